use impulse2d::*;

fn main() -> PhysicsResult<()> {
    let mut space = Space::with_config(SpaceConfig::default().with_gravity(Vec2::new(0.0, -10.0)));

    let ground = space.static_body();
    space.add_static_shape(
        Collider::builder()
            .segment(Vec2::new(-20.0, 0.0), Vec2::new(20.0, 0.0), 0.0)
            .friction(1.0)
            .build(ground)?,
    )?;

    let radius = 0.5;
    let props = MassProperties::circle(1.0, 0.0, radius, Vec2::ZERO);
    let ball = space.add_body(
        RigidBody::new(props.mass, props.moment)
            .with_position(Vec2::new(0.0, 5.0))
            .with_velocity(Vec2::new(2.0, 0.0)),
    )?;
    space.add_shape(
        Collider::builder()
            .circle(radius)
            .material(Material::rubber())
            .build(ball)?,
    )?;

    for frame in 0..180 {
        space.step(1.0 / 60.0)?;
        if frame % 30 == 0 {
            if let Some(body) = space.body(ball) {
                println!(
                    "t={:.2}s position={:?} angle={:.2}",
                    frame as f32 / 60.0,
                    body.position,
                    body.angle()
                );
            }
        }
    }
    Ok(())
}
