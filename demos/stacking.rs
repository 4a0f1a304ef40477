use impulse2d::*;

fn main() -> PhysicsResult<()> {
    let mut space = Space::with_config(
        SpaceConfig::default()
            .with_gravity(Vec2::new(0.0, -10.0))
            .with_iterations(20)
            .with_cell_size(1.0),
    );

    let ground = space.static_body();
    space.add_static_shape(
        Collider::builder()
            .box_shape(20.0, 1.0)
            .offset(Vec2::new(0.0, -0.5))
            .friction(0.8)
            .build(ground)?,
    )?;

    let props = MassProperties::box_shape(1.0, 1.0, 1.0);
    let mut boxes = Vec::new();
    for i in 0..5 {
        let body = space.add_body(
            RigidBody::new(props.mass, props.moment).with_position(Vec2::new(0.0, 0.5 + i as f32)),
        )?;
        space.add_shape(Collider::builder().box_shape(1.0, 1.0).friction(0.8).build(body)?)?;
        boxes.push(body);
    }

    for _ in 0..120 {
        space.step(1.0 / 60.0)?;
    }

    println!("Simulated stack of boxes for 2 seconds");
    for (i, id) in boxes.iter().enumerate() {
        if let Some(body) = space.body(*id) {
            println!("box {i}: {:?}", body.position);
        }
    }
    let profile = space.last_step_profile();
    println!("{} arbiters, {} contacts", profile.arbiter_count, profile.contact_count);
    Ok(())
}
