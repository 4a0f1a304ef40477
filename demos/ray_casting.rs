use impulse2d::*;

fn main() -> PhysicsResult<()> {
    let mut space = Space::new();
    let ground = space.static_body();

    for i in 0..4 {
        space.add_static_shape(
            Collider::builder()
                .circle(1.0)
                .offset(Vec2::new(i as f32 * 4.0, 0.0))
                .build(ground)?,
        )?;
    }

    let (start, end) = (Vec2::new(-5.0, 0.2), Vec2::new(20.0, 0.2));
    let mut hits = 0;
    space.segment_query(start, end, QueryFilter::default(), |_| hits += 1);
    println!("Ray hits: {hits}");

    if let Some(hit) = space.segment_query_first(start, end, QueryFilter::default()) {
        println!(
            "First hit at {:?}, normal {:?}, distance {:.2}",
            hit.hit_point(start, end),
            hit.normal,
            hit.hit_distance(start, end)
        );
    }
    Ok(())
}
