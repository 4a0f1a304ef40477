use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use approx::assert_abs_diff_eq;
use impulse2d::*;

const DT: f32 = 1.0 / 60.0;

fn gravity_space() -> Space {
    Space::with_config(SpaceConfig::default().with_gravity(Vec2::new(0.0, -10.0)))
}

fn add_ground(space: &mut Space) -> ShapeId {
    let ground = space.static_body();
    space
        .add_static_shape(
            Collider::builder()
                .box_shape(20.0, 2.0)
                .offset(Vec2::new(0.0, -1.0))
                .friction(0.7)
                .build(ground)
                .expect("ground box"),
        )
        .expect("ground")
}

fn add_ball(space: &mut Space, radius: f32, position: Vec2) -> (BodyId, ShapeId) {
    let mass = 1.0;
    let body = space
        .add_body(
            RigidBody::new(mass, MassProperties::circle(mass, 0.0, radius, Vec2::ZERO).moment)
                .with_position(position),
        )
        .expect("body");
    let shape = space
        .add_shape(Collider::builder().circle(radius).friction(0.7).build(body).expect("circle"))
        .expect("shape");
    (body, shape)
}

fn add_crate(space: &mut Space, size: f32, position: Vec2) -> (BodyId, ShapeId) {
    let props = MassProperties::box_shape(1.0, size, size);
    let body = space
        .add_body(RigidBody::new(props.mass, props.moment).with_position(position))
        .expect("body");
    let shape = space
        .add_shape(Collider::builder().box_shape(size, size).friction(0.7).build(body).expect("box"))
        .expect("shape");
    (body, shape)
}

#[test]
fn free_fall_matches_gravity() {
    let mut space = gravity_space();
    let body = space.add_body(RigidBody::new(2.0, 1.0)).expect("body");

    for _ in 0..60 {
        space.step(DT).expect("step");
    }

    let body = space.body(body).expect("body");
    assert_abs_diff_eq!(body.velocity.y, -10.0, epsilon = 1e-3);
    assert_abs_diff_eq!(body.velocity.x, 0.0);
    assert!(body.position.y < -4.0 && body.position.y > -6.0);
}

#[test]
fn elastic_head_on_collision_swaps_velocities() {
    let mut space = Space::new();
    let mut spawn = |x: f32, vx: f32| {
        let body = space
            .add_body(
                RigidBody::new(1.0, 1.0)
                    .with_position(Vec2::new(x, 0.0))
                    .with_velocity(Vec2::new(vx, 0.0)),
            )
            .expect("body");
        space
            .add_shape(
                Collider::builder()
                    .circle(1.0)
                    .elasticity(1.0)
                    .friction(0.0)
                    .build(body)
                    .expect("circle"),
            )
            .expect("shape");
        body
    };
    let left = spawn(-0.99, 1.0);
    let right = spawn(0.99, -1.0);

    space.step(DT).expect("step");

    let left = space.body(left).expect("left");
    let right = space.body(right).expect("right");
    assert_abs_diff_eq!(left.velocity.x, -1.0, epsilon = 1e-3);
    assert_abs_diff_eq!(right.velocity.x, 1.0, epsilon = 1e-3);
    assert_abs_diff_eq!(left.velocity.y, 0.0, epsilon = 1e-5);
    assert_abs_diff_eq!(left.angular_velocity, 0.0, epsilon = 1e-5);
}

#[test]
fn accumulated_impulses_carry_into_the_next_step() {
    let mut space = gravity_space();
    add_ground(&mut space);
    let (_, ball) = add_ball(&mut space, 0.5, Vec2::new(0.0, 0.45));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&seen);
    space.set_default_handler(CollisionHandler::new().with_pre_solve(move |arbiter, _| {
        let impulses: Vec<f32> = arbiter.contacts().iter().map(Contact::normal_impulse).collect();
        record.lock().expect("lock").push(impulses);
        true
    }));

    space.step(DT).expect("first step");
    let after_first: Vec<f32> = space
        .arbiters()
        .find(|arb| arb.shapes().0 == ball || arb.shapes().1 == ball)
        .expect("arbiter")
        .contacts()
        .iter()
        .map(Contact::normal_impulse)
        .collect();
    assert!(after_first.iter().all(|jn| *jn > 0.0));

    space.step(DT).expect("second step");
    let seen = seen.lock().expect("lock");
    assert_eq!(seen.len(), 2);
    assert!(seen[0].iter().all(|jn| *jn == 0.0));
    assert_eq!(seen[1], after_first);
}

#[test]
fn separated_pairs_linger_for_the_persistence_window() {
    let mut space = Space::with_config(SpaceConfig::default().with_contact_persistence(3));
    let (_, a) = add_ball(&mut space, 1.0, Vec2::ZERO);
    let (moving, b) = add_ball(&mut space, 1.0, Vec2::new(1.5, 0.0));

    let separations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&separations);
    space.set_default_handler(CollisionHandler::new().with_separate(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    }));

    space.step(DT).expect("touching");
    assert!(space.arbiter(a, b).expect("arbiter").is_touching());

    space.body_mut(moving).expect("body").position = Vec2::new(50.0, 0.0);
    for _ in 0..3 {
        space.step(DT).expect("apart");
        let arbiter = space.arbiter(a, b).expect("arbiter kept within persistence");
        assert!(!arbiter.is_touching());
        assert_eq!(arbiter.state(), ArbiterState::New);
    }
    assert_eq!(separations.load(Ordering::SeqCst), 1);

    space.step(DT).expect("apart");
    assert!(space.arbiter(a, b).is_none());
    assert_eq!(separations.load(Ordering::SeqCst), 1);
}

#[test]
fn touching_again_starts_a_fresh_contact() {
    let mut space = Space::with_config(SpaceConfig::default().with_contact_persistence(5));
    let (_, a) = add_ball(&mut space, 1.0, Vec2::ZERO);
    let (moving, b) = add_ball(&mut space, 1.0, Vec2::new(1.5, 0.0));

    let begins = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&begins);
    space.set_default_handler(CollisionHandler::new().with_begin(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
        true
    }));

    space.step(DT).expect("step");
    space.body_mut(moving).expect("body").position = Vec2::new(50.0, 0.0);
    space.step(DT).expect("step");
    space.body_mut(moving).expect("body").position = Vec2::new(1.5, 0.0);
    space.step(DT).expect("step");

    assert_eq!(begins.load(Ordering::SeqCst), 2);
    assert_eq!(space.arbiter(a, b).expect("arbiter").state(), ArbiterState::Normal);
}

#[test]
fn box_comes_to_rest_on_the_ground() {
    let mut space = gravity_space();
    add_ground(&mut space);
    let (body, _) = add_crate(&mut space, 1.0, Vec2::new(0.0, 0.6));

    for _ in 0..300 {
        space.step(DT).expect("step");
    }

    let body = space.body(body).expect("body");
    assert!(body.position.y > 0.35 && body.position.y < 0.55, "y = {}", body.position.y);
    assert!(body.velocity.length() < 0.05, "v = {:?}", body.velocity);
    assert!(body.angle().abs() < 1e-2);
    assert!(body.position.x.abs() < 1e-2);
}

#[test]
fn a_short_stack_stays_upright() {
    let mut space = gravity_space();
    space.set_iterations(20);
    add_ground(&mut space);
    let crates: Vec<BodyId> = (0..3)
        .map(|i| add_crate(&mut space, 1.0, Vec2::new(0.0, 0.5 + i as f32 * 1.0)).0)
        .collect();

    for _ in 0..240 {
        space.step(DT).expect("step");
    }

    for (i, id) in crates.iter().enumerate() {
        let body = space.body(*id).expect("crate");
        assert!(body.position.x.abs() < 0.1, "crate {i} drifted to {:?}", body.position);
        assert!(body.position.y > i as f32 * 0.9, "crate {i} sank to {:?}", body.position);
    }
}

fn scatter_scene() -> (Space, Vec<BodyId>) {
    let mut space = gravity_space();
    add_ground(&mut space);
    let mut bodies = Vec::new();
    for i in 0..12 {
        let x = (i % 4) as f32 * 1.1 - 1.6 + (i / 4) as f32 * 0.13;
        let y = 1.0 + (i / 4) as f32 * 1.2;
        let id = if i % 2 == 0 {
            add_ball(&mut space, 0.45, Vec2::new(x, y)).0
        } else {
            add_crate(&mut space, 0.9, Vec2::new(x, y)).0
        };
        bodies.push(id);
    }
    (space, bodies)
}

#[test]
fn identical_scenes_evolve_identically() {
    let (mut first, first_ids) = scatter_scene();
    let (mut second, second_ids) = scatter_scene();

    for _ in 0..180 {
        first.step(DT).expect("step");
        second.step(DT).expect("step");
    }

    for (a, b) in first_ids.iter().zip(&second_ids) {
        let a = first.body(*a).expect("body");
        let b = second.body(*b).expect("body");
        assert_eq!(a.position, b.position);
        assert_eq!(a.velocity, b.velocity);
        assert_eq!(a.angle(), b.angle());
        assert_eq!(a.angular_velocity, b.angular_velocity);
    }
    assert_eq!(first.arbiters().count(), second.arbiters().count());
}

#[test]
fn mutation_inside_a_step_is_deferred() {
    let mut space = Space::new();
    let (_, a) = add_ball(&mut space, 1.0, Vec2::ZERO);
    let (doomed_body, b) = add_ball(&mut space, 1.0, Vec2::new(1.5, 0.0));

    space.set_default_handler(CollisionHandler::new().with_begin(move |arbiter, ctx| {
        let (first, second) = arbiter.shapes();
        let victim = if first == b { first } else { second };
        assert!(ctx.remove_shape_later(victim));
        assert!(!ctx.remove_shape_later(victim));
        true
    }));

    space.step(DT).expect("step");
    assert!(space.shape(b).is_none());
    assert!(space.shape(a).is_some());
    assert!(space.arbiter(a, b).is_none());
    assert!(space.body(doomed_body).is_some());
}

#[test]
fn removed_bodies_leave_their_shapes_inert() {
    let mut space = gravity_space();
    add_ground(&mut space);
    let (body, shape) = add_ball(&mut space, 0.5, Vec2::new(0.0, 0.45));
    space.step(DT).expect("step");

    let removed = space.remove_body(body).expect("remove");
    assert_eq!(removed.id, body);
    space.step(DT).expect("step without the body");
    assert!(space.shape(shape).is_some());
    assert!(matches!(space.remove_body(body), Err(PhysicsError::UnknownBody(_))));
}

#[test]
fn profile_counts_the_last_step() {
    let (mut space, bodies) = scatter_scene();
    space.step(DT).expect("step");

    let profile = space.last_step_profile();
    assert_eq!(profile.body_count, bodies.len() + 1);
    assert_eq!(profile.shape_count, bodies.len() + 1);
    assert_eq!(profile.arbiter_count, space.arbiters().count());
    assert_eq!(space.stamp(), 1);
}

#[test]
fn the_built_in_static_body_stays() {
    let mut space = gravity_space();
    let floor = add_ground(&mut space);
    let ground = space.static_body();

    assert!(matches!(space.remove_body(ground), Err(PhysicsError::StaticBody(id)) if id == ground));
    assert!(space.body(ground).is_some());
    assert_eq!(space.shape(floor).expect("floor").body, ground);
}
