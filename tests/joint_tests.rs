use approx::assert_abs_diff_eq;
use impulse2d::*;

const DT: f32 = 1.0 / 60.0;

fn gravity_space() -> Space {
    Space::with_config(SpaceConfig::default().with_gravity(Vec2::new(0.0, -10.0)))
}

fn add_body(space: &mut Space, position: Vec2) -> BodyId {
    space
        .add_body(RigidBody::new(1.0, 1.0).with_position(position))
        .expect("body")
}

fn run(space: &mut Space, steps: usize) {
    for _ in 0..steps {
        space.step(DT).expect("step");
    }
}

#[test]
fn pin_joint_holds_its_distance() {
    let mut space = gravity_space();
    let ground = space.static_body();
    let bob = add_body(&mut space, Vec2::new(3.0, 0.0));

    let pin = {
        let a = space.body(ground).expect("ground");
        let b = space.body(bob).expect("bob");
        PinJoint::new(a, b, Vec2::ZERO, Vec2::ZERO)
    };
    assert_abs_diff_eq!(pin.distance, 3.0, epsilon = 1e-6);
    space.add_constraint(Constraint::new(ground, bob, pin)).expect("pin");

    run(&mut space, 120);

    let bob = space.body(bob).expect("bob");
    assert_abs_diff_eq!(bob.position.length(), 3.0, epsilon = 0.05);
    assert!(bob.position.x < 2.0, "the bob should have swung, got {:?}", bob.position);
}

#[test]
fn pin_joint_between_free_bodies_converges() {
    let mut space = Space::new();
    let a = space
        .add_body(RigidBody::new(1.0, 1.0).with_velocity(Vec2::new(0.0, 1.0)))
        .expect("a");
    let b = space
        .add_body(
            RigidBody::new(2.0, 1.0)
                .with_position(Vec2::new(3.0, 0.0))
                .with_velocity(Vec2::new(0.5, -1.0)),
        )
        .expect("b");
    let pin = PinJoint::with_distance(Vec2::ZERO, Vec2::ZERO, 3.0);
    space.add_constraint(Constraint::new(a, b, pin)).expect("pin");

    run(&mut space, 120);

    let distance = space.body(a).expect("a").position.distance(space.body(b).expect("b").position);
    assert_abs_diff_eq!(distance, 3.0, epsilon = 0.05);
}

#[test]
fn pivot_joint_keeps_anchors_together() {
    let mut space = gravity_space();
    let ground = space.static_body();
    let arm = add_body(&mut space, Vec2::new(2.0, 0.0));

    let pivot = {
        let a = space.body(ground).expect("ground");
        let b = space.body(arm).expect("arm");
        PivotJoint::from_world_pivot(a, b, Vec2::ZERO)
    };
    let anchor = pivot.anchor_b;
    let id = space.add_constraint(Constraint::new(ground, arm, pivot)).expect("pivot");

    run(&mut space, 120);

    let arm = space.body(arm).expect("arm");
    assert!(arm.local_to_world(anchor).length() < 0.05);
    assert!(arm.position.x < 1.5, "the arm should have swung, got {:?}", arm.position);
    assert!(space.constraint(id).expect("pivot").impulse() > 0.0);
}

#[test]
fn slide_joint_only_acts_past_its_limits() {
    let mut space = gravity_space();
    let ground = space.static_body();
    let bob = add_body(&mut space, Vec2::new(0.0, -1.0));
    let id = space
        .add_constraint(Constraint::new(
            ground,
            bob,
            SlideJoint::new(Vec2::ZERO, Vec2::ZERO, 0.5, 2.0),
        ))
        .expect("slide");

    run(&mut space, 10);
    assert_eq!(space.constraint(id).expect("slide").impulse(), 0.0);

    run(&mut space, 200);
    let bob = space.body(bob).expect("bob");
    let distance = bob.position.length();
    assert!(distance > 1.9 && distance < 2.05, "distance {distance}");
}

#[test]
fn groove_joint_confines_the_anchor_to_the_groove() {
    let mut space = gravity_space();
    let ground = space.static_body();
    let slider = space
        .add_body(RigidBody::new(1.0, 1.0).with_velocity(Vec2::new(3.0, 0.0)))
        .expect("slider");
    space
        .add_constraint(Constraint::new(
            ground,
            slider,
            GrooveJoint::new(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0), Vec2::ZERO),
        ))
        .expect("groove");

    run(&mut space, 30);
    let position = space.body(slider).expect("slider").position;
    assert!(position.y.abs() < 0.05, "fell off the groove: {position:?}");
    assert!(position.x > 1.0 && position.x < 2.0, "slid to {position:?}");

    run(&mut space, 180);
    let position = space.body(slider).expect("slider").position;
    assert!(position.x < 5.05, "passed the end of the groove: {position:?}");
    assert!(position.y.abs() < 0.05);
}

#[test]
fn simple_motor_spins_the_body_against_its_rate() {
    let mut space = Space::new();
    let ground = space.static_body();
    let wheel = add_body(&mut space, Vec2::ZERO);
    space
        .add_constraint(Constraint::new(ground, wheel, SimpleMotor::new(2.0)))
        .expect("motor");

    run(&mut space, 30);
    assert_abs_diff_eq!(space.body(wheel).expect("wheel").angular_velocity, -2.0, epsilon = 1e-3);
}

#[test]
fn weak_motor_is_limited_by_max_force() {
    let mut space = Space::new();
    let ground = space.static_body();
    let wheel = add_body(&mut space, Vec2::ZERO);
    space
        .add_constraint(Constraint::new(ground, wheel, SimpleMotor::new(10.0)).with_max_force(6.0))
        .expect("motor");

    run(&mut space, 1);
    let w = space.body(wheel).expect("wheel").angular_velocity;
    assert_abs_diff_eq!(w, -6.0 * DT, epsilon = 1e-4);
}

#[test]
fn gear_joint_locks_relative_spin() {
    let mut space = Space::new();
    let driver = space
        .add_body(RigidBody::new(1.0, 1.0).with_position(Vec2::new(-1.0, 0.0)))
        .expect("driver");
    let driven = add_body(&mut space, Vec2::new(1.0, 0.0));
    space.body_mut(driver).expect("driver").angular_velocity = 2.0;
    space
        .add_constraint(Constraint::new(driver, driven, GearJoint::new(0.0, 1.0)))
        .expect("gear");

    run(&mut space, 120);

    let a = space.body(driver).expect("driver").angular_velocity;
    let b = space.body(driven).expect("driven").angular_velocity;
    assert_abs_diff_eq!(a, b, epsilon = 1e-2);
    assert_abs_diff_eq!(a + b, 2.0, epsilon = 1e-3);
}

#[test]
fn rotary_limit_stops_the_spin() {
    let mut space = Space::new();
    let ground = space.static_body();
    let wheel = add_body(&mut space, Vec2::ZERO);
    space.body_mut(wheel).expect("wheel").angular_velocity = 5.0;
    space
        .add_constraint(Constraint::new(ground, wheel, RotaryLimitJoint::new(-0.5, 0.5)))
        .expect("limit");

    run(&mut space, 120);

    let wheel = space.body(wheel).expect("wheel");
    assert!(wheel.angle() > 0.3 && wheel.angle() < 0.7, "angle {}", wheel.angle());
    assert!(wheel.angular_velocity.abs() < 0.1);
}

#[test]
fn damped_spring_settles_at_its_rest_length() {
    let mut space = Space::new();
    let ground = space.static_body();
    let bob = add_body(&mut space, Vec2::new(4.0, 0.0));
    space
        .add_constraint(Constraint::new(
            ground,
            bob,
            DampedSpring::new(Vec2::ZERO, Vec2::ZERO, 2.0, 20.0, 4.0),
        ))
        .expect("spring");

    run(&mut space, 600);

    let bob = space.body(bob).expect("bob");
    assert_abs_diff_eq!(bob.position.length(), 2.0, epsilon = 0.05);
    assert!(bob.velocity.length() < 0.05);
}

#[test]
fn damped_rotary_spring_returns_to_rest() {
    let mut space = Space::new();
    let ground = space.static_body();
    let wheel = space
        .add_body(RigidBody::new(1.0, 1.0).with_angle(1.0))
        .expect("wheel");
    space
        .add_constraint(Constraint::new(ground, wheel, DampedRotarySpring::new(0.0, 10.0, 2.0)))
        .expect("spring");

    run(&mut space, 600);

    let wheel = space.body(wheel).expect("wheel");
    assert_abs_diff_eq!(wheel.angle(), 0.0, epsilon = 0.02);
}

#[test]
fn constraints_of_a_body_are_listed_and_removable() {
    let mut space = Space::new();
    let ground = space.static_body();
    let wheel = add_body(&mut space, Vec2::ZERO);
    let motor = space
        .add_constraint(Constraint::new(ground, wheel, SimpleMotor::new(1.0)))
        .expect("motor");
    let limit = space
        .add_constraint(Constraint::new(ground, wheel, RotaryLimitJoint::new(-1.0, 1.0)))
        .expect("limit");

    let mut listed = space.constraints_of(wheel);
    listed.sort();
    let mut expected = vec![motor, limit];
    expected.sort();
    assert_eq!(listed, expected);

    let removed = space.remove_constraint(motor).expect("remove");
    assert!(matches!(removed.kind, JointKind::SimpleMotor(_)));
    assert_eq!(space.constraints_of(wheel), vec![limit]);
    assert!(matches!(
        space.remove_constraint(motor),
        Err(PhysicsError::UnknownConstraint(_))
    ));
}

#[test]
fn joint_between_two_fixed_bodies_is_rejected() {
    let mut space = Space::new();
    let ground = space.static_body();
    let wall = space.add_body(RigidBody::new_static()).expect("wall");
    let err = space
        .add_constraint(Constraint::new(ground, wall, PivotJoint::new(Vec2::ZERO, Vec2::ZERO)))
        .expect_err("unsolvable");
    assert!(matches!(err, PhysicsError::UnsolvableConstraint { .. }));
}

#[test]
fn gear_with_a_zero_ratio_never_corrupts_velocities() {
    let mut space = Space::new();
    let driver = add_body(&mut space, Vec2::new(-1.0, 0.0));
    let driven = add_body(&mut space, Vec2::new(1.0, 0.0));

    let err = space
        .add_constraint(Constraint::new(driver, driven, GearJoint::new(0.0, 0.0)))
        .expect_err("zero ratio");
    assert!(matches!(err, PhysicsError::UnsolvableConstraint { .. }));
    assert_eq!(space.constraints().count(), 0);

    space.body_mut(driver).expect("driver").angular_velocity = 2.0;
    let gear = space
        .add_constraint(Constraint::new(driver, driven, GearJoint::new(0.0, 1.0)))
        .expect("gear");
    run(&mut space, 10);

    if let Some(JointKind::Gear(joint)) = space.constraint_mut(gear).map(|c| &mut c.kind) {
        joint.set_ratio(0.0);
    }
    let before = (
        space.body(driver).expect("driver").angular_velocity,
        space.body(driven).expect("driven").angular_velocity,
    );
    for _ in 0..2 {
        let err = space.step(DT).expect_err("neutralized gear");
        assert!(matches!(err, PhysicsError::UnsolvableConstraint { .. }));
    }

    let a = space.body(driver).expect("driver");
    let b = space.body(driven).expect("driven");
    assert!(a.angular_velocity.is_finite() && a.angle().is_finite());
    assert_eq!((a.angular_velocity, b.angular_velocity), before);
    assert_eq!(space.constraint(gear).expect("gear").impulse(), 0.0);
}
