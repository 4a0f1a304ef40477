use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
};

use impulse2d::*;

const DT: f32 = 1.0 / 60.0;
const PLAYER: CollisionType = 1;
const WALL: CollisionType = 2;
const TRIGGER: CollisionType = 3;

fn disc(space: &mut Space, x: f32, collision_type: CollisionType, sensor: bool) -> (BodyId, ShapeId) {
    let body = space
        .add_body(RigidBody::new(1.0, 1.0).with_position(Vec2::new(x, 0.0)))
        .expect("body");
    let shape = space
        .add_shape(
            Collider::builder()
                .circle(1.0)
                .collision_type(collision_type)
                .sensor(sensor)
                .build(body)
                .expect("circle"),
        )
        .expect("shape");
    (body, shape)
}

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    (Arc::clone(&count), count)
}

#[test]
fn rejected_begin_ignores_the_pair_until_it_separates() {
    let mut space = Space::new();
    let (a_body, a) = disc(&mut space, 0.0, PLAYER, false);
    let (b_body, b) = disc(&mut space, 1.0, WALL, false);

    let (begin_count, begins) = counter();
    let (pre_solve_count, pre_solves) = counter();
    let (separate_count, separates) = counter();
    space.set_collision_handler(
        PLAYER,
        WALL,
        CollisionHandler::new()
            .with_begin(move |_, _| {
                begin_count.fetch_add(1, Ordering::SeqCst);
                false
            })
            .with_pre_solve(move |_, _| {
                pre_solve_count.fetch_add(1, Ordering::SeqCst);
                true
            })
            .with_separate(move |_, _| {
                separate_count.fetch_add(1, Ordering::SeqCst);
            }),
    );

    for _ in 0..3 {
        space.step(DT).expect("step");
    }

    assert_eq!(begins.load(Ordering::SeqCst), 1);
    assert_eq!(pre_solves.load(Ordering::SeqCst), 0);
    assert_eq!(space.arbiter(a, b).expect("arbiter").state(), ArbiterState::Ignore);
    assert_eq!(space.body(a_body).expect("a").position, Vec2::ZERO);
    assert_eq!(space.body(b_body).expect("b").position, Vec2::new(1.0, 0.0));
    assert_eq!(space.last_step_profile().contact_count, 0);

    space.body_mut(b_body).expect("b").position = Vec2::new(40.0, 0.0);
    space.step(DT).expect("step");
    assert_eq!(separates.load(Ordering::SeqCst), 1);
    assert!(space.arbiter(a, b).is_none());
}

#[test]
fn rejected_pre_solve_skips_only_that_step() {
    let mut space = Space::new();
    let (a_body, _) = disc(&mut space, 0.0, PLAYER, false);
    disc(&mut space, 1.0, WALL, false);

    let allow = Arc::new(Mutex::new(false));
    let gate = Arc::clone(&allow);
    space.set_collision_handler(
        PLAYER,
        WALL,
        CollisionHandler::new().with_pre_solve(move |_, _| *gate.lock().expect("lock")),
    );

    space.step(DT).expect("step");
    assert_eq!(space.body(a_body).expect("a").position, Vec2::ZERO);
    assert_eq!(space.last_step_profile().contact_count, 0);

    *allow.lock().expect("lock") = true;
    space.step(DT).expect("step");
    assert_eq!(space.last_step_profile().contact_count, 1);

    // Separation applied on one step moves the bodies on the next.
    space.step(DT).expect("step");
    assert!(space.body(a_body).expect("a").position.x < 0.0);
}

#[test]
fn handler_sees_shapes_in_registration_order() {
    let mut space = Space::new();
    let (_, wall) = disc(&mut space, 0.0, WALL, false);
    let (_, player) = disc(&mut space, 1.0, PLAYER, false);

    let seen = Arc::new(Mutex::new(None));
    let record = Arc::clone(&seen);
    space.set_collision_handler(
        PLAYER,
        WALL,
        CollisionHandler::new().with_begin(move |arbiter, _| {
            *record.lock().expect("lock") = Some((arbiter.shapes(), arbiter.normal(0)));
            true
        }),
    );
    space.step(DT).expect("step");

    let (shapes, normal) = seen.lock().expect("lock").take().expect("begin ran");
    assert_eq!(shapes, (player, wall));
    let normal = normal.expect("one contact");
    assert!(normal.x < -0.99, "normal {normal:?} should point from player to wall");
}

#[test]
fn sensors_need_a_registered_handler() {
    let mut space = Space::new();
    let (_, trigger) = disc(&mut space, 0.0, TRIGGER, true);
    let (body, player) = disc(&mut space, 1.0, PLAYER, false);

    space.step(DT).expect("step");
    assert!(space.arbiter(trigger, player).is_none());

    let (begin_count, begins) = counter();
    space.set_collision_handler(
        TRIGGER,
        PLAYER,
        CollisionHandler::new().with_begin(move |_, _| {
            begin_count.fetch_add(1, Ordering::SeqCst);
            true
        }),
    );
    space.step(DT).expect("step");
    space.step(DT).expect("step");

    assert_eq!(begins.load(Ordering::SeqCst), 1);
    assert!(space.arbiter(trigger, player).is_some());
    assert_eq!(space.body(body).expect("player").position, Vec2::new(1.0, 0.0));
    assert_eq!(space.last_step_profile().contact_count, 0);
}

#[test]
fn post_solve_sees_final_impulses() {
    let mut space = Space::new();
    let (mover, _) = disc(&mut space, 0.0, PLAYER, false);
    disc(&mut space, 1.5, WALL, false);
    space.body_mut(mover).expect("mover").velocity = Vec2::new(2.0, 0.0);

    let impulses = Arc::new(Mutex::new(Vec::new()));
    let record = Arc::clone(&impulses);
    space.set_collision_handler(
        PLAYER,
        WALL,
        CollisionHandler::new().with_post_solve(move |arbiter, _| {
            record.lock().expect("lock").push(arbiter.total_impulse());
        }),
    );
    space.step(DT).expect("step");

    let impulses = impulses.lock().expect("lock");
    assert_eq!(impulses.len(), 1);
    assert!(impulses[0].x > 0.0, "wall should be pushed along +x, got {:?}", impulses[0]);
}

#[test]
fn callbacks_can_remove_shapes_after_the_step() {
    let mut space = Space::new();
    let (_, player) = disc(&mut space, 0.0, PLAYER, false);
    let (_, pickup) = disc(&mut space, 1.0, TRIGGER, true);

    let (separate_count, separates) = counter();
    space.set_collision_handler(
        PLAYER,
        TRIGGER,
        CollisionHandler::new()
            .with_begin(|arbiter, ctx| {
                let (_, pickup) = arbiter.shapes();
                ctx.remove_shape_later(pickup);
                false
            })
            .with_separate(move |_, _| {
                separate_count.fetch_add(1, Ordering::SeqCst);
            }),
    );

    space.step(DT).expect("step");
    assert!(space.shape(pickup).is_none());
    assert!(space.shape(player).is_some());
    assert!(space.arbiter(player, pickup).is_none());
    assert_eq!(separates.load(Ordering::SeqCst), 1);
}

#[test]
fn post_step_callbacks_run_once_per_key() {
    let mut space = Space::new();
    let (calls, count) = counter();

    let first = Arc::clone(&calls);
    assert!(space.add_post_step_callback(PostStepKey::User(7), move |_| {
        first.fetch_add(1, Ordering::SeqCst);
    }));
    let second = Arc::clone(&calls);
    assert!(!space.add_post_step_callback(PostStepKey::User(7), move |_| {
        second.fetch_add(10, Ordering::SeqCst);
    }));

    space.step(DT).expect("step");
    assert_eq!(count.load(Ordering::SeqCst), 1);

    space.step(DT).expect("step");
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[test]
fn callbacks_queued_while_draining_wait_for_the_next_step() {
    let mut space = Space::new();
    let order = Arc::new(Mutex::new(Vec::new()));

    let outer = Arc::clone(&order);
    space.add_post_step_callback(PostStepKey::User(1), move |space| {
        outer.lock().expect("lock").push(("outer", space.stamp()));
        let inner = Arc::clone(&outer);
        space.add_post_step_callback(PostStepKey::User(1), move |space| {
            inner.lock().expect("lock").push(("inner", space.stamp()));
        });
    });

    space.step(DT).expect("step");
    assert_eq!(*order.lock().expect("lock"), vec![("outer", 0)]);

    space.step(DT).expect("step");
    assert_eq!(*order.lock().expect("lock"), vec![("outer", 0), ("inner", 1)]);
}

#[test]
fn callbacks_defer_body_creation_until_after_the_step() {
    let mut space = Space::new();
    disc(&mut space, 0.0, PLAYER, false);
    disc(&mut space, 1.0, WALL, false);

    let result = Arc::new(Mutex::new(None));
    let record = Arc::clone(&result);
    space.set_collision_handler(
        PLAYER,
        WALL,
        CollisionHandler::new().with_begin(move |_, ctx| {
            let queued = ctx.add_post_step_callback(PostStepKey::User(0), |space| {
                let _ = space.add_body(RigidBody::new(1.0, 1.0));
            });
            *record.lock().expect("lock") = Some(queued);
            true
        }),
    );

    let before = space.bodies().count();
    space.step(DT).expect("step");
    assert_eq!(*result.lock().expect("lock"), Some(true));
    assert_eq!(space.bodies().count(), before + 1);
    assert!(!space.is_locked());
}

#[test]
fn default_handler_covers_unregistered_pairs() {
    let mut space = Space::new();
    disc(&mut space, 0.0, PLAYER, false);
    disc(&mut space, 1.0, PLAYER, false);
    disc(&mut space, 10.0, PLAYER, false);
    disc(&mut space, 11.0, WALL, false);

    let (default_count, defaults) = counter();
    let (specific_count, specifics) = counter();
    space.set_default_handler(CollisionHandler::new().with_begin(move |_, _| {
        default_count.fetch_add(1, Ordering::SeqCst);
        true
    }));
    space.set_collision_handler(
        PLAYER,
        WALL,
        CollisionHandler::new().with_begin(move |_, _| {
            specific_count.fetch_add(1, Ordering::SeqCst);
            true
        }),
    );
    space.step(DT).expect("step");

    assert_eq!(defaults.load(Ordering::SeqCst), 1);
    assert_eq!(specifics.load(Ordering::SeqCst), 1);

    assert!(space.remove_collision_handler(WALL, PLAYER));
    assert!(!space.remove_collision_handler(WALL, PLAYER));
}

#[test]
fn stepping_from_a_post_step_callback_is_refused() {
    let mut space = Space::new();
    let nested = Arc::new(Mutex::new(None));
    let record = Arc::clone(&nested);
    space.add_post_step_callback(PostStepKey::User(3), move |space| {
        *record.lock().expect("lock") = Some(space.step(DT));
    });

    space.step(DT).expect("step");
    let nested = nested.lock().expect("lock").take().expect("callback ran");
    assert!(matches!(nested, Err(PhysicsError::Locked)));
    assert_eq!(space.stamp(), 1);

    space.step(DT).expect("stepping works again afterwards");
    assert_eq!(space.stamp(), 2);
}
