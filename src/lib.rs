//! impulse2d – deterministic 2D rigid-body physics.
//!
//! A [`Space`] owns bodies, shapes and joints and advances them in fixed steps:
//! a spatial hash finds candidate pairs, the narrow phase produces contacts,
//! persistent [`Arbiter`]s carry impulses between steps, and a
//! sequential-impulse solver resolves contacts and joints together.
//!
//! ```
//! use impulse2d::*;
//!
//! let mut space = Space::with_config(SpaceConfig::default().with_gravity(Vec2::new(0.0, -10.0)));
//! let ball = space.add_body(RigidBody::new(1.0, 1.0)).unwrap();
//! space.add_shape(Collider::builder().circle(0.5).build(ball).unwrap()).unwrap();
//! space.step(1.0 / 60.0).unwrap();
//! assert!(space.body(ball).unwrap().velocity.y < 0.0);
//! ```

pub mod collision;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod utils;
pub mod world;

pub use glam::{Mat2, Vec2};

pub use collision::{
    arbiter::{Arbiter, ArbiterState},
    broadphase::SpatialHash,
    contact::Contact,
    handler::{CallbackContext, CollisionHandler},
    narrowphase::NarrowPhase,
    queries::SegmentHit,
};
pub use config::SpaceConfig;
pub use core::{
    collider::{Collider, ColliderBuilder, ColliderShape, CollisionFilter, CollisionType, ShapeKind, ALL_LAYERS, NO_GROUP},
    constraints::{
        Constraint, DampedRotarySpring, DampedSpring, GearJoint, GrooveJoint, JointKind, PinJoint, PivotJoint,
        RatchetJoint, RotaryLimitJoint, SimpleMotor, SlideJoint,
    },
    rigidbody::{apply_damped_spring, PositionFn, RigidBody, VelocityFn},
    types::{Bounds, MassProperties, Material, MixingMode},
};
pub use error::{PhysicsError, PhysicsResult};
pub use utils::{
    allocator::{BodyId, ConstraintId, EntityId, ShapeId},
    profiling::StepProfile,
};
pub use world::{post_step::PostStepKey, QueryFilter, Space};
