//! Core types describing bodies, colliders, joints, and shared data.

pub mod types;
pub mod rigidbody;
pub mod collider;
pub mod constraints;

pub use types::{Bounds, MassProperties, Material, MaterialPairProperties, MixingMode};
pub use rigidbody::{apply_damped_spring, PositionFn, RigidBody, VelocityFn};
pub use collider::{
    Collider, ColliderBuilder, ColliderShape, CollisionFilter, CollisionType, ConvexPolygon,
    PolygonAxis, ShapeKind, WorldGeometry, ALL_LAYERS, NO_GROUP,
};
pub use constraints::{
    Constraint, DampedRotarySpring, DampedSpring, GearJoint, GrooveJoint, JointKind, PinJoint,
    PivotJoint, RatchetJoint, RotaryLimitJoint, SimpleMotor, SlideJoint,
};
