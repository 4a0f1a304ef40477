//! Collision detection: spatial hashing, narrow phase, persistent arbiters, handlers and queries.

pub mod arbiter;
pub mod broadphase;
pub mod contact;
pub mod handler;
pub mod narrowphase;
pub mod queries;

pub use arbiter::{Arbiter, ArbiterState};
pub use broadphase::SpatialHash;
pub use contact::Contact;
pub use handler::{CallbackContext, CollisionHandler, FilterCallback, HandlerKey, HandlerRegistry, NotifyCallback};
pub use narrowphase::{NarrowPhase, SATAlgorithm};
pub use queries::SegmentHit;
