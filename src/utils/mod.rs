//! Utility helpers including math extensions, allocators, hashing, logging, and profiling.

pub mod allocator;
pub mod hash;
pub mod logging;
pub mod math;
pub mod profiling;

pub use allocator::{Arena, BodyId, ConstraintId, EntityId, GenerationalId, IdCounter, ShapeId};
pub use math::*;
pub use profiling::StepProfile;
