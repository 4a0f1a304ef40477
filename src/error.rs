//! Typed errors returned by space mutation and stepping.

use thiserror::Error;

use crate::utils::allocator::{BodyId, ConstraintId, ShapeId};

/// Result alias used across the public API.
pub type PhysicsResult<T> = Result<T, PhysicsError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("body {0:?} is not part of this space")]
    UnknownBody(BodyId),

    #[error("shape {0:?} is not part of this space")]
    UnknownShape(ShapeId),

    #[error("constraint {0:?} is not part of this space")]
    UnknownConstraint(ConstraintId),

    #[error("shape {0:?} is already indexed")]
    DuplicateShape(ShapeId),

    #[error("invalid polygon: {reason}")]
    InvalidPolygon { reason: String },

    #[error("invalid shape: {reason}")]
    InvalidShape { reason: String },

    #[error("invalid mass properties (mass {mass}, moment {moment})")]
    InvalidMass { mass: f32, moment: f32 },

    #[error("body {0:?} is the space's built-in static body")]
    StaticBody(BodyId),

    #[error("constraint attaches body {0:?} to itself")]
    SameBody(BodyId),

    #[error("unsolvable constraint: {reason}")]
    UnsolvableConstraint { reason: String },

    #[error("space is locked while stepping; schedule the change as a post-step callback")]
    Locked,
}

impl PhysicsError {
    #[must_use]
    pub fn invalid_polygon(reason: impl Into<String>) -> Self {
        Self::InvalidPolygon {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn unsolvable(reason: impl Into<String>) -> Self {
        Self::UnsolvableConstraint {
            reason: reason.into(),
        }
    }
}
