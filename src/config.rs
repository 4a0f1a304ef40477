//! Configuration constants and the per-space tuning struct.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Default gravity applied to every dynamic body (none, like an empty tabletop).
pub const DEFAULT_GRAVITY: [f32; 2] = [0.0, 0.0];

/// Solver iterations over contacts and constraints per step.
pub const DEFAULT_ITERATIONS: u32 = 10;

/// Restitution-only iterations run before velocity integration.
pub const DEFAULT_ELASTIC_ITERATIONS: u32 = 0;

/// Fraction of velocity retained after one second. `1.0` disables damping.
pub const DEFAULT_DAMPING: f32 = 1.0;

/// Edge length of a spatial hash cell.
pub const DEFAULT_CELL_SIZE: f32 = 100.0;

/// Requested bucket count for the spatial hashes, rounded up to a tabulated prime.
pub const DEFAULT_CELL_COUNT: usize = 1000;

/// Penetration tolerated before positional correction kicks in.
pub const DEFAULT_COLLISION_SLOP: f32 = 0.1;

/// Fraction of penetration resolved per step through bias impulses.
pub const DEFAULT_COLLISION_BIAS_COEF: f32 = 0.1;

/// Default error-correction rate for joints.
pub const DEFAULT_CONSTRAINT_BIAS_COEF: f32 = 0.1;

/// Steps an arbiter survives without contact before it is dropped.
pub const DEFAULT_CONTACT_PERSISTENCE: u32 = 1;

/// Upper bound on contact points stored per arbiter.
pub const MAX_CONTACTS_PER_ARBITER: usize = 6;

/// Number of handles or bins added whenever a spatial hash pool runs dry.
pub const POOL_BATCH_SIZE: usize = 128;

/// Tunables owned by a single [`crate::Space`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpaceConfig {
    pub gravity: Vec2,
    pub iterations: u32,
    pub elastic_iterations: u32,
    pub damping: f32,
    pub collision_slop: f32,
    pub collision_bias_coef: f32,
    pub contact_persistence: u32,
    pub static_cell_size: f32,
    pub static_cell_count: usize,
    pub active_cell_size: f32,
    pub active_cell_count: usize,
    /// Log a warning when a step takes longer than this many milliseconds.
    pub step_budget_ms: Option<f32>,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::from_array(DEFAULT_GRAVITY),
            iterations: DEFAULT_ITERATIONS,
            elastic_iterations: DEFAULT_ELASTIC_ITERATIONS,
            damping: DEFAULT_DAMPING,
            collision_slop: DEFAULT_COLLISION_SLOP,
            collision_bias_coef: DEFAULT_COLLISION_BIAS_COEF,
            contact_persistence: DEFAULT_CONTACT_PERSISTENCE,
            static_cell_size: DEFAULT_CELL_SIZE,
            static_cell_count: DEFAULT_CELL_COUNT,
            active_cell_size: DEFAULT_CELL_SIZE,
            active_cell_count: DEFAULT_CELL_COUNT,
            step_budget_ms: None,
        }
    }
}

impl SpaceConfig {
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_elastic_iterations(mut self, iterations: u32) -> Self {
        self.elastic_iterations = iterations;
        self
    }

    pub fn with_damping(mut self, damping: f32) -> Self {
        self.damping = damping;
        self
    }

    pub fn with_collision_slop(mut self, slop: f32) -> Self {
        self.collision_slop = slop;
        self
    }

    pub fn with_collision_bias_coef(mut self, coef: f32) -> Self {
        self.collision_bias_coef = coef;
        self
    }

    pub fn with_contact_persistence(mut self, steps: u32) -> Self {
        self.contact_persistence = steps;
        self
    }

    pub fn with_cell_size(mut self, cell_size: f32) -> Self {
        self.static_cell_size = cell_size;
        self.active_cell_size = cell_size;
        self
    }

    pub fn with_cell_count(mut self, count: usize) -> Self {
        self.static_cell_count = count;
        self.active_cell_count = count;
        self
    }

    pub fn with_step_budget_ms(mut self, budget_ms: f32) -> Self {
        self.step_budget_ms = Some(budget_ms);
        self
    }
}
