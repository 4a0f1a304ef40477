//! Simulation dynamics: integration, the contact solver and joint solving.

pub mod integrator;
pub mod joints;
pub mod solver;

pub use integrator::Integrator;
pub use solver::{apply_impulses, k_scalar, k_tensor, relative_velocity, ContactSolver};
