use glam::Vec2;

use crate::{core::rigidbody::RigidBody, utils::allocator::Arena};

/// Symplectic Euler stepping through each body's integration hooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Integrator;

impl Integrator {
    /// Per-step velocity factor for a space whose bodies keep `damping` of their
    /// velocity after one second.
    pub fn damping_factor(damping: f32, dt: f32) -> f32 {
        damping.powf(dt)
    }

    /// Moves every non-static body along its current (and bias) velocity.
    pub fn integrate_positions(bodies: &mut Arena<RigidBody>, dt: f32) {
        for body in bodies.iter_mut() {
            if body.is_static {
                continue;
            }
            body.integrate_position(dt);
        }
    }

    /// Applies gravity, forces and damping to every non-static body.
    pub fn integrate_velocities(bodies: &mut Arena<RigidBody>, gravity: Vec2, damping: f32, dt: f32) {
        let damping = Self::damping_factor(damping, dt);
        for body in bodies.iter_mut() {
            if body.is_static {
                continue;
            }
            body.integrate_velocity(gravity, damping, dt);
        }
    }
}
