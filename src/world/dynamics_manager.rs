use crate::{
    core::{constraints::Constraint, rigidbody::RigidBody},
    dynamics::solver::ContactSolver,
    error::PhysicsResult,
    utils::allocator::{Arena, BodyId, ConstraintId},
    world::collision_manager::ContactSet,
};

/// Joints of a space and the per-step solver passes over joints and contacts.
#[derive(Default)]
pub struct DynamicsManager {
    pub constraints: Arena<Constraint>,
}

impl DynamicsManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepares every contact in `solving` for this step.
    pub(crate) fn pre_step_contacts(
        contacts: &mut ContactSet,
        solving: &[usize],
        bodies: &Arena<RigidBody>,
        dt_inv: f32,
        slop: f32,
        bias_coef: f32,
    ) {
        for &slot in solving {
            let arbiter = match contacts.get_mut(slot) {
                Some(arbiter) => arbiter,
                None => continue,
            };
            let (a, b) = match (bodies.get(arbiter.body_a.0), bodies.get(arbiter.body_b.0)) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };
            ContactSolver::pre_step(arbiter, a, b, dt_inv, slop, bias_coef);
        }
    }

    /// Prepares and warm-starts every constraint. Constraints that cannot be
    /// solved this step are neutralized; the first such error is returned once
    /// all of them have been visited.
    pub(crate) fn pre_step_constraints(&mut self, bodies: &mut Arena<RigidBody>, dt: f32) -> PhysicsResult<()> {
        let mut first_error = Ok(());
        for constraint in self.constraints.iter_mut() {
            let (a, b) = match bodies.get2_mut(constraint.body_a.0, constraint.body_b.0) {
                Some(pair) => pair,
                None => {
                    log::warn!(
                        "constraint {:?} references a body that is no longer in the space",
                        constraint.id
                    );
                    continue;
                }
            };
            if let Err(err) = constraint.pre_step(a, b, dt) {
                log::warn!("constraint {:?} neutralized for this step: {}", constraint.id, err);
                if first_error.is_ok() {
                    first_error = Err(err);
                }
            }
        }
        first_error
    }

    pub(crate) fn apply_cached_contact_impulses(
        contacts: &ContactSet,
        solving: &[usize],
        bodies: &mut Arena<RigidBody>,
    ) {
        for &slot in solving {
            let arbiter = match contacts.get(slot) {
                Some(arbiter) => arbiter,
                None => continue,
            };
            if let Some((a, b)) = bodies.get2_mut(arbiter.body_a.0, arbiter.body_b.0) {
                ContactSolver::apply_cached_impulse(arbiter, a, b);
            }
        }
    }

    /// One sequential-impulse pass: contacts first, then joints.
    pub(crate) fn solve_iteration(
        &mut self,
        contacts: &mut ContactSet,
        solving: &[usize],
        bodies: &mut Arena<RigidBody>,
        elastic_coef: f32,
    ) {
        for &slot in solving {
            let arbiter = match contacts.get_mut(slot) {
                Some(arbiter) => arbiter,
                None => continue,
            };
            if let Some((a, b)) = bodies.get2_mut(arbiter.body_a.0, arbiter.body_b.0) {
                ContactSolver::apply_impulse(arbiter, a, b, elastic_coef);
            }
        }

        for constraint in self.constraints.iter_mut() {
            if let Some((a, b)) = bodies.get2_mut(constraint.body_a.0, constraint.body_b.0) {
                constraint.apply_impulse(a, b);
            }
        }
    }

    /// Constraints attached to `body`.
    pub fn constraints_of(&self, body: BodyId) -> Vec<ConstraintId> {
        self.constraints
            .iter()
            .filter(|c| c.body_a == body || c.body_b == body)
            .map(|c| c.id)
            .collect()
    }
}
