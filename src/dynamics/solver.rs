use glam::{Mat2, Vec2};

use crate::{
    collision::arbiter::Arbiter,
    core::rigidbody::RigidBody,
    utils::math,
};

/// Velocity of `b` relative to `a` at the contact offsets `r1`, `r2`.
#[inline]
pub fn relative_velocity(a: &RigidBody, b: &RigidBody, r1: Vec2, r2: Vec2) -> Vec2 {
    b.velocity_at_offset(r2) - a.velocity_at_offset(r1)
}

#[inline]
pub fn normal_relative_velocity(a: &RigidBody, b: &RigidBody, r1: Vec2, r2: Vec2, n: Vec2) -> f32 {
    relative_velocity(a, b, r1, r2).dot(n)
}

/// Applies `j` to `b` and `-j` to `a`.
#[inline]
pub fn apply_impulses(a: &mut RigidBody, b: &mut RigidBody, r1: Vec2, r2: Vec2, j: Vec2) {
    a.apply_impulse(-j, r1);
    b.apply_impulse(j, r2);
}

#[inline]
pub(crate) fn apply_bias_impulses(a: &mut RigidBody, b: &mut RigidBody, r1: Vec2, r2: Vec2, j: Vec2) {
    a.apply_bias_impulse(-j, r1);
    b.apply_bias_impulse(j, r2);
}

#[inline]
fn bias_relative_velocity(a: &RigidBody, b: &RigidBody, r1: Vec2, r2: Vec2) -> Vec2 {
    let v1 = a.velocity_bias + r1.perp() * a.angular_velocity_bias;
    let v2 = b.velocity_bias + r2.perp() * b.angular_velocity_bias;
    v2 - v1
}

/// Inverse effective mass along direction `n`.
pub fn k_scalar(a: &RigidBody, b: &RigidBody, r1: Vec2, r2: Vec2, n: Vec2) -> f32 {
    let rcn1 = math::cross(r1, n);
    let rcn2 = math::cross(r2, n);
    a.inverse_mass()
        + b.inverse_mass()
        + a.inverse_moment() * rcn1 * rcn1
        + b.inverse_moment() * rcn2 * rcn2
}

/// Effective mass tensor for a point-to-point constraint, or `None` when it is singular.
pub fn k_tensor(a: &RigidBody, b: &RigidBody, r1: Vec2, r2: Vec2) -> Option<Mat2> {
    let m_sum = a.inverse_mass() + b.inverse_mass();
    let mut k11 = m_sum;
    let mut k12 = 0.0;
    let mut k22 = m_sum;

    for (r, i_inv) in [(r1, a.inverse_moment()), (r2, b.inverse_moment())] {
        k11 += r.y * r.y * i_inv;
        k12 -= r.x * r.y * i_inv;
        k22 += r.x * r.x * i_inv;
    }

    let k = Mat2::from_cols(Vec2::new(k11, k12), Vec2::new(k12, k22));
    let det = k.determinant();
    if det == 0.0 || !det.is_finite() {
        None
    } else {
        Some(k.inverse())
    }
}

/// Sequential-impulse routines for contact arbiters.
pub struct ContactSolver;

impl ContactSolver {
    /// Computes offsets, effective masses, the Baumgarte bias and the bounce target
    /// of every contact from the bodies' current state.
    pub(crate) fn pre_step(
        arbiter: &mut Arbiter,
        a: &RigidBody,
        b: &RigidBody,
        dt_inv: f32,
        slop: f32,
        bias_coef: f32,
    ) {
        let elasticity = arbiter.elasticity;
        for con in &mut arbiter.contacts {
            con.r1 = con.point - a.position;
            con.r2 = con.point - b.position;

            con.n_mass = math::recip_or_zero(k_scalar(a, b, con.r1, con.r2, con.normal));
            con.t_mass = math::recip_or_zero(k_scalar(a, b, con.r1, con.r2, con.normal.perp()));

            con.bias = -bias_coef * dt_inv * (con.dist + slop).min(0.0);
            con.j_bias = 0.0;

            con.bounce = normal_relative_velocity(a, b, con.r1, con.r2, con.normal) * elasticity;
        }
    }

    /// Re-applies the impulses accumulated on the previous step.
    pub(crate) fn apply_cached_impulse(arbiter: &Arbiter, a: &mut RigidBody, b: &mut RigidBody) {
        for con in &arbiter.contacts {
            apply_impulses(a, b, con.r1, con.r2, con.impulse());
        }
    }

    /// One solver iteration over the arbiter's contacts.
    ///
    /// `elastic_coef` scales the bounce target; it is zero when restitution was
    /// already handled by the elastic pre-iterations.
    pub(crate) fn apply_impulse(arbiter: &mut Arbiter, a: &mut RigidBody, b: &mut RigidBody, elastic_coef: f32) {
        let friction = arbiter.friction;
        let surface_velocity = arbiter.surface_velocity;

        for con in &mut arbiter.contacts {
            let n = con.normal;
            let (r1, r2) = (con.r1, con.r2);

            let vbn = bias_relative_velocity(a, b, r1, r2).dot(n);
            let jbn = (con.bias - vbn) * con.n_mass;
            let jbn_old = con.j_bias;
            con.j_bias = (jbn_old + jbn).max(0.0);
            apply_bias_impulses(a, b, r1, r2, n * (con.j_bias - jbn_old));

            let vr = relative_velocity(a, b, r1, r2);
            let vrn = vr.dot(n);

            let jn = -(con.bounce * elastic_coef + vrn) * con.n_mass;
            let jn_old = con.jn_acc;
            con.jn_acc = (jn_old + jn).max(0.0);
            let jn = con.jn_acc - jn_old;

            let vrt = (vr + surface_velocity).dot(n.perp());
            let jt_max = friction * con.jn_acc;
            let jt = -vrt * con.t_mass;
            let jt_old = con.jt_acc;
            con.jt_acc = math::clamp(jt_old + jt, -jt_max, jt_max);
            let jt = con.jt_acc - jt_old;

            apply_impulses(a, b, r1, r2, n * jn + n.perp() * jt);
        }
    }
}
