//! Sequential-impulse solving for every joint kind.
//!
//! Each joint precomputes its anchors, effective mass and bias in `pre_step`
//! and re-applies last step's accumulated impulse there. `apply_impulse` then
//! runs once per solver iteration.

use glam::{Mat2, Vec2};

use super::solver::{apply_impulses, k_scalar, k_tensor, normal_relative_velocity, relative_velocity};
use crate::{
    core::{
        constraints::{
            Constraint, DampedRotarySpring, DampedSpring, GearJoint, GrooveJoint, JointKind, PinJoint,
            PivotJoint, RatchetJoint, RotaryLimitJoint, SimpleMotor, SlideJoint,
        },
        rigidbody::RigidBody,
    },
    error::{PhysicsError, PhysicsResult},
    utils::math,
};

/// Shared per-constraint limits for one step.
#[derive(Clone, Copy)]
struct Limits {
    dt_inv: f32,
    bias_coef: f32,
    max_bias: f32,
    /// Largest impulse per step.
    j_max: f32,
}

impl Limits {
    fn bias(&self, error: f32) -> f32 {
        math::clamp(-self.bias_coef * self.dt_inv * error, -self.max_bias, self.max_bias)
    }

    fn bias_vec(&self, delta: Vec2) -> Vec2 {
        math::clamp_length(delta * (-self.bias_coef * self.dt_inv), self.max_bias)
    }
}

impl Constraint {
    /// Prepares the joint for this step and warm-starts it.
    ///
    /// A joint whose effective mass vanishes is neutralized for the step and
    /// reported as [`PhysicsError::UnsolvableConstraint`].
    pub(crate) fn pre_step(&mut self, a: &mut RigidBody, b: &mut RigidBody, dt: f32) -> PhysicsResult<()> {
        let saved = (a.velocity, a.angular_velocity, b.velocity, b.angular_velocity);
        let status = self.kind.check_parameters().and_then(|()| self.prepare_kind(a, b, dt));
        self.neutralized = status.is_err();
        if self.neutralized {
            // Undo any warm start or spring impulse already applied.
            (a.velocity, a.angular_velocity, b.velocity, b.angular_velocity) = saved;
            self.kind.clear_accumulated();
        }
        status
    }

    fn prepare_kind(&mut self, a: &mut RigidBody, b: &mut RigidBody, dt: f32) -> PhysicsResult<()> {
        let limits = Limits {
            dt_inv: dt.recip(),
            bias_coef: self.bias_coef,
            max_bias: self.max_bias,
            j_max: self.max_force * dt,
        };

        match &mut self.kind {
            JointKind::Pin(joint) => joint.pre_step(a, b, limits),
            JointKind::Slide(joint) => joint.pre_step(a, b, limits),
            JointKind::Pivot(joint) => joint.pre_step(a, b, limits),
            JointKind::Groove(joint) => joint.pre_step(a, b, limits),
            JointKind::DampedSpring(joint) => joint.pre_step(a, b, dt),
            JointKind::DampedRotarySpring(joint) => joint.pre_step(a, b, dt),
            JointKind::Gear(joint) => joint.pre_step(a, b, limits),
            JointKind::Ratchet(joint) => joint.pre_step(a, b, limits),
            JointKind::RotaryLimit(joint) => joint.pre_step(a, b, limits),
            JointKind::SimpleMotor(joint) => joint.pre_step(a, b, limits),
        }
    }

    pub(crate) fn apply_impulse(&mut self, a: &mut RigidBody, b: &mut RigidBody) {
        if self.neutralized {
            return;
        }
        match &mut self.kind {
            JointKind::Pin(joint) => joint.apply_impulse(a, b),
            JointKind::Slide(joint) => joint.apply_impulse(a, b),
            JointKind::Pivot(joint) => joint.apply_impulse(a, b),
            JointKind::Groove(joint) => joint.apply_impulse(a, b),
            JointKind::DampedSpring(joint) => joint.apply_impulse(a, b),
            JointKind::DampedRotarySpring(joint) => joint.apply_impulse(a, b),
            JointKind::Gear(joint) => joint.apply_impulse(a, b),
            JointKind::Ratchet(joint) => joint.apply_impulse(a, b),
            JointKind::RotaryLimit(joint) => joint.apply_impulse(a, b),
            JointKind::SimpleMotor(joint) => joint.apply_impulse(a, b),
        }
    }
}

/// Inverse of a scalar inverse-mass, or an error naming the joint.
fn effective_mass(k: f32, joint: &str) -> PhysicsResult<f32> {
    if k > 0.0 && k.is_finite() {
        Ok(k.recip())
    } else {
        Err(PhysicsError::unsolvable(format!("{joint} has zero effective mass")))
    }
}

fn apply_angular(a: &mut RigidBody, b: &mut RigidBody, j: f32) {
    a.angular_velocity -= j * a.inverse_moment();
    b.angular_velocity += j * b.inverse_moment();
}

/// Anchor offsets, separation and unit axis between two body-space anchors.
fn anchor_axis(a: &RigidBody, b: &RigidBody, anchor_a: Vec2, anchor_b: Vec2) -> (Vec2, Vec2, f32, Vec2) {
    let r1 = anchor_a.rotate(a.rotation());
    let r2 = anchor_b.rotate(b.rotation());
    let delta = (b.position + r2) - (a.position + r1);
    let dist = delta.length();
    let n = if dist > 0.0 { delta / dist } else { Vec2::ZERO };
    (r1, r2, dist, n)
}

/// Value to store for this step (the neutral one when unsolvable) plus the step status.
fn neutral_or<T>(checked: PhysicsResult<T>, neutral: T) -> (T, PhysicsResult<()>) {
    match checked {
        Ok(value) => (value, Ok(())),
        Err(err) => (neutral, Err(err)),
    }
}

impl PinJoint {
    fn pre_step(&mut self, a: &mut RigidBody, b: &mut RigidBody, limits: Limits) -> PhysicsResult<()> {
        let (r1, r2, dist, n) = anchor_axis(a, b, self.anchor_a, self.anchor_b);
        self.r1 = r1;
        self.r2 = r2;
        self.n = n;

        let (n_mass, status) = neutral_or(effective_mass(k_scalar(a, b, r1, r2, self.n), "pin joint"), 0.0);
        self.n_mass = n_mass;
        self.bias = limits.bias(dist - self.distance);
        self.jn_max = limits.j_max;

        apply_impulses(a, b, r1, r2, self.n * self.jn_acc);
        status
    }

    fn apply_impulse(&mut self, a: &mut RigidBody, b: &mut RigidBody) {
        let vrn = normal_relative_velocity(a, b, self.r1, self.r2, self.n);
        let jn = (self.bias - vrn) * self.n_mass;
        let jn_old = self.jn_acc;
        self.jn_acc = math::clamp(jn_old + jn, -self.jn_max, self.jn_max);
        apply_impulses(a, b, self.r1, self.r2, self.n * (self.jn_acc - jn_old));
    }
}

impl SlideJoint {
    fn pre_step(&mut self, a: &mut RigidBody, b: &mut RigidBody, limits: Limits) -> PhysicsResult<()> {
        let (r1, r2, dist, n) = anchor_axis(a, b, self.anchor_a, self.anchor_b);
        self.r1 = r1;
        self.r2 = r2;

        let (error, n) = if dist > self.max {
            (dist - self.max, n)
        } else if dist < self.min {
            (self.min - dist, -n)
        } else {
            (0.0, n)
        };
        self.n = n;

        let (n_mass, status) = neutral_or(effective_mass(k_scalar(a, b, r1, r2, self.n), "slide joint"), 0.0);
        self.n_mass = n_mass;
        self.bias = limits.bias(error);
        self.jn_max = limits.j_max;

        if self.bias == 0.0 {
            self.jn_acc = 0.0;
        } else {
            apply_impulses(a, b, r1, r2, self.n * self.jn_acc);
        }
        status
    }

    fn apply_impulse(&mut self, a: &mut RigidBody, b: &mut RigidBody) {
        if self.bias == 0.0 {
            return;
        }
        let vrn = normal_relative_velocity(a, b, self.r1, self.r2, self.n);
        let jn = (self.bias - vrn) * self.n_mass;
        let jn_old = self.jn_acc;
        self.jn_acc = math::clamp(jn_old + jn, -self.jn_max, 0.0);
        apply_impulses(a, b, self.r1, self.r2, self.n * (self.jn_acc - jn_old));
    }
}

fn point_mass(a: &RigidBody, b: &RigidBody, r1: Vec2, r2: Vec2, joint: &str) -> PhysicsResult<Mat2> {
    k_tensor(a, b, r1, r2)
        .ok_or_else(|| PhysicsError::unsolvable(format!("{joint} has a singular mass tensor")))
}

impl PivotJoint {
    fn pre_step(&mut self, a: &mut RigidBody, b: &mut RigidBody, limits: Limits) -> PhysicsResult<()> {
        self.r1 = self.anchor_a.rotate(a.rotation());
        self.r2 = self.anchor_b.rotate(b.rotation());

        let (k_inv, status) = neutral_or(point_mass(a, b, self.r1, self.r2, "pivot joint"), Mat2::ZERO);
        self.k_inv = k_inv;
        self.j_max_len = limits.j_max;

        let delta = (b.position + self.r2) - (a.position + self.r1);
        self.bias = limits.bias_vec(delta);

        apply_impulses(a, b, self.r1, self.r2, self.j_acc);
        status
    }

    fn apply_impulse(&mut self, a: &mut RigidBody, b: &mut RigidBody) {
        let vr = relative_velocity(a, b, self.r1, self.r2);
        let j = self.k_inv * (self.bias - vr);
        let j_old = self.j_acc;
        self.j_acc = math::clamp_length(j_old + j, self.j_max_len);
        apply_impulses(a, b, self.r1, self.r2, self.j_acc - j_old);
    }
}

impl GrooveJoint {
    fn pre_step(&mut self, a: &mut RigidBody, b: &mut RigidBody, limits: Limits) -> PhysicsResult<()> {
        let ta = a.local_to_world(self.groove_a);
        let tb = a.local_to_world(self.groove_b);

        let n = self.groove_normal.rotate(a.rotation());
        let d = ta.dot(n);

        self.groove_tn = n;
        self.r2 = self.anchor_b.rotate(b.rotation());

        // Clamp the anchor's projection to the ends of the groove.
        let td = math::cross(b.position + self.r2, n);
        if td <= math::cross(ta, n) {
            self.clamp = 1.0;
            self.r1 = ta - a.position;
        } else if td >= math::cross(tb, n) {
            self.clamp = -1.0;
            self.r1 = tb - a.position;
        } else {
            self.clamp = 0.0;
            self.r1 = n.perp() * -td + n * d - a.position;
        }

        let (k_inv, status) = neutral_or(point_mass(a, b, self.r1, self.r2, "groove joint"), Mat2::ZERO);
        self.k_inv = k_inv;
        self.j_max_len = limits.j_max;

        let delta = (b.position + self.r2) - (a.position + self.r1);
        self.bias = limits.bias_vec(delta);

        apply_impulses(a, b, self.r1, self.r2, self.j_acc);
        status
    }

    fn constrain(&self, j: Vec2) -> Vec2 {
        let n = self.groove_tn;
        let clamped = if self.clamp * math::cross(j, n) > 0.0 {
            j
        } else {
            math::project(j, n)
        };
        math::clamp_length(clamped, self.j_max_len)
    }

    fn apply_impulse(&mut self, a: &mut RigidBody, b: &mut RigidBody) {
        let vr = relative_velocity(a, b, self.r1, self.r2);
        let j = self.k_inv * (self.bias - vr);
        let j_old = self.j_acc;
        self.j_acc = self.constrain(j_old + j);
        apply_impulses(a, b, self.r1, self.r2, self.j_acc - j_old);
    }
}

impl DampedSpring {
    fn pre_step(&mut self, a: &mut RigidBody, b: &mut RigidBody, dt: f32) -> PhysicsResult<()> {
        let (r1, r2, dist, n) = anchor_axis(a, b, self.anchor_a, self.anchor_b);
        self.r1 = r1;
        self.r2 = r2;
        self.n = n;

        let k = k_scalar(a, b, r1, r2, self.n);
        let (n_mass, status) = neutral_or(effective_mass(k, "damped spring"), 0.0);
        self.n_mass = n_mass;
        self.target_vrn = 0.0;
        self.v_coef = if status.is_ok() {
            1.0 - (-self.damping * dt * k).exp()
        } else {
            0.0
        };

        let f_spring = self.spring_force(dist);
        apply_impulses(a, b, r1, r2, self.n * (f_spring * dt));
        status
    }

    fn apply_impulse(&mut self, a: &mut RigidBody, b: &mut RigidBody) {
        let vrn = normal_relative_velocity(a, b, self.r1, self.r2, self.n);
        let v_damp = (self.target_vrn - vrn) * self.v_coef;
        self.target_vrn = vrn + v_damp;
        apply_impulses(a, b, self.r1, self.r2, self.n * (v_damp * self.n_mass));
    }
}

impl DampedRotarySpring {
    fn pre_step(&mut self, a: &mut RigidBody, b: &mut RigidBody, dt: f32) -> PhysicsResult<()> {
        let moment = a.inverse_moment() + b.inverse_moment();
        let (i_sum, status) = neutral_or(effective_mass(moment, "damped rotary spring"), 0.0);
        self.i_sum = i_sum;
        self.w_coef = if status.is_ok() {
            1.0 - (-self.damping * dt * moment).exp()
        } else {
            0.0
        };
        self.target_wrn = 0.0;

        let j_spring = self.spring_torque(a.angle() - b.angle()) * dt;
        a.angular_velocity -= j_spring * a.inverse_moment();
        b.angular_velocity += j_spring * b.inverse_moment();
        status
    }

    fn apply_impulse(&mut self, a: &mut RigidBody, b: &mut RigidBody) {
        let wrn = a.angular_velocity - b.angular_velocity;
        let w_damp = (self.target_wrn - wrn) * self.w_coef;
        self.target_wrn = wrn + w_damp;

        let j_damp = w_damp * self.i_sum;
        a.angular_velocity += j_damp * a.inverse_moment();
        b.angular_velocity -= j_damp * b.inverse_moment();
    }
}

impl GearJoint {
    fn pre_step(&mut self, a: &mut RigidBody, b: &mut RigidBody, limits: Limits) -> PhysicsResult<()> {
        let ratio = self.ratio();
        let ratio_inv = self.ratio_inv();
        let moment = a.inverse_moment() * ratio_inv + ratio * b.inverse_moment();
        let (i_sum, status) = neutral_or(effective_mass(moment, "gear joint"), 0.0);
        self.i_sum = i_sum;
        self.bias = limits.bias(b.angle() * ratio - a.angle() - self.phase);
        self.j_max = limits.j_max;

        let j = self.j_acc;
        a.angular_velocity -= j * a.inverse_moment() * ratio_inv;
        b.angular_velocity += j * b.inverse_moment();
        status
    }

    fn apply_impulse(&mut self, a: &mut RigidBody, b: &mut RigidBody) {
        let ratio_inv = self.ratio_inv();
        let wr = b.angular_velocity * self.ratio() - a.angular_velocity;

        let j = (self.bias - wr) * self.i_sum;
        let j_old = self.j_acc;
        self.j_acc = math::clamp(j_old + j, -self.j_max, self.j_max);
        let j = self.j_acc - j_old;

        a.angular_velocity -= j * a.inverse_moment() * ratio_inv;
        b.angular_velocity += j * b.inverse_moment();
    }
}

fn angular_mass(a: &RigidBody, b: &RigidBody, joint: &str) -> PhysicsResult<f32> {
    effective_mass(a.inverse_moment() + b.inverse_moment(), joint)
}

impl RatchetJoint {
    fn pre_step(&mut self, a: &mut RigidBody, b: &mut RigidBody, limits: Limits) -> PhysicsResult<()> {
        let delta = b.angle() - a.angle();
        let diff = self.angle - delta;

        let mut error = 0.0;
        if diff * self.ratchet > 0.0 {
            error = diff;
        } else if self.ratchet != 0.0 {
            self.angle = ((delta - self.phase) / self.ratchet).floor() * self.ratchet + self.phase;
        }

        let (i_sum, status) = neutral_or(angular_mass(a, b, "ratchet joint"), 0.0);
        self.i_sum = i_sum;
        self.bias = limits.bias(error);
        self.j_max = limits.j_max;

        if self.bias == 0.0 {
            self.j_acc = 0.0;
        }
        apply_angular(a, b, self.j_acc);
        status
    }

    fn apply_impulse(&mut self, a: &mut RigidBody, b: &mut RigidBody) {
        if self.bias == 0.0 {
            return;
        }
        let wr = b.angular_velocity - a.angular_velocity;
        let ratchet = self.ratchet;

        let j = -(self.bias + wr) * self.i_sum;
        let j_old = self.j_acc;
        self.j_acc = math::clamp((j_old + j) * ratchet, 0.0, self.j_max * ratchet.abs()) / ratchet;
        apply_angular(a, b, self.j_acc - j_old);
    }
}

impl RotaryLimitJoint {
    fn pre_step(&mut self, a: &mut RigidBody, b: &mut RigidBody, limits: Limits) -> PhysicsResult<()> {
        let dist = b.angle() - a.angle();
        let error = if dist > self.max {
            self.max - dist
        } else if dist < self.min {
            self.min - dist
        } else {
            0.0
        };

        let (i_sum, status) = neutral_or(angular_mass(a, b, "rotary limit joint"), 0.0);
        self.i_sum = i_sum;
        self.bias = limits.bias(error);
        self.j_max = limits.j_max;

        if self.bias == 0.0 {
            self.j_acc = 0.0;
        }
        apply_angular(a, b, self.j_acc);
        status
    }

    fn apply_impulse(&mut self, a: &mut RigidBody, b: &mut RigidBody) {
        if self.bias == 0.0 {
            return;
        }
        let wr = b.angular_velocity - a.angular_velocity;

        let j = -(self.bias + wr) * self.i_sum;
        let j_old = self.j_acc;
        self.j_acc = if self.bias < 0.0 {
            math::clamp(j_old + j, 0.0, self.j_max)
        } else {
            math::clamp(j_old + j, -self.j_max, 0.0)
        };
        apply_angular(a, b, self.j_acc - j_old);
    }
}

impl SimpleMotor {
    fn pre_step(&mut self, a: &mut RigidBody, b: &mut RigidBody, limits: Limits) -> PhysicsResult<()> {
        let (i_sum, status) = neutral_or(angular_mass(a, b, "simple motor"), 0.0);
        self.i_sum = i_sum;
        self.j_max = limits.j_max;

        apply_angular(a, b, self.j_acc);
        status
    }

    fn apply_impulse(&mut self, a: &mut RigidBody, b: &mut RigidBody) {
        let wr = b.angular_velocity - a.angular_velocity + self.rate;

        let j = -wr * self.i_sum;
        let j_old = self.j_acc;
        self.j_acc = math::clamp(j_old + j, -self.j_max, self.j_max);
        apply_angular(a, b, self.j_acc - j_old);
    }
}
