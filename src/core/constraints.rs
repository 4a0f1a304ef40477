//! Joint definitions. Solving lives in [`crate::dynamics::joints`].

use crate::{
    config::DEFAULT_CONSTRAINT_BIAS_COEF,
    error::{PhysicsError, PhysicsResult},
    utils::allocator::{BodyId, ConstraintId},
};

use super::rigidbody::RigidBody;
use glam::{Mat2, Vec2};
use serde::{Deserialize, Serialize};

/// A joint between two bodies plus the limits shared by every joint kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub id: ConstraintId,
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Largest force the joint may apply. Impulses are clamped to `max_force * dt`.
    pub max_force: f32,
    /// Fraction of the positional error corrected per step.
    pub bias_coef: f32,
    /// Largest correction velocity.
    pub max_bias: f32,
    pub user_data: u64,
    pub kind: JointKind,
    /// Set when the last `pre_step` could not solve the joint; iterations skip it.
    #[serde(skip)]
    pub(crate) neutralized: bool,
}

impl Constraint {
    pub fn new(body_a: BodyId, body_b: BodyId, kind: impl Into<JointKind>) -> Self {
        Self {
            id: ConstraintId::default(),
            body_a,
            body_b,
            max_force: f32::INFINITY,
            bias_coef: DEFAULT_CONSTRAINT_BIAS_COEF,
            max_bias: f32::INFINITY,
            user_data: 0,
            kind: kind.into(),
            neutralized: false,
        }
    }

    pub fn with_max_force(mut self, max_force: f32) -> Self {
        self.max_force = max_force;
        self
    }

    pub fn with_bias_coef(mut self, bias_coef: f32) -> Self {
        self.bias_coef = bias_coef;
        self
    }

    pub fn with_max_bias(mut self, max_bias: f32) -> Self {
        self.max_bias = max_bias;
        self
    }

    /// Magnitude of the impulse accumulated during the last step.
    pub fn impulse(&self) -> f32 {
        match &self.kind {
            JointKind::DampedRotarySpring(_) | JointKind::DampedSpring(_) => 0.0,
            JointKind::Pin(joint) => joint.jn_acc.abs(),
            JointKind::Slide(joint) => joint.jn_acc.abs(),
            JointKind::Pivot(joint) => joint.j_acc.length(),
            JointKind::Groove(joint) => joint.j_acc.length(),
            JointKind::Gear(joint) => joint.j_acc.abs(),
            JointKind::Ratchet(joint) => joint.j_acc.abs(),
            JointKind::RotaryLimit(joint) => joint.j_acc.abs(),
            JointKind::SimpleMotor(joint) => joint.j_acc.abs(),
        }
    }
}

/// Closed set of joint kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum JointKind {
    DampedRotarySpring(DampedRotarySpring),
    DampedSpring(DampedSpring),
    Pin(PinJoint),
    Pivot(PivotJoint),
    Slide(SlideJoint),
    Groove(GrooveJoint),
    Gear(GearJoint),
    Ratchet(RatchetJoint),
    RotaryLimit(RotaryLimitJoint),
    SimpleMotor(SimpleMotor),
}

impl JointKind {
    /// Rejects parameters no body configuration can solve.
    pub fn check_parameters(&self) -> PhysicsResult<()> {
        match self {
            JointKind::Gear(joint) if joint.ratio == 0.0 || !joint.ratio.is_finite() => Err(
                PhysicsError::unsolvable(format!("gear ratio {} is not invertible", joint.ratio)),
            ),
            _ => Ok(()),
        }
    }

    /// Drops the impulses carried over for warm starting.
    pub(crate) fn clear_accumulated(&mut self) {
        match self {
            JointKind::Pin(joint) => joint.jn_acc = 0.0,
            JointKind::Slide(joint) => joint.jn_acc = 0.0,
            JointKind::Pivot(joint) => joint.j_acc = Vec2::ZERO,
            JointKind::Groove(joint) => joint.j_acc = Vec2::ZERO,
            JointKind::Gear(joint) => joint.j_acc = 0.0,
            JointKind::Ratchet(joint) => joint.j_acc = 0.0,
            JointKind::RotaryLimit(joint) => joint.j_acc = 0.0,
            JointKind::SimpleMotor(joint) => joint.j_acc = 0.0,
            JointKind::DampedSpring(_) | JointKind::DampedRotarySpring(_) => {}
        }
    }

    /// True for joints that only act on rotation.
    pub fn is_angular(&self) -> bool {
        matches!(
            self,
            JointKind::DampedRotarySpring(_)
                | JointKind::Gear(_)
                | JointKind::Ratchet(_)
                | JointKind::RotaryLimit(_)
                | JointKind::SimpleMotor(_)
        )
    }
}

macro_rules! joint_kind_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for JointKind {
                fn from(joint: $ty) -> Self {
                    JointKind::$variant(joint)
                }
            }
        )*
    };
}

joint_kind_from!(
    DampedRotarySpring => DampedRotarySpring,
    DampedSpring => DampedSpring,
    Pin => PinJoint,
    Pivot => PivotJoint,
    Slide => SlideJoint,
    Groove => GrooveJoint,
    Gear => GearJoint,
    Ratchet => RatchetJoint,
    RotaryLimit => RotaryLimitJoint,
    SimpleMotor => SimpleMotor,
);

/// Keeps two anchor points at a fixed distance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PinJoint {
    pub anchor_a: Vec2,
    pub anchor_b: Vec2,
    pub distance: f32,
    pub(crate) r1: Vec2,
    pub(crate) r2: Vec2,
    pub(crate) n: Vec2,
    pub(crate) n_mass: f32,
    pub(crate) jn_acc: f32,
    pub(crate) jn_max: f32,
    pub(crate) bias: f32,
}

impl PinJoint {
    /// Pins the anchors at their current separation.
    pub fn new(a: &RigidBody, b: &RigidBody, anchor_a: Vec2, anchor_b: Vec2) -> Self {
        let distance = (b.local_to_world(anchor_b) - a.local_to_world(anchor_a)).length();
        Self::with_distance(anchor_a, anchor_b, distance)
    }

    pub fn with_distance(anchor_a: Vec2, anchor_b: Vec2, distance: f32) -> Self {
        Self {
            anchor_a,
            anchor_b,
            distance,
            ..Self::default()
        }
    }
}

/// Keeps the anchor distance within `[min, max]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SlideJoint {
    pub anchor_a: Vec2,
    pub anchor_b: Vec2,
    pub min: f32,
    pub max: f32,
    pub(crate) r1: Vec2,
    pub(crate) r2: Vec2,
    pub(crate) n: Vec2,
    pub(crate) n_mass: f32,
    pub(crate) jn_acc: f32,
    pub(crate) jn_max: f32,
    pub(crate) bias: f32,
}

impl SlideJoint {
    pub fn new(anchor_a: Vec2, anchor_b: Vec2, min: f32, max: f32) -> Self {
        Self {
            anchor_a,
            anchor_b,
            min,
            max,
            ..Self::default()
        }
    }
}

/// Joins two anchor points so they coincide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PivotJoint {
    pub anchor_a: Vec2,
    pub anchor_b: Vec2,
    pub(crate) r1: Vec2,
    pub(crate) r2: Vec2,
    pub(crate) k_inv: Mat2,
    pub(crate) j_acc: Vec2,
    pub(crate) j_max_len: f32,
    pub(crate) bias: Vec2,
}

impl PivotJoint {
    pub fn new(anchor_a: Vec2, anchor_b: Vec2) -> Self {
        Self {
            anchor_a,
            anchor_b,
            r1: Vec2::ZERO,
            r2: Vec2::ZERO,
            k_inv: Mat2::ZERO,
            j_acc: Vec2::ZERO,
            j_max_len: 0.0,
            bias: Vec2::ZERO,
        }
    }

    /// Pivot around a world-space point, expressed in each body's frame.
    pub fn from_world_pivot(a: &RigidBody, b: &RigidBody, pivot: Vec2) -> Self {
        Self::new(a.world_to_local(pivot), b.world_to_local(pivot))
    }
}

/// Lets an anchor on body B slide along a groove fixed to body A.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrooveJoint {
    pub groove_a: Vec2,
    pub groove_b: Vec2,
    pub anchor_b: Vec2,
    pub(crate) groove_normal: Vec2,
    pub(crate) groove_tn: Vec2,
    pub(crate) clamp: f32,
    pub(crate) r1: Vec2,
    pub(crate) r2: Vec2,
    pub(crate) k_inv: Mat2,
    pub(crate) j_acc: Vec2,
    pub(crate) j_max_len: f32,
    pub(crate) bias: Vec2,
}

impl GrooveJoint {
    pub fn new(groove_a: Vec2, groove_b: Vec2, anchor_b: Vec2) -> Self {
        Self {
            groove_a,
            groove_b,
            anchor_b,
            groove_normal: (groove_b - groove_a).normalize_or_zero().perp(),
            groove_tn: Vec2::ZERO,
            clamp: 0.0,
            r1: Vec2::ZERO,
            r2: Vec2::ZERO,
            k_inv: Mat2::ZERO,
            j_acc: Vec2::ZERO,
            j_max_len: 0.0,
            bias: Vec2::ZERO,
        }
    }
}

/// Spring with damping along the line between two anchors.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DampedSpring {
    pub anchor_a: Vec2,
    pub anchor_b: Vec2,
    pub rest_length: f32,
    pub stiffness: f32,
    pub damping: f32,
    pub(crate) r1: Vec2,
    pub(crate) r2: Vec2,
    pub(crate) n: Vec2,
    pub(crate) n_mass: f32,
    pub(crate) target_vrn: f32,
    pub(crate) v_coef: f32,
}

impl DampedSpring {
    pub fn new(anchor_a: Vec2, anchor_b: Vec2, rest_length: f32, stiffness: f32, damping: f32) -> Self {
        Self {
            anchor_a,
            anchor_b,
            rest_length,
            stiffness,
            damping,
            ..Self::default()
        }
    }

    pub(crate) fn spring_force(&self, dist: f32) -> f32 {
        (self.rest_length - dist) * self.stiffness
    }
}

/// Angular spring with damping on the relative angle.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DampedRotarySpring {
    pub rest_angle: f32,
    pub stiffness: f32,
    pub damping: f32,
    pub(crate) target_wrn: f32,
    pub(crate) w_coef: f32,
    pub(crate) i_sum: f32,
}

impl DampedRotarySpring {
    pub fn new(rest_angle: f32, stiffness: f32, damping: f32) -> Self {
        Self {
            rest_angle,
            stiffness,
            damping,
            ..Self::default()
        }
    }

    pub(crate) fn spring_torque(&self, relative_angle: f32) -> f32 {
        (relative_angle - self.rest_angle) * self.stiffness
    }
}

/// Couples the angular velocities of two bodies with a fixed ratio.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GearJoint {
    pub phase: f32,
    ratio: f32,
    ratio_inv: f32,
    pub(crate) i_sum: f32,
    pub(crate) bias: f32,
    pub(crate) j_acc: f32,
    pub(crate) j_max: f32,
}

impl GearJoint {
    pub fn new(phase: f32, ratio: f32) -> Self {
        Self {
            phase,
            ratio,
            ratio_inv: 1.0 / ratio,
            ..Self::default()
        }
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = ratio;
        self.ratio_inv = 1.0 / ratio;
    }

    pub(crate) fn ratio_inv(&self) -> f32 {
        self.ratio_inv
    }
}

/// One-way rotation in steps of `ratchet` radians, like a socket wrench.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatchetJoint {
    pub angle: f32,
    pub phase: f32,
    pub ratchet: f32,
    pub(crate) i_sum: f32,
    pub(crate) bias: f32,
    pub(crate) j_acc: f32,
    pub(crate) j_max: f32,
}

impl RatchetJoint {
    /// Starts ratcheting from the bodies' current relative angle.
    pub fn new(a: &RigidBody, b: &RigidBody, phase: f32, ratchet: f32) -> Self {
        Self {
            angle: b.angle() - a.angle(),
            phase,
            ratchet,
            ..Self::default()
        }
    }
}

/// Keeps the relative angle `b - a` within `[min, max]`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RotaryLimitJoint {
    pub min: f32,
    pub max: f32,
    pub(crate) i_sum: f32,
    pub(crate) bias: f32,
    pub(crate) j_acc: f32,
    pub(crate) j_max: f32,
}

impl RotaryLimitJoint {
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            min,
            max,
            ..Self::default()
        }
    }
}

/// Drives the relative angular velocity towards `rate`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimpleMotor {
    pub rate: f32,
    pub(crate) i_sum: f32,
    pub(crate) j_acc: f32,
    pub(crate) j_max: f32,
}

impl SimpleMotor {
    pub fn new(rate: f32) -> Self {
        Self {
            rate,
            ..Self::default()
        }
    }
}
