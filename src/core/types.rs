use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box stored as left/bottom/right/top extents.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub l: f32,
    pub b: f32,
    pub r: f32,
    pub t: f32,
}

impl Bounds {
    pub fn new(l: f32, b: f32, r: f32, t: f32) -> Self {
        Self { l, b, r, t }
    }

    pub fn for_circle(center: Vec2, radius: f32) -> Self {
        Self::new(
            center.x - radius,
            center.y - radius,
            center.x + radius,
            center.y + radius,
        )
    }

    /// Smallest box containing every point in `points`. Empty input yields a default box.
    pub fn from_points(points: &[Vec2]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        points.iter().skip(1).fold(
            Self::new(first.x, first.y, first.x, first.y),
            |bb, p| bb.expand(*p),
        )
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.l <= other.r && other.l <= self.r && self.b <= other.t && other.b <= self.t
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        self.l <= other.l && self.r >= other.r && self.b <= other.b && self.t >= other.t
    }

    pub fn contains_point(&self, p: Vec2) -> bool {
        self.l <= p.x && self.r >= p.x && self.b <= p.y && self.t >= p.y
    }

    pub fn merge(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            self.l.min(other.l),
            self.b.min(other.b),
            self.r.max(other.r),
            self.t.max(other.t),
        )
    }

    pub fn expand(&self, p: Vec2) -> Bounds {
        Bounds::new(
            self.l.min(p.x),
            self.b.min(p.y),
            self.r.max(p.x),
            self.t.max(p.y),
        )
    }

    pub fn clamp_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(p.x.clamp(self.l, self.r), p.y.clamp(self.b, self.t))
    }

    /// Wraps `p` into the box as if its edges were periodic.
    pub fn wrap_point(&self, p: Vec2) -> Vec2 {
        let wrap = |value: f32, lo: f32, hi: f32| {
            let span = (hi - lo).abs();
            if span == 0.0 {
                return lo;
            }
            let m = (value - lo) % span;
            let m = if m > 0.0 { m } else { m + span };
            m + lo
        };
        Vec2::new(wrap(p.x, self.l, self.r), wrap(p.y, self.b, self.t))
    }

    pub fn area(&self) -> f32 {
        (self.r - self.l) * (self.t - self.b)
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new((self.l + self.r) * 0.5, (self.b + self.t) * 0.5)
    }
}

/// Mass and moment of inertia of a body, with helpers for common shapes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassProperties {
    pub mass: f32,
    pub moment: f32,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self {
            mass: 1.0,
            moment: 1.0,
        }
    }
}

impl MassProperties {
    pub fn new(mass: f32, moment: f32) -> Self {
        Self { mass, moment }
    }

    pub fn infinite() -> Self {
        Self {
            mass: f32::INFINITY,
            moment: f32::INFINITY,
        }
    }

    /// Solid circle (`inner == 0`) or ring, centered `offset` away from the body origin.
    pub fn circle(mass: f32, inner: f32, outer: f32, offset: Vec2) -> Self {
        let moment = mass * (0.5 * (inner * inner + outer * outer) + offset.length_squared());
        Self { mass, moment }
    }

    /// Thin rod between `a` and `b` in body space.
    pub fn segment(mass: f32, a: Vec2, b: Vec2) -> Self {
        let length = (b - a).length();
        let offset = (a + b) * 0.5;
        let moment = mass * (length * length / 12.0 + offset.length_squared());
        Self { mass, moment }
    }

    /// Solid convex polygon. Winding may be either direction.
    pub fn polygon(mass: f32, verts: &[Vec2], offset: Vec2) -> Self {
        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (i, v) in verts.iter().enumerate() {
            let v1 = *v + offset;
            let v2 = verts[(i + 1) % verts.len()] + offset;
            let a = v2.perp_dot(v1);
            let b = v1.dot(v1) + v1.dot(v2) + v2.dot(v2);
            numerator += a * b;
            denominator += a;
        }
        let moment = if denominator == 0.0 {
            0.0
        } else {
            mass * numerator / (6.0 * denominator)
        };
        Self { mass, moment }
    }

    pub fn box_shape(mass: f32, width: f32, height: f32) -> Self {
        Self {
            mass,
            moment: mass * (width * width + height * height) / 12.0,
        }
    }
}

/// Surface coefficients that shape how a collider responds to contact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    /// Restitution; `0` is perfectly inelastic, `1` perfectly elastic.
    pub elasticity: f32,
    /// Coulomb friction coefficient.
    pub friction: f32,
    /// Tangential velocity of the surface itself, e.g. a conveyor belt.
    pub surface_velocity: Vec2,
    pub mixing: MixingMode,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            elasticity: 0.0,
            friction: 0.0,
            surface_velocity: Vec2::ZERO,
            mixing: MixingMode::default(),
        }
    }
}

impl Material {
    pub fn new(elasticity: f32, friction: f32) -> Self {
        Self {
            elasticity,
            friction,
            ..Self::default()
        }
    }

    pub fn rubber() -> Self {
        Self::new(0.8, 1.0)
    }

    pub fn steel() -> Self {
        Self::new(0.4, 0.45)
    }

    pub fn ice() -> Self {
        Self::new(0.05, 0.03)
    }

    pub fn with_surface_velocity(mut self, velocity: Vec2) -> Self {
        self.surface_velocity = velocity;
        self
    }

    pub fn with_mixing(mut self, mixing: MixingMode) -> Self {
        self.mixing = mixing;
        self
    }

    /// Pair coefficients as seen by an arbiter between `a` and `b`.
    pub fn combine_pair(a: &Self, b: &Self) -> MaterialPairProperties {
        let mode = a.mixing.resolve(b.mixing);
        MaterialPairProperties {
            elasticity: mode.combine(a.elasticity, b.elasticity),
            friction: mode.combine(a.friction, b.friction),
            surface_velocity: b.surface_velocity - a.surface_velocity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MixingMode {
    #[default]
    Multiply,
    Average,
    Min,
    Max,
    GeometricMean,
}

impl MixingMode {
    fn combine(self, a: f32, b: f32) -> f32 {
        match self {
            MixingMode::Multiply => a * b,
            MixingMode::Average => 0.5 * (a + b),
            MixingMode::Min => a.min(b),
            MixingMode::Max => a.max(b),
            MixingMode::GeometricMean => (a.abs() * b.abs()).sqrt(),
        }
    }

    fn resolve(self, other: MixingMode) -> MixingMode {
        if matches!(self, MixingMode::Multiply) {
            other
        } else {
            self
        }
    }
}

/// Coefficients combined from two materials.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MaterialPairProperties {
    pub elasticity: f32,
    pub friction: f32,
    /// Surface velocity of the second material relative to the first.
    pub surface_velocity: Vec2,
}
