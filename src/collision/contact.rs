use glam::Vec2;

/// Contact point produced by the narrow phase and refined by the solver.
///
/// `dist` is negative while the shapes overlap. `hash` identifies the
/// geometric feature pair so impulses can be carried across steps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Contact {
    pub point: Vec2,
    /// Unit normal pointing from the first shape towards the second.
    pub normal: Vec2,
    pub dist: f32,
    pub hash: u64,

    pub(crate) r1: Vec2,
    pub(crate) r2: Vec2,
    pub(crate) n_mass: f32,
    pub(crate) t_mass: f32,
    pub(crate) bounce: f32,
    pub(crate) bias: f32,

    pub(crate) jn_acc: f32,
    pub(crate) jt_acc: f32,
    pub(crate) j_bias: f32,
}

impl Contact {
    pub fn new(point: Vec2, normal: Vec2, dist: f32, hash: u64) -> Self {
        Self {
            point,
            normal,
            dist,
            hash,
            ..Self::default()
        }
    }

    /// Penetration depth; positive while overlapping.
    pub fn depth(&self) -> f32 {
        -self.dist
    }

    pub fn normal_impulse(&self) -> f32 {
        self.jn_acc
    }

    pub fn tangent_impulse(&self) -> f32 {
        self.jt_acc
    }

    /// Accumulated impulse as a world-space vector applied to the second body.
    pub fn impulse(&self) -> Vec2 {
        self.normal * self.jn_acc + self.normal.perp() * self.jt_acc
    }

    /// Copies the accumulated impulses of a matching contact from the previous step.
    pub(crate) fn inherit(&mut self, previous: &Contact) {
        self.jn_acc = previous.jn_acc;
        self.jt_acc = previous.jt_acc;
    }

    pub(crate) fn flipped(mut self) -> Self {
        self.normal = -self.normal;
        self
    }
}
