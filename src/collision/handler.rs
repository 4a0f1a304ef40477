//! Collision handler callbacks and the registry that picks one per shape pair.

use std::collections::HashMap;

use super::arbiter::Arbiter;
use crate::{
    core::{
        collider::{Collider, CollisionType},
        rigidbody::RigidBody,
    },
    utils::allocator::{Arena, BodyId, ConstraintId, ShapeId},
    world::post_step::{PostStepKey, PostStepQueue},
    Space,
};

/// Callback that may veto a collision (`begin`, `pre_solve`).
pub type FilterCallback = Box<dyn FnMut(&mut Arbiter, &mut CallbackContext<'_>) -> bool + Send>;

/// Notification callback (`post_solve`, `separate`).
pub type NotifyCallback = Box<dyn FnMut(&mut Arbiter, &mut CallbackContext<'_>) + Send>;

/// What a handler callback may touch while the space is stepping.
///
/// Bodies can be nudged directly. Topology changes have to go through the
/// post-step queue, which runs once the solver is done.
pub struct CallbackContext<'a> {
    pub bodies: &'a mut Arena<RigidBody>,
    pub shapes: &'a Arena<Collider>,
    post_step: &'a mut PostStepQueue,
}

impl<'a> CallbackContext<'a> {
    pub(crate) fn new(
        bodies: &'a mut Arena<RigidBody>,
        shapes: &'a Arena<Collider>,
        post_step: &'a mut PostStepQueue,
    ) -> Self {
        Self {
            bodies,
            shapes,
            post_step,
        }
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id.0)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id.0)
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Collider> {
        self.shapes.get(id.0)
    }

    /// Queues `f` to run after the step. Returns `false` if `key` was already queued.
    pub fn add_post_step_callback(
        &mut self,
        key: PostStepKey,
        f: impl FnOnce(&mut Space) + Send + 'static,
    ) -> bool {
        self.post_step.add(key, f)
    }

    pub fn remove_shape_later(&mut self, id: ShapeId) -> bool {
        self.post_step.add(PostStepKey::Shape(id), move |space| {
            if let Err(err) = space.remove_shape(id) {
                log::warn!("deferred removal of {:?} failed: {}", id, err);
            }
        })
    }

    pub fn remove_body_later(&mut self, id: BodyId) -> bool {
        self.post_step.add(PostStepKey::Body(id), move |space| {
            if let Err(err) = space.remove_body(id) {
                log::warn!("deferred removal of {:?} failed: {}", id, err);
            }
        })
    }

    pub fn remove_constraint_later(&mut self, id: ConstraintId) -> bool {
        self.post_step.add(PostStepKey::Constraint(id), move |space| {
            if let Err(err) = space.remove_constraint(id) {
                log::warn!("deferred removal of {:?} failed: {}", id, err);
            }
        })
    }
}

/// Callbacks for one pair of collision types. Missing callbacks behave as
/// "always collide" and "do nothing".
#[derive(Default)]
pub struct CollisionHandler {
    begin: Option<FilterCallback>,
    pre_solve: Option<FilterCallback>,
    post_solve: Option<NotifyCallback>,
    separate: Option<NotifyCallback>,
}

impl CollisionHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called on the first step two shapes touch. Returning `false` ignores the pair until it separates.
    pub fn with_begin(
        mut self,
        f: impl FnMut(&mut Arbiter, &mut CallbackContext<'_>) -> bool + Send + 'static,
    ) -> Self {
        self.begin = Some(Box::new(f));
        self
    }

    /// Called every step the shapes touch, before solving. Returning `false` skips the pair this step.
    pub fn with_pre_solve(
        mut self,
        f: impl FnMut(&mut Arbiter, &mut CallbackContext<'_>) -> bool + Send + 'static,
    ) -> Self {
        self.pre_solve = Some(Box::new(f));
        self
    }

    /// Called after solving, with the final impulses available on the arbiter.
    pub fn with_post_solve(
        mut self,
        f: impl FnMut(&mut Arbiter, &mut CallbackContext<'_>) + Send + 'static,
    ) -> Self {
        self.post_solve = Some(Box::new(f));
        self
    }

    /// Called once when the shapes stop touching.
    pub fn with_separate(
        mut self,
        f: impl FnMut(&mut Arbiter, &mut CallbackContext<'_>) + Send + 'static,
    ) -> Self {
        self.separate = Some(Box::new(f));
        self
    }

    pub(crate) fn begin(&mut self, arbiter: &mut Arbiter, ctx: &mut CallbackContext<'_>) -> bool {
        match self.begin.as_mut() {
            Some(f) => f(arbiter, ctx),
            None => true,
        }
    }

    pub(crate) fn pre_solve(&mut self, arbiter: &mut Arbiter, ctx: &mut CallbackContext<'_>) -> bool {
        match self.pre_solve.as_mut() {
            Some(f) => f(arbiter, ctx),
            None => true,
        }
    }

    pub(crate) fn post_solve(&mut self, arbiter: &mut Arbiter, ctx: &mut CallbackContext<'_>) {
        if let Some(f) = self.post_solve.as_mut() {
            f(arbiter, ctx);
        }
    }

    pub(crate) fn separate(&mut self, arbiter: &mut Arbiter, ctx: &mut CallbackContext<'_>) {
        if let Some(f) = self.separate.as_mut() {
            f(arbiter, ctx);
        }
    }
}

impl std::fmt::Debug for CollisionHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionHandler")
            .field("begin", &self.begin.is_some())
            .field("pre_solve", &self.pre_solve.is_some())
            .field("post_solve", &self.post_solve.is_some())
            .field("separate", &self.separate.is_some())
            .finish()
    }
}

/// Which registered handler an arbiter dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandlerKey {
    Default,
    /// Collision types in ascending order.
    Pair(CollisionType, CollisionType),
}

impl HandlerKey {
    fn for_types(a: CollisionType, b: CollisionType) -> Self {
        if a <= b {
            HandlerKey::Pair(a, b)
        } else {
            HandlerKey::Pair(b, a)
        }
    }
}

struct Registered {
    /// Collision type the handler expects as its first shape.
    first: CollisionType,
    handler: CollisionHandler,
}

/// Handlers keyed by unordered pairs of collision types, plus a fallback.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<HandlerKey, Registered>,
    default: CollisionHandler,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for shapes of type `a` colliding with type `b`.
    ///
    /// Arbiters passed to it report shape `a` first regardless of the order the
    /// engine found the pair in. Replaces any handler already set for the pair.
    pub fn set(&mut self, a: CollisionType, b: CollisionType, handler: CollisionHandler) {
        self.handlers
            .insert(HandlerKey::for_types(a, b), Registered { first: a, handler });
    }

    pub fn remove(&mut self, a: CollisionType, b: CollisionType) -> bool {
        self.handlers.remove(&HandlerKey::for_types(a, b)).is_some()
    }

    pub fn set_default(&mut self, handler: CollisionHandler) {
        self.default = handler;
    }

    /// Handler for a pair whose first shape has type `a`, and whether the pair
    /// must be reported in the opposite order.
    pub fn lookup(&self, a: CollisionType, b: CollisionType) -> (HandlerKey, bool) {
        let key = HandlerKey::for_types(a, b);
        match self.handlers.get(&key) {
            Some(registered) => (key, registered.first != a),
            None => (HandlerKey::Default, false),
        }
    }

    pub fn get_mut(&mut self, key: HandlerKey) -> &mut CollisionHandler {
        match key {
            HandlerKey::Default => &mut self.default,
            pair => match self.handlers.get_mut(&pair) {
                Some(registered) => &mut registered.handler,
                None => &mut self.default,
            },
        }
    }
}
