//! Deferred work that runs once the current step has finished solving.

use std::collections::HashSet;

use crate::{
    utils::allocator::{BodyId, ConstraintId, ShapeId},
    Space,
};

/// Identity a post-step callback is registered under. Only the first callback
/// per key survives until the queue is drained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PostStepKey {
    Body(BodyId),
    Shape(ShapeId),
    Constraint(ConstraintId),
    /// Caller-chosen key for work not tied to a space object.
    User(u64),
}

impl From<BodyId> for PostStepKey {
    fn from(id: BodyId) -> Self {
        PostStepKey::Body(id)
    }
}

impl From<ShapeId> for PostStepKey {
    fn from(id: ShapeId) -> Self {
        PostStepKey::Shape(id)
    }
}

impl From<ConstraintId> for PostStepKey {
    fn from(id: ConstraintId) -> Self {
        PostStepKey::Constraint(id)
    }
}

pub type PostStepFn = Box<dyn FnOnce(&mut Space) + Send>;

/// Callbacks in registration order, deduplicated by key.
#[derive(Default)]
pub struct PostStepQueue {
    entries: Vec<(PostStepKey, PostStepFn)>,
    keys: HashSet<PostStepKey>,
}

impl PostStepQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` and drops `f` when `key` is already queued.
    pub fn add(&mut self, key: PostStepKey, f: impl FnOnce(&mut Space) + Send + 'static) -> bool {
        if !self.keys.insert(key) {
            log::trace!("post-step callback for {:?} already queued", key);
            return false;
        }
        self.entries.push((key, Box::new(f)));
        true
    }

    pub fn contains(&self, key: PostStepKey) -> bool {
        self.keys.contains(&key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the queue, handing back the callbacks in registration order.
    pub(crate) fn take(&mut self) -> Vec<(PostStepKey, PostStepFn)> {
        self.keys.clear();
        std::mem::take(&mut self.entries)
    }
}

impl std::fmt::Debug for PostStepQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.entries.iter().map(|(key, _)| key))
            .finish()
    }
}
