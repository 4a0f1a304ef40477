use std::collections::BTreeMap;

use crate::{
    collision::{arbiter::Arbiter, broadphase::SpatialHash, contact::Contact, handler::HandlerRegistry},
    config::SpaceConfig,
    core::collider::Collider,
    utils::allocator::ShapeId,
};

/// Order-independent identity of a shape pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey(ShapeId, ShapeId);

impl PairKey {
    pub fn new(a: ShapeId, b: ShapeId) -> Self {
        if a <= b {
            PairKey(a, b)
        } else {
            PairKey(b, a)
        }
    }

    pub fn involves(&self, shape: ShapeId) -> bool {
        self.0 == shape || self.1 == shape
    }
}

/// Persistent arbiters keyed by shape pair.
///
/// Arbiters live in a slab; dropped slots go on a free list and are reused for
/// later pairs. Iteration follows key order so callbacks fire deterministically.
#[derive(Debug, Default)]
pub struct ContactSet {
    index: BTreeMap<PairKey, usize>,
    slots: Vec<Arbiter>,
    free: Vec<usize>,
}

impl ContactSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Arbiters allocated so far, live or pooled.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn find(&self, a: ShapeId, b: ShapeId) -> Option<&Arbiter> {
        let slot = *self.index.get(&PairKey::new(a, b))?;
        self.slots.get(slot)
    }

    /// Slot of the arbiter for `a`/`b`, creating or recycling one when the pair is new.
    pub(crate) fn find_or_insert(&mut self, a: &Collider, b: &Collider, stamp: u64) -> usize {
        let key = PairKey::new(a.id, b.id);
        if let Some(&slot) = self.index.get(&key) {
            return slot;
        }

        let slot = match self.free.pop() {
            Some(slot) => {
                self.slots[slot].reset(a, b, stamp);
                slot
            }
            None => {
                self.slots.push(Arbiter::new(a, b, stamp));
                self.slots.len() - 1
            }
        };
        self.index.insert(key, slot);
        slot
    }

    pub(crate) fn get_mut(&mut self, slot: usize) -> Option<&mut Arbiter> {
        self.slots.get_mut(slot)
    }

    pub(crate) fn get(&self, slot: usize) -> Option<&Arbiter> {
        self.slots.get(slot)
    }

    /// Live arbiters in pair-key order.
    pub fn iter(&self) -> impl Iterator<Item = &Arbiter> + '_ {
        self.index.values().map(move |&slot| &self.slots[slot])
    }

    /// Visits live arbiters mutably, in pair-key order.
    pub(crate) fn for_each_mut(&mut self, mut f: impl FnMut(&mut Arbiter)) {
        for &slot in self.index.values() {
            f(&mut self.slots[slot]);
        }
    }

    /// Keeps the arbiters for which `keep` returns `true` and pools the rest.
    pub(crate) fn sweep(&mut self, mut keep: impl FnMut(&mut Arbiter) -> bool) {
        let slots = &mut self.slots;
        let free = &mut self.free;
        self.index.retain(|_, slot| {
            let kept = keep(&mut slots[*slot]);
            if !kept {
                free.push(*slot);
            }
            kept
        });
    }

    /// Drops every arbiter involving `shape`, passing each one to `on_drop` first.
    pub(crate) fn remove_shape(&mut self, shape: ShapeId, mut on_drop: impl FnMut(&mut Arbiter)) {
        let slots = &mut self.slots;
        let free = &mut self.free;
        self.index.retain(|key, slot| {
            if !key.involves(shape) {
                return true;
            }
            on_drop(&mut slots[*slot]);
            free.push(*slot);
            false
        });
    }

    pub fn clear(&mut self) {
        self.free.extend(self.index.values().copied());
        self.index.clear();
    }
}

/// Broad-phase indices, the contact table and collision handlers of a space.
pub struct CollisionManager {
    /// Shapes that never move. Rebuilt only on request.
    pub static_hash: SpatialHash,
    /// Shapes attached to moving bodies. Rehashed every step.
    pub active_hash: SpatialHash,
    pub contacts: ContactSet,
    pub handlers: HandlerRegistry,
    /// Slots of arbiters handed to the solver this step.
    pub(crate) solving: Vec<usize>,
    /// Candidate pairs from the broad phase, reused between steps.
    pub(crate) pairs: Vec<(ShapeId, ShapeId)>,
    /// Narrow-phase output for the pair being processed.
    pub(crate) contact_buffer: Vec<Contact>,
}

impl Default for CollisionManager {
    fn default() -> Self {
        Self::new(&SpaceConfig::default())
    }
}

impl CollisionManager {
    pub fn new(config: &SpaceConfig) -> Self {
        Self {
            static_hash: SpatialHash::new(config.static_cell_size, config.static_cell_count),
            active_hash: SpatialHash::new(config.active_cell_size, config.active_cell_count),
            contacts: ContactSet::new(),
            handlers: HandlerRegistry::new(),
            solving: Vec::new(),
            pairs: Vec::new(),
            contact_buffer: Vec::new(),
        }
    }

    /// Arbiters solved during the last step.
    pub fn solved_arbiters(&self) -> impl Iterator<Item = &Arbiter> + '_ {
        self.solving.iter().filter_map(move |&slot| self.contacts.get(slot))
    }
}
