use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Unique identifier with generation tracking to prevent stale references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct GenerationalId {
    pub index: usize,
    pub generation: u32,
}

impl GenerationalId {
    pub fn new(index: usize, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Untyped slot identifier handed out by [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct EntityId(pub GenerationalId);

impl EntityId {
    pub fn new(index: usize, generation: u32) -> Self {
        Self(GenerationalId::new(index, generation))
    }

    pub fn index(&self) -> usize {
        self.0.index
    }

    pub fn generation(&self) -> u32 {
        self.0.generation
    }

    pub fn is_null(&self) -> bool {
        self.0.index == usize::MAX
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self(GenerationalId::new(usize::MAX, 0))
    }
}

/// Typed handles so a shape id can never be used to look up a body.
macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord,
        )]
        pub struct $name(pub EntityId);

        impl $name {
            pub fn index(&self) -> usize {
                self.0.index()
            }

            pub fn is_null(&self) -> bool {
                self.0.is_null()
            }
        }

        impl From<EntityId> for $name {
            fn from(id: EntityId) -> Self {
                Self(id)
            }
        }
    };
}

typed_handle!(
    /// Handle to a [`crate::RigidBody`] owned by a space.
    BodyId
);
typed_handle!(
    /// Handle to a [`crate::Collider`] owned by a space.
    ShapeId
);
typed_handle!(
    /// Handle to a [`crate::Constraint`] owned by a space.
    ConstraintId
);

/// Generational arena that hands out stable IDs while preventing use-after-free.
pub struct Arena<T> {
    items: Vec<Option<T>>,
    generations: Vec<u32>,
    free_list: VecDeque<usize>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            generations: Vec::new(),
            free_list: VecDeque::new(),
            len: 0,
        }
    }

    pub fn insert(&mut self, item: T) -> EntityId {
        self.len += 1;
        if let Some(index) = self.free_list.pop_front() {
            let generation = self.generations[index];
            self.items[index] = Some(item);
            return EntityId::new(index, generation);
        }

        let index = self.items.len();
        self.items.push(Some(item));
        self.generations.push(0);
        EntityId::new(index, 0)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: EntityId) -> Option<&T> {
        if self.is_valid(id) {
            self.items.get(id.index()).and_then(|slot| slot.as_ref())
        } else {
            None
        }
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut T> {
        if self.is_valid(id) {
            self.items.get_mut(id.index()).and_then(|slot| slot.as_mut())
        } else {
            None
        }
    }

    pub fn get2_mut(&mut self, id_a: EntityId, id_b: EntityId) -> Option<(&mut T, &mut T)> {
        if id_a.index() == id_b.index() {
            return None;
        }

        if !self.is_valid(id_a) || !self.is_valid(id_b) {
            return None;
        }

        let (first, second, flipped) = if id_a.index() < id_b.index() {
            (id_a, id_b, false)
        } else {
            (id_b, id_a, true)
        };

        let second_index = second.index();
        if second_index >= self.items.len() {
            return None;
        }

        let (left, right) = self.items.split_at_mut(second_index);
        let first_slot = left
            .get_mut(first.index())
            .and_then(|slot| slot.as_mut())?;
        let second_slot = right.get_mut(0).and_then(|slot| slot.as_mut())?;

        if flipped {
            Some((second_slot, first_slot))
        } else {
            Some((first_slot, second_slot))
        }
    }

    pub fn remove(&mut self, id: EntityId) -> Option<T> {
        if !self.is_valid(id) {
            return None;
        }
        let slot = self.items.get_mut(id.index())?;
        let item = slot.take()?;
        self.generations[id.index()] = self.generations[id.index()].wrapping_add(1);
        self.free_list.push_back(id.index());
        self.len -= 1;
        Some(item)
    }

    pub fn iter(&self) -> ArenaIter<'_, T> {
        ArenaIter {
            inner: self.items.iter(),
        }
    }

    pub fn iter_mut(&mut self) -> ArenaIterMut<'_, T> {
        ArenaIterMut {
            inner: self.items.iter_mut(),
        }
    }

    #[cfg(feature = "parallel")]
    pub fn par_iter_mut(&mut self) -> impl ParallelIterator<Item = &mut T> + '_
    where
        T: Send,
    {
        self.items.par_iter_mut().filter_map(|slot| slot.as_mut())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn is_valid(&self, id: EntityId) -> bool {
        self.generations
            .get(id.index())
            .copied()
            .map(|gen| gen == id.generation())
            .unwrap_or(false)
    }
}

pub struct ArenaIter<'a, T> {
    inner: std::slice::Iter<'a, Option<T>>,
}

impl<'a, T> Iterator for ArenaIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.inner.by_ref() {
            if let Some(item) = slot.as_ref() {
                return Some(item);
            }
        }
        None
    }
}

pub struct ArenaIterMut<'a, T> {
    inner: std::slice::IterMut<'a, Option<T>>,
}

impl<'a, T> Iterator for ArenaIterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        for slot in self.inner.by_ref() {
            if let Some(item) = slot.as_mut() {
                return Some(item);
            }
        }
        None
    }
}

/// Monotonic counter for shape hash ids. Owned by a space so runs are reproducible.
#[derive(Debug, Clone, Default)]
pub struct IdCounter {
    next: u64,
}

impl IdCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_ids_are_rejected_after_reuse() {
        let mut arena = Arena::new();
        let first = arena.insert("a");
        assert_eq!(arena.remove(first), Some("a"));

        let second = arena.insert("b");
        assert_eq!(first.index(), second.index());
        assert_ne!(first.generation(), second.generation());
        assert!(arena.get(first).is_none());
        assert_eq!(arena.get(second), Some(&"b"));
        assert_eq!(arena.remove(first), None);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn get2_mut_returns_requested_order() {
        let mut arena = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);

        let (x, y) = arena.get2_mut(b, a).expect("both slots live");
        assert_eq!((*x, *y), (2, 1));
        assert!(arena.get2_mut(a, a).is_none());
    }

    #[test]
    fn id_counter_resets() {
        let mut ids = IdCounter::new();
        assert_eq!(ids.next_id(), 0);
        assert_eq!(ids.next_id(), 1);
        ids.reset();
        assert_eq!(ids.next_id(), 0);
    }
}
