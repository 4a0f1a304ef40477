use glam::Vec2;

use super::{contact::Contact, handler::HandlerKey};
use crate::{
    core::{collider::Collider, types::Material},
    utils::allocator::{BodyId, ShapeId},
};

/// Where an arbiter is in its collision lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArbiterState {
    /// Not touching, or touching again after a separation.
    #[default]
    New,
    /// First step of contact; `begin` has just run.
    FirstContact,
    /// Touching for at least one step already.
    Normal,
    /// `begin` rejected the pair; skipped until it is dropped.
    Ignore,
}

/// Persistent contact state for one pair of shapes.
///
/// Shapes are stored in narrow-phase order (lower shape kind first). The public
/// accessors report them in the order of the handler that processes the pair.
#[derive(Debug, Clone)]
pub struct Arbiter {
    pub(crate) shape_a: ShapeId,
    pub(crate) shape_b: ShapeId,
    pub(crate) body_a: BodyId,
    pub(crate) body_b: BodyId,
    pub(crate) contacts: Vec<Contact>,

    /// Combined restitution. May be overridden from `pre_solve`.
    pub elasticity: f32,
    /// Combined friction. May be overridden from `pre_solve`.
    pub friction: f32,
    /// Surface velocity of the second shape relative to the first, used for friction.
    pub surface_velocity: Vec2,
    pub user_data: u64,

    pub(crate) state: ArbiterState,
    pub(crate) touching: bool,
    pub(crate) stamp: u64,
    pub(crate) swapped: bool,
    pub(crate) handler: HandlerKey,
    /// Either shape is a sensor or neither body can move.
    pub(crate) sensor: bool,
}

impl Arbiter {
    pub(crate) fn new(a: &Collider, b: &Collider, stamp: u64) -> Self {
        Self {
            shape_a: a.id,
            shape_b: b.id,
            body_a: a.body,
            body_b: b.body,
            contacts: Vec::new(),
            elasticity: 0.0,
            friction: 0.0,
            surface_velocity: Vec2::ZERO,
            user_data: 0,
            state: ArbiterState::New,
            touching: false,
            stamp,
            swapped: false,
            handler: HandlerKey::Default,
            sensor: false,
        }
    }

    /// Reuses a pooled arbiter for a new pair.
    pub(crate) fn reset(&mut self, a: &Collider, b: &Collider, stamp: u64) {
        let mut contacts = std::mem::take(&mut self.contacts);
        contacts.clear();
        *self = Self {
            contacts,
            ..Self::new(a, b, stamp)
        };
    }

    /// Replaces the contact list, carrying accumulated impulses over by feature hash,
    /// and refreshes the pair coefficients from the shapes' materials.
    pub(crate) fn update(
        &mut self,
        incoming: &[Contact],
        a: &Collider,
        b: &Collider,
        handler: HandlerKey,
        swapped: bool,
    ) {
        let previous = std::mem::take(&mut self.contacts);
        self.contacts.extend_from_slice(incoming);
        for contact in &mut self.contacts {
            if let Some(old) = previous.iter().find(|old| old.hash == contact.hash) {
                contact.inherit(old);
            }
        }

        let pair = Material::combine_pair(&a.material, &b.material);
        self.elasticity = pair.elasticity;
        self.friction = pair.friction;
        self.surface_velocity = pair.surface_velocity;

        self.handler = handler;
        self.swapped = swapped;
        self.shape_a = a.id;
        self.shape_b = b.id;
        self.body_a = a.body;
        self.body_b = b.body;
    }

    pub fn state(&self) -> ArbiterState {
        self.state
    }

    /// True while the shapes overlapped on the latest step.
    pub fn is_touching(&self) -> bool {
        self.touching
    }

    pub fn is_first_contact(&self) -> bool {
        self.state == ArbiterState::FirstContact
    }

    /// The two shapes, first one matching the handler's first collision type.
    pub fn shapes(&self) -> (ShapeId, ShapeId) {
        if self.swapped {
            (self.shape_b, self.shape_a)
        } else {
            (self.shape_a, self.shape_b)
        }
    }

    /// Bodies of [`Arbiter::shapes`], in the same order.
    pub fn bodies(&self) -> (BodyId, BodyId) {
        if self.swapped {
            (self.body_b, self.body_a)
        } else {
            (self.body_a, self.body_b)
        }
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Raw contacts, normals pointing from the narrow-phase first shape to the second.
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    /// Normal of contact `i`, pointing from the first to the second of [`Arbiter::shapes`].
    pub fn normal(&self, i: usize) -> Option<Vec2> {
        let n = self.contacts.get(i)?.normal;
        Some(if self.swapped { -n } else { n })
    }

    pub fn contact_points(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.contacts.iter().map(|c| c.point)
    }

    /// Sum of normal impulses applied on the last step, as seen by the second shape.
    pub fn total_impulse(&self) -> Vec2 {
        let sum: Vec2 = self
            .contacts
            .iter()
            .map(|c| c.normal * c.normal_impulse())
            .sum();
        self.oriented(sum)
    }

    /// Like [`Arbiter::total_impulse`] but including friction.
    pub fn total_impulse_with_friction(&self) -> Vec2 {
        let sum: Vec2 = self.contacts.iter().map(Contact::impulse).sum();
        self.oriented(sum)
    }

    /// How much of the contact impulse cancelled itself out, from 0 (none) to 1 (crushed).
    pub fn estimate_crushing_impulse(&self) -> f32 {
        let mut magnitude_sum = 0.0;
        let mut vector_sum = Vec2::ZERO;
        for contact in &self.contacts {
            let j = contact.impulse();
            magnitude_sum += j.length();
            vector_sum += j;
        }
        if magnitude_sum > 0.0 {
            (1.0 - vector_sum.length() / magnitude_sum).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn oriented(&self, v: Vec2) -> Vec2 {
        if self.swapped {
            -v
        } else {
            v
        }
    }
}
