//! The [`Space`]: owner of every body, shape and joint, and the fixed-step driver.

pub mod collision_manager;
pub mod dynamics_manager;
pub mod post_step;

use std::time::Instant;

use glam::Vec2;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::{
    collision::{
        arbiter::{Arbiter, ArbiterState},
        handler::{CallbackContext, CollisionHandler, HandlerKey},
        narrowphase::NarrowPhase,
        queries::SegmentHit,
    },
    config::SpaceConfig,
    core::{
        collider::{Collider, CollisionFilter, CollisionType},
        constraints::Constraint,
        rigidbody::RigidBody,
        types::Bounds,
    },
    dynamics::integrator::Integrator,
    error::{PhysicsError, PhysicsResult},
    utils::{
        allocator::{Arena, BodyId, ConstraintId, IdCounter, ShapeId},
        logging::{warn_if_step_budget_exceeded, ScopedTimer},
        profiling::{ScopedTimer as PhaseTimer, StepProfile},
    },
};

use self::{
    collision_manager::CollisionManager,
    dynamics_manager::DynamicsManager,
    post_step::{PostStepKey, PostStepQueue},
};

/// Layer and group filter applied to spatial queries.
pub type QueryFilter = CollisionFilter;

/// A simulation world advanced in fixed steps.
///
/// Topology changes (adding or removing bodies, shapes and constraints) are
/// rejected with [`PhysicsError::Locked`] while a step runs. Handler callbacks
/// defer them through [`CallbackContext`] instead.
pub struct Space {
    config: SpaceConfig,
    bodies: Arena<RigidBody>,
    shapes: Arena<Collider>,
    collision: CollisionManager,
    dynamics: DynamicsManager,
    post_step: PostStepQueue,
    static_body: BodyId,
    shape_ids: IdCounter,
    stamp: u64,
    locked: bool,
    /// True from the start of `step` until its post-step callbacks have run.
    stepping: bool,
    profile: StepProfile,
}

impl Default for Space {
    fn default() -> Self {
        Self::new()
    }
}

impl Space {
    pub fn new() -> Self {
        Self::with_config(SpaceConfig::default())
    }

    pub fn with_config(config: SpaceConfig) -> Self {
        let mut bodies = Arena::new();
        let static_body = BodyId(bodies.insert(RigidBody::new_static()));
        if let Some(body) = bodies.get_mut(static_body.0) {
            body.id = static_body;
        }

        Self {
            collision: CollisionManager::new(&config),
            config,
            bodies,
            shapes: Arena::new(),
            dynamics: DynamicsManager::new(),
            post_step: PostStepQueue::new(),
            static_body,
            shape_ids: IdCounter::new(),
            stamp: 0,
            locked: false,
            stepping: false,
            profile: StepProfile::default(),
        }
    }

    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    pub fn gravity(&self) -> Vec2 {
        self.config.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.config.gravity = gravity;
    }

    pub fn set_iterations(&mut self, iterations: u32) {
        self.config.iterations = iterations;
    }

    pub fn set_elastic_iterations(&mut self, iterations: u32) {
        self.config.elastic_iterations = iterations;
    }

    pub fn set_damping(&mut self, damping: f32) {
        self.config.damping = damping;
    }

    /// Built-in immovable body for static geometry and anchors.
    pub fn static_body(&self) -> BodyId {
        self.static_body
    }

    /// Number of completed steps.
    pub fn stamp(&self) -> u64 {
        self.stamp
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn last_step_profile(&self) -> &StepProfile {
        &self.profile
    }

    fn ensure_unlocked(&self) -> PhysicsResult<()> {
        if self.locked {
            Err(PhysicsError::Locked)
        } else {
            Ok(())
        }
    }

    pub fn add_body(&mut self, body: RigidBody) -> PhysicsResult<BodyId> {
        self.ensure_unlocked()?;
        body.validate()?;

        let id = BodyId(self.bodies.insert(body));
        if let Some(stored) = self.bodies.get_mut(id.0) {
            stored.id = id;
        }
        log::debug!("added body {:?}", id);
        Ok(id)
    }

    /// Removes a body. Shapes and constraints attached to it stay in the space
    /// and are skipped until they are removed as well. The built-in static body
    /// cannot be removed.
    pub fn remove_body(&mut self, id: BodyId) -> PhysicsResult<RigidBody> {
        self.ensure_unlocked()?;
        if id == self.static_body {
            return Err(PhysicsError::StaticBody(id));
        }
        let body = self
            .bodies
            .remove(id.0)
            .ok_or(PhysicsError::UnknownBody(id))?;
        log::debug!("removed body {:?}", id);
        Ok(body)
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id.0)
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id.0)
    }

    /// Every body, the built-in static body included.
    pub fn bodies(&self) -> impl Iterator<Item = &RigidBody> + '_ {
        self.bodies.iter()
    }

    /// Adds a shape whose body moves. Its bounds are refreshed every step.
    pub fn add_shape(&mut self, shape: Collider) -> PhysicsResult<ShapeId> {
        self.insert_shape(shape, false)
    }

    /// Adds a shape that never moves. It is only re-binned by [`Space::rehash_static`].
    pub fn add_static_shape(&mut self, shape: Collider) -> PhysicsResult<ShapeId> {
        self.insert_shape(shape, true)
    }

    fn insert_shape(&mut self, mut shape: Collider, is_static: bool) -> PhysicsResult<ShapeId> {
        self.ensure_unlocked()?;
        let body = self
            .bodies
            .get(shape.body.0)
            .ok_or(PhysicsError::UnknownBody(shape.body))?;

        let body_id = shape.body;
        shape.is_static = is_static;
        shape.hash_id = self.shape_ids.next_id();
        let bounds = shape.cache_bounds(body.position, body.rotation());

        let id = ShapeId(self.shapes.insert(shape));
        if let Some(stored) = self.shapes.get_mut(id.0) {
            stored.id = id;
        }

        let hash = if is_static {
            &mut self.collision.static_hash
        } else {
            &mut self.collision.active_hash
        };
        if let Err(err) = hash.insert(id, bounds) {
            self.shapes.remove(id.0);
            return Err(err);
        }

        log::debug!(
            "added {} shape {:?} to body {:?}",
            if is_static { "static" } else { "active" },
            id,
            body_id
        );
        Ok(id)
    }

    /// Removes a shape, firing `separate` for every pair it was still touching.
    pub fn remove_shape(&mut self, id: ShapeId) -> PhysicsResult<Collider> {
        self.ensure_unlocked()?;
        let is_static = match self.shapes.get(id.0) {
            Some(shape) => shape.is_static,
            None => return Err(PhysicsError::UnknownShape(id)),
        };

        {
            let CollisionManager {
                contacts, handlers, ..
            } = &mut self.collision;
            let mut ctx = CallbackContext::new(&mut self.bodies, &self.shapes, &mut self.post_step);
            contacts.remove_shape(id, |arbiter| {
                if arbiter.touching {
                    arbiter.touching = false;
                    handlers.get_mut(arbiter.handler).separate(arbiter, &mut ctx);
                }
            });
        }

        if is_static {
            self.collision.static_hash.remove(id);
        } else {
            self.collision.active_hash.remove(id);
        }
        let shape = self
            .shapes
            .remove(id.0)
            .ok_or(PhysicsError::UnknownShape(id))?;
        log::debug!("removed shape {:?}", id);
        Ok(shape)
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Collider> {
        self.shapes.get(id.0)
    }

    /// Mutable access to a shape's material, filter and tags. Geometry changes
    /// take effect once the shape is rehashed.
    pub fn shape_mut(&mut self, id: ShapeId) -> Option<&mut Collider> {
        self.shapes.get_mut(id.0)
    }

    pub fn shapes(&self) -> impl Iterator<Item = &Collider> + '_ {
        self.shapes.iter()
    }

    /// Refreshes one shape's bounds from its body and re-bins it.
    pub fn rehash_shape(&mut self, id: ShapeId) -> PhysicsResult<()> {
        let shape = self
            .shapes
            .get_mut(id.0)
            .ok_or(PhysicsError::UnknownShape(id))?;
        let body = self
            .bodies
            .get(shape.body.0)
            .ok_or(PhysicsError::UnknownBody(shape.body))?;
        let bounds = shape.cache_bounds(body.position, body.rotation());
        let hash = if shape.is_static {
            &mut self.collision.static_hash
        } else {
            &mut self.collision.active_hash
        };
        hash.rehash_object(id, bounds);
        Ok(())
    }

    /// Refreshes the bounds of every static shape and rebuilds the static hash.
    pub fn rehash_static(&mut self) {
        let bodies = &self.bodies;
        for shape in self.shapes.iter_mut().filter(|shape| shape.is_static) {
            if let Some(body) = bodies.get(shape.body.0) {
                shape.cache_bounds(body.position, body.rotation());
            }
        }
        self.collision.static_hash.rehash(&self.shapes);
    }

    pub fn resize_static_hash(&mut self, cell_size: f32, cells: usize) {
        self.config.static_cell_size = cell_size;
        self.config.static_cell_count = cells;
        self.collision.static_hash.resize(cell_size, cells, &self.shapes);
        log::debug!("static hash resized to {} cells of {}", self.collision.static_hash.cell_count(), cell_size);
    }

    pub fn resize_active_hash(&mut self, cell_size: f32, cells: usize) {
        self.config.active_cell_size = cell_size;
        self.config.active_cell_count = cells;
        self.collision.active_hash.resize(cell_size, cells, &self.shapes);
        log::debug!("active hash resized to {} cells of {}", self.collision.active_hash.cell_count(), cell_size);
    }

    /// Rewinds the shape hash-id counter so a rebuilt scene reproduces the same
    /// contact hashes. Does nothing and returns `false` while shapes are present.
    pub fn reset_shape_ids(&mut self) -> bool {
        if !self.shapes.is_empty() {
            log::warn!("shape ids can only be reset in a space without shapes");
            return false;
        }
        self.shape_ids.reset();
        true
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> PhysicsResult<ConstraintId> {
        self.ensure_unlocked()?;
        if constraint.body_a == constraint.body_b {
            return Err(PhysicsError::SameBody(constraint.body_a));
        }
        let a = self
            .bodies
            .get(constraint.body_a.0)
            .ok_or(PhysicsError::UnknownBody(constraint.body_a))?;
        let b = self
            .bodies
            .get(constraint.body_b.0)
            .ok_or(PhysicsError::UnknownBody(constraint.body_b))?;
        constraint.kind.check_parameters()?;

        let free = if constraint.kind.is_angular() {
            a.inverse_moment() + b.inverse_moment()
        } else {
            a.inverse_mass() + b.inverse_mass() + a.inverse_moment() + b.inverse_moment()
        };
        if free.is_nan() || free <= 0.0 {
            return Err(PhysicsError::unsolvable(
                "both bodies are immovable along the constrained axes",
            ));
        }

        let id = ConstraintId(self.dynamics.constraints.insert(constraint));
        if let Some(stored) = self.dynamics.constraints.get_mut(id.0) {
            stored.id = id;
        }
        log::debug!("added constraint {:?}", id);
        Ok(id)
    }

    pub fn remove_constraint(&mut self, id: ConstraintId) -> PhysicsResult<Constraint> {
        self.ensure_unlocked()?;
        let constraint = self
            .dynamics
            .constraints
            .remove(id.0)
            .ok_or(PhysicsError::UnknownConstraint(id))?;
        log::debug!("removed constraint {:?}", id);
        Ok(constraint)
    }

    pub fn constraint(&self, id: ConstraintId) -> Option<&Constraint> {
        self.dynamics.constraints.get(id.0)
    }

    pub fn constraint_mut(&mut self, id: ConstraintId) -> Option<&mut Constraint> {
        self.dynamics.constraints.get_mut(id.0)
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> + '_ {
        self.dynamics.constraints.iter()
    }

    /// Constraints attached to `body`.
    pub fn constraints_of(&self, body: BodyId) -> Vec<ConstraintId> {
        self.dynamics.constraints_of(body)
    }

    /// Live arbiters in a stable order.
    pub fn arbiters(&self) -> impl Iterator<Item = &Arbiter> + '_ {
        self.collision.contacts.iter()
    }

    /// The arbiter for a pair of shapes, if they touched recently.
    pub fn arbiter(&self, a: ShapeId, b: ShapeId) -> Option<&Arbiter> {
        self.collision.contacts.find(a, b)
    }

    /// Registers `handler` for collisions between shapes of type `a` and `b`.
    pub fn set_collision_handler(&mut self, a: CollisionType, b: CollisionType, handler: CollisionHandler) {
        self.collision.handlers.set(a, b, handler);
    }

    pub fn remove_collision_handler(&mut self, a: CollisionType, b: CollisionType) -> bool {
        self.collision.handlers.remove(a, b)
    }

    /// Handler for every pair without a registered one.
    pub fn set_default_handler(&mut self, handler: CollisionHandler) {
        self.collision.handlers.set_default(handler);
    }

    /// Queues `f` to run at the end of the current (or next) step.
    /// Returns `false` if a callback is already queued under `key`.
    pub fn add_post_step_callback(
        &mut self,
        key: PostStepKey,
        f: impl FnOnce(&mut Space) + Send + 'static,
    ) -> bool {
        self.post_step.add(key, f)
    }

    /// Calls `f` for every shape containing `point`.
    pub fn point_query(&mut self, point: Vec2, filter: QueryFilter, mut f: impl FnMut(&Collider)) {
        let shapes = &self.shapes;
        let mut visit = |id: ShapeId| {
            if let Some(shape) = shapes.get(id.0) {
                if !filter.rejects(&shape.filter) && shape.point_query(point) {
                    f(shape);
                }
            }
        };
        self.collision.active_hash.query_point(point, &mut visit);
        self.collision.static_hash.query_point(point, &mut visit);
    }

    /// Some shape containing `point`, if any.
    pub fn point_query_first(&mut self, point: Vec2, filter: QueryFilter) -> Option<ShapeId> {
        let mut found = None;
        self.point_query(point, filter, |shape| {
            if found.is_none() {
                found = Some(shape.id);
            }
        });
        found
    }

    /// Calls `f` for every shape crossed by `start`-`end`. Returns whether anything was hit.
    pub fn segment_query(
        &mut self,
        start: Vec2,
        end: Vec2,
        filter: QueryFilter,
        mut f: impl FnMut(&SegmentHit),
    ) -> bool {
        let shapes = &self.shapes;
        let mut any = false;
        let mut visit = |id: ShapeId| {
            if let Some(hit) = shapes
                .get(id.0)
                .filter(|shape| !filter.rejects(&shape.filter))
                .and_then(|shape| shape.segment_query(start, end))
            {
                any = true;
                f(&hit);
            }
            1.0
        };
        self.collision.static_hash.query_segment(start, end, &mut visit);
        self.collision.active_hash.query_segment(start, end, &mut visit);
        any
    }

    /// The hit closest to `start`, if any.
    pub fn segment_query_first(&mut self, start: Vec2, end: Vec2, filter: QueryFilter) -> Option<SegmentHit> {
        let shapes = &self.shapes;
        let mut best: Option<SegmentHit> = None;
        let mut visit = |id: ShapeId| {
            let hit = shapes
                .get(id.0)
                .filter(|shape| !filter.rejects(&shape.filter))
                .and_then(|shape| shape.segment_query(start, end));
            if let Some(hit) = hit {
                if best.map_or(true, |b| hit.t < b.t) {
                    best = Some(hit);
                }
            }
            best.map_or(1.0, |b| b.t)
        };
        self.collision.static_hash.query_segment(start, end, &mut visit);
        self.collision.active_hash.query_segment(start, end, &mut visit);
        best
    }

    /// Calls `f` for every shape whose bounding box overlaps `bounds`.
    pub fn bb_query(&mut self, bounds: Bounds, filter: QueryFilter, mut f: impl FnMut(&Collider)) {
        let shapes = &self.shapes;
        let mut visit = |id: ShapeId| {
            if let Some(shape) = shapes.get(id.0) {
                if !filter.rejects(&shape.filter) && shape.bounds().intersects(&bounds) {
                    f(shape);
                }
            }
        };
        self.collision.active_hash.query(bounds, &mut visit);
        self.collision.static_hash.query(bounds, &mut visit);
    }

    /// Advances the simulation by `dt`. A zero `dt` does nothing.
    ///
    /// The step always runs to completion. If a constraint could not be solved
    /// it is skipped for this step and the first such error is returned.
    pub fn step(&mut self, dt: f32) -> PhysicsResult<()> {
        if dt == 0.0 {
            return Ok(());
        }
        self.ensure_unlocked()?;
        if self.stepping {
            return Err(PhysicsError::Locked);
        }

        let started = Instant::now();
        let _step_timer = ScopedTimer::new("step");
        let mut profile = StepProfile::default();
        let dt_inv = dt.recip();

        self.stepping = true;
        self.locked = true;
        self.collision.solving.clear();

        {
            let _timer = ScopedTimer::new("step::integrate_positions");
            let _phase = PhaseTimer::new(&mut profile.integrate_positions_time);
            Integrator::integrate_positions(&mut self.bodies, dt);
        }

        {
            let _timer = ScopedTimer::new("step::broad_phase");
            let _phase = PhaseTimer::new(&mut profile.broad_phase_time);
            self.refresh_active_bounds();
            self.collect_pairs();
        }

        {
            let _timer = ScopedTimer::new("step::collide");
            let _phase = PhaseTimer::new(&mut profile.narrow_phase_time);
            for index in 0..self.collision.pairs.len() {
                let (a, b) = self.collision.pairs[index];
                self.collide_pair(a, b);
            }
            self.sweep_contacts();
        }

        let constraint_result;
        {
            let _timer = ScopedTimer::new("step::solve");
            let _phase = PhaseTimer::new(&mut profile.solver_time);
            DynamicsManager::pre_step_contacts(
                &mut self.collision.contacts,
                &self.collision.solving,
                &self.bodies,
                dt_inv,
                self.config.collision_slop,
                self.config.collision_bias_coef,
            );
            constraint_result = self.dynamics.pre_step_constraints(&mut self.bodies, dt);

            for _ in 0..self.config.elastic_iterations {
                self.dynamics.solve_iteration(
                    &mut self.collision.contacts,
                    &self.collision.solving,
                    &mut self.bodies,
                    1.0,
                );
            }
        }

        {
            let _timer = ScopedTimer::new("step::integrate_velocities");
            let _phase = PhaseTimer::new(&mut profile.integrate_velocities_time);
            Integrator::integrate_velocities(&mut self.bodies, self.config.gravity, self.config.damping, dt);
        }

        {
            let _timer = ScopedTimer::new("step::solve");
            let _phase = PhaseTimer::new(&mut profile.solver_time);
            DynamicsManager::apply_cached_contact_impulses(
                &self.collision.contacts,
                &self.collision.solving,
                &mut self.bodies,
            );

            // Restitution was already resolved by the elastic pass when it ran.
            let elastic_coef = if self.config.elastic_iterations > 0 { 0.0 } else { 1.0 };
            for _ in 0..self.config.iterations {
                self.dynamics.solve_iteration(
                    &mut self.collision.contacts,
                    &self.collision.solving,
                    &mut self.bodies,
                    elastic_coef,
                );
            }
        }

        self.locked = false;

        {
            let _timer = ScopedTimer::new("step::callbacks");
            let _phase = PhaseTimer::new(&mut profile.callback_time);
            self.run_post_solve();
            for (_, callback) in self.post_step.take() {
                callback(self);
            }
        }

        self.stamp += 1;
        self.stepping = false;

        profile.body_count = self.bodies.len();
        profile.shape_count = self.shapes.len();
        profile.candidate_pair_count = self.collision.pairs.len();
        profile.arbiter_count = self.collision.contacts.len();
        profile.contact_count = self
            .collision
            .solved_arbiters()
            .map(Arbiter::contact_count)
            .sum();
        profile.constraint_count = self.dynamics.constraints.len();
        profile.total_step_time = started.elapsed();
        profile.report();
        if let Some(budget_ms) = self.config.step_budget_ms {
            warn_if_step_budget_exceeded(profile.total_step_time, budget_ms);
        }
        self.profile = profile;

        constraint_result
    }

    fn refresh_active_bounds(&mut self) {
        let bodies = &self.bodies;
        let refresh = |shape: &mut Collider| {
            if shape.is_static {
                return;
            }
            match bodies.get(shape.body.0) {
                Some(body) => {
                    shape.cache_bounds(body.position, body.rotation());
                }
                None => log::warn!("shape {:?} references a missing body {:?}", shape.id, shape.body),
            }
        };

        #[cfg(feature = "parallel")]
        self.shapes.par_iter_mut().for_each(refresh);
        #[cfg(not(feature = "parallel"))]
        self.shapes.iter_mut().for_each(refresh);
    }

    /// Active shapes against static ones, then active against active.
    fn collect_pairs(&mut self) {
        let CollisionManager {
            static_hash,
            active_hash,
            pairs,
            ..
        } = &mut self.collision;
        let shapes = &self.shapes;

        pairs.clear();
        active_hash.each(|id| {
            if let Some(shape) = shapes.get(id.0) {
                static_hash.query(shape.bounds(), |other| pairs.push((id, other)));
            }
        });
        active_hash.rehash_query(shapes, |current, earlier| pairs.push((current, earlier)));
    }

    fn rejects_pair(a: &Collider, b: &Collider) -> bool {
        !a.bounds().intersects(&b.bounds()) || a.body == b.body || a.filter.rejects(&b.filter)
    }

    fn collide_pair(&mut self, a: ShapeId, b: ShapeId) {
        let (mut a, mut b) = match (self.shapes.get(a.0), self.shapes.get(b.0)) {
            (Some(a), Some(b)) => (a, b),
            _ => return,
        };
        if Self::rejects_pair(a, b) {
            return;
        }
        if a.kind() > b.kind() {
            std::mem::swap(&mut a, &mut b);
        }

        let (handler_key, swapped) = self.collision.handlers.lookup(a.collision_type, b.collision_type);
        let sensor = a.sensor || b.sensor;
        if sensor && handler_key == HandlerKey::Default {
            return;
        }

        let buffer = &mut self.collision.contact_buffer;
        buffer.clear();
        if NarrowPhase::collide(a, b, self.config.collision_slop, buffer) == 0 {
            return;
        }

        let immovable = match (self.bodies.get(a.body.0), self.bodies.get(b.body.0)) {
            (Some(body_a), Some(body_b)) => is_immovable(body_a) && is_immovable(body_b),
            _ => {
                log::warn!("skipping pair {:?}/{:?}: body no longer in the space", a.id, b.id);
                return;
            }
        };

        let stamp = self.stamp;
        let slot = self.collision.contacts.find_or_insert(a, b, stamp);
        let arbiter = match self.collision.contacts.get_mut(slot) {
            Some(arbiter) => arbiter,
            None => return,
        };
        arbiter.update(&buffer[..], a, b, handler_key, swapped);
        arbiter.sensor = sensor || immovable;

        let handler = self.collision.handlers.get_mut(handler_key);
        let mut ctx = CallbackContext::new(&mut self.bodies, &self.shapes, &mut self.post_step);

        if arbiter.state == ArbiterState::New {
            arbiter.state = ArbiterState::FirstContact;
            if !handler.begin(arbiter, &mut ctx) {
                arbiter.state = ArbiterState::Ignore;
            }
        }

        let solve = arbiter.state != ArbiterState::Ignore
            && handler.pre_solve(arbiter, &mut ctx)
            && !arbiter.sensor;
        if solve {
            self.collision.solving.push(slot);
        } else {
            for contact in &mut arbiter.contacts {
                contact.jn_acc = 0.0;
                contact.jt_acc = 0.0;
            }
        }

        arbiter.touching = true;
        arbiter.stamp = stamp;
    }

    /// Fires `separate` for pairs that stopped touching and drops pairs that
    /// have been apart for longer than the persistence window.
    fn sweep_contacts(&mut self) {
        let stamp = self.stamp;
        let persistence = u64::from(self.config.contact_persistence);
        let CollisionManager {
            contacts, handlers, ..
        } = &mut self.collision;
        let mut ctx = CallbackContext::new(&mut self.bodies, &self.shapes, &mut self.post_step);

        contacts.sweep(|arbiter| {
            let ticks = stamp.saturating_sub(arbiter.stamp);
            if ticks >= 1 && arbiter.touching {
                arbiter.touching = false;
                handlers.get_mut(arbiter.handler).separate(arbiter, &mut ctx);
                if arbiter.state == ArbiterState::Ignore {
                    return false;
                }
                arbiter.state = ArbiterState::New;
            }
            ticks <= persistence
        });
    }

    fn run_post_solve(&mut self) {
        let stamp = self.stamp;
        let CollisionManager {
            contacts,
            handlers,
            solving,
            ..
        } = &mut self.collision;
        let mut ctx = CallbackContext::new(&mut self.bodies, &self.shapes, &mut self.post_step);

        for &slot in solving.iter() {
            if let Some(arbiter) = contacts.get_mut(slot) {
                handlers.get_mut(arbiter.handler).post_solve(arbiter, &mut ctx);
            }
        }

        contacts.for_each_mut(|arbiter| {
            if arbiter.stamp == stamp && arbiter.state == ArbiterState::FirstContact {
                arbiter.state = ArbiterState::Normal;
            }
        });
    }
}

fn is_immovable(body: &RigidBody) -> bool {
    body.inverse_mass() == 0.0 && body.inverse_moment() == 0.0
}
