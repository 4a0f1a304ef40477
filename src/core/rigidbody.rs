use crate::{
    error::{PhysicsError, PhysicsResult},
    utils::{allocator::BodyId, math},
};

use super::types::MassProperties;
use glam::Vec2;

/// Velocity integration hook: `(body, gravity, damping, dt)`.
pub type VelocityFn = fn(&mut RigidBody, Vec2, f32, f32);

/// Position integration hook: `(body, dt)`.
pub type PositionFn = fn(&mut RigidBody, f32);

/// Core rigid body description storing kinematic state and mass properties.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub id: BodyId,
    pub position: Vec2,
    pub velocity: Vec2,
    pub force: Vec2,
    pub angular_velocity: f32,
    pub torque: f32,
    /// Maximum linear speed after velocity integration.
    pub velocity_limit: f32,
    /// Maximum angular speed after velocity integration.
    pub angular_velocity_limit: f32,
    /// Static bodies are never integrated and have infinite mass.
    pub is_static: bool,
    pub user_data: u64,
    pub velocity_fn: VelocityFn,
    pub position_fn: PositionFn,
    angle: f32,
    rotation: Vec2,
    mass_properties: MassProperties,
    inverse_mass: f32,
    inverse_moment: f32,
    pub(crate) velocity_bias: Vec2,
    pub(crate) angular_velocity_bias: f32,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

impl RigidBody {
    pub fn new(mass: f32, moment: f32) -> Self {
        let mut body = Self {
            id: BodyId::default(),
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            force: Vec2::ZERO,
            angular_velocity: 0.0,
            torque: 0.0,
            velocity_limit: f32::INFINITY,
            angular_velocity_limit: f32::INFINITY,
            is_static: false,
            user_data: 0,
            velocity_fn: RigidBody::update_velocity,
            position_fn: RigidBody::update_position,
            angle: 0.0,
            rotation: Vec2::X,
            mass_properties: MassProperties::new(mass, moment),
            inverse_mass: 0.0,
            inverse_moment: 0.0,
            velocity_bias: Vec2::ZERO,
            angular_velocity_bias: 0.0,
        };
        body.recompute_inverses();
        body
    }

    /// Immovable body used to anchor static geometry and joints.
    pub fn new_static() -> Self {
        Self {
            is_static: true,
            ..Self::new(f32::INFINITY, f32::INFINITY)
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.set_angle(angle);
        self
    }

    pub fn mass(&self) -> f32 {
        self.mass_properties.mass
    }

    pub fn moment(&self) -> f32 {
        self.mass_properties.moment
    }

    pub fn inverse_mass(&self) -> f32 {
        self.inverse_mass
    }

    pub fn inverse_moment(&self) -> f32 {
        self.inverse_moment
    }

    pub fn mass_properties(&self) -> MassProperties {
        self.mass_properties
    }

    pub fn set_mass(&mut self, mass: f32) {
        self.mass_properties.mass = mass;
        self.recompute_inverses();
    }

    pub fn set_moment(&mut self, moment: f32) {
        self.mass_properties.moment = moment;
        self.recompute_inverses();
    }

    pub fn set_mass_properties(&mut self, props: MassProperties) {
        self.mass_properties = props;
        self.recompute_inverses();
    }

    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Unit vector `(cos angle, sin angle)`.
    pub fn rotation(&self) -> Vec2 {
        self.rotation
    }

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle;
        self.rotation = Vec2::from_angle(angle);
    }

    /// Rejects NaN, zero and negative masses. Infinite values are allowed.
    pub fn validate(&self) -> PhysicsResult<()> {
        let MassProperties { mass, moment } = self.mass_properties;
        let valid = |value: f32| !value.is_nan() && value > 0.0;
        if valid(mass) && valid(moment) {
            Ok(())
        } else {
            Err(PhysicsError::InvalidMass { mass, moment })
        }
    }

    pub fn local_to_world(&self, point: Vec2) -> Vec2 {
        self.position + point.rotate(self.rotation)
    }

    pub fn world_to_local(&self, point: Vec2) -> Vec2 {
        math::unrotate(point - self.position, self.rotation)
    }

    /// Velocity of the material point at world-space offset `r` from the center of mass.
    pub fn velocity_at_offset(&self, r: Vec2) -> Vec2 {
        self.velocity + r.perp() * self.angular_velocity
    }

    pub fn reset_forces(&mut self) {
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }

    /// Accumulates a force applied at world-space offset `r` from the center of mass.
    pub fn apply_force(&mut self, force: Vec2, r: Vec2) {
        self.force += force;
        self.torque += math::cross(r, force);
    }

    pub fn apply_impulse(&mut self, impulse: Vec2, r: Vec2) {
        self.velocity += impulse * self.inverse_mass;
        self.angular_velocity += self.inverse_moment * math::cross(r, impulse);
    }

    pub(crate) fn apply_bias_impulse(&mut self, impulse: Vec2, r: Vec2) {
        self.velocity_bias += impulse * self.inverse_mass;
        self.angular_velocity_bias += self.inverse_moment * math::cross(r, impulse);
    }

    /// Sets the velocity needed to reach `target` over `dt`.
    pub fn slew(&mut self, target: Vec2, dt: f32) {
        if dt > 0.0 {
            self.velocity = (target - self.position) / dt;
        }
    }

    /// Default velocity integrator: gravity, accumulated force, damping and limits.
    pub fn update_velocity(&mut self, gravity: Vec2, damping: f32, dt: f32) {
        let velocity = self.velocity * damping + (gravity + self.force * self.inverse_mass) * dt;
        self.velocity = math::clamp_length(velocity, self.velocity_limit);

        let limit = self.angular_velocity_limit;
        let angular =
            self.angular_velocity * damping + self.torque * self.inverse_moment * dt;
        self.angular_velocity = angular.clamp(-limit, limit);
    }

    /// Default position integrator. Consumes and clears the solver bias velocities.
    pub fn update_position(&mut self, dt: f32) {
        self.position += (self.velocity + self.velocity_bias) * dt;
        let angle = self.angle + (self.angular_velocity + self.angular_velocity_bias) * dt;
        self.set_angle(angle);

        self.velocity_bias = Vec2::ZERO;
        self.angular_velocity_bias = 0.0;
    }

    pub(crate) fn integrate_velocity(&mut self, gravity: Vec2, damping: f32, dt: f32) {
        let integrate = self.velocity_fn;
        integrate(self, gravity, damping, dt);
    }

    pub(crate) fn integrate_position(&mut self, dt: f32) {
        let integrate = self.position_fn;
        integrate(self, dt);
    }

    fn recompute_inverses(&mut self) {
        self.inverse_mass = 1.0 / self.mass_properties.mass;
        self.inverse_moment = 1.0 / self.mass_properties.moment;
    }
}

/// Applies a damped spring force between two bodies for the coming step.
///
/// The anchors are in body space. The damping term is limited so it cannot
/// reverse the relative velocity within a single step.
#[allow(clippy::too_many_arguments)]
pub fn apply_damped_spring(
    a: &mut RigidBody,
    b: &mut RigidBody,
    anchor_a: Vec2,
    anchor_b: Vec2,
    rest_length: f32,
    stiffness: f32,
    damping: f32,
    dt: f32,
) {
    let r1 = anchor_a.rotate(a.rotation);
    let r2 = anchor_b.rotate(b.rotation);

    let delta = (b.position + r2) - (a.position + r1);
    let dist = delta.length();
    let n = if dist > 0.0 { delta / dist } else { Vec2::ZERO };

    let f_spring = (dist - rest_length) * stiffness;

    let vrn = (b.velocity_at_offset(r2) - a.velocity_at_offset(r1)).dot(n);
    let mass_sum = a.inverse_mass + b.inverse_mass;
    let damping_limit = if mass_sum > 0.0 && dt > 0.0 {
        1.0 / (dt * mass_sum)
    } else {
        f32::INFINITY
    };
    let f_damp = vrn * damping.min(damping_limit);

    let f = n * (f_spring + f_damp);
    a.apply_force(f, r1);
    b.apply_force(-f, r2);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_bodies_have_zero_inverse_mass() {
        let body = RigidBody::new_static();
        assert!(body.is_static);
        assert_eq!(body.inverse_mass(), 0.0);
        assert_eq!(body.inverse_moment(), 0.0);
        assert!(body.validate().is_ok());
    }

    #[test]
    fn invalid_mass_is_rejected() {
        assert!(RigidBody::new(0.0, 1.0).validate().is_err());
        assert!(RigidBody::new(1.0, f32::NAN).validate().is_err());
        assert!(RigidBody::new(-2.0, 1.0).validate().is_err());
    }

    #[test]
    fn local_world_round_trip() {
        let body = RigidBody::default()
            .with_position(Vec2::new(3.0, 4.0))
            .with_angle(std::f32::consts::FRAC_PI_2);

        let world = body.local_to_world(Vec2::new(1.0, 0.0));
        assert!((world - Vec2::new(3.0, 5.0)).length() < 1e-5);
        assert!((body.world_to_local(world) - Vec2::new(1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn velocity_integration_respects_limits() {
        let mut body = RigidBody::new(2.0, 1.0);
        body.velocity_limit = 5.0;
        body.force = Vec2::new(100.0, 0.0);
        body.update_velocity(Vec2::new(0.0, -10.0), 1.0, 1.0);
        assert!((body.velocity.length() - 5.0).abs() < 1e-4);
    }

    #[test]
    fn position_integration_consumes_bias() {
        let mut body = RigidBody::default().with_velocity(Vec2::new(1.0, 0.0));
        body.apply_bias_impulse(Vec2::new(0.0, 2.0), Vec2::ZERO);
        body.update_position(0.5);
        assert_eq!(body.position, Vec2::new(0.5, 1.0));
        assert_eq!(body.velocity_bias, Vec2::ZERO);
    }

    #[test]
    fn off_center_impulse_spins_body() {
        let mut body = RigidBody::new(1.0, 1.0);
        body.apply_impulse(Vec2::new(0.0, 1.0), Vec2::new(1.0, 0.0));
        assert_eq!(body.velocity, Vec2::new(0.0, 1.0));
        assert_eq!(body.angular_velocity, 1.0);
    }

    #[test]
    fn damped_spring_pulls_stretched_bodies_together() {
        let mut a = RigidBody::default();
        let mut b = RigidBody::default().with_position(Vec2::new(4.0, 0.0));
        apply_damped_spring(&mut a, &mut b, Vec2::ZERO, Vec2::ZERO, 2.0, 10.0, 0.0, 1.0 / 60.0);
        assert!(a.force.x > 0.0);
        assert!(b.force.x < 0.0);
        assert!((a.force.x - 20.0).abs() < 1e-4);
    }
}
