//! Rigid body component for entities moved by the physics pipeline
//!
//! Entities without this component are static: they collide but never move.

use crate::ecs::Component;
use crate::foundation::math::Vec3;

/// How the pipeline moves a body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Moved by gravity and contact impulses
    Dynamic,
    /// Moved only by its own velocity; pushes dynamic bodies but is never pushed
    Kinematic,
}

/// Component for entities that take part in the simulation
#[derive(Debug, Clone)]
pub struct RigidBodyComponent {
    /// Dynamic or kinematic
    pub kind: BodyKind,

    /// Linear velocity in units per second
    pub velocity: Vec3,

    /// Angular velocity in radians per second
    pub angular_velocity: Vec3,

    /// Inverse mass (0 for kinematic bodies)
    pub inverse_mass: f32,

    /// Damping factor for velocity (0 = no damping)
    pub linear_damping: f32,

    /// Damping factor for angular velocity
    pub angular_damping: f32,

    /// Scale applied to the configured gravity
    pub gravity_scale: f32,

    /// Force accumulated for the next step, cleared by the integrator
    pub force: Vec3,
}

impl RigidBodyComponent {
    /// Dynamic body with the given mass
    ///
    /// Non-positive masses produce an immovable body.
    pub fn dynamic(mass: f32) -> Self {
        Self {
            kind: BodyKind::Dynamic,
            velocity: Vec3::zeros(),
            angular_velocity: Vec3::zeros(),
            inverse_mass: if mass > 0.0 { 1.0 / mass } else { 0.0 },
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_scale: 1.0,
            force: Vec3::zeros(),
        }
    }

    /// Kinematic body moving at a fixed velocity
    pub fn kinematic(velocity: Vec3) -> Self {
        Self {
            kind: BodyKind::Kinematic,
            velocity,
            inverse_mass: 0.0,
            gravity_scale: 0.0,
            ..Self::dynamic(0.0)
        }
    }

    /// Builder pattern: Set velocity
    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    /// Builder pattern: Set angular velocity
    pub fn with_angular_velocity(mut self, angular_velocity: Vec3) -> Self {
        self.angular_velocity = angular_velocity;
        self
    }

    /// Builder pattern: Set linear and angular damping
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear.max(0.0);
        self.angular_damping = angular.max(0.0);
        self
    }

    /// Builder pattern: Set gravity scale
    pub fn with_gravity_scale(mut self, scale: f32) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Whether this body is kinematic
    pub fn is_kinematic(&self) -> bool {
        self.kind == BodyKind::Kinematic
    }

    /// Add a force for the next step
    pub fn apply_force(&mut self, force: Vec3) {
        self.force += force;
    }

    /// Apply an instantaneous change of momentum
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        self.velocity += impulse * self.inverse_mass;
    }

    /// Stop all movement
    pub fn stop(&mut self) {
        self.velocity = Vec3::zeros();
        self.angular_velocity = Vec3::zeros();
        self.force = Vec3::zeros();
    }
}

impl Component for RigidBodyComponent {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinematic_bodies_ignore_impulses() {
        let mut body = RigidBodyComponent::kinematic(Vec3::x());
        body.apply_impulse(Vec3::new(0.0, 10.0, 0.0));

        assert!(body.is_kinematic());
        assert_eq!(body.velocity, Vec3::x());
    }

    #[test]
    fn impulse_scales_by_inverse_mass() {
        let mut body = RigidBodyComponent::dynamic(2.0);
        body.apply_impulse(Vec3::new(4.0, 0.0, 0.0));

        assert_eq!(body.velocity, Vec3::new(2.0, 0.0, 0.0));
    }
}
