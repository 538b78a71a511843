//! Body integration
//!
//! Last stage of a step: velocities (already corrected by the solver) move
//! the transforms.

use crate::ecs::components::{RigidBodyComponent, TransformComponent};
use crate::ecs::{Entity, World};
use crate::foundation::math::{Quat, Vec3};

/// Advances bodies by one step
pub trait Integrator: Send {
    /// Integrate every rigid body for `dt` seconds under `gravity`
    fn integrate(&mut self, world: &mut World, gravity: Vec3, dt: f32);
}

/// Semi-implicit Euler: velocity first, then position from the new velocity
#[derive(Debug, Clone, Copy, Default)]
pub struct SemiImplicitEuler;

impl SemiImplicitEuler {
    /// Advance one body's velocities and return its displacement
    pub fn advance(body: &mut RigidBodyComponent, gravity: Vec3, dt: f32) -> (Vec3, Vec3) {
        if !body.is_kinematic() && body.inverse_mass > 0.0 {
            body.velocity += (gravity * body.gravity_scale + body.force * body.inverse_mass) * dt;
        }
        body.force = Vec3::zeros();

        if body.linear_damping > 0.0 {
            body.velocity *= (1.0 - body.linear_damping * dt).max(0.0);
        }
        if body.angular_damping > 0.0 {
            body.angular_velocity *= (1.0 - body.angular_damping * dt).max(0.0);
        }

        (body.velocity * dt, body.angular_velocity * dt)
    }
}

impl Integrator for SemiImplicitEuler {
    fn integrate(&mut self, world: &mut World, gravity: Vec3, dt: f32) {
        let moves: Vec<(Entity, Vec3, Vec3)> = world
            .query_mut::<RigidBodyComponent>()
            .into_iter()
            .map(|(entity, body)| {
                let (linear, angular) = Self::advance(body, gravity, dt);
                (entity, linear, angular)
            })
            .collect();

        for (entity, linear, angular) in moves {
            let Some(transform) = world.get_component_mut::<TransformComponent>(entity) else {
                continue;
            };
            transform.position += linear;
            if angular != Vec3::zeros() {
                transform.rotation = Quat::from_scaled_axis(angular) * transform.rotation;
            }
        }
    }
}
