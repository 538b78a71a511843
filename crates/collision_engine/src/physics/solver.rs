//! Contact solver
//!
//! The pipeline hands every active manifold to a [`ConstraintSolver`] after
//! notifications went out. The solver changes body velocities and reports the
//! impulses it accumulated so the next step can warm start from them.

use std::collections::HashMap;

use crate::ecs::components::RigidBodyComponent;
use crate::ecs::{Entity, World};
use crate::foundation::math::{tangent_basis, Vec3};
use crate::physics::events::CollisionEventType;
use crate::physics::manifold::{ContactImpulse, ManifoldCache};

/// Resolves contacts by changing body velocities
pub trait ConstraintSolver: Send {
    /// Solve every manifold for one step of length `dt`
    fn solve(&mut self, world: &mut World, manifolds: &ManifoldCache, dt: f32) -> Vec<ContactImpulse>;
}

/// Fraction of the penetration corrected per step
const BAUMGARTE: f32 = 0.2;

/// Penetration tolerated without correction
const PENETRATION_SLOP: f32 = 0.005;

#[derive(Debug, Clone, Copy)]
struct BodyState {
    entity: Entity,
    velocity: Vec3,
    inverse_mass: f32,
}

#[derive(Debug, Clone, Copy)]
struct ContactConstraint {
    impulse: ContactImpulse,
    first: Option<usize>,
    second: Option<usize>,
    normal: Vec3,
    tangent: Vec3,
    bitangent: Vec3,
    effective_mass: f32,
    bias: f32,
}

/// Sequential impulses on linear velocity with Coulomb friction
///
/// Bodies are treated as point masses; contact offsets do not produce torque.
#[derive(Debug, Clone)]
pub struct SequentialImpulseSolver {
    /// Velocity iterations per step
    pub iterations: u32,
    /// Friction coefficient
    pub friction: f32,
}

impl SequentialImpulseSolver {
    /// Create a solver
    pub fn new(iterations: u32, friction: f32) -> Self {
        Self {
            iterations,
            friction: friction.max(0.0),
        }
    }
}

impl Default for SequentialImpulseSolver {
    fn default() -> Self {
        Self::new(8, 0.5)
    }
}

impl ConstraintSolver for SequentialImpulseSolver {
    fn solve(&mut self, world: &mut World, manifolds: &ManifoldCache, dt: f32) -> Vec<ContactImpulse> {
        if dt <= 0.0 {
            return Vec::new();
        }

        let mut bodies: Vec<BodyState> = Vec::new();
        let mut slots: HashMap<Entity, usize> = HashMap::new();
        let mut slot_of = |entity: Entity, moves: bool, world: &World| -> Option<usize> {
            let body = world.get_component::<RigidBodyComponent>(entity)?;
            if let Some(slot) = slots.get(&entity) {
                return Some(*slot);
            }
            slots.insert(entity, bodies.len());
            bodies.push(BodyState {
                entity,
                velocity: body.velocity,
                inverse_mass: if moves { body.inverse_mass } else { 0.0 },
            });
            Some(bodies.len() - 1)
        };

        let mut constraints: Vec<ContactConstraint> = Vec::new();
        for manifold in manifolds.manifolds() {
            let pair = manifold.pair();
            let (moves_first, moves_second) = match manifold.event_type {
                CollisionEventType::TwoBodyPhysics => (true, true),
                CollisionEventType::FirstBodyPhysics => (true, false),
                CollisionEventType::SecondBodyPhysics => (false, true),
                _ => continue,
            };
            let first = slot_of(pair.first, moves_first, &*world);
            let second = slot_of(pair.second, moves_second, &*world);

            for (index, contact) in manifold.contacts().iter().enumerate() {
                let (tangent, bitangent) = tangent_basis(&contact.normal);
                constraints.push(ContactConstraint {
                    impulse: ContactImpulse {
                        pair,
                        contact: index,
                        lambda: contact.lambda,
                        mu_tangent: contact.mu_tangent,
                        mu_bitangent: contact.mu_bitangent,
                    },
                    first,
                    second,
                    normal: contact.normal,
                    tangent,
                    bitangent,
                    effective_mass: 0.0,
                    bias: BAUMGARTE / dt * (contact.depth - PENETRATION_SLOP).max(0.0),
                });
            }
        }

        for constraint in &mut constraints {
            let inverse_mass_sum = inverse_mass(&bodies, constraint.first) + inverse_mass(&bodies, constraint.second);
            constraint.effective_mass = if inverse_mass_sum > 0.0 {
                1.0 / inverse_mass_sum
            } else {
                0.0
            };

            // Warm start
            let impulse = constraint.normal * constraint.impulse.lambda
                + constraint.tangent * constraint.impulse.mu_tangent
                + constraint.bitangent * constraint.impulse.mu_bitangent;
            apply(&mut bodies, constraint.first, constraint.second, &impulse);
        }

        for _ in 0..self.iterations {
            for constraint in &mut constraints {
                if constraint.effective_mass == 0.0 {
                    continue;
                }

                let (first, second) = (constraint.first, constraint.second);
                let effective_mass = constraint.effective_mass;

                let relative = relative_velocity(&bodies, first, second);
                let delta = (constraint.bias - relative.dot(&constraint.normal)) * effective_mass;
                let total = (constraint.impulse.lambda + delta).max(0.0);
                let applied = total - constraint.impulse.lambda;
                constraint.impulse.lambda = total;
                apply(&mut bodies, first, second, &(constraint.normal * applied));

                let limit = self.friction * constraint.impulse.lambda;
                for (axis, accumulated) in [
                    (constraint.tangent, &mut constraint.impulse.mu_tangent),
                    (constraint.bitangent, &mut constraint.impulse.mu_bitangent),
                ] {
                    let relative = relative_velocity(&bodies, first, second);
                    let delta = -relative.dot(&axis) * effective_mass;
                    let total = (*accumulated + delta).clamp(-limit, limit);
                    let applied = total - *accumulated;
                    *accumulated = total;
                    apply(&mut bodies, first, second, &(axis * applied));
                }
            }
        }

        for body in &bodies {
            if body.inverse_mass == 0.0 {
                continue;
            }
            if let Some(component) = world.get_component_mut::<RigidBodyComponent>(body.entity) {
                component.velocity = body.velocity;
            }
        }

        log::trace!("Solved {} contacts over {} bodies", constraints.len(), bodies.len());
        constraints.into_iter().map(|constraint| constraint.impulse).collect()
    }
}

fn inverse_mass(bodies: &[BodyState], slot: Option<usize>) -> f32 {
    slot.map_or(0.0, |slot| bodies[slot].inverse_mass)
}

/// Velocity of the second body relative to the first
fn relative_velocity(bodies: &[BodyState], first: Option<usize>, second: Option<usize>) -> Vec3 {
    let velocity = |slot: Option<usize>| slot.map_or_else(Vec3::zeros, |slot| bodies[slot].velocity);
    velocity(second) - velocity(first)
}

/// Push the bodies apart along `impulse` (directed from first to second)
fn apply(bodies: &mut [BodyState], first: Option<usize>, second: Option<usize>, impulse: &Vec3) {
    if let Some(slot) = first {
        let body = &mut bodies[slot];
        body.velocity -= impulse * body.inverse_mass;
    }
    if let Some(slot) = second {
        let body = &mut bodies[slot];
        body.velocity += impulse * body.inverse_mass;
    }
}
