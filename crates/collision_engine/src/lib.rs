//! # Collision Engine
//!
//! Real-time rigid-body collision pipeline for an entity-component world.
//!
//! ## Features
//!
//! - **Broad Phase**: Single-axis sort and sweep over sphere estimates with a
//!   coherence-aware radix sort
//! - **Narrow Phase**: GJK intersection and EPA penetration on a rayon worker pool
//! - **Manifolds**: Up to four persistent contacts per pair with warm-start impulses
//! - **Notifications**: Enter/stay/exit callbacks for collisions and triggers
//! - **Static Geometry**: Triangle meshes for static level collision
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use collision_engine::prelude::*;
//!
//! fn main() -> Result<(), PhysicsError> {
//!     let mut world = World::new();
//!     let ball = world.create_entity();
//!     world.add_component(ball, TransformComponent::from_position(Vec3::new(0.0, 5.0, 0.0)));
//!     world.attach_collider(ball, ColliderComponent::new(BoundingVolume::sphere(Vec3::zeros(), 0.5)))?;
//!     world.attach_rigid_body(ball, RigidBodyComponent::dynamic(1.0))?;
//!
//!     let mut pipeline = PhysicsPipeline::new(PhysicsConfig::with_fixed_step(1.0 / 60.0))?;
//!     let report = pipeline.update(&mut world, 1.0 / 30.0);
//!     println!("ran {} steps", report.steps);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod ecs;
pub mod foundation;
pub mod physics;

pub use physics::error::{PhysicsError, PhysicsResult};

/// Common imports for pipeline users
pub mod prelude {
    pub use crate::{
        config::Config,
        core::config::{PhysicsConfig, SweepAxis},
        ecs::components::{
            ColliderComponent, CollisionListener, CollisionLogicComponent, CollisionNotification,
            ConcaveColliderComponent, RigidBodyComponent, TransformComponent,
        },
        ecs::{Component, Entity, World},
        foundation::math::{Mat4, Quat, Transform, Vec3},
        physics::{
            BoundingVolume, ColliderError, FrameReport, Joint, PhysicsError, PhysicsPipeline, Ray,
            RayHit, Triangle,
        },
    };
}
