//! Physics module for collision detection and response
//!
//! A fixed-step pipeline: a sort-and-sweep broad phase over sphere estimates,
//! GJK/EPA on a worker pool, persistent contact manifolds with enter/stay/exit
//! notifications, and a small contact solver and integrator.
//!
//! - [`collision`] - volumes, spheres, rays, triangles
//! - [`events`] - pair classification
//! - [`broad_phase`] - proxies, radix sort, single-axis sweep
//! - [`narrow_phase`] - GJK, EPA, parallel task evaluation
//! - [`manifold`] - persistent contacts and notification state
//! - [`static_geometry`] - world-space copies of static triangle meshes
//! - [`solver`] / [`integrator`] - contact resolution and body motion
//! - [`joints`] - anchor pairs between entities
//! - [`pipeline`] - the orchestrator tying it together

pub mod broad_phase;
pub mod collision;
pub mod error;
pub mod events;
pub mod integrator;
pub mod joints;
pub mod manifold;
pub mod narrow_phase;
pub mod pipeline;
pub mod solver;
pub mod static_geometry;

#[cfg(test)]
mod tests;

pub use collision::{BoundingSphere, BoundingVolume, Ray, RayHit, Triangle};
pub use error::{ColliderError, EpaError, PhysicsError, PhysicsResult};
pub use events::{ClientObjectProperties, CollisionEventType};
pub use joints::{Joint, JointKey};
pub use manifold::{ContactImpulse, EntityPair, Manifold, ManifoldCache, NotificationCounts};
pub use narrow_phase::{Contact, NarrowPhysicsResult};
pub use pipeline::{FrameReport, PhysicsPipeline, StepReport};
pub use solver::{ConstraintSolver, SequentialImpulseSolver};
pub use integrator::{Integrator, SemiImplicitEuler};
