//! Collision geometry
//!
//! Volumes are stored in model space and transformed to world space only
//! while they are being tested.
//!
//! - [`primitives`] - Rays, bounding spheres, triangles
//! - [`volume`] - Convex bounding volumes, support functions and sphere estimates

pub mod primitives;
pub mod volume;

pub use primitives::{BoundingSphere, Ray, RayHit, Triangle};
pub use volume::{sphere_estimate, support, world_support, BoundingVolume};
