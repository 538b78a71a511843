//! Error types for the collision pipeline

use crate::config::ConfigError;
use crate::ecs::Entity;
use crate::foundation::math::Vec3;
use thiserror::Error;

/// Rejected collider data
///
/// Raised when colliders are attached or edited, never while stepping.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ColliderError {
    /// A transform scale component is zero
    #[error("collider scale {0:?} has a zero component")]
    ZeroScale(Vec3),

    /// Spheres only support uniform scale
    #[error("sphere collider requires uniform scale, got {0:?}")]
    NonUniformSphereScale(Vec3),

    /// Concave colliders may only live on static entities
    #[error("concave collider on {0:?} conflicts with a rigid body")]
    ConcaveOnDynamic(Entity),

    /// Colliders need a transform to be placed in the world
    #[error("{0:?} has no transform component")]
    MissingTransform(Entity),

    /// Editing a collider that was never attached
    #[error("{0:?} has no collider component")]
    MissingCollider(Entity),

    /// The entity handle is stale
    #[error("{0:?} is not alive")]
    DeadEntity(Entity),

    /// Convex hulls need at least one vertex
    #[error("convex hull has no vertices")]
    EmptyHull,

    /// Negative or non-finite size parameter
    #[error("invalid {name}: {value}")]
    InvalidDimension {
        /// Offending parameter
        name: &'static str,
        /// Its value
        value: f32,
    },

    /// Mesh index past the end of the vertex list
    #[error("mesh index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        /// Offending index
        index: u32,
        /// Number of vertices available
        vertex_count: usize,
    },
}

/// Expanding-polytope failure
///
/// Recovered by the narrow phase: the pair is reported without a contact for
/// the step.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum EpaError {
    /// GJK did not end with a full tetrahedron
    #[error("simplex has {0} points, EPA needs 4")]
    IncompleteSimplex(usize),

    /// Every polytope face was degenerate
    #[error("polytope has no valid face")]
    NoValidFace,

    /// The result contained NaN or infinity
    #[error("penetration result is not finite")]
    NonFinite,
}

/// Umbrella error for the collision pipeline
#[derive(Error, Debug)]
pub enum PhysicsError {
    /// Configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Collider rejected
    #[error("collider error: {0}")]
    Collider(#[from] ColliderError),

    /// Penetration query failed
    #[error("penetration query failed: {0}")]
    Epa(#[from] EpaError),

    /// The narrow-phase worker pool could not be built
    #[error("worker pool error: {0}")]
    WorkerPool(String),
}

/// Result alias for pipeline operations
pub type PhysicsResult<T> = Result<T, PhysicsError>;
