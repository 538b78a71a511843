//! Broad-phase proxies
//!
//! A proxy is what the broad phase knows about a collider: who owns it, a
//! conservative world-space sphere, and how it classifies. Proxies are rebuilt
//! every step and never outlive it.

use crate::ecs::Entity;
use crate::foundation::math::Mat4;
use crate::physics::collision::{sphere_estimate, BoundingSphere, BoundingVolume};
use crate::physics::events::ClientObjectProperties;

/// Broad-phase view of one collider
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proxy {
    /// Owning entity
    pub entity: Entity,
    /// World-space sphere containing the collider
    pub estimate: BoundingSphere,
    /// Classification bits
    pub properties: ClientObjectProperties,
}

impl Proxy {
    /// Create a proxy from an already computed estimate
    pub fn new(entity: Entity, estimate: BoundingSphere, properties: ClientObjectProperties) -> Self {
        Self {
            entity,
            estimate,
            properties,
        }
    }

    /// Create a proxy for a volume placed by `matrix`
    pub fn from_volume(
        entity: Entity,
        volume: &BoundingVolume,
        matrix: &Mat4,
        properties: ClientObjectProperties,
    ) -> Self {
        Self::new(entity, sphere_estimate(volume, matrix), properties)
    }
}
