//! Static concave geometry
//!
//! Triangle meshes attached to static entities. The pipeline keeps one
//! world-space copy per mesh, updated from queued add/remove events rather
//! than rebuilt every step.

use std::collections::BTreeMap;

use crate::ecs::components::ConcaveColliderComponent;
use crate::ecs::world::StaticColliderEvent;
use crate::ecs::{Entity, World};
use crate::foundation::math::{max_axis_scale, translation, Mat4, Vec3};
use crate::physics::collision::{BoundingSphere, Triangle};

/// World-space copy of one static mesh
#[derive(Debug, Clone)]
pub struct StaticMesh {
    /// Owning entity
    pub entity: Entity,
    /// Model-to-world matrix the triangles were built with
    pub matrix: Mat4,
    /// Triangles in world space
    pub triangles: Vec<Triangle>,
    /// Per-triangle bounding spheres
    pub triangle_bounds: Vec<BoundingSphere>,
    /// Sphere containing the whole mesh
    pub bounds: BoundingSphere,
}

impl StaticMesh {
    /// Place model-space triangles with `matrix`
    pub fn new(entity: Entity, local_triangles: &[Triangle], matrix: Mat4) -> Self {
        let triangles: Vec<Triangle> = local_triangles
            .iter()
            .map(|triangle| triangle.transformed(&matrix))
            .collect();
        let triangle_bounds: Vec<BoundingSphere> =
            triangles.iter().map(Triangle::bounding_sphere).collect();

        let center = if triangles.is_empty() {
            translation(&matrix)
        } else {
            triangles.iter().map(Triangle::centroid).sum::<Vec3>() / triangles.len() as f32
        };
        let radius = triangles
            .iter()
            .flat_map(Triangle::vertices)
            .map(|vertex| (vertex - center).magnitude())
            .fold(0.0, f32::max);

        Self {
            entity,
            matrix,
            triangles,
            triangle_bounds,
            bounds: BoundingSphere::new(center, radius),
        }
    }

    /// Triangles whose bounding sphere overlaps `sphere`
    pub fn triangles_near<'a>(&'a self, sphere: &'a BoundingSphere) -> impl Iterator<Item = &'a Triangle> + 'a {
        self.triangles
            .iter()
            .zip(self.triangle_bounds.iter())
            .filter(move |(triangle, bounds)| bounds.intersects(sphere) && triangle.intersects_sphere(sphere))
            .map(|(triangle, _)| triangle)
    }
}

/// All static meshes known to the pipeline
#[derive(Debug, Clone, Default)]
pub struct StaticGeometry {
    meshes: BTreeMap<Entity, StaticMesh>,
}

impl StaticGeometry {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply queued add/remove events
    ///
    /// Added entities whose collider or transform has since disappeared are
    /// skipped.
    pub fn apply(&mut self, events: impl IntoIterator<Item = StaticColliderEvent>, world: &World) {
        for event in events {
            match event {
                StaticColliderEvent::Added(entity) => match Self::build(entity, world) {
                    Some(mesh) => {
                        log::debug!(
                            "Static mesh {entity:?} added with {} triangles",
                            mesh.triangles.len()
                        );
                        self.meshes.insert(entity, mesh);
                    }
                    None => log::warn!("Static mesh {entity:?} vanished before it was added"),
                },
                StaticColliderEvent::Removed(entity) => {
                    if self.meshes.remove(&entity).is_some() {
                        log::debug!("Static mesh {entity:?} removed");
                    }
                }
            }
        }
    }

    /// Rebuild meshes whose transform changed since they were placed
    pub fn sync_transforms(&mut self, world: &World) {
        for mesh in self.meshes.values_mut() {
            let Some(matrix) = world.world_matrix(mesh.entity) else {
                continue;
            };
            if matrix != mesh.matrix {
                if let Some(rebuilt) = Self::build(mesh.entity, world) {
                    *mesh = rebuilt;
                }
            }
        }
    }

    /// Mesh of an entity
    pub fn mesh(&self, entity: Entity) -> Option<&StaticMesh> {
        self.meshes.get(&entity)
    }

    /// Meshes whose bounds overlap `sphere`
    pub fn overlapping<'a>(&'a self, sphere: &'a BoundingSphere) -> impl Iterator<Item = &'a StaticMesh> + 'a {
        self.meshes
            .values()
            .filter(move |mesh| mesh.bounds.intersects(sphere))
    }

    /// Number of meshes
    pub fn len(&self) -> usize {
        self.meshes.len()
    }

    /// Whether there are no meshes
    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }

    /// Drop every mesh
    pub fn clear(&mut self) {
        self.meshes.clear();
    }

    fn build(entity: Entity, world: &World) -> Option<StaticMesh> {
        let collider = world.get_component::<ConcaveColliderComponent>(entity)?;
        let matrix = world.world_matrix(entity)?;
        debug_assert!(max_axis_scale(&matrix) > 0.0);
        Some(StaticMesh::new(entity, &collider.triangles, matrix))
    }
}
