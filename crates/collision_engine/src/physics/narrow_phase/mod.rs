//! Narrow phase
//!
//! Exact tests for the candidate pairs the broad phase produced. Workers read
//! an immutable [`SceneSnapshot`] and return their results; nothing shared is
//! mutated until the manifold cache merges them.
//!
//! - [`simplex`] - support points and the GJK simplex
//! - [`support`] - support mappings for placed volumes and triangles
//! - [`gjk`] - intersection test
//! - [`epa`] - penetration normal, depth and witness points

pub mod epa;
pub mod gjk;
pub mod simplex;
pub mod support;

pub use epa::{epa, Penetration, EPA_MAX_ITERATIONS, EPA_TOLERANCE};
pub use gjk::{gjk, GjkState, GJK_MAX_ITERATIONS};
pub use simplex::{Simplex, SupportPoint};
pub use support::{SupportMap, Transformed};

use std::collections::HashMap;

use rayon::prelude::*;
use rayon::ThreadPool;

use crate::ecs::components::{ColliderComponent, RigidBodyComponent};
use crate::ecs::{Entity, World};
use crate::foundation::math::{inverse_transform_point, normalize_or, Mat4, Vec3};
use crate::physics::broad_phase::{BroadPhasePairs, CandidatePair, Proxy};
use crate::physics::collision::{sphere_estimate, BoundingSphere, BoundingVolume, Triangle};
use crate::physics::error::EpaError;
use crate::physics::events::{ClientObjectProperties, CollisionEventType};
use crate::physics::static_geometry::{StaticGeometry, StaticMesh};

/// One contact point between two bodies
///
/// The accumulators carry the solver's impulses from one step to the next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Point on A, world space
    pub world_point_a: Vec3,
    /// Point on B, world space
    pub world_point_b: Vec3,
    /// Point on A in A's local space
    pub local_point_a: Vec3,
    /// Point on B in B's local space
    pub local_point_b: Vec3,
    /// Unit normal from A toward B
    pub normal: Vec3,
    /// Penetration depth along the normal
    pub depth: f32,
    /// Accumulated normal impulse
    pub lambda: f32,
    /// Accumulated impulse along the first tangent
    pub mu_tangent: f32,
    /// Accumulated impulse along the second tangent
    pub mu_bitangent: f32,
}

impl Contact {
    /// Contact from a penetration with fresh accumulators
    pub fn from_penetration(penetration: &Penetration, local_point_a: Vec3, local_point_b: Vec3) -> Self {
        Self {
            world_point_a: penetration.world_point_a,
            world_point_b: penetration.world_point_b,
            local_point_a,
            local_point_b,
            normal: penetration.normal,
            depth: penetration.depth,
            lambda: 0.0,
            mu_tangent: 0.0,
            mu_bitangent: 0.0,
        }
    }

    /// The same contact seen from B
    pub fn flipped(&self) -> Self {
        Self {
            world_point_a: self.world_point_b,
            world_point_b: self.world_point_a,
            local_point_a: self.local_point_b,
            local_point_b: self.local_point_a,
            normal: -self.normal,
            ..*self
        }
    }
}

/// Outcome of one narrow-phase test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NarrowPhysicsResult {
    /// First entity
    pub entity_a: Entity,
    /// Second entity
    pub entity_b: Entity,
    /// Classification for `(entity_a, entity_b)`
    pub event_type: CollisionEventType,
    /// Contact for physics pairs; `None` for triggers and failed penetration queries
    pub contact: Option<Contact>,
}

/// A collider as seen by the narrow phase during one step
#[derive(Debug, Clone)]
pub struct ColliderSnapshot {
    /// Owning entity
    pub entity: Entity,
    /// Model-space volume
    pub volume: BoundingVolume,
    /// Model-to-world matrix
    pub matrix: Mat4,
    /// Classification bits
    pub properties: ClientObjectProperties,
    /// Conservative world-space sphere
    pub estimate: BoundingSphere,
}

impl ColliderSnapshot {
    fn placed(&self) -> Transformed<'_> {
        Transformed::new(&self.volume, self.matrix)
    }
}

/// Immutable view of every convex collider for one step
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    colliders: Vec<ColliderSnapshot>,
    index: HashMap<Entity, usize>,
}

impl SceneSnapshot {
    /// Capture every collider that has a transform
    pub fn capture(world: &World) -> Self {
        let mut snapshot = Self::default();
        for (entity, collider) in world.query::<ColliderComponent>() {
            let Some(matrix) = world.world_matrix(entity) else {
                log::trace!("Skipping collider on {entity:?} without a transform");
                continue;
            };
            let body = world.get_component::<RigidBodyComponent>(entity);

            snapshot.push(ColliderSnapshot {
                entity,
                estimate: sphere_estimate(&collider.volume, &matrix),
                volume: collider.volume.clone(),
                matrix,
                properties: ClientObjectProperties::from_components(collider, body),
            });
        }
        snapshot
    }

    /// Add a collider
    pub fn push(&mut self, collider: ColliderSnapshot) {
        self.index.insert(collider.entity, self.colliders.len());
        self.colliders.push(collider);
    }

    /// Collider of an entity
    pub fn get(&self, entity: Entity) -> Option<&ColliderSnapshot> {
        self.index.get(&entity).map(|i| &self.colliders[*i])
    }

    /// All colliders
    pub fn colliders(&self) -> &[ColliderSnapshot] {
        &self.colliders
    }

    /// Number of colliders
    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    /// Whether the snapshot holds no collider
    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Broad-phase proxies for every collider
    pub fn proxies(&self) -> Vec<Proxy> {
        self.colliders
            .iter()
            .map(|c| Proxy::new(c.entity, c.estimate, c.properties))
            .collect()
    }
}

/// One unit of narrow-phase work
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NarrowTask {
    /// Two convex colliders
    Convex(CandidatePair),
    /// A convex collider against the triangles of a static mesh
    StaticMesh {
        /// Convex collider owner
        body: Entity,
        /// Static mesh owner
        mesh: Entity,
        /// Classification for `(body, mesh)`
        event_type: CollisionEventType,
    },
}

/// Build the task list for a step
///
/// Convex pairs come from the broad phase; every convex collider whose estimate
/// reaches a static mesh adds one mesh task.
pub fn collect_tasks(pairs: &BroadPhasePairs, snapshot: &SceneSnapshot, statics: &StaticGeometry) -> Vec<NarrowTask> {
    let mut tasks: Vec<NarrowTask> = pairs.iter().copied().map(NarrowTask::Convex).collect();

    for collider in snapshot.colliders() {
        for mesh in statics.overlapping(&collider.estimate) {
            if mesh.entity == collider.entity {
                continue;
            }
            let event_type = collider
                .properties
                .event_type(ClientObjectProperties::static_geometry());
            if event_type != CollisionEventType::None {
                tasks.push(NarrowTask::StaticMesh {
                    body: collider.entity,
                    mesh: mesh.entity,
                    event_type,
                });
            }
        }
    }

    tasks
}

/// Evaluate tasks on the worker pool
///
/// Each chunk of tasks fills a private result list; the lists are concatenated
/// once every worker is done.
pub fn run_narrow_phase(
    pool: &ThreadPool,
    tasks: &[NarrowTask],
    snapshot: &SceneSnapshot,
    statics: &StaticGeometry,
) -> Vec<NarrowPhysicsResult> {
    if tasks.is_empty() {
        return Vec::new();
    }

    let chunk_size = tasks.len().div_ceil(pool.current_num_threads().max(1) * 4).max(1);
    let per_worker: Vec<Vec<NarrowPhysicsResult>> = pool.install(|| {
        tasks
            .par_chunks(chunk_size)
            .map(|chunk| {
                let mut results = Vec::new();
                for task in chunk {
                    evaluate_task(task, snapshot, statics, &mut results);
                }
                results
            })
            .collect()
    });

    per_worker.into_iter().flatten().collect()
}

/// Evaluate one task, appending its results
pub fn evaluate_task(
    task: &NarrowTask,
    snapshot: &SceneSnapshot,
    statics: &StaticGeometry,
    results: &mut Vec<NarrowPhysicsResult>,
) {
    match *task {
        NarrowTask::Convex(pair) => {
            let (Some(a), Some(b)) = (snapshot.get(pair.first), snapshot.get(pair.second)) else {
                return;
            };
            if let Some(result) = evaluate_pair(a, b, pair.event_type) {
                results.push(result);
            }
        }
        NarrowTask::StaticMesh {
            body,
            mesh,
            event_type,
        } => {
            let (Some(collider), Some(mesh)) = (snapshot.get(body), statics.mesh(mesh)) else {
                return;
            };
            evaluate_mesh(collider, mesh, event_type, results);
        }
    }
}

/// Test two convex colliders
///
/// Trigger pairs only run GJK. Physics pairs of two spheres use the exact
/// sphere test; everything else goes through GJK and EPA.
pub fn evaluate_pair(
    a: &ColliderSnapshot,
    b: &ColliderSnapshot,
    event_type: CollisionEventType,
) -> Option<NarrowPhysicsResult> {
    let result = |contact| NarrowPhysicsResult {
        entity_a: a.entity,
        entity_b: b.entity,
        event_type,
        contact,
    };

    if let (BoundingVolume::Sphere { .. }, BoundingVolume::Sphere { .. }) = (&a.volume, &b.volume) {
        let penetration = sphere_penetration(&a.estimate, &b.estimate)?;
        let contact = event_type.is_physics().then(|| {
            Contact::from_penetration(
                &penetration,
                a.placed().to_local(&penetration.world_point_a),
                b.placed().to_local(&penetration.world_point_b),
            )
        });
        return Some(result(contact));
    }

    let (placed_a, placed_b) = (a.placed(), b.placed());
    let mut state = GjkState::new();
    if !gjk(&placed_a, &placed_b, &mut state) {
        return None;
    }

    if event_type.is_trigger() {
        return Some(result(None));
    }

    match epa(&placed_a, &placed_b, &state) {
        Ok(penetration) => Some(result(Some(Contact::from_penetration(
            &penetration,
            placed_a.to_local(&penetration.world_point_a),
            placed_b.to_local(&penetration.world_point_b),
        )))),
        Err(error) => {
            log::warn!("EPA failed for {:?} vs {:?}: {error}", a.entity, b.entity);
            Some(result(None))
        }
    }
}

fn evaluate_mesh(
    collider: &ColliderSnapshot,
    mesh: &StaticMesh,
    event_type: CollisionEventType,
    results: &mut Vec<NarrowPhysicsResult>,
) {
    let result = |contact| NarrowPhysicsResult {
        entity_a: collider.entity,
        entity_b: mesh.entity,
        event_type,
        contact,
    };

    let mut touched = false;
    for triangle in mesh.triangles_near(&collider.estimate) {
        match penetrate_triangle(&collider.volume, &collider.matrix, triangle) {
            None => {}
            Some(_) if event_type.is_trigger() => {
                results.push(result(None));
                return;
            }
            Some(Ok(penetration)) => {
                touched = true;
                let local_a = collider.placed().to_local(&penetration.world_point_a);
                let local_b = inverse_transform_point(&mesh.matrix, &penetration.world_point_b)
                    .unwrap_or(penetration.world_point_b);
                results.push(result(Some(Contact::from_penetration(&penetration, local_a, local_b))));
            }
            Some(Err(error)) => {
                log::warn!(
                    "EPA failed for {:?} vs static mesh {:?}: {error}",
                    collider.entity,
                    mesh.entity
                );
                if !touched {
                    touched = true;
                    results.push(result(None));
                }
            }
        }
    }
}

/// Penetration of a placed volume into a world-space triangle
///
/// `None` when they do not overlap.
pub fn penetrate_triangle(
    volume: &BoundingVolume,
    matrix: &Mat4,
    triangle: &Triangle,
) -> Option<Result<Penetration, EpaError>> {
    let placed = Transformed::new(volume, *matrix);
    let mut state = GjkState::new();
    gjk(&placed, triangle, &mut state).then(|| epa(&placed, triangle, &state))
}

/// Exact sphere overlap: centers closer than the sum of the radii
pub fn intersect(a: &BoundingSphere, b: &BoundingSphere) -> bool {
    a.intersects(b)
}

/// Penetration of two overlapping spheres
pub fn sphere_penetration(a: &BoundingSphere, b: &BoundingSphere) -> Option<Penetration> {
    if !intersect(a, b) {
        return None;
    }

    let offset = b.center - a.center;
    let distance = offset.magnitude();
    let normal = normalize_or(&offset, Vec3::x());
    Some(Penetration {
        normal,
        depth: a.radius + b.radius - distance,
        world_point_a: a.center + normal * a.radius,
        world_point_b: b.center - normal * b.radius,
        iterations: 0,
    })
}
