//! Collision pipeline orchestrator
//!
//! Owns every cache that lives across steps (broad-phase proxies, contact
//! manifolds, static geometry, joints) and runs the fixed-step loop:
//!
//! 1. apply queued static geometry changes
//! 2. snapshot colliders and rebuild proxies
//! 3. broad phase
//! 4. narrow phase on the worker pool
//! 5. merge results, refresh manifolds, send notifications
//! 6. solve contacts and keep the impulses for warm starting
//! 7. integrate bodies

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::core::config::PhysicsConfig;
use crate::ecs::components::ConcaveColliderComponent;
use crate::ecs::world::StaticColliderEvent;
use crate::ecs::{Entity, World};
use crate::foundation::time::{FixedTimestep, Stopwatch};
use crate::physics::broad_phase::{BroadPhase, SingleAxisPrune};
use crate::physics::collision::{Ray, RayHit};
use crate::physics::error::{PhysicsError, PhysicsResult};
use crate::physics::integrator::{Integrator, SemiImplicitEuler};
use crate::physics::joints::{Joint, JointKey, JointSet};
use crate::physics::manifold::{ManifoldCache, NotificationCounts};
use crate::physics::narrow_phase::{collect_tasks, run_narrow_phase, SceneSnapshot};
use crate::physics::solver::{ConstraintSolver, SequentialImpulseSolver};
use crate::physics::static_geometry::StaticGeometry;

/// What one step did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepReport {
    /// Colliders taking part
    pub colliders: usize,
    /// Candidate pairs from the broad phase
    pub candidate_pairs: usize,
    /// Narrow-phase tasks, including convex-vs-mesh tasks
    pub narrow_tasks: usize,
    /// Narrow-phase results merged
    pub narrow_results: usize,
    /// Manifolds alive after notification
    pub manifolds: usize,
    /// Trigger overlaps alive after notification
    pub triggers: usize,
    /// Notifications sent
    pub notifications: NotificationCounts,
}

/// What one [`PhysicsPipeline::update`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Fixed steps run
    pub steps: u32,
    /// Whether the per-frame step cap left time banked
    pub capped: bool,
    /// Notifications sent over all steps
    pub notifications: NotificationCounts,
    /// Report of the last step, if any ran
    pub last_step: Option<StepReport>,
}

/// Fixed-step collision and contact pipeline
///
/// The broad phase, solver and integrator are type parameters so they can be
/// swapped without touching the orchestration.
pub struct PhysicsPipeline<B = SingleAxisPrune, S = SequentialImpulseSolver, I = SemiImplicitEuler>
where
    B: BroadPhase,
    S: ConstraintSolver,
    I: Integrator,
{
    config: PhysicsConfig,
    pool: ThreadPool,
    timestep: FixedTimestep,
    broad_phase: B,
    solver: S,
    integrator: I,
    manifolds: ManifoldCache,
    statics: StaticGeometry,
    pending_static: Vec<StaticColliderEvent>,
    joints: JointSet,
    total_steps: u64,
}

impl PhysicsPipeline {
    /// Pipeline with the default broad phase, solver and integrator
    pub fn new(config: PhysicsConfig) -> PhysicsResult<Self> {
        let broad_phase = SingleAxisPrune::new(config.sweep_axis);
        let solver = SequentialImpulseSolver::new(config.solver_iterations, config.friction);
        Self::with_parts(config, broad_phase, solver, SemiImplicitEuler)
    }
}

impl<B, S, I> PhysicsPipeline<B, S, I>
where
    B: BroadPhase,
    S: ConstraintSolver,
    I: Integrator,
{
    /// Pipeline with explicit stages
    pub fn with_parts(config: PhysicsConfig, broad_phase: B, solver: S, integrator: I) -> PhysicsResult<Self> {
        config.validate()?;

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|index| format!("narrow-phase-{index}"))
            .build()
            .map_err(|error| PhysicsError::WorkerPool(error.to_string()))?;

        log::info!(
            "Physics pipeline ready: step {:.4}s, up to {} steps per frame, {} narrow-phase workers",
            config.fixed_step,
            config.max_physics_iterations,
            pool.current_num_threads()
        );

        Ok(Self {
            timestep: FixedTimestep::new(config.fixed_step, config.max_physics_iterations),
            manifolds: ManifoldCache::new(config.break_distance),
            config,
            pool,
            broad_phase,
            solver,
            integrator,
            statics: StaticGeometry::new(),
            pending_static: Vec::new(),
            joints: JointSet::new(),
            total_steps: 0,
        })
    }

    /// Advance the simulation by `delta_time` seconds of frame time
    ///
    /// Runs whole fixed steps while enough time is banked, up to the per-frame
    /// cap. Leftover time carries into the next frame.
    pub fn update(&mut self, world: &mut World, delta_time: f32) -> FrameReport {
        let mut report = FrameReport::default();
        self.timestep.accumulate(delta_time);

        while self.timestep.next_step() {
            let step = self.step(world);
            report.steps += 1;
            report.notifications += step.notifications;
            report.last_step = Some(step);
        }

        if self.timestep.capped() {
            report.capped = true;
            log::warn!(
                "Physics fell behind: {} steps run, {:.4}s still banked",
                report.steps,
                self.timestep.accumulator()
            );
        }

        report
    }

    /// Run exactly one fixed step
    pub fn step(&mut self, world: &mut World) -> StepReport {
        let dt = self.config.fixed_step;
        let stopwatch = Stopwatch::start_new();
        self.total_steps += 1;

        // Step 1: Static geometry changes queued since the last step
        self.pending_static.extend(world.drain_static_collider_events());
        self.statics.apply(self.pending_static.drain(..), world);
        self.statics.sync_transforms(world);

        let pruned = self.joints.prune(world);
        if pruned > 0 {
            log::debug!("Dropped {pruned} joints of destroyed entities");
        }

        // Step 2: Immutable view of every collider for this step
        let snapshot = SceneSnapshot::capture(world);

        // Step 3: Broad phase
        self.broad_phase.update(snapshot.proxies());
        let pairs = self.broad_phase.find_pairs();

        // Step 4: Narrow phase on the worker pool
        let tasks = collect_tasks(&pairs, &snapshot, &self.statics);
        let results = run_narrow_phase(&self.pool, &tasks, &snapshot, &self.statics);
        let narrow_results = results.len();

        // Step 5: Single-writer merge, then notifications
        self.manifolds.merge_contacts(results);
        self.manifolds.update_manifolds(world);
        let notifications = self.manifolds.notify_events(world);

        // Step 6: Contact resolution
        let impulses = self.solver.solve(world, &self.manifolds, dt);
        self.manifolds.cache_impulses(&impulses);

        // Step 7: Move bodies
        self.integrator.integrate(world, self.config.gravity, dt);

        let report = StepReport {
            colliders: snapshot.len(),
            candidate_pairs: pairs.len(),
            narrow_tasks: tasks.len(),
            narrow_results,
            manifolds: self.manifolds.manifold_count(),
            triggers: self.manifolds.trigger_count(),
            notifications,
        };
        log::debug!(
            "Physics step {} took {:.3}ms: {report:?}",
            self.total_steps,
            stopwatch.elapsed_millis()
        );
        report
    }

    /// Forget all cached state without sending notifications
    ///
    /// Static geometry is dropped too; call
    /// [`PhysicsPipeline::resync_static_geometry`] to pick it up again.
    pub fn clear(&mut self) {
        self.manifolds.clear();
        self.broad_phase.clear();
        self.timestep.reset();
        self.statics.clear();
        self.pending_static.clear();
        log::info!("Physics pipeline cleared");
    }

    /// Queue every concave collider in `world` to be added at the next step
    pub fn resync_static_geometry(&mut self, world: &World) {
        self.pending_static.extend(
            world
                .query::<ConcaveColliderComponent>()
                .into_iter()
                .map(|(entity, _)| StaticColliderEvent::Added(entity)),
        );
    }

    /// Queue a static mesh to be added at the next step
    pub fn static_collider_added(&mut self, entity: Entity) {
        self.pending_static.push(StaticColliderEvent::Added(entity));
    }

    /// Queue a static mesh to be removed at the next step
    pub fn static_collider_removed(&mut self, entity: Entity) {
        self.pending_static.push(StaticColliderEvent::Removed(entity));
    }

    /// Colliders hit by `ray`, closest first
    ///
    /// Tests the sphere estimates from the last step.
    pub fn raycast(&self, ray: &Ray) -> Vec<RayHit> {
        let mut hits: Vec<RayHit> = self
            .broad_phase
            .proxies()
            .iter()
            .filter_map(|proxy| {
                proxy
                    .estimate
                    .intersect_ray(ray)
                    .map(|(distance, point, normal)| RayHit {
                        entity: proxy.entity,
                        distance,
                        point,
                        normal,
                    })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Store a joint
    pub fn add_joint(&mut self, joint: Joint) -> JointKey {
        self.joints.add_joint(joint)
    }

    /// Remove a joint
    pub fn remove_joint(&mut self, key: JointKey) -> Option<Joint> {
        self.joints.remove_joint(key)
    }

    /// Remove every joint attached to `entity`
    pub fn remove_all_joints(&mut self, entity: Entity) -> usize {
        self.joints.remove_all_joints(entity)
    }

    /// Stored joints
    pub fn joints(&self) -> &JointSet {
        &self.joints
    }

    /// Contact manifolds and trigger overlaps
    pub fn manifolds(&self) -> &ManifoldCache {
        &self.manifolds
    }

    /// Static meshes currently placed
    pub fn static_geometry(&self) -> &StaticGeometry {
        &self.statics
    }

    /// Broad-phase stage
    pub fn broad_phase(&self) -> &B {
        &self.broad_phase
    }

    /// Active configuration
    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Time banked toward the next step
    pub fn accumulator(&self) -> f32 {
        self.timestep.accumulator()
    }

    /// Steps run since creation
    pub fn total_steps(&self) -> u64 {
        self.total_steps
    }

    /// Narrow-phase worker count
    pub fn worker_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::ecs::components::{ColliderComponent, TransformComponent};
    use crate::foundation::math::Vec3;
    use crate::physics::collision::BoundingVolume;

    fn sphere_at(world: &mut World, position: Vec3) -> Entity {
        let entity = world.create_entity();
        world.add_component(entity, TransformComponent::from_position(position));
        world
            .attach_collider(entity, ColliderComponent::new(BoundingVolume::sphere(Vec3::zeros(), 1.0)))
            .unwrap();
        entity
    }

    #[test]
    fn rejects_invalid_configuration() {
        let result = PhysicsPipeline::new(PhysicsConfig::with_fixed_step(0.0));

        assert!(matches!(
            result,
            Err(PhysicsError::Config(ConfigError::Invalid { field: "fixed_step", .. }))
        ));
    }

    #[test]
    fn worker_count_follows_configuration() {
        let pipeline = PhysicsPipeline::new(PhysicsConfig::default().with_worker_threads(2)).unwrap();

        assert_eq!(pipeline.worker_threads(), 2);
    }

    #[test]
    fn raycast_returns_closest_first() {
        let mut world = World::new();
        let far = sphere_at(&mut world, Vec3::new(0.0, 0.0, -10.0));
        let near = sphere_at(&mut world, Vec3::new(0.0, 0.0, -4.0));
        sphere_at(&mut world, Vec3::new(5.0, 0.0, -4.0));
        let mut pipeline = PhysicsPipeline::new(PhysicsConfig::default()).unwrap();
        pipeline.step(&mut world);

        let hits = pipeline.raycast(&Ray::new(Vec3::zeros(), -Vec3::z()));

        assert_eq!(hits.iter().map(|hit| hit.entity).collect::<Vec<_>>(), vec![near, far]);
        assert!((hits[0].distance - 3.0).abs() < 1.0e-4);
    }

    #[test]
    fn manually_queued_static_mesh_is_applied_next_step() {
        use crate::physics::collision::Triangle;
        use std::sync::Arc;

        let mut world = World::new();
        let floor = world.create_entity();
        world.add_component(floor, TransformComponent::identity());
        world.add_component(
            floor,
            ConcaveColliderComponent::new(Arc::from(vec![Triangle::new(
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(0.0, 0.0, 1.0),
                Vec3::new(1.0, 0.0, -1.0),
            )])),
        );
        let mut pipeline = PhysicsPipeline::new(PhysicsConfig::default()).unwrap();

        pipeline.step(&mut world);
        assert!(pipeline.static_geometry().is_empty());

        pipeline.static_collider_added(floor);
        pipeline.step(&mut world);
        assert_eq!(pipeline.static_geometry().len(), 1);

        pipeline.clear();
        assert!(pipeline.static_geometry().is_empty());
        pipeline.resync_static_geometry(&world);
        pipeline.step(&mut world);
        assert_eq!(pipeline.static_geometry().len(), 1);

        pipeline.static_collider_removed(floor);
        pipeline.step(&mut world);
        assert!(pipeline.static_geometry().is_empty());
    }

    #[test]
    fn joints_round_trip_through_pipeline() {
        let mut world = World::new();
        let a = sphere_at(&mut world, Vec3::zeros());
        let b = sphere_at(&mut world, Vec3::new(5.0, 0.0, 0.0));
        let mut pipeline = PhysicsPipeline::new(PhysicsConfig::default()).unwrap();

        let key = pipeline.add_joint(Joint {
            entity_a: a,
            entity_b: b,
            anchor_a: Vec3::x(),
            anchor_b: -Vec3::x(),
        });
        assert_eq!(pipeline.joints().len(), 1);
        assert!(pipeline.remove_joint(key).is_some());

        pipeline.add_joint(Joint {
            entity_a: a,
            entity_b: b,
            anchor_a: Vec3::zeros(),
            anchor_b: Vec3::zeros(),
        });
        world.destroy_entity(b);
        pipeline.step(&mut world);
        assert!(pipeline.joints().is_empty());
        assert_eq!(pipeline.remove_all_joints(a), 0);
    }
}
