//! Headless collision demo
//!
//! Drops a handful of boxes onto a static floor mesh while a kinematic probe
//! sweeps through a trigger zone. Frames arrive at an uneven rate so the
//! fixed-step accumulator and its per-frame cap get exercised. Collision and
//! trigger notifications are logged as they happen.
//!
//! Usage: `collision_demo [physics.toml|physics.ron]`

use std::sync::Arc;

use collision_engine::config::ConfigError;
use collision_engine::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

const SIMULATED_SECONDS: f32 = 10.0;
const BOX_COUNT: usize = 8;
const SEED: u64 = 0x5eed;

#[derive(Error, Debug)]
enum DemoError {
    #[error("physics error: {0}")]
    Physics(#[from] PhysicsError),

    #[error("collider error: {0}")]
    Collider(#[from] ColliderError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Logs every notification for one named entity
struct LoggingListener {
    name: String,
}

impl CollisionListener for LoggingListener {
    fn on_collision_enter(&mut self, _self_entity: Entity, other: Entity) {
        log::info!("{} started touching {other:?}", self.name);
    }

    fn on_collision_exit(&mut self, _self_entity: Entity, other: Entity) {
        log::info!("{} stopped touching {other:?}", self.name);
    }

    fn on_trigger_enter(&mut self, _self_entity: Entity, other: Entity) {
        log::info!("{} entered by {other:?}", self.name);
    }

    fn on_trigger_exit(&mut self, _self_entity: Entity, other: Entity) {
        log::info!("{} left by {other:?}", self.name);
    }
}

fn logic(name: impl Into<String>) -> CollisionLogicComponent {
    CollisionLogicComponent::with_listener(LoggingListener { name: name.into() })
}

fn spawn_floor(world: &mut World) -> Result<Entity, ColliderError> {
    let floor = world.create_entity();
    world.add_component(floor, TransformComponent::identity().with_uniform_scale(20.0));
    world.attach_concave_collider(
        floor,
        ConcaveColliderComponent::new(Arc::from(vec![
            Triangle::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(-1.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 1.0)),
            Triangle::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, 1.0), Vec3::new(1.0, 0.0, -1.0)),
        ])),
    )?;
    Ok(floor)
}

fn spawn_boxes(world: &mut World, rng: &mut StdRng) -> Result<Vec<Entity>, ColliderError> {
    let mut boxes = Vec::with_capacity(BOX_COUNT);
    for i in 0..BOX_COUNT {
        let entity = world.create_entity();
        let position = Vec3::new(
            rng.gen_range(-6.0..6.0),
            rng.gen_range(2.0..8.0),
            rng.gen_range(-6.0..6.0),
        );
        let half = rng.gen_range(0.3..0.7);
        world.add_component(entity, TransformComponent::from_position(position));
        world.attach_collider(
            entity,
            ColliderComponent::new(BoundingVolume::cuboid(Vec3::zeros(), Vec3::new(half, half, half))),
        )?;
        world.attach_rigid_body(entity, RigidBodyComponent::dynamic(half * 8.0).with_damping(0.05, 0.0))?;
        world.add_component(entity, logic(format!("box {i}")));
        boxes.push(entity);
    }
    Ok(boxes)
}

fn spawn_trigger_zone(world: &mut World) -> Result<(Entity, Entity), ColliderError> {
    let zone = world.create_entity();
    world.add_component(zone, TransformComponent::from_position(Vec3::new(0.0, 1.0, 12.0)));
    world.attach_collider(
        zone,
        ColliderComponent::new(BoundingVolume::sphere(Vec3::zeros(), 2.0)).as_trigger(),
    )?;
    world.add_component(zone, logic("trigger zone"));

    let probe = world.create_entity();
    world.add_component(probe, TransformComponent::from_position(Vec3::new(-10.0, 1.0, 12.0)));
    world.attach_collider(
        probe,
        ColliderComponent::new(BoundingVolume::capsule(
            Vec3::new(0.0, -0.5, 0.0),
            Vec3::new(0.0, 0.5, 0.0),
            0.4,
        )),
    )?;
    world.attach_rigid_body(probe, RigidBodyComponent::kinematic(Vec3::new(2.0, 0.0, 0.0)))?;
    world.add_component(probe, logic("probe"));

    Ok((zone, probe))
}

fn load_config() -> Result<PhysicsConfig, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading physics configuration from {path}");
            PhysicsConfig::load_from_file(path)
        }
        None => Ok(PhysicsConfig::with_fixed_step(1.0 / 60.0)),
    }
}

fn run() -> Result<(), DemoError> {
    let config = load_config()?;
    let mut pipeline = PhysicsPipeline::new(config)?;
    let mut world = World::new();
    let mut rng = StdRng::seed_from_u64(SEED);

    let floor = spawn_floor(&mut world)?;
    let boxes = spawn_boxes(&mut world, &mut rng)?;
    let (zone, probe) = spawn_trigger_zone(&mut world)?;
    log::info!(
        "Scene ready: floor {floor:?}, {} boxes, zone {zone:?}, probe {probe:?}",
        boxes.len()
    );

    let mut elapsed = 0.0;
    let mut frames = 0u32;
    let mut capped_frames = 0u32;
    let mut steps = 0u32;
    let mut notifications = 0usize;
    while elapsed < SIMULATED_SECONDS {
        // Occasional long frames push the step cap
        let frame_time = if rng.gen_bool(0.05) {
            rng.gen_range(0.1..0.2)
        } else {
            rng.gen_range(1.0 / 144.0..1.0 / 30.0)
        };
        elapsed += frame_time;
        frames += 1;

        let report = pipeline.update(&mut world, frame_time);
        steps += report.steps;
        if report.capped {
            capped_frames += 1;
        }

        // Listeners already saw these; only the totals are kept
        for (_, logic) in world.query_mut::<CollisionLogicComponent>() {
            notifications += logic.drain_notifications().len();
        }
    }

    log::info!(
        "Simulated {elapsed:.2}s in {frames} frames: {steps} steps, {capped_frames} frames hit the step cap, {notifications} notifications"
    );
    for (i, entity) in boxes.iter().enumerate() {
        if let Some(transform) = world.get_component::<TransformComponent>(*entity) {
            log::info!("box {i} came to rest at {:.2?}", transform.position);
        }
    }

    Ok(())
}

fn main() {
    collision_engine::foundation::logging::init();
    log::info!("Starting collision demo");

    if let Err(error) = run() {
        log::error!("Demo failed: {error}");
        std::process::exit(1);
    }
}
