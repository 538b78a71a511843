//! Scenario tests for the full collision pipeline
//!
//! Each test builds a small world, runs fixed steps and checks what the
//! entities were told.

use std::sync::Arc;

use approx::assert_relative_eq;

use crate::core::config::PhysicsConfig;
use crate::ecs::components::{
    ColliderComponent, CollisionLogicComponent, CollisionNotification, ConcaveColliderComponent,
    RigidBodyComponent, TransformComponent, DEFAULT_NOTIFICATION_LOG,
};
use crate::ecs::{Entity, World};
use crate::foundation::logging;
use crate::foundation::math::Vec3;
use crate::physics::collision::{BoundingVolume, Triangle};
use crate::physics::pipeline::PhysicsPipeline;

fn weightless() -> PhysicsConfig {
    PhysicsConfig::default().with_gravity(Vec3::zeros())
}

fn spawn(world: &mut World, position: Vec3, volume: BoundingVolume, body: Option<RigidBodyComponent>) -> Entity {
    let entity = world.create_entity();
    world.add_component(entity, TransformComponent::from_position(position));
    world.attach_collider(entity, ColliderComponent::new(volume)).unwrap();
    if let Some(body) = body {
        world.attach_rigid_body(entity, body).unwrap();
    }
    world.add_component(entity, CollisionLogicComponent::new());
    entity
}

fn spawn_floor(world: &mut World, scale: f32) -> Entity {
    let floor = world.create_entity();
    world.add_component(floor, TransformComponent::identity().with_uniform_scale(scale));
    world
        .attach_concave_collider(
            floor,
            ConcaveColliderComponent::new(Arc::from(vec![
                Triangle::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(-1.0, 0.0, 1.0), Vec3::new(1.0, 0.0, 1.0)),
                Triangle::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(1.0, 0.0, 1.0), Vec3::new(1.0, 0.0, -1.0)),
            ])),
        )
        .unwrap();
    floor
}

fn received(world: &World, entity: Entity) -> Vec<CollisionNotification> {
    world
        .get_component::<CollisionLogicComponent>(entity)
        .map(|logic| logic.notifications().copied().collect())
        .unwrap_or_default()
}

fn count(notifications: &[CollisionNotification], wanted: CollisionNotification) -> usize {
    notifications.iter().filter(|n| **n == wanted).count()
}

#[test]
fn overlapping_boxes_report_contact_along_x() {
    let mut world = World::new();
    let cube = BoundingVolume::cuboid(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5));
    let a = spawn(&mut world, Vec3::zeros(), cube.clone(), Some(RigidBodyComponent::dynamic(1.0)));
    let b = spawn(&mut world, Vec3::new(0.5, 0.0, 0.0), cube, Some(RigidBodyComponent::dynamic(1.0)));
    let mut pipeline = PhysicsPipeline::new(weightless()).unwrap();

    let report = pipeline.step(&mut world);

    assert_eq!(report.candidate_pairs, 1);
    assert_eq!(report.notifications.enter, 1);
    let manifold = pipeline.manifolds().manifold(a, b).unwrap();
    let contact = manifold.contacts()[0];
    assert_relative_eq!(contact.normal.x.abs(), 1.0, epsilon = 1.0e-3);
    assert_relative_eq!(contact.depth, 0.5, epsilon = 0.01);
    assert_eq!(received(&world, a), vec![CollisionNotification::CollisionEnter(b)]);
    assert_eq!(received(&world, b), vec![CollisionNotification::CollisionEnter(a)]);
}

#[test]
fn separating_spheres_enter_once_and_exit_once() {
    let mut world = World::new();
    let sphere = BoundingVolume::sphere(Vec3::zeros(), 0.5);
    let a = spawn(&mut world, Vec3::zeros(), sphere.clone(), Some(RigidBodyComponent::dynamic(1.0)));
    let b = spawn(&mut world, Vec3::new(0.8, 0.0, 0.0), sphere, Some(RigidBodyComponent::dynamic(1.0)));
    let mut pipeline = PhysicsPipeline::new(weightless()).unwrap();

    for _ in 0..120 {
        pipeline.step(&mut world);
    }

    for (me, other) in [(a, b), (b, a)] {
        let notifications = received(&world, me);
        assert_eq!(count(&notifications, CollisionNotification::CollisionEnter(other)), 1);
        assert_eq!(count(&notifications, CollisionNotification::CollisionExit(other)), 1);
        assert_eq!(notifications.first(), Some(&CollisionNotification::CollisionEnter(other)));
        assert_eq!(notifications.last(), Some(&CollisionNotification::CollisionExit(other)));
    }
    assert_eq!(pipeline.manifolds().manifold_count(), 0);

    let position = |entity| world.get_component::<TransformComponent>(entity).unwrap().position;
    assert!(position(b).x - position(a).x > 1.0);
}

#[test]
fn kinematic_body_passes_through_trigger_zone() {
    let mut world = World::new();
    let zone = world.create_entity();
    world.add_component(zone, TransformComponent::identity());
    world
        .attach_collider(
            zone,
            ColliderComponent::new(BoundingVolume::sphere(Vec3::zeros(), 2.0)).as_trigger(),
        )
        .unwrap();
    world.add_component(zone, CollisionLogicComponent::new());
    let mover = spawn(
        &mut world,
        Vec3::new(-5.0, 0.0, 0.0),
        BoundingVolume::sphere(Vec3::zeros(), 0.5),
        Some(RigidBodyComponent::kinematic(Vec3::new(6.0, 0.0, 0.0))),
    );
    let mut pipeline = PhysicsPipeline::new(weightless()).unwrap();

    for _ in 0..120 {
        pipeline.step(&mut world);
        assert_eq!(pipeline.manifolds().manifold_count(), 0);
    }

    let zone_log = received(&world, zone);
    assert_eq!(count(&zone_log, CollisionNotification::TriggerEnter(mover)), 1);
    assert_eq!(count(&zone_log, CollisionNotification::TriggerExit(mover)), 1);
    assert!(count(&zone_log, CollisionNotification::TriggerStay(mover)) > 10);
    let mover_log = received(&world, mover);
    assert_eq!(count(&mover_log, CollisionNotification::TriggerEnter(zone)), 1);
    assert_eq!(count(&mover_log, CollisionNotification::TriggerExit(zone)), 1);

    // Kinematic bodies keep their velocity
    let body = world.get_component::<RigidBodyComponent>(mover).unwrap();
    assert_eq!(body.velocity, Vec3::new(6.0, 0.0, 0.0));
}

#[test]
fn destroyed_entity_still_produces_exit() {
    let mut world = World::new();
    let sphere = BoundingVolume::sphere(Vec3::zeros(), 0.5);
    let survivor = spawn(&mut world, Vec3::zeros(), sphere.clone(), Some(RigidBodyComponent::dynamic(1.0)));
    let doomed = spawn(&mut world, Vec3::new(0.5, 0.0, 0.0), sphere, Some(RigidBodyComponent::dynamic(1.0)));
    let mut pipeline = PhysicsPipeline::new(weightless()).unwrap();

    pipeline.step(&mut world);
    assert!(world
        .get_component::<CollisionLogicComponent>(survivor)
        .unwrap()
        .is_colliding_with(doomed));

    world.destroy_entity(doomed);
    let report = pipeline.step(&mut world);

    assert_eq!(report.notifications.exit, 1);
    assert_eq!(
        received(&world, survivor).last(),
        Some(&CollisionNotification::CollisionExit(doomed))
    );
    assert!(!world
        .get_component::<CollisionLogicComponent>(survivor)
        .unwrap()
        .is_colliding());
    assert!(pipeline.manifolds().manifold(survivor, doomed).is_none());
}

#[test]
fn destroyed_trigger_visitor_leaves_the_zone() {
    let mut world = World::new();
    let zone = spawn(&mut world, Vec3::zeros(), BoundingVolume::sphere(Vec3::zeros(), 2.0), None);
    world
        .get_component_mut::<ColliderComponent>(zone)
        .unwrap()
        .is_trigger = true;
    let visitor = spawn(
        &mut world,
        Vec3::new(0.5, 0.0, 0.0),
        BoundingVolume::sphere(Vec3::zeros(), 0.5),
        Some(RigidBodyComponent::dynamic(1.0)),
    );
    let mut pipeline = PhysicsPipeline::new(weightless()).unwrap();

    pipeline.step(&mut world);
    assert_eq!(pipeline.manifolds().trigger_count(), 1);

    world.destroy_entity(visitor);
    pipeline.step(&mut world);

    assert_eq!(pipeline.manifolds().trigger_count(), 0);
    assert_eq!(
        received(&world, zone),
        vec![
            CollisionNotification::TriggerEnter(visitor),
            CollisionNotification::TriggerExit(visitor)
        ]
    );
}

#[test]
fn step_cap_carries_leftover_time() {
    logging::init_for_tests();
    let mut world = World::new();
    let mut pipeline = PhysicsPipeline::new(
        PhysicsConfig::with_fixed_step(0.01).with_max_physics_iterations(4),
    )
    .unwrap();

    let report = pipeline.update(&mut world, 0.1);

    assert_eq!(report.steps, 4);
    assert!(report.capped);
    assert_relative_eq!(pipeline.accumulator(), 0.06, epsilon = 1.0e-4);

    pipeline.clear();
    let report = pipeline.update(&mut world, 0.025);
    assert_eq!(report.steps, 2);
    assert!(!report.capped);
    assert_relative_eq!(pipeline.accumulator(), 0.005, epsilon = 1.0e-4);
    assert_eq!(pipeline.total_steps(), 6);
}

#[test]
fn falling_box_lands_on_static_floor() {
    logging::init_for_tests();
    let mut world = World::new();
    let floor = spawn_floor(&mut world, 10.0);
    let crate_box = spawn(
        &mut world,
        Vec3::new(2.0, 2.0, -3.0),
        BoundingVolume::cuboid(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5)),
        Some(RigidBodyComponent::dynamic(1.0)),
    );
    let mut pipeline = PhysicsPipeline::new(PhysicsConfig::default()).unwrap();

    for _ in 0..240 {
        pipeline.step(&mut world);
    }

    let height = world.get_component::<TransformComponent>(crate_box).unwrap().position.y;
    assert!(height > 0.3 && height < 0.7, "box settled at {height}");
    let log = received(&world, crate_box);
    assert_eq!(count(&log, CollisionNotification::CollisionEnter(floor)), 1);
    assert_eq!(count(&log, CollisionNotification::CollisionExit(floor)), 0);
    assert_eq!(pipeline.static_geometry().len(), 1);
}

#[test]
fn resting_contact_keeps_notification_log_bounded() {
    let mut world = World::new();
    let floor = spawn_floor(&mut world, 10.0);
    let crate_box = spawn(
        &mut world,
        Vec3::new(0.0, 0.49, 0.0),
        BoundingVolume::cuboid(Vec3::zeros(), Vec3::new(0.5, 0.5, 0.5)),
        Some(RigidBodyComponent::dynamic(1.0)),
    );
    let mut pipeline = PhysicsPipeline::new(PhysicsConfig::default()).unwrap();

    for _ in 0..(3 * DEFAULT_NOTIFICATION_LOG) {
        pipeline.step(&mut world);
        let logic = world.get_component::<CollisionLogicComponent>(crate_box).unwrap();
        assert!(logic.notification_count() <= DEFAULT_NOTIFICATION_LOG);
    }

    let logic = world.get_component::<CollisionLogicComponent>(crate_box).unwrap();
    assert_eq!(logic.notification_count(), DEFAULT_NOTIFICATION_LOG);
    assert!(logic.is_colliding_with(floor));
    assert_eq!(
        received(&world, crate_box).last(),
        Some(&CollisionNotification::CollisionStay(floor))
    );

    let drained = world
        .get_component_mut::<CollisionLogicComponent>(crate_box)
        .unwrap()
        .drain_notifications();
    assert_eq!(drained.len(), DEFAULT_NOTIFICATION_LOG);
    pipeline.step(&mut world);
    assert_eq!(received(&world, crate_box), vec![CollisionNotification::CollisionStay(floor)]);
}

#[test]
fn worker_count_does_not_change_results() {
    fn simulate(workers: usize) -> Vec<Vec3> {
        let mut world = World::new();
        let sphere = BoundingVolume::sphere(Vec3::zeros(), 0.5);
        let entities: Vec<Entity> = (0..24)
            .map(|i| {
                let position = Vec3::new((i % 6) as f32 * 0.8, (i / 6) as f32 * 0.9, (i % 4) as f32 * 0.1);
                spawn(&mut world, position, sphere.clone(), Some(RigidBodyComponent::dynamic(1.0)))
            })
            .collect();
        let mut pipeline = PhysicsPipeline::new(weightless().with_worker_threads(workers)).unwrap();
        for _ in 0..30 {
            pipeline.step(&mut world);
        }
        entities
            .iter()
            .map(|entity| world.get_component::<TransformComponent>(*entity).unwrap().position)
            .collect()
    }

    assert_eq!(simulate(1), simulate(4));
}
