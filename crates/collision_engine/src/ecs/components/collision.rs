//! Collision components for ECS
//!
//! Colliders describe what an entity collides with; the logic component
//! receives the enter/stay/exit notifications the pipeline produces.

use crate::ecs::{Component, Entity};
use crate::foundation::math::Vec3;
use crate::physics::collision::{BoundingVolume, Triangle};
use crate::physics::error::ColliderError;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

const UNIFORM_SCALE_TOLERANCE: f32 = 1.0e-5;

/// Notifications kept by a logic component before the oldest are dropped
pub const DEFAULT_NOTIFICATION_LOG: usize = 256;

/// Convex collider attached to an entity
///
/// The volume is expressed in the entity's local space.
#[derive(Debug, Clone)]
pub struct ColliderComponent {
    /// Local-space convex volume
    pub volume: BoundingVolume,

    /// Trigger volumes report overlaps but get no physical response
    pub is_trigger: bool,
}

impl ColliderComponent {
    /// Create a solid collider
    pub fn new(volume: BoundingVolume) -> Self {
        Self {
            volume,
            is_trigger: false,
        }
    }

    /// Mark this as a trigger volume
    pub fn as_trigger(mut self) -> Self {
        self.is_trigger = true;
        self
    }

    /// Check the volume against the scale of the transform it will live under
    pub fn validate_scale(&self, scale: &Vec3) -> Result<(), ColliderError> {
        self.volume.validate()?;
        Self::validate_nonzero_scale(scale)?;

        if matches!(self.volume, BoundingVolume::Sphere { .. }) {
            let reference = scale.x.abs();
            let uniform = [scale.y, scale.z]
                .iter()
                .all(|s| (s.abs() - reference).abs() <= UNIFORM_SCALE_TOLERANCE * reference);
            if !uniform {
                return Err(ColliderError::NonUniformSphereScale(*scale));
            }
        }

        Ok(())
    }

    /// Reject scales with a zero (or non-finite) component
    pub fn validate_nonzero_scale(scale: &Vec3) -> Result<(), ColliderError> {
        if scale.iter().any(|s| *s == 0.0 || !s.is_finite()) {
            return Err(ColliderError::ZeroScale(*scale));
        }
        Ok(())
    }
}

impl Component for ColliderComponent {}

/// Static triangle-mesh collider
///
/// Only allowed on entities without a rigid body. Triangles are in the
/// entity's local space and shared with whatever loaded the mesh.
#[derive(Debug, Clone)]
pub struct ConcaveColliderComponent {
    /// Local-space triangles
    pub triangles: Arc<[Triangle]>,
}

impl ConcaveColliderComponent {
    /// Create a concave collider from shared triangles
    pub fn new(triangles: Arc<[Triangle]>) -> Self {
        Self { triangles }
    }
}

impl Component for ConcaveColliderComponent {}

/// Notification callbacks for game logic
///
/// Every method receives the entity that owns the logic component first and
/// the other entity of the pair second.
pub trait CollisionListener: Send + Sync {
    /// Two physical bodies started touching
    fn on_collision_enter(&mut self, _self_entity: Entity, _other: Entity) {}

    /// Two physical bodies are still touching
    fn on_collision_stay(&mut self, _self_entity: Entity, _other: Entity) {}

    /// Two physical bodies separated
    fn on_collision_exit(&mut self, _self_entity: Entity, _other: Entity) {}

    /// Something entered a trigger shared with this entity
    fn on_trigger_enter(&mut self, _self_entity: Entity, _other: Entity) {}

    /// A trigger overlap continues
    fn on_trigger_stay(&mut self, _self_entity: Entity, _other: Entity) {}

    /// A trigger overlap ended
    fn on_trigger_exit(&mut self, _self_entity: Entity, _other: Entity) {}
}

/// A notification delivered to a [`CollisionLogicComponent`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionNotification {
    /// Collision started with the entity
    CollisionEnter(Entity),
    /// Collision continues with the entity
    CollisionStay(Entity),
    /// Collision ended with the entity
    CollisionExit(Entity),
    /// Trigger overlap started with the entity
    TriggerEnter(Entity),
    /// Trigger overlap continues with the entity
    TriggerStay(Entity),
    /// Trigger overlap ended with the entity
    TriggerExit(Entity),
}

/// Component that receives collision notifications for an entity
///
/// Tracks which entities it currently touches and keeps a bounded log of the
/// notifications received since the last [`CollisionLogicComponent::drain_notifications`].
/// Once the log is full the oldest entry is dropped for each new one. An
/// optional listener is invoked as each notification arrives.
pub struct CollisionLogicComponent {
    /// Notifications are only delivered while this is set
    pub notifications_enabled: bool,

    listener: Option<Box<dyn CollisionListener>>,
    colliding_with: HashSet<Entity>,
    triggered_by: HashSet<Entity>,
    received: VecDeque<CollisionNotification>,
    log_capacity: usize,
}

impl CollisionLogicComponent {
    /// Logic component that only records notifications
    pub fn new() -> Self {
        Self {
            notifications_enabled: true,
            listener: None,
            colliding_with: HashSet::new(),
            triggered_by: HashSet::new(),
            received: VecDeque::new(),
            log_capacity: DEFAULT_NOTIFICATION_LOG,
        }
    }

    /// Logic component that forwards notifications to a listener
    pub fn with_listener(listener: impl CollisionListener + 'static) -> Self {
        Self {
            listener: Some(Box::new(listener)),
            ..Self::new()
        }
    }

    /// Builder pattern: enable or disable delivery
    pub fn with_notifications(mut self, enabled: bool) -> Self {
        self.notifications_enabled = enabled;
        self
    }

    /// Builder pattern: keep at most `capacity` logged notifications (0 disables the log)
    pub fn with_log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self.received.truncate(capacity);
        self
    }

    /// Deliver a notification about `self_entity`
    pub fn dispatch(&mut self, self_entity: Entity, notification: CollisionNotification) {
        if !self.notifications_enabled {
            return;
        }

        match notification {
            CollisionNotification::CollisionEnter(other) => {
                self.colliding_with.insert(other);
            }
            CollisionNotification::CollisionExit(other) => {
                self.colliding_with.remove(&other);
            }
            CollisionNotification::TriggerEnter(other) => {
                self.triggered_by.insert(other);
            }
            CollisionNotification::TriggerExit(other) => {
                self.triggered_by.remove(&other);
            }
            CollisionNotification::CollisionStay(_) | CollisionNotification::TriggerStay(_) => {}
        }

        if let Some(listener) = self.listener.as_mut() {
            match notification {
                CollisionNotification::CollisionEnter(other) => {
                    listener.on_collision_enter(self_entity, other);
                }
                CollisionNotification::CollisionStay(other) => {
                    listener.on_collision_stay(self_entity, other);
                }
                CollisionNotification::CollisionExit(other) => {
                    listener.on_collision_exit(self_entity, other);
                }
                CollisionNotification::TriggerEnter(other) => {
                    listener.on_trigger_enter(self_entity, other);
                }
                CollisionNotification::TriggerStay(other) => {
                    listener.on_trigger_stay(self_entity, other);
                }
                CollisionNotification::TriggerExit(other) => {
                    listener.on_trigger_exit(self_entity, other);
                }
            }
        }

        if self.log_capacity == 0 {
            return;
        }
        if self.received.len() == self.log_capacity {
            self.received.pop_front();
        }
        self.received.push_back(notification);
    }

    /// Check if we're currently colliding with any entity
    pub fn is_colliding(&self) -> bool {
        !self.colliding_with.is_empty()
    }

    /// Check if we're colliding with a specific entity
    pub fn is_colliding_with(&self, entity: Entity) -> bool {
        self.colliding_with.contains(&entity)
    }

    /// Check if a specific entity is inside a trigger shared with us
    pub fn is_triggered_by(&self, entity: Entity) -> bool {
        self.triggered_by.contains(&entity)
    }

    /// Notifications received since the last drain, oldest first
    pub fn notifications(&self) -> impl Iterator<Item = &CollisionNotification> + '_ {
        self.received.iter()
    }

    /// Number of logged notifications
    pub fn notification_count(&self) -> usize {
        self.received.len()
    }

    /// Take the notifications received since the last drain
    pub fn drain_notifications(&mut self) -> Vec<CollisionNotification> {
        self.received.drain(..).collect()
    }
}

impl Default for CollisionLogicComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CollisionLogicComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollisionLogicComponent")
            .field("notifications_enabled", &self.notifications_enabled)
            .field("has_listener", &self.listener.is_some())
            .field("colliding_with", &self.colliding_with)
            .field("triggered_by", &self.triggered_by)
            .finish()
    }
}

impl Component for CollisionLogicComponent {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingListener(Arc<AtomicUsize>);

    impl CollisionListener for CountingListener {
        fn on_collision_enter(&mut self, _self_entity: Entity, _other: Entity) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn sphere_rejects_non_uniform_scale() {
        let collider = ColliderComponent::new(BoundingVolume::sphere(Vec3::zeros(), 1.0));

        assert!(collider.validate_scale(&Vec3::new(2.0, 2.0, 2.0)).is_ok());
        assert!(matches!(
            collider.validate_scale(&Vec3::new(1.0, 2.0, 1.0)),
            Err(ColliderError::NonUniformSphereScale(_))
        ));
    }

    #[test]
    fn zero_scale_is_rejected_for_every_volume() {
        let collider = ColliderComponent::new(BoundingVolume::cuboid(
            Vec3::zeros(),
            Vec3::new(0.5, 0.5, 0.5),
        ));

        assert!(collider.validate_scale(&Vec3::new(1.0, 3.0, 0.5)).is_ok());
        assert!(matches!(
            collider.validate_scale(&Vec3::new(1.0, 0.0, 1.0)),
            Err(ColliderError::ZeroScale(_))
        ));
    }

    #[test]
    fn dispatch_tracks_contacts_and_calls_listener() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut logic = CollisionLogicComponent::with_listener(CountingListener(count.clone()));
        let me = Entity::new(0, 0);
        let other = Entity::new(1, 0);

        logic.dispatch(me, CollisionNotification::CollisionEnter(other));
        assert!(logic.is_colliding_with(other));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        logic.dispatch(me, CollisionNotification::CollisionExit(other));
        assert!(!logic.is_colliding());
        assert_eq!(logic.drain_notifications().len(), 2);
        assert_eq!(logic.notification_count(), 0);
    }

    #[test]
    fn full_log_drops_oldest() {
        let mut logic = CollisionLogicComponent::new().with_log_capacity(2);
        let me = Entity::new(0, 0);
        let other = Entity::new(1, 0);

        logic.dispatch(me, CollisionNotification::CollisionEnter(other));
        logic.dispatch(me, CollisionNotification::CollisionStay(other));
        logic.dispatch(me, CollisionNotification::CollisionStay(other));

        assert_eq!(
            logic.drain_notifications(),
            vec![
                CollisionNotification::CollisionStay(other),
                CollisionNotification::CollisionStay(other)
            ]
        );
        assert!(logic.is_colliding_with(other));
    }

    #[test]
    fn zero_capacity_keeps_state_without_log() {
        let mut logic = CollisionLogicComponent::new().with_log_capacity(0);
        let other = Entity::new(1, 0);

        logic.dispatch(Entity::new(0, 0), CollisionNotification::TriggerEnter(other));

        assert!(logic.is_triggered_by(other));
        assert_eq!(logic.notification_count(), 0);
    }

    #[test]
    fn disabled_logic_ignores_notifications() {
        let mut logic = CollisionLogicComponent::new().with_notifications(false);

        logic.dispatch(
            Entity::new(0, 0),
            CollisionNotification::TriggerEnter(Entity::new(1, 0)),
        );

        assert_eq!(logic.notification_count(), 0);
    }
}
