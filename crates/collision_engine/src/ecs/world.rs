//! ECS World implementation

use super::components::{
    ColliderComponent, ConcaveColliderComponent, RigidBodyComponent, TransformComponent,
};
use super::{Component, Entity};
use crate::physics::collision::BoundingVolume;
use crate::physics::error::ColliderError;
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Lifecycle notification for static concave colliders
///
/// The world queues these whenever a concave collider appears or disappears;
/// the physics pipeline drains them at the start of its next step to keep its
/// static geometry in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticColliderEvent {
    /// A concave collider was attached to the entity
    Added(Entity),
    /// The entity's concave collider was removed or the entity destroyed
    Removed(Entity),
}

/// Type-erased storage for one component type
trait ComponentStore: Send + Sync {
    fn remove_entity(&mut self, entity: Entity);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Component> ComponentStore for HashMap<Entity, T> {
    fn remove_entity(&mut self, entity: Entity) {
        self.remove(&entity);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// ECS World containing all entities and components
pub struct World {
    generations: Vec<u32>,
    alive: Vec<bool>,
    free_ids: Vec<u32>,
    component_storages: HashMap<TypeId, Box<dyn ComponentStore>>,
    static_collider_events: Vec<StaticColliderEvent>,
}

impl World {
    /// Create a new world
    pub fn new() -> Self {
        Self {
            generations: Vec::new(),
            alive: Vec::new(),
            free_ids: Vec::new(),
            component_storages: HashMap::new(),
            static_collider_events: Vec::new(),
        }
    }

    /// Create a new entity
    pub fn create_entity(&mut self) -> Entity {
        if let Some(id) = self.free_ids.pop() {
            let slot = id as usize;
            self.alive[slot] = true;
            return Entity::new(id, self.generations[slot]);
        }

        let id = u32::try_from(self.generations.len()).unwrap_or(u32::MAX);
        self.generations.push(0);
        self.alive.push(true);
        Entity::new(id, 0)
    }

    /// Destroy an entity and all of its components
    ///
    /// Returns `false` if the entity was already gone.
    pub fn destroy_entity(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }

        if self.has_component::<ConcaveColliderComponent>(entity) {
            self.static_collider_events
                .push(StaticColliderEvent::Removed(entity));
        }

        for storage in self.component_storages.values_mut() {
            storage.remove_entity(entity);
        }

        let slot = entity.id() as usize;
        self.alive[slot] = false;
        self.generations[slot] = self.generations[slot].wrapping_add(1);
        self.free_ids.push(entity.id());
        true
    }

    /// Check whether an entity handle still refers to a live entity
    pub fn is_alive(&self, entity: Entity) -> bool {
        let slot = entity.id() as usize;
        self.alive.get(slot).copied().unwrap_or(false)
            && self.generations[slot] == entity.generation()
    }

    /// Number of live entities
    pub fn entity_count(&self) -> usize {
        self.alive.iter().filter(|alive| **alive).count()
    }

    /// Add a component to an entity, replacing any previous one of that type
    ///
    /// Components added to dead entities are dropped.
    pub fn add_component<T: Component>(&mut self, entity: Entity, component: T) {
        if !self.is_alive(entity) {
            log::warn!("Ignoring component added to dead entity {entity:?}");
            return;
        }
        self.storage_mut::<T>().insert(entity, component);
    }

    /// Remove a component from an entity
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let removed = self
            .component_storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|storage| storage.as_any_mut().downcast_mut::<HashMap<Entity, T>>())
            .and_then(|storage| storage.remove(&entity));

        if removed.is_some() && TypeId::of::<T>() == TypeId::of::<ConcaveColliderComponent>() {
            self.static_collider_events
                .push(StaticColliderEvent::Removed(entity));
        }
        removed
    }

    /// Get a component from an entity
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.storage::<T>().and_then(|storage| storage.get(&entity))
    }

    /// Get a mutable component from an entity
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.component_storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|storage| storage.as_any_mut().downcast_mut::<HashMap<Entity, T>>())
            .and_then(|storage| storage.get_mut(&entity))
    }

    /// Check whether an entity has a component of type `T`
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.get_component::<T>(entity).is_some()
    }

    /// All entities with a component of type `T`, ordered by entity id
    pub fn query<T: Component>(&self) -> Vec<(Entity, &T)> {
        let mut results: Vec<(Entity, &T)> = self
            .storage::<T>()
            .map(|storage| storage.iter().map(|(entity, c)| (*entity, c)).collect())
            .unwrap_or_default();
        results.sort_by_key(|(entity, _)| *entity);
        results
    }

    /// Mutable access to every component of type `T`
    pub fn query_mut<T: Component>(&mut self) -> Vec<(Entity, &mut T)> {
        self.component_storages
            .get_mut(&TypeId::of::<T>())
            .and_then(|storage| storage.as_any_mut().downcast_mut::<HashMap<Entity, T>>())
            .map(|storage| storage.iter_mut().map(|(entity, c)| (*entity, c)).collect())
            .unwrap_or_default()
    }

    /// World matrix of an entity's transform
    pub fn world_matrix(&self, entity: Entity) -> Option<crate::foundation::math::Mat4> {
        self.get_component::<TransformComponent>(entity)
            .map(TransformComponent::to_matrix)
    }

    /// Attach a convex collider, validating it against the entity's transform
    ///
    /// Colliders must be validated when they enter the scene; nothing during
    /// stepping re-checks them.
    pub fn attach_collider(
        &mut self,
        entity: Entity,
        collider: ColliderComponent,
    ) -> Result<(), ColliderError> {
        let transform = self.require_transform(entity)?;
        collider.validate_scale(&transform.scale)?;
        self.add_component(entity, collider);
        Ok(())
    }

    /// Replace the volume of an existing collider, re-running validation
    ///
    /// The old volume is kept when the new one is rejected.
    pub fn set_collider_volume(
        &mut self,
        entity: Entity,
        volume: BoundingVolume,
    ) -> Result<(), ColliderError> {
        let transform = self.require_transform(entity)?;
        let collider = self
            .get_component_mut::<ColliderComponent>(entity)
            .ok_or(ColliderError::MissingCollider(entity))?;

        let candidate = ColliderComponent {
            volume,
            is_trigger: collider.is_trigger,
        };
        candidate.validate_scale(&transform.scale)?;
        *collider = candidate;
        Ok(())
    }

    /// Attach a static concave (triangle mesh) collider
    pub fn attach_concave_collider(
        &mut self,
        entity: Entity,
        collider: ConcaveColliderComponent,
    ) -> Result<(), ColliderError> {
        let transform = self.require_transform(entity)?;
        ColliderComponent::validate_nonzero_scale(&transform.scale)?;
        if self.has_component::<RigidBodyComponent>(entity) {
            return Err(ColliderError::ConcaveOnDynamic(entity));
        }

        self.add_component(entity, collider);
        self.static_collider_events
            .push(StaticColliderEvent::Added(entity));
        Ok(())
    }

    /// Attach a rigid body
    ///
    /// Entities carrying a concave collider must stay static.
    pub fn attach_rigid_body(
        &mut self,
        entity: Entity,
        body: RigidBodyComponent,
    ) -> Result<(), ColliderError> {
        if !self.is_alive(entity) {
            return Err(ColliderError::DeadEntity(entity));
        }
        if self.has_component::<ConcaveColliderComponent>(entity) {
            return Err(ColliderError::ConcaveOnDynamic(entity));
        }
        self.add_component(entity, body);
        Ok(())
    }

    /// Take the queued static collider notifications
    ///
    /// `PhysicsPipeline::step` drains this queue. A world that is never stepped
    /// must be drained by its owner or the queue keeps every event.
    pub fn drain_static_collider_events(&mut self) -> Vec<StaticColliderEvent> {
        std::mem::take(&mut self.static_collider_events)
    }

    fn require_transform(&self, entity: Entity) -> Result<TransformComponent, ColliderError> {
        if !self.is_alive(entity) {
            return Err(ColliderError::DeadEntity(entity));
        }
        self.get_component::<TransformComponent>(entity)
            .cloned()
            .ok_or(ColliderError::MissingTransform(entity))
    }

    fn storage<T: Component>(&self) -> Option<&HashMap<Entity, T>> {
        self.component_storages
            .get(&TypeId::of::<T>())
            .and_then(|storage| storage.as_any().downcast_ref::<HashMap<Entity, T>>())
    }

    fn storage_mut<T: Component>(&mut self) -> &mut HashMap<Entity, T> {
        let storage = self
            .component_storages
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(HashMap::<Entity, T>::new()));
        match storage.as_any_mut().downcast_mut::<HashMap<Entity, T>>() {
            Some(storage) => storage,
            None => unreachable!("component storage keyed by the wrong TypeId"),
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use crate::physics::collision::Triangle;
    use std::sync::Arc;

    #[derive(Debug, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    #[test]
    fn components_round_trip() {
        let mut world = World::new();
        let entity = world.create_entity();

        world.add_component(entity, Health(10));
        assert_eq!(world.get_component::<Health>(entity), Some(&Health(10)));

        world.get_component_mut::<Health>(entity).unwrap().0 = 3;
        assert_eq!(world.query::<Health>(), vec![(entity, &Health(3))]);

        assert_eq!(world.remove_component::<Health>(entity), Some(Health(3)));
        assert!(!world.has_component::<Health>(entity));
    }

    #[test]
    fn destroyed_ids_are_reused_with_new_generation() {
        let mut world = World::new();
        let first = world.create_entity();
        world.add_component(first, Health(1));

        assert!(world.destroy_entity(first));
        assert!(!world.is_alive(first));
        assert!(!world.destroy_entity(first));

        let second = world.create_entity();
        assert_eq!(second.id(), first.id());
        assert_ne!(second.generation(), first.generation());
        assert!(world.get_component::<Health>(second).is_none());
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn world_matrix_follows_transform() {
        let mut world = World::new();
        let entity = world.create_entity();
        assert!(world.world_matrix(entity).is_none());

        world.add_component(entity, TransformComponent::from_position(Vec3::new(1.0, 2.0, 3.0)));
        let matrix = world.world_matrix(entity).unwrap();
        assert_eq!(matrix[(0, 3)], 1.0);
        assert_eq!(matrix[(1, 3)], 2.0);
        assert_eq!(matrix[(2, 3)], 3.0);
    }

    #[test]
    fn collider_requires_transform() {
        let mut world = World::new();
        let entity = world.create_entity();

        let result = world.attach_collider(
            entity,
            ColliderComponent::new(BoundingVolume::sphere(Vec3::zeros(), 1.0)),
        );

        assert!(matches!(result, Err(ColliderError::MissingTransform(e)) if e == entity));
    }

    #[test]
    fn concave_collider_rejected_on_rigid_body() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.add_component(entity, TransformComponent::identity());
        world
            .attach_rigid_body(entity, RigidBodyComponent::dynamic(1.0))
            .unwrap();

        let triangle = Triangle::new(Vec3::zeros(), Vec3::x(), Vec3::z());
        let result = world.attach_concave_collider(
            entity,
            ConcaveColliderComponent::new(Arc::from(vec![triangle])),
        );

        assert!(matches!(result, Err(ColliderError::ConcaveOnDynamic(_))));
    }

    #[test]
    fn concave_collider_lifecycle_is_queued() {
        let mut world = World::new();
        let entity = world.create_entity();
        world.add_component(entity, TransformComponent::identity());
        let triangle = Triangle::new(Vec3::zeros(), Vec3::x(), Vec3::z());
        world
            .attach_concave_collider(
                entity,
                ConcaveColliderComponent::new(Arc::from(vec![triangle])),
            )
            .unwrap();
        world.destroy_entity(entity);

        assert_eq!(
            world.drain_static_collider_events(),
            vec![
                StaticColliderEvent::Added(entity),
                StaticColliderEvent::Removed(entity)
            ]
        );
        assert!(world.drain_static_collider_events().is_empty());
    }
}
