//! ECS Components module
//!
//! Components the collision pipeline reads and writes.

pub mod collision;
pub mod rigid_body;
pub mod transform;

pub use collision::{
    ColliderComponent, CollisionListener, CollisionLogicComponent, CollisionNotification,
    ConcaveColliderComponent, DEFAULT_NOTIFICATION_LOG,
};
pub use rigid_body::{BodyKind, RigidBodyComponent};
pub use transform::TransformComponent;
