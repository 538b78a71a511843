//! Entity-Component storage consumed by the collision pipeline
//!
//! The pipeline never reaches for global state: every stage receives the
//! [`World`] it operates on explicitly.

pub mod component;
pub mod components;
pub mod entity;
pub mod world;

pub use component::Component;
pub use entity::Entity;
pub use world::World;
