//! # Core Module
//!
//! Shared configuration used by every pipeline stage.
//!
//! ## Organization
//!
//! - **Config**: physics step, tolerance and worker settings

pub mod config;

// Re-export foundation modules for convenience
pub use crate::ecs;
pub use crate::foundation;

pub use crate::config::{Config, ConfigError};
pub use config::{PhysicsConfig, SweepAxis};
