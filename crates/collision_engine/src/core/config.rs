//! # Physics Configuration
//!
//! Everything the collision pipeline reads at startup. Only the fixed step is
//! expected to come from the host; every other field has a tuned default.
//!
//! ```
//! use collision_engine::core::config::PhysicsConfig;
//!
//! let config = PhysicsConfig::with_fixed_step(1.0 / 120.0);
//! assert!(config.validate().is_ok());
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{Config, ConfigError};
use crate::foundation::math::Vec3;

/// Axis the broad phase sorts and sweeps along
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SweepAxis {
    /// World X axis
    #[default]
    X,
    /// World Y axis
    Y,
    /// World Z axis
    Z,
}

impl SweepAxis {
    /// Component index of this axis
    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// # Physics Configuration
///
/// Fixed-step and tolerance settings for the collision pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Length of one physics sub-step in seconds
    pub fixed_step: f32,
    /// Maximum sub-steps run in a single frame
    pub max_physics_iterations: u32,
    /// Separation beyond which cached contact points are discarded
    pub break_distance: f32,
    /// Narrow-phase worker threads (0 lets rayon pick)
    pub worker_threads: usize,
    /// Axis used by the single-axis sweep
    pub sweep_axis: SweepAxis,
    /// Gravity applied to dynamic bodies
    pub gravity: Vec3,
    /// Velocity iterations of the reference contact solver
    pub solver_iterations: u32,
    /// Coulomb friction coefficient used by the reference contact solver
    pub friction: f32,
}

impl PhysicsConfig {
    /// Defaults with a specific fixed step
    pub fn with_fixed_step(fixed_step: f32) -> Self {
        Self {
            fixed_step,
            ..Self::default()
        }
    }

    /// Set the per-frame sub-step cap
    pub fn with_max_physics_iterations(mut self, iterations: u32) -> Self {
        self.max_physics_iterations = iterations;
        self
    }

    /// Set the number of narrow-phase workers
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Set gravity
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the contact break distance
    pub fn with_break_distance(mut self, break_distance: f32) -> Self {
        self.break_distance = break_distance;
        self
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fixed_step.is_finite() || self.fixed_step <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "fixed_step",
                reason: format!("must be a positive number of seconds, got {}", self.fixed_step),
            });
        }

        if self.max_physics_iterations == 0 {
            return Err(ConfigError::Invalid {
                field: "max_physics_iterations",
                reason: "at least one sub-step per frame is required".to_string(),
            });
        }

        if !self.break_distance.is_finite() || self.break_distance < 0.0 {
            return Err(ConfigError::Invalid {
                field: "break_distance",
                reason: format!("must be non-negative, got {}", self.break_distance),
            });
        }

        if self.gravity.iter().any(|component| !component.is_finite()) {
            return Err(ConfigError::Invalid {
                field: "gravity",
                reason: "components must be finite".to_string(),
            });
        }

        if self.friction < 0.0 {
            return Err(ConfigError::Invalid {
                field: "friction",
                reason: format!("must be non-negative, got {}", self.friction),
            });
        }

        Ok(())
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_step: 1.0 / 60.0,
            max_physics_iterations: 4,
            break_distance: 0.02,
            worker_threads: 0,
            sweep_axis: SweepAxis::X,
            gravity: Vec3::new(0.0, -9.81, 0.0),
            solver_iterations: 8,
            friction: 0.5,
        }
    }
}

impl Config for PhysicsConfig {}
