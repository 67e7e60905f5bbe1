//! # Unified Configuration System
//!
//! All engine configuration structures live here. They are plain serde types
//! that can be loaded from TOML or RON through the [`Config`] trait.
//!
//! ## Configuration Categories
//!
//! - **Engine Config**: logging, entity capacity, frame pacing
//! - **Physics Config**: gravity and unit scale used by bodies
//! - **Asset Config**: data and script directories

use crate::ecs::DEFAULT_MAX_ENTITY_CAPACITY;
use serde::{Serialize, Deserialize};
use std::path::PathBuf;

pub use crate::config::{Config, ConfigError};

/// # Engine Configuration
///
/// Core engine behavior: logging, initial entity capacity and the fixed
/// simulation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Log level for the engine
    pub log_level: String,
    /// Number of entity slots allocated up front
    pub initial_entity_capacity: usize,
    /// Most entity slots the registry may grow to
    pub max_entity_capacity: usize,
    /// Length of one fixed update step in seconds
    pub fixed_delta_time: f32,
    /// Upper bound of fixed steps run in a single frame
    pub max_fixed_steps_per_frame: u32,
    /// Target frame rate used to pace the headless loop (0 = unlimited)
    pub max_framerate: u32,
    /// Stop after this many frames (None = run until quit)
    pub max_frames: Option<u64>,
    /// Whether development diagnostics are enabled
    pub dev_mode: bool,
    /// Whether the inspector hooks are collected each frame
    pub editor: bool,
}

impl EngineConfig {
    /// Create a new engine configuration
    pub fn new() -> Self {
        Self {
            log_level: "info".to_string(),
            initial_entity_capacity: 10_000,
            max_entity_capacity: DEFAULT_MAX_ENTITY_CAPACITY,
            fixed_delta_time: 0.02,
            max_fixed_steps_per_frame: 5,
            max_framerate: 60,
            max_frames: None,
            dev_mode: cfg!(debug_assertions),
            editor: false,
        }
    }

    /// Set log level
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Set the initial entity capacity
    pub fn with_entity_capacity(mut self, capacity: usize) -> Self {
        self.initial_entity_capacity = capacity;
        self
    }

    /// Set the ceiling on entity capacity growth
    pub fn with_max_entity_capacity(mut self, capacity: usize) -> Self {
        self.max_entity_capacity = capacity;
        self
    }

    /// Set the fixed update step in seconds
    pub fn with_fixed_delta_time(mut self, step: f32) -> Self {
        self.fixed_delta_time = step;
        self
    }

    /// Stop the loop after `frames` frames
    pub fn with_max_frames(mut self, frames: u64) -> Self {
        self.max_frames = Some(frames);
        self
    }

    /// Set the frame pacing target (0 disables pacing)
    pub fn with_max_framerate(mut self, fps: u32) -> Self {
        self.max_framerate = fps;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_entity_capacity == 0 {
            return Err(ConfigError::Invalid("initial_entity_capacity must be at least 1".to_string()));
        }
        if self.max_entity_capacity < self.initial_entity_capacity {
            return Err(ConfigError::Invalid(format!(
                "max_entity_capacity ({}) is below initial_entity_capacity ({})",
                self.max_entity_capacity, self.initial_entity_capacity
            )));
        }
        if !(self.fixed_delta_time > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "fixed_delta_time must be positive, got {}",
                self.fixed_delta_time
            )));
        }
        if self.max_fixed_steps_per_frame == 0 {
            return Err(ConfigError::Invalid("max_fixed_steps_per_frame must be at least 1".to_string()));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Physics Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    /// Gravity in meters per second squared (y grows downwards)
    pub gravity: [f32; 2],
    /// Conversion factor between pixels and meters
    pub pixels_per_meter: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: [0.0, 9.81],
            pixels_per_meter: 100.0,
        }
    }
}

/// # Asset Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetConfig {
    /// Base directory for scenes and textures
    pub data_dir: PathBuf,
    /// Base directory for behavior scripts
    pub scripts_dir: PathBuf,
}

impl AssetConfig {
    /// Set the data directory
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/"),
            scripts_dir: PathBuf::from("scripts/"),
        }
    }
}

/// # Complete Application Configuration
///
/// Top-level configuration that encompasses all engine subsystems.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationConfig {
    /// Engine core configuration
    pub engine: EngineConfig,
    /// Physics configuration
    pub physics: PhysicsConfig,
    /// Asset configuration
    pub assets: AssetConfig,
}

impl ApplicationConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.engine.validate()?;
        if !(self.physics.pixels_per_meter > 0.0) {
            return Err(ConfigError::Invalid("pixels_per_meter must be positive".to_string()));
        }
        Ok(())
    }
}

impl Config for ApplicationConfig {}
