//! # Core Engine Module
//!
//! Shared abstractions that the other subsystems depend on.
//!
//! ## Organization
//!
//! - **Config**: Unified configuration for the engine, physics and assets
//! - **Foundation**: Low-level utilities (math, collections, time, logging)
//! - **ECS**: Entity registry, component managers and system scheduling

pub mod config;

// Re-export foundation modules for convenience
pub use crate::foundation;
pub use crate::ecs;

// Re-export commonly used config types
pub use config::{
    ApplicationConfig,
    EngineConfig,
    PhysicsConfig,
    AssetConfig,
    Config,
    ConfigError,
};
