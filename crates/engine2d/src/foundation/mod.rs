//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - 2D math types and conversions
//! - Collections (bounded work queues)
//! - Time management (frame timer, fixed timestep)
//! - Logging utilities

pub mod math;
pub mod collections;
pub mod time;
pub mod logging;
