//! # engine2d
//!
//! Component-based 2D game engine core.
//!
//! ## Features
//!
//! - **Dense ECS**: entities are 1-based slots, components live in one array
//!   per kind indexed by entity id, a per-entity bitmask records attachment
//! - **Frame pipeline**: update, fixed-step slices and draw, in registration
//!   order, with failing systems isolated and disabled
//! - **Declarative scenes**: JSON scene files built through per-kind factories
//!   with per-descriptor diagnostics
//! - **Scripts**: behaviours and whole systems dispatched through a
//!   [`ScriptHost`](script::ScriptHost)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use engine2d::prelude::*;
//!
//! struct MyApp;
//!
//! impl Application for MyApp {
//!     fn initialize(&mut self, engine: &mut Engine) -> Result<(), AppError> {
//!         engine.load_scene("scenes/main.json")?;
//!         Ok(())
//!     }
//!
//!     fn update(&mut self, _engine: &mut Engine, _delta_time: f32) -> Result<(), AppError> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ApplicationConfig::default();
//!     let mut app = MyApp;
//!     Engine::run(config, &mut app)?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

// Core engine modules
pub mod config;
pub mod core;

pub mod assets;
pub mod ecs;
pub mod editor;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod script;

mod application;
mod engine;

pub use application::{AppError, Application};
pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{ApplicationConfig, AssetConfig, Config, EngineConfig, PhysicsConfig},
        ecs::{
            components::{
                Behavior, BehaviorManager, Body2d, Body2dManager, BodyType, Collider2d, Collider2dManager,
                ColliderShape, Sprite, SpriteManager, Tile, TileManager, Transform2d, Transform2dManager,
            },
            Component, ComponentConfig, ComponentFactory, ComponentKind, ComponentManager, ComponentMask, EcsError,
            EcsResult, Entity, EntityRegistry, Shared, SharedRegistry, System, SystemScheduler, INVALID_ENTITY,
        },
        foundation::{
            math::Vec2,
            time::{Stopwatch, Timer},
        },
        scene::{SceneDescriptor, SceneReport},
        script::{NativeScript, NativeScriptHost, ScriptContext, ScriptHost},
        AppError, Application, Engine, EngineError,
    };
}
