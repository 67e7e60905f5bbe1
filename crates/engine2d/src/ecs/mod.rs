//! Entity-Component-System core
//!
//! Entities are plain ids handed out by the [`EntityRegistry`], which also
//! records which component kinds each entity carries. Component data lives in
//! one dense [`ComponentManager`] per kind, indexed by entity id. Systems are
//! driven once per frame by the [`SystemScheduler`].

pub mod component;
pub mod components;
pub mod entity;
pub mod error;
pub mod factory;
pub mod scheduler;
pub mod storage;
pub mod system;

pub use component::{Component, ComponentKind, ComponentMask};
pub use entity::{
    Entity, EntityRegistry, ResizeObserver, SharedRegistry, DEFAULT_MAX_ENTITY_CAPACITY, INVALID_ENTITY,
};
pub use error::{EcsError, EcsResult};
pub use factory::{ComponentConfig, ComponentFactory, ConfigFields};
pub use scheduler::{FrameStats, SystemKey, SystemScheduler};
pub use storage::{share_observer, ComponentManager, Shared};
pub use system::{as_system, SharedSystem, System, SystemState};

#[cfg(test)]
mod tests;
