//! ECS error taxonomy

use super::{ComponentKind, Entity};
use thiserror::Error;

/// Result alias used by every fallible ECS operation
pub type EcsResult<T> = Result<T, EcsError>;

/// Errors raised by the entity registry, component managers and scheduler
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EcsError {
    /// The entity id is zero or beyond the registry capacity, or the slot is not alive
    #[error("Invalid entity {entity} (capacity {capacity})")]
    InvalidEntity {
        /// Offending entity
        entity: Entity,
        /// Registry capacity at the time of the call
        capacity: usize,
    },

    /// No free slot is left; the registry must be resized first
    #[error("No free entity slot among {capacity}; resize the registry first")]
    OutOfCapacity {
        /// Registry capacity at the time of the call
        capacity: usize,
    },

    /// An explicitly requested entity id is already in use
    #[error("{0} already exists")]
    EntityAlreadyExists(Entity),

    /// The entity has no component of the requested kind
    #[error("{entity} has no {kind} component")]
    MissingComponent {
        /// Queried entity
        entity: Entity,
        /// Queried component kind
        kind: ComponentKind,
    },

    /// A scene descriptor field is missing or has the wrong type
    #[error("Invalid {kind} config field `{field}`: {reason}")]
    InvalidComponentConfig {
        /// Component kind being configured
        kind: ComponentKind,
        /// Name of the offending field
        field: String,
        /// What was wrong with it
        reason: String,
    },

    /// The descriptor's `type` does not name a known component kind
    #[error("Unknown component type {0}")]
    UnknownComponentKind(String),

    /// No manager is registered for a known component kind
    #[error("No manager registered for {0} components")]
    UnregisteredComponentKind(ComponentKind),

    /// A system could not acquire a collaborator during init
    #[error("System `{system}` failed to initialize: {reason}")]
    SystemInitFailure {
        /// Name of the system
        system: String,
        /// Why init failed
        reason: String,
    },

    /// A system failed during a frame callback
    #[error("System `{system}` failed during {phase}: {reason}")]
    SystemFailure {
        /// Name of the system
        system: String,
        /// Phase that failed (`update`, `fixed_update`, `draw`, ...)
        phase: &'static str,
        /// Why the call failed
        reason: String,
    },
}

impl EcsError {
    /// Shorthand for an [`EcsError::InvalidComponentConfig`]
    pub fn config(kind: ComponentKind, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidComponentConfig {
            kind,
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`EcsError::SystemInitFailure`]
    pub fn init_failure(system: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SystemInitFailure {
            system: system.into(),
            reason: reason.into(),
        }
    }

    /// Whether the caller can recover by checking state first (structural errors)
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::InvalidEntity { .. } | Self::OutOfCapacity { .. } | Self::MissingComponent { .. }
        )
    }
}
