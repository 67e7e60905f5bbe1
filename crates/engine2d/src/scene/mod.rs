//! Scene loading
//!
//! A scene file is a JSON document naming the entities to create, the
//! components each one carries and the extra systems to schedule:
//!
//! ```json
//! {
//!   "name": "Colony",
//!   "entities": [
//!     { "name": "Dwarf", "components": [
//!       { "type": 1, "position": [5, 5] },
//!       { "type": "sprite", "path": "sprites/dwarf.png" }
//!     ] }
//!   ],
//!   "systems": [ { "systemClassName": "navigation" }, { "script_path": "scripts/weather.py" } ]
//! }
//! ```
//!
//! Loading never aborts on a bad descriptor. Every problem becomes a
//! [`SceneDiagnostic`] in the returned [`SceneReport`] and the rest of the
//! scene keeps loading.

mod catalog;
mod descriptor;
mod loader;

pub use catalog::{SystemCatalog, SystemConstructor};
pub use descriptor::{component_kind, EntityDescriptor, SceneDescriptor, SystemDescriptor};
pub use loader::{SceneDiagnostic, SceneLoader, SceneReport};

use crate::ecs::EcsError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that prevent a scene from being read at all
#[derive(Error, Debug)]
pub enum SceneError {
    /// The scene file could not be read
    #[error("Failed to read scene {path}: {source}")]
    Io {
        /// Scene file
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The scene file is not valid JSON or has the wrong shape
    #[error("Malformed scene: {0}")]
    Json(#[from] serde_json::Error),

    /// The registry rejected an operation the loader cannot work around
    #[error(transparent)]
    Ecs(#[from] EcsError),
}
