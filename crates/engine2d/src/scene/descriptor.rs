//! Serde model of scene files

use super::SceneError;
use crate::ecs::{ComponentConfig, ComponentKind, EcsError, EcsResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Whole scene file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneDescriptor {
    /// Scene name, used in logs
    pub name: String,
    /// Entities in creation order
    pub entities: Vec<EntityDescriptor>,
    /// Systems scheduled in addition to the engine's own
    pub systems: Vec<SystemDescriptor>,
}

impl SceneDescriptor {
    /// Parse a scene from JSON text
    pub fn from_json_str(json: &str) -> Result<Self, SceneError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a scene from an already-decoded JSON value
    pub fn from_value(value: Value) -> Result<Self, SceneError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Read and parse a scene file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut scene = Self::from_json_str(&json)?;
        if scene.name.is_empty() {
            scene.name = path
                .file_stem()
                .map_or_else(|| "NewScene".to_string(), |stem| stem.to_string_lossy().into_owned());
        }
        Ok(scene)
    }

    /// Number of component descriptors over all entities
    pub fn component_count(&self) -> usize {
        self.entities.iter().map(|entity| entity.components.len()).sum()
    }
}

/// One entity of a scene
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityDescriptor {
    /// Display name; the registry's default name when absent
    pub name: Option<String>,
    /// Explicit entity id; the first free slot when absent
    pub id: Option<u32>,
    /// Component descriptors, each carrying a `type` field
    pub components: Vec<ComponentConfig>,
}

/// One system requested by a scene
///
/// Either a native system known to the [`SystemCatalog`](super::SystemCatalog)
/// or a script path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemDescriptor {
    /// Name of a native system
    #[serde(rename = "systemClassName", alias = "class_name", skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Script implementing the system
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script_path: Option<String>,
}

impl SystemDescriptor {
    /// Name used to look the system up; native names win over scripts
    pub fn identifier(&self) -> Option<&str> {
        self.class_name.as_deref().or(self.script_path.as_deref())
    }
}

/// Resolve the `type` field of a component descriptor
///
/// Accepts the flag value of the kind (`1 << bit`) or its name.
pub fn component_kind(config: &ComponentConfig) -> EcsResult<ComponentKind> {
    match config.get("type") {
        Some(Value::Number(number)) => number
            .as_u64()
            .and_then(ComponentKind::from_flag)
            .ok_or_else(|| EcsError::UnknownComponentKind(number.to_string())),
        Some(Value::String(name)) => name.parse().map_err(EcsError::UnknownComponentKind),
        Some(other) => Err(EcsError::UnknownComponentKind(other.to_string())),
        None => Err(EcsError::UnknownComponentKind("<missing type>".to_string())),
    }
}
