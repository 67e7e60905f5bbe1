//! Declarative component creation
//!
//! The scene loader hands each component descriptor to the [`ComponentFactory`]
//! registered for its kind. Factories read fields through [`ConfigFields`],
//! which ignores unknown keys and reports wrongly-typed ones as
//! [`EcsError::InvalidComponentConfig`] naming the field.

use super::{ComponentKind, EcsError, EcsResult, Entity};
use crate::foundation::math::Vec2;
use serde_json::{Map, Value};

/// Key/value fields of one component descriptor
pub type ComponentConfig = Map<String, Value>;

/// Creates and destroys components of one kind from declarative descriptors
pub trait ComponentFactory {
    /// Kind produced by this factory
    fn kind(&self) -> ComponentKind;

    /// Add a component to `entity` and apply the recognized fields of `config`
    fn create_component(&mut self, config: &ComponentConfig, entity: Entity) -> EcsResult<()>;

    /// Add a default component to `entity`
    fn create_empty_component(&mut self, entity: Entity) -> EcsResult<()>;

    /// Remove the component from `entity`
    fn destroy_component(&mut self, entity: Entity) -> EcsResult<()>;

    /// Drain problems met while creating components that did not stop creation
    fn take_warnings(&mut self) -> Vec<EcsError> {
        Vec::new()
    }
}

/// Typed accessors over a descriptor's fields
#[derive(Debug, Clone, Copy)]
pub struct ConfigFields<'a> {
    kind: ComponentKind,
    map: &'a ComponentConfig,
}

impl<'a> ConfigFields<'a> {
    /// View `map` as the config of a `kind` component
    pub fn new(kind: ComponentKind, map: &'a ComponentConfig) -> Self {
        Self { kind, map }
    }

    /// Whether the field is present (and not null)
    pub fn contains(&self, field: &str) -> bool {
        self.map.get(field).is_some_and(|value| !value.is_null())
    }

    /// `[x, y]` or `{ "x": .., "y": .. }`
    #[allow(clippy::cast_possible_truncation)]
    pub fn vec2(&self, field: &str) -> EcsResult<Option<Vec2>> {
        let Some(value) = self.value(field) else { return Ok(None) };
        let pair = match value {
            Value::Array(items) if items.len() == 2 => (items[0].as_f64(), items[1].as_f64()),
            Value::Object(object) => (
                object.get("x").and_then(Value::as_f64),
                object.get("y").and_then(Value::as_f64),
            ),
            _ => (None, None),
        };
        match pair {
            (Some(x), Some(y)) => Ok(Some(Vec2::new(x as f32, y as f32))),
            _ => Err(self.error(field, format!("expected a 2D vector, got {value}"))),
        }
    }

    /// Any JSON number
    #[allow(clippy::cast_possible_truncation)]
    pub fn f32(&self, field: &str) -> EcsResult<Option<f32>> {
        let Some(value) = self.value(field) else { return Ok(None) };
        value
            .as_f64()
            .map(|number| Some(number as f32))
            .ok_or_else(|| self.error(field, format!("expected a number, got {value}")))
    }

    /// Non-negative integer
    pub fn u32(&self, field: &str) -> EcsResult<Option<u32>> {
        let Some(value) = self.value(field) else { return Ok(None) };
        value
            .as_u64()
            .and_then(|number| u32::try_from(number).ok())
            .map(Some)
            .ok_or_else(|| self.error(field, format!("expected a non-negative integer, got {value}")))
    }

    /// Signed integer
    pub fn i32(&self, field: &str) -> EcsResult<Option<i32>> {
        let Some(value) = self.value(field) else { return Ok(None) };
        value
            .as_i64()
            .and_then(|number| i32::try_from(number).ok())
            .map(Some)
            .ok_or_else(|| self.error(field, format!("expected an integer, got {value}")))
    }

    /// Boolean
    pub fn bool(&self, field: &str) -> EcsResult<Option<bool>> {
        let Some(value) = self.value(field) else { return Ok(None) };
        value
            .as_bool()
            .map(Some)
            .ok_or_else(|| self.error(field, format!("expected a boolean, got {value}")))
    }

    /// String
    pub fn str(&self, field: &str) -> EcsResult<Option<&'a str>> {
        let Some(value) = self.value(field) else { return Ok(None) };
        value
            .as_str()
            .map(Some)
            .ok_or_else(|| self.error(field, format!("expected a string, got {value}")))
    }

    /// Raw JSON value, for fields with several accepted shapes
    pub fn raw(&self, field: &str) -> Option<&'a Value> {
        self.value(field)
    }

    /// Turn a missing required field into an error
    pub fn require<T>(&self, field: &str, value: Option<T>) -> EcsResult<T> {
        value.ok_or_else(|| self.error(field, "required field is missing"))
    }

    /// Config error for `field` of this kind
    pub fn error(&self, field: &str, reason: impl Into<String>) -> EcsError {
        EcsError::config(self.kind, field, reason)
    }

    fn value(&self, field: &str) -> Option<&'a Value> {
        self.map.get(field).filter(|value| !value.is_null())
    }
}
