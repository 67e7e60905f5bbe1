//! Editor inspector hooks
//!
//! Each component kind can describe its current state as label/value rows.
//! The [`Inspector`] gathers the rows of every registered kind for the
//! selected entity once per editor frame. Rows are presentation only; nothing
//! in the simulation reads them back.

use crate::ecs::{Component, ComponentKind, ComponentManager, Entity, SharedRegistry};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// One label/value line of an inspector panel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectorRow {
    /// Field label
    pub label: String,
    /// Formatted value
    pub value: String,
}

impl InspectorRow {
    /// Build a row from anything displayable
    pub fn new(label: impl Into<String>, value: impl fmt::Display) -> Self {
        Self {
            label: label.into(),
            value: value.to_string(),
        }
    }
}

/// Rows describing one component of the selected entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectorPanel {
    /// Component kind described
    pub kind: ComponentKind,
    /// Rows in display order
    pub rows: Vec<InspectorRow>,
}

/// Component payloads that can describe themselves
pub trait Inspect {
    /// Current state as display rows
    fn inspect(&self) -> Vec<InspectorRow>;
}

/// Per-kind hook queried by the inspector
pub trait InspectorHook {
    /// Panel for `entity`, or `None` when it has no component of this kind
    fn inspect_entity(&self, entity: Entity) -> Option<InspectorPanel>;
}

impl<T: Component + Inspect> InspectorHook for ComponentManager<T> {
    fn inspect_entity(&self, entity: Entity) -> Option<InspectorPanel> {
        self.try_get(entity).map(|component| InspectorPanel {
            kind: T::KIND,
            rows: component.inspect(),
        })
    }
}

/// Everything shown for the selected entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityReport {
    /// Inspected entity
    pub entity: Entity,
    /// Display name from the registry
    pub name: String,
    /// One panel per attached, inspectable component
    pub panels: Vec<InspectorPanel>,
}

/// Collects inspector panels for the selected entity
pub struct Inspector {
    registry: SharedRegistry,
    hooks: Vec<Weak<RefCell<dyn InspectorHook>>>,
    selected: Option<Entity>,
}

impl Inspector {
    /// Create an inspector over `registry`
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            registry,
            hooks: Vec::new(),
            selected: None,
        }
    }

    /// Register a component kind's hook
    pub fn register<H: InspectorHook + 'static>(&mut self, hook: &Rc<RefCell<H>>) {
        let hook: Rc<RefCell<dyn InspectorHook>> = hook.clone();
        self.hooks.push(Rc::downgrade(&hook));
    }

    /// Select the entity to inspect
    pub fn select(&mut self, entity: Option<Entity>) {
        self.selected = entity;
    }

    /// Currently selected entity
    pub fn selected(&self) -> Option<Entity> {
        self.selected
    }

    /// Gather the panels of the selected entity
    ///
    /// Returns `None` with no selection or when the selection is no longer alive.
    pub fn report(&mut self) -> Option<EntityReport> {
        let entity = self.selected?;
        let name = {
            let registry = self.registry.borrow();
            if !registry.is_alive(entity) {
                self.selected = None;
                return None;
            }
            registry.name(entity).ok()?
        };

        self.hooks.retain(|hook| hook.strong_count() > 0);
        let panels = self
            .hooks
            .iter()
            .filter_map(Weak::upgrade)
            .filter_map(|hook| hook.try_borrow().ok().and_then(|hook| hook.inspect_entity(entity)))
            .collect();

        Some(EntityReport { entity, name, panels })
    }
}

impl fmt::Display for EntityReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}]", self.name, self.entity)?;
        for panel in &self.panels {
            writeln!(f, "  {}", panel.kind)?;
            for row in &panel.rows {
                writeln!(f, "    {}: {}", row.label, row.value)?;
            }
        }
        Ok(())
    }
}
