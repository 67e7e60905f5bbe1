//! 2D transform component
//!
//! Pure data: position in pixels, per-axis scale and an angle in degrees.
//! Other managers (sprites, bodies, colliders) look transforms up by entity id
//! through the shared [`Transform2dManager`].

use crate::ecs::{
    share_observer, Component, ComponentConfig, ComponentFactory, ComponentKind, ComponentManager,
    ConfigFields, EcsResult, Entity, ResizeObserver, Shared, SharedRegistry, System,
};
use crate::editor::{Inspect, InspectorHook, InspectorPanel, InspectorRow};
use crate::foundation::math::{trs_matrix, wrap_degrees, Mat3, Vec2};
use std::ops::{Deref, DerefMut};

/// Position, scale and rotation of an entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform2d {
    /// World position in pixels
    pub position: Vec2,
    /// Per-axis scale factors
    pub scale: Vec2,
    /// Rotation in degrees
    pub angle: f32,
}

impl Component for Transform2d {
    const KIND: ComponentKind = ComponentKind::Transform2d;
}

impl Default for Transform2d {
    fn default() -> Self {
        Self {
            position: Vec2::zeros(),
            scale: Vec2::new(1.0, 1.0),
            angle: 0.0,
        }
    }
}

impl Transform2d {
    /// Transform at `position` with unit scale and no rotation
    pub fn from_position(position: Vec2) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Homogeneous world matrix
    pub fn matrix(&self) -> Mat3 {
        trs_matrix(self.position, self.angle, self.scale)
    }
}

impl Inspect for Transform2d {
    fn inspect(&self) -> Vec<InspectorRow> {
        vec![
            InspectorRow::new("Position", format!("{:.2}, {:.2}", self.position.x, self.position.y)),
            InspectorRow::new("Scale", format!("{:.2}, {:.2}", self.scale.x, self.scale.y)),
            InspectorRow::new("Angle", format!("{:.1}", self.angle)),
        ]
    }
}

/// Storage and per-frame behavior of transforms
pub struct Transform2dManager {
    store: ComponentManager<Transform2d>,
}

impl Transform2dManager {
    /// System name used in scene files
    pub const NAME: &'static str = "transform2d";

    /// Create a manager over `registry`
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            store: ComponentManager::new(registry),
        }
    }

    /// Create a shared manager subscribed to registry growth
    pub fn shared(registry: &SharedRegistry) -> Shared<Self> {
        share_observer(Self::new(registry.clone()), registry)
    }

    /// World position of `entity`, if it has a transform
    pub fn position(&self, entity: Entity) -> Option<Vec2> {
        self.store.try_get(entity).map(|transform| transform.position)
    }
}

impl Deref for Transform2dManager {
    type Target = ComponentManager<Transform2d>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl DerefMut for Transform2dManager {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}

impl System for Transform2dManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn update(&mut self, _delta_time: f32) -> EcsResult<()> {
        for (_, transform) in self.store.iter_mut() {
            transform.angle = wrap_degrees(transform.angle);
        }
        Ok(())
    }

    fn apply_pending_destroys(&mut self) -> usize {
        self.store.apply_pending_destroys()
    }

    fn clear(&mut self) {
        self.store.clear();
    }

    fn collect(&mut self) {
        self.store.collect();
    }
}

impl ComponentFactory for Transform2dManager {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Transform2d
    }

    fn create_component(&mut self, config: &ComponentConfig, entity: Entity) -> EcsResult<()> {
        let fields = ConfigFields::new(ComponentKind::Transform2d, config);
        // Read everything first so a bad field leaves the entity untouched
        let position = fields.vec2("position")?;
        let scale = fields.vec2("scale")?;
        let angle = fields.f32("angle")?;

        let transform = self.store.add_component(entity)?;
        if let Some(position) = position {
            transform.position = position;
        }
        if let Some(scale) = scale {
            transform.scale = scale;
        }
        if let Some(angle) = angle {
            transform.angle = angle;
        }
        Ok(())
    }

    fn create_empty_component(&mut self, entity: Entity) -> EcsResult<()> {
        self.store.add_component(entity).map(|_| ())
    }

    fn destroy_component(&mut self, entity: Entity) -> EcsResult<()> {
        self.store.destroy_component(entity)
    }
}

impl ResizeObserver for Transform2dManager {
    fn on_resize(&mut self, capacity: usize) {
        self.store.resize(capacity);
    }
}

impl InspectorHook for Transform2dManager {
    fn inspect_entity(&self, entity: Entity) -> Option<InspectorPanel> {
        self.store.inspect_entity(entity)
    }
}
