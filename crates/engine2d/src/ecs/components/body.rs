//! Rigid body component
//!
//! Bodies keep their state in meters and write the resulting pixel position
//! back into the entity's transform after every fixed step. Integration is a
//! plain semi-implicit Euler step; anything fancier belongs to a physics
//! backend.

use super::Transform2dManager;
use crate::core::PhysicsConfig;
use crate::ecs::{
    share_observer, Component, ComponentConfig, ComponentFactory, ComponentKind, ComponentManager,
    ComponentMask, ConfigFields, EcsError, EcsResult, Entity, ResizeObserver, Shared, SharedRegistry, System,
};
use crate::editor::{Inspect, InspectorHook, InspectorPanel, InspectorRow};
use crate::foundation::math::{meter_to_pixel, pixel_to_meter, Vec2};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::{Rc, Weak};

/// How a body takes part in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyType {
    /// Never moves
    #[default]
    Static,
    /// Moves with its velocity, ignores gravity
    Kinematic,
    /// Moves with its velocity and falls with gravity
    Dynamic,
}

impl BodyType {
    /// Parse `0`/`1`/`2` or `"static"`/`"kinematic"`/`"dynamic"`
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => match number.as_u64()? {
                0 => Some(Self::Static),
                1 => Some(Self::Kinematic),
                2 => Some(Self::Dynamic),
                _ => None,
            },
            Value::String(name) => match name.to_ascii_lowercase().as_str() {
                "static" => Some(Self::Static),
                "kinematic" => Some(Self::Kinematic),
                "dynamic" => Some(Self::Dynamic),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Static => "static",
            Self::Kinematic => "kinematic",
            Self::Dynamic => "dynamic",
        };
        f.write_str(name)
    }
}

/// Simulated body attached to an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Body2d {
    /// Simulation mode
    pub body_type: BodyType,
    /// Position in meters
    pub position: Vec2,
    /// Velocity in meters per second
    pub velocity: Vec2,
    /// Multiplier applied to world gravity
    pub gravity_scale: f32,
    /// Offset in pixels between the body and its transform
    pub offset: Vec2,
    /// Mass in kilograms
    pub mass: f32,
}

impl Component for Body2d {
    const KIND: ComponentKind = ComponentKind::Body2d;
}

impl Default for Body2d {
    fn default() -> Self {
        Self {
            body_type: BodyType::default(),
            position: Vec2::zeros(),
            velocity: Vec2::zeros(),
            gravity_scale: 1.0,
            offset: Vec2::zeros(),
            mass: 1.0,
        }
    }
}

impl Body2d {
    /// Add an impulse (kg·m/s); static bodies ignore it
    pub fn apply_impulse(&mut self, impulse: Vec2) {
        if self.body_type != BodyType::Static && self.mass > 0.0 {
            self.velocity += impulse / self.mass;
        }
    }
}

impl Inspect for Body2d {
    fn inspect(&self) -> Vec<InspectorRow> {
        vec![
            InspectorRow::new("Type", self.body_type),
            InspectorRow::new("Velocity", format!("{:.2}, {:.2}", self.velocity.x, self.velocity.y)),
            InspectorRow::new("Gravity scale", self.gravity_scale),
            InspectorRow::new("Mass", self.mass),
        ]
    }
}

/// Storage and fixed-step integration of bodies
pub struct Body2dManager {
    store: ComponentManager<Body2d>,
    transforms: Weak<RefCell<Transform2dManager>>,
    config: PhysicsConfig,
}

impl Body2dManager {
    /// System name used in scene files
    pub const NAME: &'static str = "body2d";

    /// Create a manager moving the transforms of `transforms`
    pub fn new(registry: SharedRegistry, transforms: &Shared<Transform2dManager>, config: PhysicsConfig) -> Self {
        Self {
            store: ComponentManager::new(registry),
            transforms: Rc::downgrade(transforms),
            config,
        }
    }

    /// Create a shared manager subscribed to registry growth
    pub fn shared(
        registry: &SharedRegistry,
        transforms: &Shared<Transform2dManager>,
        config: PhysicsConfig,
    ) -> Shared<Self> {
        share_observer(Self::new(registry.clone(), transforms, config), registry)
    }

    /// World gravity in meters per second squared
    pub fn gravity(&self) -> Vec2 {
        Vec2::new(self.config.gravity[0], self.config.gravity[1])
    }

    fn transforms(&self) -> EcsResult<Rc<RefCell<Transform2dManager>>> {
        self.transforms
            .upgrade()
            .ok_or_else(|| EcsError::init_failure(Self::NAME, "transform manager is gone"))
    }
}

impl Deref for Body2dManager {
    type Target = ComponentManager<Body2d>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl DerefMut for Body2dManager {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}

impl System for Body2dManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self) -> EcsResult<()> {
        self.transforms().map(|_| ())
    }

    fn fixed_update(&mut self, fixed_delta_time: f32) -> EcsResult<()> {
        let transforms = self.transforms()?;
        let mut transforms = transforms.borrow_mut();
        let gravity = self.gravity();
        let pixels_per_meter = self.config.pixels_per_meter;

        let mask = ComponentMask::BODY_2D | ComponentMask::TRANSFORM_2D;
        let entities = self.store.registry().borrow().entities_with(mask);
        for entity in entities {
            let body = self.store.get_mut(entity)?;
            match body.body_type {
                BodyType::Static => continue,
                BodyType::Kinematic => {}
                BodyType::Dynamic => body.velocity += gravity * body.gravity_scale * fixed_delta_time,
            }
            body.position += body.velocity * fixed_delta_time;
            let position = meter_to_pixel(body.position, pixels_per_meter) - body.offset;
            transforms.get_mut(entity)?.position = position;
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

impl ComponentFactory for Body2dManager {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Body2d
    }

    fn create_component(&mut self, config: &ComponentConfig, entity: Entity) -> EcsResult<()> {
        let fields = ConfigFields::new(ComponentKind::Body2d, config);
        let body_type = match fields.raw("body_type") {
            Some(value) => Some(
                BodyType::from_value(value)
                    .ok_or_else(|| fields.error("body_type", format!("unknown body type {value}")))?,
            ),
            None => None,
        };
        let velocity = fields.vec2("velocity")?;
        let gravity_scale = fields.f32("gravity_scale")?;
        let offset = fields.vec2("offset")?;
        let mass = fields.f32("mass")?;

        // Bodies start where their transform is
        let start = self.transforms()?.borrow().position(entity).unwrap_or_else(Vec2::zeros);
        let pixels_per_meter = self.config.pixels_per_meter;

        let body = self.store.add_component(entity)?;
        body.body_type = body_type.unwrap_or_default();
        body.velocity = velocity.unwrap_or_else(Vec2::zeros);
        body.gravity_scale = gravity_scale.unwrap_or(1.0);
        body.offset = offset.unwrap_or_else(Vec2::zeros);
        body.mass = mass.unwrap_or(1.0);
        body.position = pixel_to_meter(start + body.offset, pixels_per_meter);
        Ok(())
    }

    fn create_empty_component(&mut self, entity: Entity) -> EcsResult<()> {
        self.store.add_component(entity).map(|_| ())
    }

    fn destroy_component(&mut self, entity: Entity) -> EcsResult<()> {
        self.store.destroy_component(entity)
    }
}

impl ResizeObserver for Body2dManager {
    fn on_resize(&mut self, capacity: usize) {
        self.store.resize(capacity);
    }
}

impl InspectorHook for Body2dManager {
    fn inspect_entity(&self, entity: Entity) -> Option<InspectorPanel> {
        self.store.inspect_entity(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{EntityRegistry, INVALID_ENTITY};
    use approx::assert_relative_eq;
    use serde_json::json;

    fn config(value: Value) -> ComponentConfig {
        value.as_object().cloned().unwrap()
    }

    fn setup() -> (SharedRegistry, Shared<Transform2dManager>, Body2dManager) {
        let registry = EntityRegistry::shared(4);
        let transforms = Transform2dManager::shared(&registry);
        let bodies = Body2dManager::new(registry.clone(), &transforms, PhysicsConfig::default());
        (registry, transforms, bodies)
    }

    #[test]
    fn test_body_type_values() {
        assert_eq!(BodyType::from_value(&json!(2)), Some(BodyType::Dynamic));
        assert_eq!(BodyType::from_value(&json!("Kinematic")), Some(BodyType::Kinematic));
        assert_eq!(BodyType::from_value(&json!(7)), None);
        assert_eq!(BodyType::from_value(&json!(true)), None);
    }

    #[test]
    fn test_dynamic_body_falls() {
        let (registry, transforms, mut bodies) = setup();
        let entity = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();
        transforms.borrow_mut().add_component(entity).unwrap().position = Vec2::new(100.0, 0.0);
        bodies
            .create_component(&config(json!({ "body_type": 2 })), entity)
            .unwrap();
        assert_relative_eq!(bodies.get(entity).unwrap().position.x, 1.0);

        bodies.init().unwrap();
        bodies.fixed_update(0.5).unwrap();
        let body = bodies.get(entity).unwrap();
        assert_relative_eq!(body.velocity.y, 9.81 * 0.5, epsilon = 1e-4);

        let position = transforms.borrow().position(entity).unwrap();
        assert_relative_eq!(position.x, 100.0, epsilon = 1e-3);
        assert_relative_eq!(position.y, 9.81 * 0.25 * 100.0, epsilon = 1e-2);
    }

    #[test]
    fn test_static_and_kinematic() {
        let (registry, transforms, mut bodies) = setup();
        let still = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();
        let slider = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();
        for entity in [still, slider] {
            transforms.borrow_mut().add_component(entity).unwrap();
        }
        bodies.create_component(&config(json!({})), still).unwrap();
        bodies
            .create_component(&config(json!({ "body_type": "kinematic", "velocity": [1, 0] })), slider)
            .unwrap();

        bodies.fixed_update(1.0).unwrap();
        assert_eq!(transforms.borrow().position(still), Some(Vec2::zeros()));
        let moved = transforms.borrow().position(slider).unwrap();
        assert_relative_eq!(moved.x, 100.0, epsilon = 1e-3);
        assert_relative_eq!(moved.y, 0.0);
    }

    #[test]
    fn test_bad_body_type() {
        let (registry, _transforms, mut bodies) = setup();
        let entity = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();
        let result = bodies.create_component(&config(json!({ "body_type": "floaty" })), entity);
        assert!(matches!(result, Err(EcsError::InvalidComponentConfig { .. })));
    }
}
