//! Collider component and contact detection
//!
//! Colliders are centered on their entity's transform. Every fixed step the
//! manager tests all collider pairs and records contact begin/end events,
//! which gameplay drains with [`Collider2dManager::drain_contacts`]. Boxes are
//! axis aligned; transform rotation is ignored.

use super::Transform2dManager;
use crate::ecs::{
    share_observer, Component, ComponentConfig, ComponentFactory, ComponentKind, ComponentManager,
    ComponentMask, ConfigFields, EcsError, EcsResult, Entity, ResizeObserver, Shared, SharedRegistry, System,
};
use crate::editor::{Inspect, InspectorHook, InspectorPanel, InspectorRow};
use crate::foundation::math::Vec2;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};
use std::rc::{Rc, Weak};

/// Collision shape in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    /// Circle of the given radius
    Circle {
        /// Radius in pixels
        radius: f32,
    },
    /// Axis-aligned box of the given full size
    Box {
        /// Width and height in pixels
        size: Vec2,
    },
}

impl Default for ColliderShape {
    fn default() -> Self {
        Self::Circle { radius: 0.5 }
    }
}

/// Collision shape attached to an entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collider2d {
    /// Shape centered on the transform
    pub shape: ColliderShape,
    /// Sensors report contacts but are not solid
    pub sensor: bool,
    /// Restitution used by a physics backend
    pub bounciness: f32,
}

impl Component for Collider2d {
    const KIND: ComponentKind = ComponentKind::Collider2d;
}

impl Inspect for Collider2d {
    fn inspect(&self) -> Vec<InspectorRow> {
        let shape = match self.shape {
            ColliderShape::Circle { radius } => format!("circle r={radius:.1}"),
            ColliderShape::Box { size } => format!("box {:.1}x{:.1}", size.x, size.y),
        };
        vec![
            InspectorRow::new("Shape", shape),
            InspectorRow::new("Sensor", self.sensor),
            InspectorRow::new("Bounciness", self.bounciness),
        ]
    }
}

/// Whether a contact started or ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactPhase {
    /// The pair started overlapping this step
    Begin,
    /// The pair stopped overlapping this step
    End,
}

/// Contact change between two colliders; `a` always has the lower id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    /// Begin or end
    pub phase: ContactPhase,
    /// First entity of the pair
    pub a: Entity,
    /// Second entity of the pair
    pub b: Entity,
}

/// Test two shapes centered at `pa` and `pb` for overlap
pub fn shapes_overlap(a: ColliderShape, pa: Vec2, b: ColliderShape, pb: Vec2) -> bool {
    match (a, b) {
        (ColliderShape::Circle { radius: ra }, ColliderShape::Circle { radius: rb }) => {
            (pa - pb).norm_squared() <= (ra + rb) * (ra + rb)
        }
        (ColliderShape::Box { size: sa }, ColliderShape::Box { size: sb }) => {
            let delta = (pa - pb).abs();
            delta.x <= (sa.x + sb.x) * 0.5 && delta.y <= (sa.y + sb.y) * 0.5
        }
        (ColliderShape::Circle { radius }, ColliderShape::Box { size }) => circle_box(pa, radius, pb, size),
        (ColliderShape::Box { size }, ColliderShape::Circle { radius }) => circle_box(pb, radius, pa, size),
    }
}

fn circle_box(center: Vec2, radius: f32, box_center: Vec2, size: Vec2) -> bool {
    let half = size * 0.5;
    let local = center - box_center;
    let closest = Vec2::new(local.x.clamp(-half.x, half.x), local.y.clamp(-half.y, half.y));
    (local - closest).norm_squared() <= radius * radius
}

/// Storage and contact detection of colliders
pub struct Collider2dManager {
    store: ComponentManager<Collider2d>,
    transforms: Weak<RefCell<Transform2dManager>>,
    touching: BTreeSet<(Entity, Entity)>,
    contacts: Vec<ContactEvent>,
}

impl Collider2dManager {
    /// System name used in scene files
    pub const NAME: &'static str = "collider2d";

    /// Create a manager reading positions from `transforms`
    pub fn new(registry: SharedRegistry, transforms: &Shared<Transform2dManager>) -> Self {
        Self {
            store: ComponentManager::new(registry),
            transforms: Rc::downgrade(transforms),
            touching: BTreeSet::new(),
            contacts: Vec::new(),
        }
    }

    /// Create a shared manager subscribed to registry growth
    pub fn shared(registry: &SharedRegistry, transforms: &Shared<Transform2dManager>) -> Shared<Self> {
        share_observer(Self::new(registry.clone(), transforms), registry)
    }

    /// Take every contact event recorded since the last drain
    pub fn drain_contacts(&mut self) -> Vec<ContactEvent> {
        std::mem::take(&mut self.contacts)
    }

    /// Whether `a` and `b` currently overlap
    pub fn are_touching(&self, a: Entity, b: Entity) -> bool {
        self.touching.contains(&(a.min(b), a.max(b)))
    }

    fn transforms(&self) -> EcsResult<Rc<RefCell<Transform2dManager>>> {
        self.transforms
            .upgrade()
            .ok_or_else(|| EcsError::init_failure(Self::NAME, "transform manager is gone"))
    }
}

impl Deref for Collider2dManager {
    type Target = ComponentManager<Collider2d>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl DerefMut for Collider2dManager {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}

impl System for Collider2dManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self) -> EcsResult<()> {
        self.transforms().map(|_| ())
    }

    fn fixed_update(&mut self, _fixed_delta_time: f32) -> EcsResult<()> {
        let transforms = self.transforms()?;
        let transforms = transforms.borrow();

        let mask = ComponentMask::COLLIDER_2D | ComponentMask::TRANSFORM_2D;
        let entities = self.store.registry().borrow().entities_with(mask);
        let placed: Vec<_> = entities
            .into_iter()
            .filter_map(|entity| {
                let collider = self.store.try_get(entity)?;
                let position = transforms.position(entity)?;
                Some((entity, collider.shape, position))
            })
            .collect();

        let mut touching = BTreeSet::new();
        for (i, &(a, shape_a, pa)) in placed.iter().enumerate() {
            for &(b, shape_b, pb) in &placed[i + 1..] {
                if shapes_overlap(shape_a, pa, shape_b, pb) {
                    touching.insert((a, b));
                }
            }
        }

        for &(a, b) in touching.difference(&self.touching) {
            self.contacts.push(ContactEvent { phase: ContactPhase::Begin, a, b });
        }
        for &(a, b) in self.touching.difference(&touching) {
            self.contacts.push(ContactEvent { phase: ContactPhase::End, a, b });
        }
        self.touching = touching;
        Ok(())
    }

    fn apply_pending_destroys(&mut self) -> usize {
        self.store.apply_pending_destroys()
    }

    fn clear(&mut self) {
        self.store.clear();
        self.touching.clear();
        self.contacts.clear();
    }

    fn collect(&mut self) {
        self.store.collect();
        self.contacts.shrink_to_fit();
    }
}

impl ComponentFactory for Collider2dManager {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Collider2d
    }

    fn create_component(&mut self, config: &ComponentConfig, entity: Entity) -> EcsResult<()> {
        let fields = ConfigFields::new(ComponentKind::Collider2d, config);
        let shape = match fields.u32("collider_type")?.unwrap_or(0) {
            0 => ColliderShape::Circle {
                radius: fields.f32("radius")?.unwrap_or(0.5),
            },
            1 => ColliderShape::Box {
                size: fields.vec2("size")?.unwrap_or_else(|| Vec2::new(1.0, 1.0)),
            },
            other => return Err(fields.error("collider_type", format!("unknown collider type {other}"))),
        };
        let sensor = fields.bool("sensor")?.unwrap_or(false);
        let bounciness = fields.f32("bouncing")?.unwrap_or(0.0);

        let collider = self.store.add_component(entity)?;
        collider.shape = shape;
        collider.sensor = sensor;
        collider.bounciness = bounciness;
        Ok(())
    }

    fn create_empty_component(&mut self, entity: Entity) -> EcsResult<()> {
        self.store.add_component(entity).map(|_| ())
    }

    fn destroy_component(&mut self, entity: Entity) -> EcsResult<()> {
        self.store.destroy_component(entity)
    }
}

impl ResizeObserver for Collider2dManager {
    fn on_resize(&mut self, capacity: usize) {
        self.store.resize(capacity);
    }
}

impl InspectorHook for Collider2dManager {
    fn inspect_entity(&self, entity: Entity) -> Option<InspectorPanel> {
        self.store.inspect_entity(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{EntityRegistry, INVALID_ENTITY};
    use serde_json::json;

    fn config(value: serde_json::Value) -> ComponentConfig {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_shape_overlap() {
        let circle = ColliderShape::Circle { radius: 1.0 };
        let square = ColliderShape::Box { size: Vec2::new(2.0, 2.0) };
        assert!(shapes_overlap(circle, Vec2::zeros(), circle, Vec2::new(2.0, 0.0)));
        assert!(!shapes_overlap(circle, Vec2::zeros(), circle, Vec2::new(2.1, 0.0)));
        assert!(shapes_overlap(square, Vec2::zeros(), square, Vec2::new(1.5, 1.5)));
        assert!(shapes_overlap(circle, Vec2::new(1.9, 0.0), square, Vec2::zeros()));
        assert!(!shapes_overlap(square, Vec2::zeros(), circle, Vec2::new(1.8, 1.8)));
    }

    #[test]
    fn test_contact_begin_and_end() {
        let registry = EntityRegistry::shared(4);
        let transforms = Transform2dManager::shared(&registry);
        let mut colliders = Collider2dManager::new(registry.clone(), &transforms);

        let a = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();
        let b = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();
        for entity in [a, b] {
            transforms.borrow_mut().add_component(entity).unwrap();
            colliders
                .create_component(&config(json!({ "collider_type": 0, "radius": 10 })), entity)
                .unwrap();
        }

        colliders.fixed_update(0.02).unwrap();
        assert!(colliders.are_touching(b, a));
        assert_eq!(
            colliders.drain_contacts(),
            vec![ContactEvent { phase: ContactPhase::Begin, a, b }]
        );

        colliders.fixed_update(0.02).unwrap();
        assert!(colliders.drain_contacts().is_empty());

        transforms.borrow_mut().get_mut(b).unwrap().position = Vec2::new(100.0, 0.0);
        colliders.fixed_update(0.02).unwrap();
        assert_eq!(
            colliders.drain_contacts(),
            vec![ContactEvent { phase: ContactPhase::End, a, b }]
        );
    }

    #[test]
    fn test_unknown_collider_type() {
        let registry = EntityRegistry::shared(2);
        let transforms = Transform2dManager::shared(&registry);
        let mut colliders = Collider2dManager::new(registry.clone(), &transforms);
        let entity = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();
        let result = colliders.create_component(&config(json!({ "collider_type": 5 })), entity);
        assert!(matches!(result, Err(EcsError::InvalidComponentConfig { .. })));
        assert_eq!(colliders.has_component(entity), Ok(false));
    }
}
