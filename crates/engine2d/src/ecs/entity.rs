//! Entity identifiers and the entity registry
//!
//! Entities are 1-based indices into the registry's mask array and into every
//! component store. Id `0` is reserved as [`INVALID_ENTITY`]. The registry owns
//! one [`ComponentMask`] per slot; a set bit is the single source of truth for
//! "entity E has component K".

use super::{ComponentKind, ComponentMask, EcsError, EcsResult};
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

/// Entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Entity(u32);

/// Reserved sentinel; never issued by the registry
pub const INVALID_ENTITY: Entity = Entity(0);

impl Entity {
    /// Wrap a raw 1-based id
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Entity stored at the 0-based `index`
    pub fn from_index(index: usize) -> Self {
        Self(u32::try_from(index + 1).unwrap_or(0))
    }

    /// Raw 1-based id
    pub const fn id(self) -> u32 {
        self.0
    }

    /// 0-based index into stores; meaningless for [`INVALID_ENTITY`]
    pub const fn index(self) -> usize {
        (self.0 as usize).wrapping_sub(1)
    }

    /// Whether this is anything but the sentinel
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Receives capacity growth notifications from the registry
pub trait ResizeObserver {
    /// Grow backing storage to at least `capacity` slots
    fn on_resize(&mut self, capacity: usize);
}

/// Registry handle shared between managers
pub type SharedRegistry = Rc<RefCell<EntityRegistry>>;

/// Ceiling on registry growth unless configured otherwise
pub const DEFAULT_MAX_ENTITY_CAPACITY: usize = 1_000_000;

/// Owner of entity identity and per-entity component masks
pub struct EntityRegistry {
    masks: Vec<ComponentMask>,
    // Slots handed out by create_entity; a freshly created entity has an
    // empty mask but must not be issued twice.
    occupied: Vec<bool>,
    names: Vec<String>,
    max_capacity: usize,
    observers: Vec<Weak<RefCell<dyn ResizeObserver>>>,
}

impl EntityRegistry {
    /// Create a registry with `capacity` slots
    pub fn new(capacity: usize) -> Self {
        Self {
            masks: vec![ComponentMask::empty(); capacity],
            occupied: vec![false; capacity],
            names: vec![String::new(); capacity],
            max_capacity: DEFAULT_MAX_ENTITY_CAPACITY.max(capacity),
            observers: Vec::new(),
        }
    }

    /// Wrap a new registry for sharing between managers
    pub fn shared(capacity: usize) -> SharedRegistry {
        Rc::new(RefCell::new(Self::new(capacity)))
    }

    /// Current number of slots
    pub fn capacity(&self) -> usize {
        self.masks.len()
    }

    /// Most slots [`grow`](Self::grow) will ever allocate
    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    /// Set the growth ceiling; never below the current capacity
    pub fn set_max_capacity(&mut self, max_capacity: usize) {
        self.max_capacity = max_capacity.max(self.capacity());
    }

    /// Grow to at least `capacity` slots, refusing to pass the ceiling
    pub fn grow(&mut self, capacity: usize) -> EcsResult<usize> {
        if capacity > self.max_capacity {
            return Err(EcsError::OutOfCapacity { capacity: self.max_capacity });
        }
        self.resize_capacity(capacity);
        Ok(self.capacity())
    }

    /// Double the capacity, clamped to the ceiling
    pub fn grow_doubling(&mut self) -> EcsResult<usize> {
        let capacity = self.capacity().saturating_mul(2).max(1).min(self.max_capacity);
        if capacity <= self.capacity() {
            return Err(EcsError::OutOfCapacity { capacity: self.capacity() });
        }
        self.grow(capacity)
    }

    /// Create an entity
    ///
    /// With [`INVALID_ENTITY`] the first free slot in ascending order is used;
    /// otherwise the requested slot must be free.
    pub fn create_entity(&mut self, requested: Entity) -> EcsResult<Entity> {
        if requested.is_valid() {
            self.check_bounds(requested)?;
            let index = requested.index();
            if self.is_slot_used(index) {
                return Err(EcsError::EntityAlreadyExists(requested));
            }
            self.occupy(index);
            return Ok(requested);
        }

        let index = (0..self.capacity())
            .find(|&index| !self.is_slot_used(index))
            .ok_or(EcsError::OutOfCapacity { capacity: self.capacity() })?;
        self.occupy(index);
        Ok(Entity::from_index(index))
    }

    /// Release an entity; its mask is cleared and the slot becomes free
    ///
    /// Component payloads are left in their stores; managers holding data for
    /// the entity should be told through their own `destroy_component`.
    pub fn destroy_entity(&mut self, entity: Entity) -> EcsResult<()> {
        self.check_alive(entity)?;
        let index = entity.index();
        self.masks[index] = ComponentMask::empty();
        self.occupied[index] = false;
        self.names[index].clear();
        Ok(())
    }

    /// Whether `entity` is in range and currently issued
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.check_alive(entity).is_ok()
    }

    /// Component mask of `entity`
    pub fn get_mask(&self, entity: Entity) -> EcsResult<ComponentMask> {
        self.check_bounds(entity)?;
        Ok(self.masks[entity.index()])
    }

    /// Whether `entity` has a component of `kind`
    pub fn has_component(&self, entity: Entity, kind: ComponentKind) -> EcsResult<bool> {
        Ok(self.get_mask(entity)?.has(kind))
    }

    /// Set the `kind` bit; idempotent
    pub fn add_component_type(&mut self, entity: Entity, kind: ComponentKind) -> EcsResult<()> {
        self.check_bounds(entity)?;
        self.masks[entity.index()].insert(kind.mask());
        Ok(())
    }

    /// Clear the `kind` bit; idempotent
    pub fn remove_component_type(&mut self, entity: Entity, kind: ComponentKind) -> EcsResult<()> {
        self.check_bounds(entity)?;
        self.masks[entity.index()].remove(kind.mask());
        Ok(())
    }

    /// Grow to at least `capacity` slots; never shrinks
    ///
    /// Live observers are told the new capacity. Observers that are currently
    /// borrowed (for instance the manager that triggered the resize) are
    /// skipped and must grow themselves.
    pub fn resize_capacity(&mut self, capacity: usize) {
        if capacity <= self.capacity() {
            return;
        }
        log::debug!("Entity registry grows {} -> {}", self.capacity(), capacity);
        self.masks.resize(capacity, ComponentMask::empty());
        self.occupied.resize(capacity, false);
        self.names.resize(capacity, String::new());

        self.observers.retain(|observer| observer.strong_count() > 0);
        for observer in &self.observers {
            let Some(observer) = observer.upgrade() else { continue };
            match observer.try_borrow_mut() {
                Ok(mut observer) => observer.on_resize(capacity),
                Err(_) => log::warn!("Resize observer busy, skipping notification"),
            };
        }
    }

    /// Subscribe to capacity growth
    pub fn register_observer(&mut self, observer: Weak<RefCell<dyn ResizeObserver>>) {
        self.observers.push(observer);
    }

    /// Name given to `entity`, or `Entity: <id>` when unnamed
    pub fn name(&self, entity: Entity) -> EcsResult<String> {
        self.check_bounds(entity)?;
        let name = &self.names[entity.index()];
        if name.is_empty() {
            Ok(format!("Entity: {}", entity.id()))
        } else {
            Ok(name.clone())
        }
    }

    /// Name `entity` for the editor and diagnostics
    pub fn set_name(&mut self, entity: Entity, name: impl Into<String>) -> EcsResult<()> {
        self.check_bounds(entity)?;
        self.names[entity.index()] = name.into();
        Ok(())
    }

    /// Every issued entity, ascending
    pub fn live_entities(&self) -> Vec<Entity> {
        (0..self.capacity())
            .filter(|&index| self.is_slot_used(index))
            .map(Entity::from_index)
            .collect()
    }

    /// Every entity whose mask contains all bits of `mask`
    pub fn entities_with(&self, mask: ComponentMask) -> Vec<Entity> {
        self.masks
            .iter()
            .enumerate()
            .filter(|(index, entity_mask)| self.is_slot_used(*index) && entity_mask.contains(mask))
            .map(|(index, _)| Entity::from_index(index))
            .collect()
    }

    /// Number of issued entities
    pub fn live_count(&self) -> usize {
        (0..self.capacity()).filter(|&index| self.is_slot_used(index)).count()
    }

    /// Release every entity, keeping capacity and observers
    pub fn clear(&mut self) {
        self.masks.fill(ComponentMask::empty());
        self.occupied.fill(false);
        self.names.iter_mut().for_each(String::clear);
    }

    fn is_slot_used(&self, index: usize) -> bool {
        self.occupied[index] || !self.masks[index].is_empty()
    }

    fn occupy(&mut self, index: usize) {
        self.occupied[index] = true;
        self.masks[index] = ComponentMask::empty();
    }

    fn check_bounds(&self, entity: Entity) -> EcsResult<()> {
        if entity.is_valid() && entity.index() < self.capacity() {
            Ok(())
        } else {
            Err(EcsError::InvalidEntity { entity, capacity: self.capacity() })
        }
    }

    fn check_alive(&self, entity: Entity) -> EcsResult<()> {
        self.check_bounds(entity)?;
        if self.is_slot_used(entity.index()) {
            Ok(())
        } else {
            Err(EcsError::InvalidEntity { entity, capacity: self.capacity() })
        }
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new(crate::core::EngineConfig::default().initial_entity_capacity)
    }
}

impl fmt::Debug for EntityRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityRegistry")
            .field("capacity", &self.capacity())
            .field("live", &self.live_count())
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_entity_is_one() {
        let mut registry = EntityRegistry::new(10);
        assert_eq!(registry.create_entity(INVALID_ENTITY), Ok(Entity::new(1)));
        assert_eq!(registry.create_entity(INVALID_ENTITY), Ok(Entity::new(2)));
    }

    #[test]
    fn test_requested_id() {
        let mut registry = EntityRegistry::new(10);
        let entity = Entity::new(5);
        assert_eq!(registry.create_entity(entity), Ok(entity));
        assert_eq!(
            registry.create_entity(entity),
            Err(EcsError::EntityAlreadyExists(entity))
        );
        assert!(matches!(
            registry.create_entity(Entity::new(11)),
            Err(EcsError::InvalidEntity { .. })
        ));
    }

    #[test]
    fn test_invalid_entity_is_hard_failure() {
        let registry = EntityRegistry::new(4);
        assert!(matches!(
            registry.has_component(INVALID_ENTITY, ComponentKind::Sprite),
            Err(EcsError::InvalidEntity { .. })
        ));
        assert!(matches!(
            registry.get_mask(Entity::new(5)),
            Err(EcsError::InvalidEntity { capacity: 4, .. })
        ));
    }

    #[test]
    fn test_mask_edits_are_idempotent() {
        let mut registry = EntityRegistry::new(2);
        let entity = registry.create_entity(INVALID_ENTITY).unwrap();
        registry.add_component_type(entity, ComponentKind::Body2d).unwrap();
        registry.add_component_type(entity, ComponentKind::Body2d).unwrap();
        assert_eq!(registry.get_mask(entity), Ok(ComponentMask::BODY_2D));
        registry.remove_component_type(entity, ComponentKind::Body2d).unwrap();
        registry.remove_component_type(entity, ComponentKind::Body2d).unwrap();
        assert_eq!(registry.get_mask(entity), Ok(ComponentMask::empty()));
        // still issued even with an empty mask
        assert!(registry.is_alive(entity));
    }

    #[test]
    fn test_resize_never_shrinks() {
        let mut registry = EntityRegistry::new(4);
        let entity = registry.create_entity(INVALID_ENTITY).unwrap();
        registry.add_component_type(entity, ComponentKind::Sprite).unwrap();
        registry.resize_capacity(2);
        assert_eq!(registry.capacity(), 4);
        registry.resize_capacity(8);
        assert_eq!(registry.capacity(), 8);
        assert_eq!(registry.get_mask(entity), Ok(ComponentMask::SPRITE));
    }

    struct Recorder(Vec<usize>);

    impl ResizeObserver for Recorder {
        fn on_resize(&mut self, capacity: usize) {
            self.0.push(capacity);
        }
    }

    #[test]
    fn test_observers_are_notified() {
        let mut registry = EntityRegistry::new(1);
        let recorder = Rc::new(RefCell::new(Recorder(Vec::new())));
        let observer: Rc<RefCell<dyn ResizeObserver>> = recorder.clone();
        registry.register_observer(Rc::downgrade(&observer));
        drop(observer);

        registry.resize_capacity(3);
        registry.resize_capacity(3);
        assert_eq!(recorder.borrow().0, vec![3]);

        drop(recorder);
        registry.resize_capacity(5);
        assert_eq!(registry.observers.len(), 0);
    }

    #[test]
    fn test_busy_observer_is_skipped() {
        let mut registry = EntityRegistry::new(1);
        let recorder = Rc::new(RefCell::new(Recorder(Vec::new())));
        let observer: Rc<RefCell<dyn ResizeObserver>> = recorder.clone();
        registry.register_observer(Rc::downgrade(&observer));

        let held = recorder.borrow_mut();
        registry.resize_capacity(4);
        assert_eq!(held.0, Vec::<usize>::new());
        drop(held);

        assert_eq!(registry.capacity(), 4);
        registry.resize_capacity(6);
        assert_eq!(recorder.borrow().0, vec![6]);
    }

    #[test]
    fn test_growth_stops_at_ceiling() {
        let mut registry = EntityRegistry::new(3);
        registry.set_max_capacity(5);
        assert_eq!(registry.grow_doubling(), Ok(5));
        assert_eq!(registry.grow_doubling(), Err(EcsError::OutOfCapacity { capacity: 5 }));
        assert_eq!(registry.grow(6), Err(EcsError::OutOfCapacity { capacity: 5 }));
        assert_eq!(registry.capacity(), 5);

        // the ceiling never drops below what is already allocated
        registry.set_max_capacity(2);
        assert_eq!(registry.max_capacity(), 5);
    }

    #[test]
    fn test_names_and_clear() {
        let mut registry = EntityRegistry::new(3);
        let entity = registry.create_entity(INVALID_ENTITY).unwrap();
        assert_eq!(registry.name(entity).unwrap(), "Entity: 1");
        registry.set_name(entity, "dwarf").unwrap();
        assert_eq!(registry.name(entity).unwrap(), "dwarf");

        registry.clear();
        assert_eq!(registry.live_count(), 0);
        assert_eq!(registry.name(entity).unwrap(), "Entity: 1");
        assert_eq!(registry.capacity(), 3);
    }

    #[test]
    fn test_entities_with_mask() {
        let mut registry = EntityRegistry::new(4);
        let a = registry.create_entity(INVALID_ENTITY).unwrap();
        let b = registry.create_entity(INVALID_ENTITY).unwrap();
        registry.add_component_type(a, ComponentKind::Transform2d).unwrap();
        registry.add_component_type(a, ComponentKind::Sprite).unwrap();
        registry.add_component_type(b, ComponentKind::Transform2d).unwrap();

        let mask = ComponentMask::TRANSFORM_2D | ComponentMask::SPRITE;
        assert_eq!(registry.entities_with(mask), vec![a]);
        assert_eq!(registry.entities_with(ComponentMask::TRANSFORM_2D), vec![a, b]);
        assert_eq!(registry.live_entities(), vec![a, b]);
    }
}
