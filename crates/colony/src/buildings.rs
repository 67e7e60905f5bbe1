//! Shared bookkeeping for buildings that house or employ dwarves

use engine2d::prelude::*;
use std::cell::RefCell;
use std::rc::Weak;

/// Resources moved between buildings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResourceType {
    /// Nothing stored
    #[default]
    None,
    /// Raw iron from mines
    Iron,
    /// Raw stone
    Stone,
    /// Tools forged from iron
    Tool,
    /// Food eaten in dwellings
    Food,
}

/// Dwarves assigned to a building and currently inside it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DwarfSlots {
    /// Assignment limit
    pub capacity: u32,
    /// Dwarves that call this building theirs
    pub assigned: u32,
    /// Dwarves physically inside
    pub inside: u32,
}

impl DwarfSlots {
    /// Empty slots for up to `capacity` dwarves
    pub const fn new(capacity: u32) -> Self {
        Self {
            capacity,
            assigned: 0,
            inside: 0,
        }
    }

    /// Whether another dwarf can be assigned
    pub const fn has_room(&self) -> bool {
        self.assigned < self.capacity
    }
}

/// Building rows indexed by position, with vacated rows reused first
///
/// A vacant row holds [`INVALID_ENTITY`] and is skipped by every query.
#[derive(Debug, Clone)]
pub struct BuildingTable<I> {
    entities: Vec<Entity>,
    slots: Vec<DwarfSlots>,
    inventories: Vec<I>,
}

impl<I> Default for BuildingTable<I> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            slots: Vec::new(),
            inventories: Vec::new(),
        }
    }
}

impl<I> BuildingTable<I> {
    /// Record a building in the first vacant row, or a new one
    pub fn insert(&mut self, entity: Entity, slots: DwarfSlots, inventory: I) -> usize {
        if let Some(row) = self.entities.iter().position(|e| !e.is_valid()) {
            self.entities[row] = entity;
            self.slots[row] = slots;
            self.inventories[row] = inventory;
            return row;
        }
        self.entities.push(entity);
        self.slots.push(slots);
        self.inventories.push(inventory);
        self.entities.len() - 1
    }

    /// Vacate the row of `entity`
    pub fn remove(&mut self, entity: Entity) -> bool {
        match self.row(entity) {
            Some(row) => {
                self.entities[row] = INVALID_ENTITY;
                true
            }
            None => false,
        }
    }

    /// Whether `entity` is a recorded building
    pub fn contains(&self, entity: Entity) -> bool {
        self.row(entity).is_some()
    }

    /// Assign one more dwarf to `entity`; false when full or unknown
    pub fn assign_dwarf(&mut self, entity: Entity) -> bool {
        match self.row(entity) {
            Some(row) if self.slots[row].has_room() => {
                self.slots[row].assigned += 1;
                true
            }
            _ => false,
        }
    }

    /// Release one assignment of `entity`
    pub fn release_dwarf(&mut self, entity: Entity) -> bool {
        let Some(row) = self.row(entity) else {
            return false;
        };
        self.slots[row].assigned = self.slots[row].assigned.saturating_sub(1);
        true
    }

    /// First occupied building that can take another dwarf
    pub fn free_slot(&self) -> Option<Entity> {
        self.entities
            .iter()
            .zip(&self.slots)
            .find(|(entity, slots)| entity.is_valid() && slots.has_room())
            .map(|(entity, _)| *entity)
    }

    /// A dwarf walked into `entity`; capped at the building's capacity
    pub fn enter(&mut self, entity: Entity) -> bool {
        let Some(row) = self.row(entity) else {
            return false;
        };
        let slots = &mut self.slots[row];
        slots.inside = (slots.inside + 1).min(slots.capacity);
        true
    }

    /// A dwarf left `entity`
    pub fn exit(&mut self, entity: Entity) -> bool {
        let Some(row) = self.row(entity) else {
            return false;
        };
        self.slots[row].inside = self.slots[row].inside.saturating_sub(1);
        true
    }

    /// Dwarf slots of `entity`
    pub fn slots(&self, entity: Entity) -> Option<DwarfSlots> {
        self.row(entity).map(|row| self.slots[row])
    }

    /// Inventory of `entity`
    pub fn inventory(&self, entity: Entity) -> Option<&I> {
        self.row(entity).map(|row| &self.inventories[row])
    }

    /// Inventory of `entity`, mutably
    pub fn inventory_mut(&mut self, entity: Entity) -> Option<&mut I> {
        self.row(entity).map(|row| &mut self.inventories[row])
    }

    /// Occupied rows
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &DwarfSlots, &I)> {
        self.entities
            .iter()
            .zip(&self.slots)
            .zip(&self.inventories)
            .filter(|((entity, _), _)| entity.is_valid())
            .map(|((entity, slots), inventory)| (*entity, slots, inventory))
    }

    /// Occupied rows, with mutable inventories
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &DwarfSlots, &mut I)> {
        self.entities
            .iter()
            .zip(&self.slots)
            .zip(&mut self.inventories)
            .filter(|((entity, _), _)| entity.is_valid())
            .map(|((entity, slots), inventory)| (*entity, slots, inventory))
    }

    /// Occupied buildings in row order
    pub fn entities(&self) -> Vec<Entity> {
        self.entities.iter().copied().filter(|e| e.is_valid()).collect()
    }

    /// Number of occupied rows
    pub fn len(&self) -> usize {
        self.entities.iter().filter(|e| e.is_valid()).count()
    }

    /// Whether no building is recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every building
    pub fn clear(&mut self) {
        self.entities.clear();
        self.slots.clear();
        self.inventories.clear();
    }

    fn row(&self, entity: Entity) -> Option<usize> {
        if !entity.is_valid() {
            return None;
        }
        self.entities.iter().position(|e| *e == entity)
    }
}

/// Create an entity with a transform at `position`, growing the registry when full
///
/// Fails with [`EcsError::OutOfCapacity`] once the registry is at its ceiling.
pub fn spawn_at(
    registry: &SharedRegistry,
    transforms: &Weak<RefCell<Transform2dManager>>,
    position: Vec2,
) -> EcsResult<Entity> {
    let transforms = transforms
        .upgrade()
        .ok_or_else(|| EcsError::init_failure("colony", "transform manager is gone"))?;

    let entity = {
        let mut registry = registry.borrow_mut();
        match registry.create_entity(INVALID_ENTITY) {
            Err(EcsError::OutOfCapacity { .. }) => {
                registry.grow_doubling()?;
                registry.create_entity(INVALID_ENTITY)?
            }
            other => other?,
        }
    };
    transforms.borrow_mut().add_component(entity)?.position = position;
    Ok(entity)
}

/// Destroy an entity created by [`spawn_at`] along with its transform
pub fn despawn(
    registry: &SharedRegistry,
    transforms: &Weak<RefCell<Transform2dManager>>,
    entity: Entity,
) -> EcsResult<()> {
    if let Some(transforms) = transforms.upgrade() {
        transforms.borrow_mut().destroy_component(entity)?;
    }
    registry.borrow_mut().destroy_entity(entity)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> BuildingTable<u32> {
        let mut table = BuildingTable::default();
        table.insert(Entity::new(1), DwarfSlots::new(1), 10);
        table.insert(Entity::new(2), DwarfSlots::new(2), 20);
        table
    }

    #[test]
    fn test_vacated_row_is_reused() {
        let mut table = table();
        assert!(table.remove(Entity::new(1)));
        assert!(!table.remove(Entity::new(1)));
        assert_eq!(table.len(), 1);

        assert_eq!(table.insert(Entity::new(7), DwarfSlots::new(3), 70), 0);
        assert_eq!(table.entities(), vec![Entity::new(7), Entity::new(2)]);
        assert_eq!(table.inventory(Entity::new(7)), Some(&70));
    }

    #[test]
    fn test_free_slot_skips_full_and_vacant_rows() {
        let mut table = table();
        assert_eq!(table.free_slot(), Some(Entity::new(1)));
        assert!(table.assign_dwarf(Entity::new(1)));
        assert!(!table.assign_dwarf(Entity::new(1)));
        assert_eq!(table.free_slot(), Some(Entity::new(2)));

        table.remove(Entity::new(2));
        assert_eq!(table.free_slot(), None);
        assert!(!table.assign_dwarf(INVALID_ENTITY));
    }

    #[test]
    fn test_inside_count_is_clamped() {
        let mut table = table();
        let home = Entity::new(2);
        for _ in 0..5 {
            table.enter(home);
        }
        assert_eq!(table.slots(home).map(|s| s.inside), Some(2));
        for _ in 0..5 {
            table.exit(home);
        }
        assert_eq!(table.slots(home).map(|s| s.inside), Some(0));
        assert!(table.release_dwarf(home));
        assert_eq!(table.slots(home).map(|s| s.assigned), Some(0));
    }

    #[test]
    fn test_spawn_grows_registry() {
        let registry = EntityRegistry::shared(1);
        let transforms = Transform2dManager::shared(&registry);
        let weak = std::rc::Rc::downgrade(&transforms);

        let first = spawn_at(&registry, &weak, Vec2::new(1.0, 2.0)).unwrap();
        let second = spawn_at(&registry, &weak, Vec2::new(3.0, 4.0)).unwrap();
        assert_eq!(second, Entity::new(2));
        assert_eq!(registry.borrow().capacity(), 2);
        assert_eq!(transforms.borrow().position(first), Some(Vec2::new(1.0, 2.0)));
        assert_eq!(transforms.borrow().position(second), Some(Vec2::new(3.0, 4.0)));
    }

    #[test]
    fn test_spawn_fails_at_capacity_ceiling() {
        let registry = EntityRegistry::shared(1);
        registry.borrow_mut().set_max_capacity(2);
        let transforms = Transform2dManager::shared(&registry);
        let weak = std::rc::Rc::downgrade(&transforms);

        spawn_at(&registry, &weak, Vec2::zeros()).unwrap();
        spawn_at(&registry, &weak, Vec2::zeros()).unwrap();
        assert_eq!(
            spawn_at(&registry, &weak, Vec2::zeros()),
            Err(EcsError::OutOfCapacity { capacity: 2 })
        );
        assert_eq!(registry.borrow().capacity(), 2);
        assert_eq!(transforms.borrow().count(), 2);
    }
}
