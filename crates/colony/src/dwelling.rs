//! Dwellings: where dwarves live and eat

use crate::buildings::{despawn, spawn_at, BuildingTable, DwarfSlots, ResourceType};
use crate::config::BuildingConfig;
use engine2d::prelude::*;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Food stored in one dwelling
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FoodStore {
    /// Food available
    pub amount: f32,
    /// Storage limit
    pub capacity: f32,
    cooldown: u32,
}

impl FoodStore {
    fn new(capacity: f32) -> Self {
        Self {
            amount: 0.0,
            capacity,
            cooldown: 0,
        }
    }
}

/// Houses dwarves and feeds the ones inside
pub struct DwellingManager {
    registry: SharedRegistry,
    transforms: Weak<RefCell<Transform2dManager>>,
    config: BuildingConfig,
    table: BuildingTable<FoodStore>,
    unhappiness: u64,
}

impl DwellingManager {
    /// System name used in scene files
    pub const NAME: &'static str = "dwelling_manager";

    /// Create a manager placing dwellings through `transforms`
    pub fn new(registry: SharedRegistry, transforms: &Shared<Transform2dManager>, config: BuildingConfig) -> Self {
        Self {
            registry,
            transforms: Rc::downgrade(transforms),
            config,
            table: BuildingTable::default(),
            unhappiness: 0,
        }
    }

    /// Create a shared manager
    pub fn shared(
        registry: &SharedRegistry,
        transforms: &Shared<Transform2dManager>,
        config: BuildingConfig,
    ) -> Shared<Self> {
        Rc::new(RefCell::new(Self::new(registry.clone(), transforms, config)))
    }

    /// Build a dwelling at `position`
    pub fn add_building(&mut self, position: Vec2) -> EcsResult<Entity> {
        let entity = spawn_at(&self.registry, &self.transforms, position)?;
        self.registry.borrow_mut().set_name(entity, format!("Dwelling {}", entity.id()))?;
        let row = self.table.insert(
            entity,
            DwarfSlots::new(self.config.dwarf_capacity),
            FoodStore::new(self.config.food_capacity),
        );
        log::debug!("Dwelling {} built at ({}, {}) in row {}", entity, position.x, position.y, row);
        Ok(entity)
    }

    /// Tear down a dwelling; false when `entity` is not one
    pub fn destroy_building(&mut self, entity: Entity) -> EcsResult<bool> {
        if !self.table.remove(entity) {
            return Ok(false);
        }
        despawn(&self.registry, &self.transforms, entity)?;
        Ok(true)
    }

    /// Assign a dwarf to `entity`
    pub fn assign_dwarf(&mut self, entity: Entity) -> bool {
        self.table.assign_dwarf(entity)
    }

    /// Release a dwarf assigned to `entity`
    pub fn release_dwarf(&mut self, entity: Entity) -> bool {
        self.table.release_dwarf(entity)
    }

    /// First dwelling with room for another dwarf
    pub fn free_slot(&self) -> Option<Entity> {
        self.table.free_slot()
    }

    /// A dwarf walked into `entity`
    pub fn dwarf_enter(&mut self, entity: Entity) -> bool {
        self.table.enter(entity)
    }

    /// A dwarf left `entity`
    pub fn dwarf_exit(&mut self, entity: Entity) -> bool {
        self.table.exit(entity)
    }

    /// Dwarf slots of `entity`
    pub fn slots(&self, entity: Entity) -> Option<DwarfSlots> {
        self.table.slots(entity)
    }

    /// Resources dwellings accept
    pub fn needed_resources(&self) -> &'static [ResourceType] {
        &[ResourceType::Food]
    }

    /// Deliver `amount` of `resource`, returning what did not fit
    pub fn give_resources(&mut self, entity: Entity, amount: f32, resource: ResourceType) -> f32 {
        if resource != ResourceType::Food {
            return amount;
        }
        let Some(store) = self.table.inventory_mut(entity) else {
            return amount;
        };
        store.amount += amount;
        let excess = store.amount - store.capacity;
        if excess > 0.0 {
            store.amount = store.capacity;
            excess
        } else {
            0.0
        }
    }

    /// Food stored in `entity`
    pub fn food(&self, entity: Entity) -> Option<f32> {
        self.table.inventory(entity).map(|store| store.amount)
    }

    /// Times a dwelling ran out of food
    pub fn unhappiness(&self) -> u64 {
        self.unhappiness
    }

    /// Dwellings in row order
    pub fn buildings(&self) -> Vec<Entity> {
        self.table.entities()
    }

    /// One meal tick: dwarves inside eat once per cooldown
    fn consume(&mut self) {
        let cooldown_frames = self.config.meal_cooldown_frames;
        let mut starving = 0;
        for (entity, slots, store) in self.table.iter_mut() {
            if store.amount <= 0.0 {
                starving += 1;
                continue;
            }
            if slots.inside == 0 {
                continue;
            }

            store.cooldown += 1;
            if store.cooldown < cooldown_frames {
                continue;
            }
            store.cooldown = 0;
            store.amount -= slots.inside as f32;
            if store.amount < 0.0 {
                store.amount = 0.0;
                log::debug!("Dwelling {} ran out of food", entity);
                starving += 1;
            }
        }
        self.unhappiness += starving;
    }
}

impl System for DwellingManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self) -> EcsResult<()> {
        if self.transforms.upgrade().is_none() {
            return Err(EcsError::init_failure(Self::NAME, "transform manager is gone"));
        }
        Ok(())
    }

    fn fixed_update(&mut self, _fixed_delta_time: f32) -> EcsResult<()> {
        self.consume();
        Ok(())
    }

    fn clear(&mut self) {
        self.table.clear();
        self.unhappiness = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn manager(config: BuildingConfig) -> (SharedRegistry, Shared<Transform2dManager>, DwellingManager) {
        let registry = EntityRegistry::shared(4);
        let transforms = Transform2dManager::shared(&registry);
        let manager = DwellingManager::new(registry.clone(), &transforms, config);
        (registry, transforms, manager)
    }

    #[test]
    fn test_building_gets_transform_and_name() {
        let (registry, transforms, mut dwellings) = manager(BuildingConfig::default());
        let home = dwellings.add_building(Vec2::new(10.0, 20.0)).unwrap();
        assert_eq!(transforms.borrow().position(home), Some(Vec2::new(10.0, 20.0)));
        assert_eq!(registry.borrow().name(home).unwrap(), format!("Dwelling {}", home.id()));
        assert_eq!(dwellings.free_slot(), Some(home));
    }

    #[test]
    fn test_destroyed_dwelling_slot_is_skipped_then_reused() {
        let config = BuildingConfig {
            dwarf_capacity: 1,
            ..BuildingConfig::default()
        };
        let (registry, _transforms, mut dwellings) = manager(config);
        let first = dwellings.add_building(Vec2::zeros()).unwrap();
        let second = dwellings.add_building(Vec2::zeros()).unwrap();

        assert!(dwellings.destroy_building(first).unwrap());
        assert!(!dwellings.destroy_building(first).unwrap());
        assert!(!registry.borrow().is_alive(first));
        assert_eq!(dwellings.free_slot(), Some(second));

        assert!(dwellings.assign_dwarf(second));
        assert_eq!(dwellings.free_slot(), None);

        let third = dwellings.add_building(Vec2::zeros()).unwrap();
        assert_eq!(dwellings.buildings(), vec![third, second]);
        assert_eq!(dwellings.free_slot(), Some(third));
    }

    #[test]
    fn test_give_resources_returns_excess() {
        let (_registry, _transforms, mut dwellings) = manager(BuildingConfig::default());
        let home = dwellings.add_building(Vec2::zeros()).unwrap();

        assert_relative_eq!(dwellings.give_resources(home, 60.0, ResourceType::Food), 0.0);
        assert_relative_eq!(dwellings.give_resources(home, 60.0, ResourceType::Food), 20.0);
        assert_relative_eq!(dwellings.give_resources(home, 5.0, ResourceType::Iron), 5.0);
        assert_relative_eq!(dwellings.food(home).unwrap(), 100.0);
    }

    #[test]
    fn test_dwarves_inside_eat_after_cooldown() {
        let config = BuildingConfig {
            meal_cooldown_frames: 3,
            ..BuildingConfig::default()
        };
        let (_registry, _transforms, mut dwellings) = manager(config);
        let home = dwellings.add_building(Vec2::zeros()).unwrap();
        dwellings.give_resources(home, 3.0, ResourceType::Food);
        dwellings.dwarf_enter(home);
        dwellings.dwarf_enter(home);

        for _ in 0..3 {
            dwellings.fixed_update(0.02).unwrap();
        }
        assert_relative_eq!(dwellings.food(home).unwrap(), 1.0);
        assert_eq!(dwellings.unhappiness(), 0);

        for _ in 0..3 {
            dwellings.fixed_update(0.02).unwrap();
        }
        assert_relative_eq!(dwellings.food(home).unwrap(), 0.0);
        assert_eq!(dwellings.unhappiness(), 1);
    }
}
