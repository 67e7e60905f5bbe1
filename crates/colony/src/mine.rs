//! Mines: dwarves inside dig iron into packs

use crate::buildings::{despawn, spawn_at, BuildingTable, DwarfSlots, ResourceType};
use crate::config::BuildingConfig;
use engine2d::prelude::*;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Iron held by one mine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IronStore {
    /// Loose iron not yet packed
    pub loose: f32,
    /// Finished packs waiting for pickup
    pub packs: u32,
    /// Units per pack
    pub pack_size: u32,
    /// Packed iron limit
    pub capacity: u32,
}

impl IronStore {
    fn is_full(&self) -> bool {
        self.packs * self.pack_size >= self.capacity
    }
}

/// Produces iron packs while dwarves work inside
pub struct MineManager {
    registry: SharedRegistry,
    transforms: Weak<RefCell<Transform2dManager>>,
    config: BuildingConfig,
    table: BuildingTable<IronStore>,
}

impl MineManager {
    /// System name used in scene files
    pub const NAME: &'static str = "mine_manager";

    /// Create a manager placing mines through `transforms`
    pub fn new(registry: SharedRegistry, transforms: &Shared<Transform2dManager>, config: BuildingConfig) -> Self {
        Self {
            registry,
            transforms: Rc::downgrade(transforms),
            config,
            table: BuildingTable::default(),
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

    /// Dig a mine at `position`
    pub fn add_building(&mut self, position: Vec2) -> EcsResult<Entity> {
        let entity = spawn_at(&self.registry, &self.transforms, position)?;
        self.registry.borrow_mut().set_name(entity, format!("Mine {}", entity.id()))?;
        let store = IronStore {
            loose: 0.0,
            packs: 0,
            pack_size: self.config.pack_size,
            capacity: self.config.mine_capacity,
        };
        self.table.insert(entity, DwarfSlots::new(self.config.dwarf_capacity), store);
        Ok(entity)
    }

    /// Close a mine; false when `entity` is not one
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

    /// First mine with room for another worker
    pub fn free_slot(&self) -> Option<Entity> {
        self.table.free_slot()
    }

    /// A dwarf started working in `entity`
    pub fn dwarf_enter(&mut self, entity: Entity) -> bool {
        self.table.enter(entity)
    }

    /// A dwarf stopped working in `entity`
    pub fn dwarf_exit(&mut self, entity: Entity) -> bool {
        self.table.exit(entity)
    }

    /// Resource mines produce
    pub fn resource_type(&self) -> ResourceType {
        ResourceType::Iron
    }

    /// First mine with a pack ready
    pub fn building_with_resources(&self) -> Option<Entity> {
        self.table
            .iter()
            .find(|(_, _, store)| store.packs > 0)
            .map(|(entity, _, _)| entity)
    }

    /// Take one pack from `entity`, returning its size or zero when none is ready
    pub fn take_pack(&mut self, entity: Entity) -> u32 {
        match self.table.inventory_mut(entity) {
            Some(store) if store.packs > 0 => {
                store.packs -= 1;
                store.pack_size
            }
            _ => 0,
        }
    }

    /// Iron held by `entity`
    pub fn store(&self, entity: Entity) -> Option<IronStore> {
        self.table.inventory(entity).copied()
    }

    /// Mines in row order
    pub fn buildings(&self) -> Vec<Entity> {
        self.table.entities()
    }

    fn produce(&mut self) {
        let rate = self.config.production_rate;
        for (_, slots, store) in self.table.iter_mut() {
            if store.is_full() {
                continue;
            }
            store.loose += rate * slots.inside as f32;
            if store.loose >= store.pack_size as f32 {
                store.loose -= store.pack_size as f32;
                store.packs += 1;
            }
        }
    }
}

impl System for MineManager {
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
        self.produce();
        Ok(())
    }

    fn clear(&mut self) {
        self.table.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mines(config: BuildingConfig) -> (Shared<Transform2dManager>, MineManager) {
        let registry = EntityRegistry::shared(2);
        let transforms = Transform2dManager::shared(&registry);
        let manager = MineManager::new(registry, &transforms, config);
        (transforms, manager)
    }

    #[test]
    fn test_workers_fill_packs_until_full() {
        let config = BuildingConfig {
            production_rate: 1.0,
            pack_size: 2,
            mine_capacity: 4,
            ..BuildingConfig::default()
        };
        let (_transforms, mut mines) = mines(config);
        let mine = mines.add_building(Vec2::new(5.0, 5.0)).unwrap();
        mines.dwarf_enter(mine);

        mines.fixed_update(0.02).unwrap();
        assert_eq!(mines.building_with_resources(), None);
        mines.fixed_update(0.02).unwrap();
        assert_eq!(mines.building_with_resources(), Some(mine));

        for _ in 0..10 {
            mines.fixed_update(0.02).unwrap();
        }
        assert_eq!(mines.store(mine).map(|store| store.packs), Some(2));

        assert_eq!(mines.take_pack(mine), 2);
        assert_eq!(mines.take_pack(mine), 2);
        assert_eq!(mines.take_pack(mine), 0);
        assert_eq!(mines.building_with_resources(), None);
    }

    #[test]
    fn test_idle_mine_produces_nothing() {
        let (_transforms, mut mines) = mines(BuildingConfig::default());
        let mine = mines.add_building(Vec2::zeros()).unwrap();
        mines.fixed_update(0.02).unwrap();
        assert_eq!(mines.store(mine).map(|store| store.packs), Some(0));
        assert_eq!(mines.resource_type(), ResourceType::Iron);
        assert!(mines.free_slot().is_some());
    }
}
