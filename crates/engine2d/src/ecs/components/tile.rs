//! Tile component
//!
//! A tile is one square of a tilemap. It always sits on a transform: adding a
//! tile to an entity without one adds a default transform first. The parent
//! tilemap is referenced by entity id.

use super::Transform2dManager;
use crate::ecs::{
    share_observer, Component, ComponentConfig, ComponentFactory, ComponentKind, ComponentManager,
    ConfigFields, EcsError, EcsResult, Entity, ResizeObserver, Shared, SharedRegistry, System, INVALID_ENTITY,
};
use crate::editor::{Inspect, InspectorHook, InspectorPanel, InspectorRow};
use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::{Rc, Weak};

/// Identifier of a tile type in the tile asset table
pub type TileTypeId = u32;

/// One square of a tilemap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Tile type; `None` until one is assigned
    pub tile_type: Option<TileTypeId>,
    /// Draw layer inside the tilemap
    pub layer: i32,
    /// Tilemap entity owning this tile, [`INVALID_ENTITY`] when detached
    pub tilemap: Entity,
}

impl Component for Tile {
    const KIND: ComponentKind = ComponentKind::Tile;
}

impl Default for Tile {
    fn default() -> Self {
        Self {
            tile_type: None,
            layer: 0,
            tilemap: INVALID_ENTITY,
        }
    }
}

impl Inspect for Tile {
    fn inspect(&self) -> Vec<InspectorRow> {
        let tile_type = self.tile_type.map_or_else(|| "none".to_string(), |id| id.to_string());
        vec![
            InspectorRow::new("Type", tile_type),
            InspectorRow::new("Layer", self.layer),
            InspectorRow::new("Tilemap", self.tilemap),
        ]
    }
}

/// Storage of tiles
pub struct TileManager {
    store: ComponentManager<Tile>,
    transforms: Weak<RefCell<Transform2dManager>>,
}

impl TileManager {
    /// System name used in scene files
    pub const NAME: &'static str = "tile";

    /// Create a manager placing tiles on the transforms of `transforms`
    pub fn new(registry: SharedRegistry, transforms: &Shared<Transform2dManager>) -> Self {
        Self {
            store: ComponentManager::new(registry),
            transforms: Rc::downgrade(transforms),
        }
    }

    /// Create a shared manager subscribed to registry growth
    pub fn shared(registry: &SharedRegistry, transforms: &Shared<Transform2dManager>) -> Shared<Self> {
        share_observer(Self::new(registry.clone(), transforms), registry)
    }

    /// Add a tile of `tile_type` to `entity`, giving it a transform if it has none
    pub fn add_tile(&mut self, entity: Entity, tile_type: TileTypeId) -> EcsResult<&mut Tile> {
        self.ensure_transform(entity)?;
        let tile = self.store.add_component(entity)?;
        tile.tile_type = Some(tile_type);
        Ok(tile)
    }

    /// Tiles belonging to `tilemap`, in entity order
    pub fn tiles_of(&self, tilemap: Entity) -> Vec<Entity> {
        self.store
            .iter()
            .filter(|(_, tile)| tile.tilemap == tilemap)
            .map(|(entity, _)| entity)
            .collect()
    }

    fn ensure_transform(&self, entity: Entity) -> EcsResult<()> {
        let transforms = self.transforms()?;
        let mut transforms = transforms.borrow_mut();
        if !transforms.has_component(entity)? {
            transforms.add_component(entity)?;
        }
        Ok(())
    }

    fn transforms(&self) -> EcsResult<Rc<RefCell<Transform2dManager>>> {
        self.transforms
            .upgrade()
            .ok_or_else(|| EcsError::init_failure(Self::NAME, "transform manager is gone"))
    }
}

impl Deref for TileManager {
    type Target = ComponentManager<Tile>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl DerefMut for TileManager {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}

impl System for TileManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self) -> EcsResult<()> {
        self.transforms().map(|_| ())
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

impl ComponentFactory for TileManager {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Tile
    }

    fn create_component(&mut self, config: &ComponentConfig, entity: Entity) -> EcsResult<()> {
        let fields = ConfigFields::new(ComponentKind::Tile, config);
        let tile_type = fields.u32("tile_type")?;
        let layer = fields.i32("layer")?;
        let tilemap = fields.u32("tilemap")?;
        let position = fields.vec2("position")?;

        self.ensure_transform(entity)?;
        if let Some(position) = position {
            self.transforms()?.borrow_mut().get_mut(entity)?.position = position;
        }

        let tile = self.store.add_component(entity)?;
        tile.tile_type = tile_type;
        if let Some(layer) = layer {
            tile.layer = layer;
        }
        if let Some(tilemap) = tilemap {
            tile.tilemap = Entity::new(tilemap);
        }
        Ok(())
    }

    fn create_empty_component(&mut self, entity: Entity) -> EcsResult<()> {
        self.ensure_transform(entity)?;
        self.store.add_component(entity).map(|_| ())
    }

    fn destroy_component(&mut self, entity: Entity) -> EcsResult<()> {
        self.store.destroy_component(entity)
    }
}

impl ResizeObserver for TileManager {
    fn on_resize(&mut self, capacity: usize) {
        self.store.resize(capacity);
    }
}

impl InspectorHook for TileManager {
    fn inspect_entity(&self, entity: Entity) -> Option<InspectorPanel> {
        self.store.inspect_entity(entity)
    }
}
