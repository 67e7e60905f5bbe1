//! Sprite component
//!
//! A sprite draws a texture at its entity's transform. The transform is looked
//! up by entity id every frame; the sprite never holds a reference to it.
//!
//! When a texture cannot be resolved the sprite is still attached with
//! `texture = None` and draws as a placeholder. A warning names the path.

use super::Transform2dManager;
use crate::assets::{TextureCatalog, TextureId};
use crate::ecs::{
    share_observer, Component, ComponentConfig, ComponentFactory, ComponentKind, ComponentManager,
    ComponentMask, ConfigFields, EcsError, EcsResult, Entity, ResizeObserver, Shared, SharedRegistry, System,
};
use crate::editor::{Inspect, InspectorHook, InspectorPanel, InspectorRow};
use crate::render::{DrawCommand, RenderQueue};
use std::cell::RefCell;
use std::ops::{Deref, DerefMut};
use std::rc::{Rc, Weak};

/// Textured quad drawn at the entity's transform
#[derive(Debug, Clone, PartialEq)]
pub struct Sprite {
    /// Texture path as written in the scene
    pub texture_path: String,
    /// Resolved texture; `None` draws a placeholder
    pub texture: Option<TextureId>,
    /// Draw layer; higher layers are drawn on top
    pub layer: i32,
    /// Hidden sprites emit no draw command
    pub visible: bool,
}

impl Component for Sprite {
    const KIND: ComponentKind = ComponentKind::Sprite;
}

impl Default for Sprite {
    fn default() -> Self {
        Self {
            texture_path: String::new(),
            texture: None,
            layer: 0,
            visible: true,
        }
    }
}

impl Sprite {
    /// Whether the sprite draws the placeholder
    pub fn is_placeholder(&self) -> bool {
        self.texture.is_none()
    }
}

impl Inspect for Sprite {
    fn inspect(&self) -> Vec<InspectorRow> {
        vec![
            InspectorRow::new("Texture", &self.texture_path),
            InspectorRow::new("Loaded", self.texture.is_some()),
            InspectorRow::new("Layer", self.layer),
            InspectorRow::new("Visible", self.visible),
        ]
    }
}

/// Storage and draw emission of sprites
pub struct SpriteManager {
    store: ComponentManager<Sprite>,
    transforms: Weak<RefCell<Transform2dManager>>,
    textures: Box<dyn TextureCatalog>,
    queue: Rc<RefCell<RenderQueue>>,
    warnings: Vec<EcsError>,
}

impl SpriteManager {
    /// System name used in scene files
    pub const NAME: &'static str = "sprite";

    /// Create a manager drawing at the transforms of `transforms`
    pub fn new(
        registry: SharedRegistry,
        transforms: &Shared<Transform2dManager>,
        textures: Box<dyn TextureCatalog>,
    ) -> Self {
        Self {
            store: ComponentManager::new(registry),
            transforms: Rc::downgrade(transforms),
            textures,
            queue: Rc::new(RefCell::new(RenderQueue::new())),
            warnings: Vec::new(),
        }
    }

    /// Create a shared manager subscribed to registry growth
    pub fn shared(
        registry: &SharedRegistry,
        transforms: &Shared<Transform2dManager>,
        textures: Box<dyn TextureCatalog>,
    ) -> Shared<Self> {
        share_observer(Self::new(registry.clone(), transforms, textures), registry)
    }

    /// Send draw commands to `queue` instead of the manager's own queue
    pub fn with_render_queue(mut self, queue: Rc<RefCell<RenderQueue>>) -> Self {
        self.queue = queue;
        self
    }

    /// Queue filled by the draw phase
    pub fn render_queue(&self) -> Rc<RefCell<RenderQueue>> {
        self.queue.clone()
    }

    /// Texture catalog used to resolve paths
    pub fn textures(&self) -> &dyn TextureCatalog {
        self.textures.as_ref()
    }

    /// Point the sprite of `entity` at a new texture
    ///
    /// The sprite is kept with a placeholder when the texture cannot be
    /// resolved; the error is returned so callers can report it.
    pub fn set_texture(&mut self, entity: Entity, path: &str) -> EcsResult<()> {
        let resolved = self.textures.load(path);
        let sprite = self.store.get_mut(entity)?;
        sprite.texture_path = path.to_string();
        match resolved {
            Ok(id) => {
                sprite.texture = Some(id);
                Ok(())
            }
            Err(e) => {
                sprite.texture = None;
                log::warn!("Sprite of {} uses a placeholder: {}", entity, e);
                Err(EcsError::config(ComponentKind::Sprite, "path", e.to_string()))
            }
        }
    }

    fn transforms(&self) -> EcsResult<Rc<RefCell<Transform2dManager>>> {
        self.transforms
            .upgrade()
            .ok_or_else(|| EcsError::init_failure(Self::NAME, "transform manager is gone"))
    }
}

impl Deref for SpriteManager {
    type Target = ComponentManager<Sprite>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl DerefMut for SpriteManager {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}

impl System for SpriteManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn init(&mut self) -> EcsResult<()> {
        self.transforms().map(|_| ())
    }

    fn draw(&mut self) -> EcsResult<()> {
        let transforms = self.transforms()?;
        let transforms = transforms.borrow();
        let mut queue = self.queue.borrow_mut();
        queue.clear();

        let mask = ComponentMask::SPRITE | ComponentMask::TRANSFORM_2D;
        let entities = self.store.registry().borrow().entities_with(mask);
        for entity in entities {
            let (Some(sprite), Some(transform)) = (self.store.try_get(entity), transforms.try_get(entity)) else {
                continue;
            };
            if !sprite.visible {
                continue;
            }
            queue.push(DrawCommand {
                entity,
                texture: sprite.texture,
                texture_path: sprite.texture_path.clone(),
                transform: transform.matrix(),
                position: transform.position,
                layer: sprite.layer,
            });
        }
        queue.sort_commands();
        Ok(())
    }

    fn apply_pending_destroys(&mut self) -> usize {
        self.store.apply_pending_destroys()
    }

    fn clear(&mut self) {
        self.store.clear();
        self.queue.borrow_mut().clear();
    }

    fn collect(&mut self) {
        self.store.collect();
        self.textures.clear();
    }
}

impl ComponentFactory for SpriteManager {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Sprite
    }

    fn create_component(&mut self, config: &ComponentConfig, entity: Entity) -> EcsResult<()> {
        let fields = ConfigFields::new(ComponentKind::Sprite, config);
        let path = fields.str("path")?;
        let path = fields.require("path", path)?;
        let layer = fields.i32("layer")?;

        if !self.transforms()?.borrow().has_component(entity)? {
            log::warn!("Sprite of {} has no transform yet and will not draw until it gets one", entity);
        }

        let sprite = self.store.add_component(entity)?;
        if let Some(layer) = layer {
            sprite.layer = layer;
        }
        // A missing texture keeps the sprite as a placeholder
        if let Err(e) = self.set_texture(entity, path) {
            self.warnings.push(e);
        }
        Ok(())
    }

    fn create_empty_component(&mut self, entity: Entity) -> EcsResult<()> {
        self.store.add_component(entity).map(|_| ())
    }

    fn destroy_component(&mut self, entity: Entity) -> EcsResult<()> {
        self.store.destroy_component(entity)
    }

    fn take_warnings(&mut self) -> Vec<EcsError> {
        std::mem::take(&mut self.warnings)
    }
}

impl ResizeObserver for SpriteManager {
    fn on_resize(&mut self, capacity: usize) {
        self.store.resize(capacity);
    }
}

impl InspectorHook for SpriteManager {
    fn inspect_entity(&self, entity: Entity) -> Option<InspectorPanel> {
        self.store.inspect_entity(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::FileTextureCatalog;
    use crate::ecs::{EntityRegistry, INVALID_ENTITY};
    use crate::foundation::math::Vec2;
    use serde_json::json;

    fn setup() -> (SharedRegistry, Shared<Transform2dManager>, SpriteManager) {
        let registry = EntityRegistry::shared(8);
        let transforms = Transform2dManager::shared(&registry);
        let catalog = FileTextureCatalog::new(std::env::temp_dir().join("engine2d_no_textures_here"));
        let sprites = SpriteManager::new(registry.clone(), &transforms, Box::new(catalog));
        (registry, transforms, sprites)
    }

    fn config(value: serde_json::Value) -> ComponentConfig {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_missing_texture_keeps_placeholder() {
        let (registry, _transforms, mut sprites) = setup();
        let entity = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();

        sprites
            .create_component(&config(json!({ "path": "missing.png", "layer": 2 })), entity)
            .unwrap();
        let sprite = sprites.get(entity).unwrap();
        assert!(sprite.is_placeholder());
        assert_eq!(sprite.texture_path, "missing.png");
        assert_eq!(sprite.layer, 2);

        let warnings = sprites.take_warnings();
        assert!(matches!(
            warnings.as_slice(),
            [EcsError::InvalidComponentConfig { kind: ComponentKind::Sprite, field, .. }] if field == "path"
        ));
        assert!(sprites.take_warnings().is_empty());
    }

    #[test]
    fn test_path_is_required() {
        let (registry, _transforms, mut sprites) = setup();
        let entity = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();
        let result = sprites.create_component(&config(json!({ "layer": 1 })), entity);
        assert!(matches!(result, Err(EcsError::InvalidComponentConfig { .. })));
        assert_eq!(sprites.has_component(entity), Ok(false));
    }

    #[test]
    fn test_draw_needs_transform_and_visibility() {
        let (registry, transforms, mut sprites) = setup();
        let drawn = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();
        let hidden = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();
        let floating = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();

        for entity in [drawn, hidden] {
            transforms.borrow_mut().add_component(entity).unwrap().position = Vec2::new(3.0, 4.0);
        }
        for entity in [drawn, hidden, floating] {
            sprites.add_component(entity).unwrap();
        }
        sprites.get_mut(hidden).unwrap().visible = false;

        sprites.init().unwrap();
        sprites.draw().unwrap();
        let queue = sprites.render_queue();
        let mut queue = queue.borrow_mut();
        let commands = queue.commands();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].entity, drawn);
        assert_eq!(commands[0].position, Vec2::new(3.0, 4.0));
    }

    #[test]
    fn test_init_fails_without_transforms() {
        let (_registry, transforms, mut sprites) = setup();
        drop(transforms);
        assert!(matches!(sprites.init(), Err(EcsError::SystemInitFailure { .. })));
    }
}
