//! End-to-end walkthroughs of entity creation, capacity and scene loading

use crate::assets::FileTextureCatalog;
use crate::core::ApplicationConfig;
use crate::ecs::components::{Sprite, SpriteManager, Transform2d, Transform2dManager};
use crate::ecs::{ComponentKind, EcsError, Entity, EntityRegistry, INVALID_ENTITY};
use crate::foundation::math::Vec2;
use crate::scene::{SceneDescriptor, SceneDiagnostic};
use crate::Engine;
use serde_json::json;

#[test]
fn test_first_entity_and_component_query() {
    let registry = EntityRegistry::shared(10);
    let transforms = Transform2dManager::shared(&registry);
    let textures = Box::new(FileTextureCatalog::new(std::env::temp_dir()));
    let _sprites = SpriteManager::shared(&registry, &transforms, textures);

    let entity = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();
    assert_eq!(entity, Entity::new(1));
    transforms.borrow_mut().add_component(entity).unwrap();

    let registry = registry.borrow();
    assert_eq!(registry.has_component(entity, ComponentKind::Transform2d), Ok(true));
    assert_eq!(registry.has_component(entity, ComponentKind::Sprite), Ok(false));
}

#[test]
fn test_out_of_capacity_until_resize() {
    let mut registry = EntityRegistry::new(2);
    assert_eq!(registry.create_entity(INVALID_ENTITY), Ok(Entity::new(1)));
    assert_eq!(registry.create_entity(INVALID_ENTITY), Ok(Entity::new(2)));
    assert_eq!(
        registry.create_entity(INVALID_ENTITY),
        Err(EcsError::OutOfCapacity { capacity: 2 })
    );

    registry.resize_capacity(3);
    assert_eq!(registry.create_entity(INVALID_ENTITY), Ok(Entity::new(3)));
}

#[test]
fn test_destroyed_component_comes_back_default() {
    let registry = EntityRegistry::shared(4);
    let transforms = Transform2dManager::shared(&registry);
    let entity = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();
    {
        let mut transforms = transforms.borrow_mut();
        let transform = transforms.add_component(entity).unwrap();
        transform.position = Vec2::new(12.0, -3.0);
        transform.angle = 45.0;
    }

    transforms.borrow_mut().destroy_component(entity).unwrap();
    assert_eq!(
        transforms.borrow().get(entity).err(),
        Some(EcsError::MissingComponent { entity, kind: ComponentKind::Transform2d })
    );

    let fresh = *transforms.borrow_mut().add_component(entity).unwrap();
    assert_eq!(fresh, Transform2d::default());
}

#[test]
fn test_missing_sprite_texture_loads_placeholder() {
    let mut config = ApplicationConfig::default();
    config.engine = config.engine.with_entity_capacity(4);
    config.assets = config.assets.with_data_dir(std::env::temp_dir().join("engine2d-no-such-dir"));
    let mut engine = Engine::new(config).unwrap();

    let scene = SceneDescriptor::from_value(json!({
        "name": "placeholder",
        "entities": [{
            "name": "Lonely",
            "components": [
                { "type": "transform", "position": [5, 5] },
                { "type": "sprite", "path": "missing.png" }
            ]
        }]
    }))
    .unwrap();
    let report = engine.load_scene_descriptor(&scene);
    assert_eq!(report.components, 2);
    assert!(report.is_clean());
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(
        report.warnings[0],
        SceneDiagnostic::Component {
            index: 1,
            kind: Some(ComponentKind::Sprite),
            error: EcsError::InvalidComponentConfig { ref field, .. },
            ..
        } if field == "path"
    ));

    let entity = report.entities[0];
    let registry = engine.registry().borrow();
    assert_eq!(registry.has_component(entity, ComponentKind::Transform2d), Ok(true));
    assert_eq!(registry.has_component(entity, ComponentKind::Sprite), Ok(true));
    assert_eq!(
        engine.transforms().borrow().position(entity),
        Some(Vec2::new(5.0, 5.0))
    );

    let sprites = engine.sprites().borrow();
    let sprite: &Sprite = sprites.get(entity).unwrap();
    assert!(sprite.is_placeholder());
    assert_eq!(sprite.texture_path, "missing.png");
}
