//! Building entities and systems from a scene descriptor

use super::descriptor::component_kind;
use super::{EntityDescriptor, SceneDescriptor, SystemCatalog};
use crate::ecs::{
    ComponentFactory, ComponentKind, EcsError, EcsResult, Entity, SharedRegistry, SystemKey, SystemScheduler,
    INVALID_ENTITY,
};
use crate::foundation::time::Stopwatch;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

/// A descriptor that was skipped, and why
#[derive(Debug, Clone, PartialEq)]
pub enum SceneDiagnostic {
    /// The entity could not be created; none of its components were loaded
    Entity {
        /// Descriptor name or position
        name: String,
        /// Cause
        error: EcsError,
    },
    /// One component descriptor of an otherwise loaded entity
    Component {
        /// Entity being populated
        entity: Entity,
        /// Its display name
        name: String,
        /// Position of the descriptor in the entity's list
        index: usize,
        /// Kind, when the `type` field could be resolved
        kind: Option<ComponentKind>,
        /// Cause
        error: EcsError,
    },
    /// A requested system could not be built or initialized
    System {
        /// Class name or script path
        identifier: String,
        /// Cause
        error: EcsError,
    },
}

impl SceneDiagnostic {
    /// Underlying error
    pub fn error(&self) -> &EcsError {
        match self {
            Self::Entity { error, .. } | Self::Component { error, .. } | Self::System { error, .. } => error,
        }
    }
}

impl fmt::Display for SceneDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entity { name, error } => write!(f, "entity `{name}` skipped: {error}"),
            Self::Component { name, index, kind: Some(kind), error, .. } => {
                write!(f, "`{name}` component #{index} ({kind}) skipped: {error}")
            }
            Self::Component { name, index, kind: None, error, .. } => {
                write!(f, "`{name}` component #{index} skipped: {error}")
            }
            Self::System { identifier, error } => write!(f, "system `{identifier}` skipped: {error}"),
        }
    }
}

/// Outcome of loading one scene
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneReport {
    /// Scene name
    pub name: String,
    /// Entities created, in descriptor order
    pub entities: Vec<Entity>,
    /// Components created successfully
    pub components: usize,
    /// Systems added to the schedule by this scene, including disabled ones
    pub systems: Vec<SystemKey>,
    /// Everything that was skipped
    pub diagnostics: Vec<SceneDiagnostic>,
    /// Components that loaded in a degraded state, such as a sprite without its texture
    pub warnings: Vec<SceneDiagnostic>,
    /// Wall time spent loading
    pub elapsed: Duration,
}

impl SceneReport {
    /// Whether every descriptor loaded; warnings do not count
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Creates scene entities through the registered component factories
pub struct SceneLoader {
    registry: SharedRegistry,
    factories: HashMap<ComponentKind, Rc<RefCell<dyn ComponentFactory>>>,
}

impl SceneLoader {
    /// Create a loader populating `registry`
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            registry,
            factories: HashMap::new(),
        }
    }

    /// Route descriptors of the factory's kind to `factory`
    pub fn register_factory<F: ComponentFactory + 'static>(&mut self, factory: &Rc<RefCell<F>>) {
        let kind = factory.borrow().kind();
        let factory: Rc<RefCell<dyn ComponentFactory>> = factory.clone();
        if self.factories.insert(kind, factory).is_some() {
            log::warn!("Component factory for {} replaced", kind);
        }
    }

    /// Whether a factory handles `kind`
    pub fn has_factory(&self, kind: ComponentKind) -> bool {
        self.factories.contains_key(&kind)
    }

    /// Create the entities and components of `scene`
    pub fn load_entities(&self, scene: &SceneDescriptor) -> SceneReport {
        let watch = Stopwatch::start_new();
        let mut report = SceneReport {
            name: scene.name.clone(),
            ..SceneReport::default()
        };

        for (position, descriptor) in scene.entities.iter().enumerate() {
            let label = descriptor.name.clone().unwrap_or_else(|| format!("#{position}"));
            let entity = match self.create_entity(descriptor) {
                Ok(entity) => entity,
                Err(error) => {
                    log::error!("Scene `{}`: entity `{}` skipped: {}", scene.name, label, error);
                    report.diagnostics.push(SceneDiagnostic::Entity { name: label, error });
                    continue;
                }
            };
            report.entities.push(entity);

            for (index, config) in descriptor.components.iter().enumerate() {
                let kind = component_kind(config);
                let created = kind.clone().and_then(|kind| {
                    let factory = self.factories.get(&kind).ok_or(EcsError::UnregisteredComponentKind(kind))?;
                    let mut factory = factory.try_borrow_mut().map_err(|_| EcsError::SystemFailure {
                        system: kind.name().to_string(),
                        phase: "create_component",
                        reason: "manager is busy".to_string(),
                    })?;
                    let created = factory.create_component(config, entity);
                    let warnings = factory.take_warnings();
                    created.map(|()| warnings)
                });
                match created {
                    Ok(warnings) => {
                        report.components += 1;
                        report.warnings.extend(warnings.into_iter().map(|error| SceneDiagnostic::Component {
                            entity,
                            name: label.clone(),
                            index,
                            kind: kind.clone().ok(),
                            error,
                        }));
                    }
                    Err(error) => {
                        log::error!(
                            "Scene `{}`: `{}` component #{} skipped: {}",
                            scene.name,
                            label,
                            index,
                            error
                        );
                        report.diagnostics.push(SceneDiagnostic::Component {
                            entity,
                            name: label.clone(),
                            index,
                            kind: kind.ok(),
                            error,
                        });
                    }
                }
            }
        }

        report.elapsed = watch.elapsed();
        report
    }

    /// Load entities, then build and initialize the scene's systems
    ///
    /// A system already scheduled under the requested name is initialized if
    /// needed but not added twice.
    pub fn load(
        &self,
        scene: &SceneDescriptor,
        scheduler: &mut SystemScheduler,
        catalog: &SystemCatalog,
    ) -> SceneReport {
        let watch = Stopwatch::start_new();
        log::info!("Loading scene `{}`", scene.name);
        let mut report = self.load_entities(scene);

        for descriptor in &scene.systems {
            let identifier = descriptor.identifier().unwrap_or("<unnamed>").to_string();
            let outcome = match scheduler.key_of(&identifier) {
                Some(key) => {
                    log::debug!("System `{}` already scheduled", identifier);
                    scheduler.init(key)
                }
                None => catalog.construct(descriptor).and_then(|system| {
                    // Systems failing init stay scheduled, disabled, and belong to the scene
                    let (key, result) = scheduler.add_and_init(system);
                    report.systems.push(key);
                    result
                }),
            };
            if let Err(error) = outcome {
                log::error!("Scene `{}`: system `{}` skipped: {}", scene.name, identifier, error);
                report.diagnostics.push(SceneDiagnostic::System { identifier, error });
            }
        }

        report.elapsed = watch.elapsed();
        log::info!(
            "Scene `{}` loaded in {:.3}s: {} entities, {} components, {} systems, {} skipped, {} warnings",
            report.name,
            report.elapsed.as_secs_f32(),
            report.entities.len(),
            report.components,
            report.systems.len(),
            report.diagnostics.len(),
            report.warnings.len()
        );
        report
    }

    fn create_entity(&self, descriptor: &EntityDescriptor) -> EcsResult<Entity> {
        let mut registry = self.registry.borrow_mut();
        let requested = descriptor.id.map_or(INVALID_ENTITY, Entity::new);
        if requested.is_valid() && requested.index() >= registry.capacity() {
            let capacity = registry.capacity();
            registry
                .grow(requested.index().saturating_add(1))
                .map_err(|_| EcsError::InvalidEntity { entity: requested, capacity })?;
        }

        let entity = match registry.create_entity(requested) {
            Err(EcsError::OutOfCapacity { .. }) => {
                registry.grow_doubling()?;
                registry.create_entity(requested)?
            }
            other => other?,
        };
        if let Some(name) = &descriptor.name {
            registry.set_name(entity, name.clone())?;
        }
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::Transform2dManager;
    use crate::ecs::{EntityRegistry, System};
    use crate::foundation::math::Vec2;
    use serde_json::json;

    fn scene(value: serde_json::Value) -> SceneDescriptor {
        SceneDescriptor::from_value(value).unwrap()
    }

    fn loader(capacity: usize) -> (SharedRegistry, Rc<RefCell<Transform2dManager>>, SceneLoader) {
        let registry = EntityRegistry::shared(capacity);
        let transforms = Transform2dManager::shared(&registry);
        let mut loader = SceneLoader::new(registry.clone());
        loader.register_factory(&transforms);
        (registry, transforms, loader)
    }

    #[test]
    fn test_bad_descriptors_are_skipped() {
        let (registry, transforms, loader) = loader(4);
        let report = loader.load_entities(&scene(json!({
            "name": "partial",
            "entities": [{
                "name": "Rock",
                "components": [
                    { "type": 1, "position": "north" },
                    { "type": 2, "path": "rock.png" },
                    { "type": 99 },
                    { "type": "transform", "position": [3, 4] }
                ]
            }]
        })));

        assert_eq!(report.entities.len(), 1);
        assert_eq!(report.components, 1);
        assert_eq!(report.diagnostics.len(), 3);
        assert!(matches!(
            report.diagnostics[1].error(),
            EcsError::UnregisteredComponentKind(ComponentKind::Sprite)
        ));

        let rock = report.entities[0];
        assert_eq!(registry.borrow().name(rock).unwrap(), "Rock");
        assert_eq!(transforms.borrow().position(rock), Some(Vec2::new(3.0, 4.0)));
    }

    #[test]
    fn test_registry_grows_for_scene() {
        let (registry, transforms, loader) = loader(1);
        let report = loader.load_entities(&scene(json!({
            "entities": [
                { "components": [{ "type": 1 }] },
                { "components": [{ "type": 1 }] },
                { "id": 9, "components": [{ "type": 1 }] }
            ]
        })));

        assert!(report.is_clean());
        assert_eq!(report.entities, vec![Entity::new(1), Entity::new(2), Entity::new(9)]);
        assert!(registry.borrow().capacity() >= 9);
        assert_eq!(transforms.borrow().count(), 3);
    }

    #[test]
    fn test_oversized_id_is_skipped_without_growth() {
        let (registry, _transforms, loader) = loader(2);
        registry.borrow_mut().set_max_capacity(16);
        let report = loader.load_entities(&scene(json!({
            "entities": [
                { "id": 3_000_000, "name": "far", "components": [{ "type": 1 }] },
                { "id": 4_294_967_295u32, "name": "farther" },
                { "name": "near", "components": [{ "type": 1 }] }
            ]
        })));

        assert_eq!(report.entities, vec![Entity::new(1)]);
        assert_eq!(report.diagnostics.len(), 2);
        assert!(matches!(
            report.diagnostics[0],
            SceneDiagnostic::Entity { ref name, error: EcsError::InvalidEntity { capacity: 2, .. } } if name == "far"
        ));
        assert_eq!(registry.borrow().capacity(), 2);
    }

    #[test]
    fn test_doubling_stops_at_ceiling() {
        let (registry, _transforms, loader) = loader(2);
        registry.borrow_mut().set_max_capacity(3);
        let report = loader.load_entities(&scene(json!({
            "entities": [{}, {}, {}, { "name": "fourth" }]
        })));

        assert_eq!(report.entities.len(), 3);
        assert!(matches!(
            report.diagnostics[0],
            SceneDiagnostic::Entity { ref name, error: EcsError::OutOfCapacity { capacity: 3 } } if name == "fourth"
        ));
        assert_eq!(registry.borrow().capacity(), 3);
    }

    #[test]
    fn test_duplicate_id_skips_entity() {
        let (_registry, _transforms, loader) = loader(4);
        let report = loader.load_entities(&scene(json!({
            "entities": [
                { "id": 2, "name": "first" },
                { "id": 2, "name": "second", "components": [{ "type": 1 }] }
            ]
        })));
        assert_eq!(report.entities, vec![Entity::new(2)]);
        assert_eq!(report.components, 0);
        assert!(matches!(
            report.diagnostics[0],
            SceneDiagnostic::Entity { ref name, error: EcsError::EntityAlreadyExists(_) } if name == "second"
        ));
    }

    #[test]
    fn test_systems_are_resolved() {
        struct Idle;
        impl System for Idle {
            fn name(&self) -> &str {
                "idle"
            }
        }

        let (_registry, transforms, loader) = loader(4);
        let mut scheduler = SystemScheduler::new(0.02, 5);
        scheduler.add_and_init(transforms.clone()).1.unwrap();
        let mut catalog = SystemCatalog::new();
        catalog.register("idle", || Rc::new(RefCell::new(Idle)));

        let report = loader.load(
            &scene(json!({
                "systems": [
                    { "systemClassName": "idle" },
                    { "systemClassName": "transform2d" },
                    { "systemClassName": "missing" }
                ]
            })),
            &mut scheduler,
            &catalog,
        );
        assert_eq!(report.systems.len(), 1);
        assert_eq!(scheduler.names(), vec!["transform2d", "idle"]);
        assert!(matches!(
            report.diagnostics.as_slice(),
            [SceneDiagnostic::System { identifier, .. }] if identifier == "missing"
        ));
    }
}
