//! Script behaviours attached to entities
//!
//! An entity may carry several behaviour scripts. The manager calls every
//! script of every entity in each phase. A script that fails is detached from
//! that entity only; the other scripts and entities keep running.

use crate::ecs::{
    share_observer, Component, ComponentConfig, ComponentFactory, ComponentKind, ComponentManager,
    ConfigFields, EcsError, EcsResult, Entity, ResizeObserver, Shared, SharedRegistry, System,
};
use crate::editor::{Inspect, InspectorHook, InspectorPanel, InspectorRow};
use crate::script::{ScriptContext, ScriptHook, SharedScriptHost};
use std::ops::{Deref, DerefMut};

/// Script paths driving one entity
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Behavior {
    /// Scripts in attach order
    pub scripts: Vec<String>,
}

impl Component for Behavior {
    const KIND: ComponentKind = ComponentKind::Behavior;
}

impl Inspect for Behavior {
    fn inspect(&self) -> Vec<InspectorRow> {
        self.scripts
            .iter()
            .enumerate()
            .map(|(index, script)| InspectorRow::new(format!("Script {index}"), script))
            .collect()
    }
}

/// Storage and dispatch of behaviour scripts
pub struct BehaviorManager {
    store: ComponentManager<Behavior>,
    host: SharedScriptHost,
}

impl BehaviorManager {
    /// System name used in scene files
    pub const NAME: &'static str = "behavior";

    /// Create a manager running scripts through `host`
    pub fn new(registry: SharedRegistry, host: SharedScriptHost) -> Self {
        Self {
            store: ComponentManager::new(registry),
            host,
        }
    }

    /// Create a shared manager subscribed to registry growth
    pub fn shared(registry: &SharedRegistry, host: SharedScriptHost) -> Shared<Self> {
        share_observer(Self::new(registry.clone(), host), registry)
    }

    /// Attach `path` to `entity`, adding the component if needed
    ///
    /// The script is loaded and its init hook runs immediately.
    pub fn attach_script(&mut self, entity: Entity, path: &str) -> EcsResult<()> {
        let init = {
            let mut host = self
                .host
                .try_borrow_mut()
                .map_err(|_| EcsError::config(ComponentKind::Behavior, "script_path", "script host is busy"))?;
            host.load(path)
                .and_then(|()| host.call(path, ScriptHook::Init, ScriptContext::entity(entity, 0.0)))
        };
        init.map_err(|e| EcsError::config(ComponentKind::Behavior, "script_path", e.to_string()))?;

        if !self.store.has_component(entity)? {
            self.store.add_component(entity)?;
        }
        let behavior = self.store.get_mut(entity)?;
        if !behavior.scripts.iter().any(|script| script == path) {
            behavior.scripts.push(path.to_string());
        }
        Ok(())
    }

    /// Scripts attached to `entity`
    pub fn scripts(&self, entity: Entity) -> &[String] {
        self.store.try_get(entity).map_or(&[], |behavior| behavior.scripts.as_slice())
    }

    fn dispatch(&mut self, hook: ScriptHook, delta_time: f32) -> EcsResult<()> {
        let Ok(mut host) = self.host.try_borrow_mut() else {
            return Err(EcsError::SystemFailure {
                system: Self::NAME.to_string(),
                phase: "dispatch",
                reason: "script host is busy".to_string(),
            });
        };

        for (entity, behavior) in self.store.iter_mut() {
            let context = ScriptContext::entity(entity, delta_time);
            behavior.scripts.retain(|script| match host.call(script, hook, context) {
                Ok(()) => true,
                Err(e) => {
                    log::error!("Detaching {} from {}: {}", script, entity, e);
                    false
                }
            });
        }
        Ok(())
    }
}

impl Deref for BehaviorManager {
    type Target = ComponentManager<Behavior>;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

impl DerefMut for BehaviorManager {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.store
    }
}

impl System for BehaviorManager {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn update(&mut self, delta_time: f32) -> EcsResult<()> {
        self.dispatch(ScriptHook::Update, delta_time)
    }

    fn fixed_update(&mut self, fixed_delta_time: f32) -> EcsResult<()> {
        self.dispatch(ScriptHook::FixedUpdate, fixed_delta_time)
    }

    fn draw(&mut self) -> EcsResult<()> {
        self.dispatch(ScriptHook::Draw, 0.0)
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

impl ComponentFactory for BehaviorManager {
    fn kind(&self) -> ComponentKind {
        ComponentKind::Behavior
    }

    /// Each descriptor attaches one script; repeated descriptors append
    fn create_component(&mut self, config: &ComponentConfig, entity: Entity) -> EcsResult<()> {
        let fields = ConfigFields::new(ComponentKind::Behavior, config);
        let path = fields.str("script_path")?;
        let path = fields.require("script_path", path)?;
        self.attach_script(entity, path)
    }

    fn create_empty_component(&mut self, entity: Entity) -> EcsResult<()> {
        self.store.add_component(entity).map(|_| ())
    }

    fn destroy_component(&mut self, entity: Entity) -> EcsResult<()> {
        self.store.destroy_component(entity)
    }
}

impl ResizeObserver for BehaviorManager {
    fn on_resize(&mut self, capacity: usize) {
        self.store.resize(capacity);
    }
}

impl InspectorHook for BehaviorManager {
    fn inspect_entity(&self, entity: Entity) -> Option<InspectorPanel> {
        self.store.inspect_entity(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{EntityRegistry, INVALID_ENTITY};
    use crate::script::tests::Journal;
    use crate::script::NativeScriptHost;
    use serde_json::json;

    fn config(value: serde_json::Value) -> ComponentConfig {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_repeated_descriptors_append() {
        let host = NativeScriptHost::new()
            .with_script("dig.py", Journal::default())
            .with_script("eat.py", Journal::default())
            .into_shared();
        let registry = EntityRegistry::shared(2);
        let mut behaviors = BehaviorManager::new(registry.clone(), host);
        let entity = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();

        behaviors.create_component(&config(json!({ "script_path": "dig.py" })), entity).unwrap();
        behaviors.create_component(&config(json!({ "script_path": "eat.py" })), entity).unwrap();
        behaviors.create_component(&config(json!({ "script_path": "dig.py" })), entity).unwrap();
        assert_eq!(behaviors.scripts(entity), ["dig.py", "eat.py"]);
    }

    #[test]
    fn test_unknown_script_is_config_error() {
        let host = NativeScriptHost::new().into_shared();
        let registry = EntityRegistry::shared(2);
        let mut behaviors = BehaviorManager::new(registry.clone(), host);
        let entity = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();

        let result = behaviors.create_component(&config(json!({ "script_path": "ghost.py" })), entity);
        assert!(matches!(result, Err(EcsError::InvalidComponentConfig { .. })));
        assert_eq!(behaviors.has_component(entity), Ok(false));
    }

    #[test]
    fn test_failing_script_is_detached() {
        let healthy = Journal::default();
        let broken = Journal {
            fail_on: Some(ScriptHook::Update),
            ..Journal::default()
        };
        let host = NativeScriptHost::new()
            .with_script("healthy.py", healthy.clone())
            .with_script("broken.py", broken)
            .into_shared();
        let registry = EntityRegistry::shared(2);
        let mut behaviors = BehaviorManager::new(registry.clone(), host);
        let entity = registry.borrow_mut().create_entity(INVALID_ENTITY).unwrap();
        behaviors.attach_script(entity, "broken.py").unwrap();
        behaviors.attach_script(entity, "healthy.py").unwrap();

        behaviors.update(0.016).unwrap();
        behaviors.update(0.016).unwrap();
        assert_eq!(behaviors.scripts(entity), ["healthy.py"]);

        let updates = healthy
            .calls
            .borrow()
            .iter()
            .filter(|(hook, who)| *hook == ScriptHook::Update && *who == Some(entity))
            .count();
        assert_eq!(updates, 2);
    }
}
