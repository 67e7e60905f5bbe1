//! Named system constructors

use super::SystemDescriptor;
use crate::ecs::{EcsError, EcsResult, SharedSystem};
use crate::script::{ScriptedSystem, SharedScriptHost};
use std::collections::HashMap;

/// Builds a fresh system on demand
pub type SystemConstructor = Box<dyn Fn() -> SharedSystem>;

/// Resolves the systems a scene asks for
///
/// Native systems are registered by name. Script paths become a
/// [`ScriptedSystem`] running through the catalog's script host.
#[derive(Default)]
pub struct SystemCatalog {
    constructors: HashMap<String, SystemConstructor>,
    scripts: Option<SharedScriptHost>,
}

impl SystemCatalog {
    /// Empty catalog without script support
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve script paths through `host`
    pub fn with_script_host(mut self, host: SharedScriptHost) -> Self {
        self.scripts = Some(host);
        self
    }

    /// Make a native system available under `name`
    pub fn register(&mut self, name: impl Into<String>, constructor: impl Fn() -> SharedSystem + 'static) {
        let name = name.into();
        if self.constructors.insert(name.clone(), Box::new(constructor)).is_some() {
            log::warn!("System constructor `{}` replaced", name);
        }
    }

    /// Whether a native system is known under `name`
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered native names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.constructors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build the system described by `descriptor`
    pub fn construct(&self, descriptor: &SystemDescriptor) -> EcsResult<SharedSystem> {
        if let Some(name) = &descriptor.class_name {
            let constructor = self
                .constructors
                .get(name)
                .ok_or_else(|| EcsError::init_failure(name, "no such system"))?;
            return Ok(constructor());
        }

        let Some(path) = &descriptor.script_path else {
            return Err(EcsError::init_failure("<unnamed>", "descriptor names neither a class nor a script"));
        };
        let host = self
            .scripts
            .clone()
            .ok_or_else(|| EcsError::init_failure(path, "no script host configured"))?;
        Ok(ScriptedSystem::new(path.clone(), host).into_shared())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::System;
    use crate::script::tests::Journal;
    use crate::script::NativeScriptHost;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Idle;

    impl System for Idle {
        fn name(&self) -> &str {
            "idle"
        }

        fn init(&mut self) -> EcsResult<()> {
            Ok(())
        }
    }

    fn native(name: &str) -> SystemDescriptor {
        SystemDescriptor {
            class_name: Some(name.to_string()),
            script_path: None,
        }
    }

    fn script(path: &str) -> SystemDescriptor {
        SystemDescriptor {
            class_name: None,
            script_path: Some(path.to_string()),
        }
    }

    #[test]
    fn test_native_lookup() {
        let mut catalog = SystemCatalog::new();
        catalog.register("idle", || Rc::new(RefCell::new(Idle)));
        assert!(catalog.contains("idle"));
        assert_eq!(catalog.construct(&native("idle")).unwrap().borrow().name(), "idle");
        assert!(matches!(
            catalog.construct(&native("busy")),
            Err(EcsError::SystemInitFailure { .. })
        ));
    }

    #[test]
    fn test_script_needs_host() {
        let catalog = SystemCatalog::new();
        assert!(catalog.construct(&script("weather.py")).is_err());

        let host = NativeScriptHost::new()
            .with_script("weather.py", Journal::default())
            .into_shared();
        let catalog = SystemCatalog::new().with_script_host(host);
        let system = catalog.construct(&script("weather.py")).unwrap();
        assert_eq!(system.borrow().name(), "weather.py");
    }
}
