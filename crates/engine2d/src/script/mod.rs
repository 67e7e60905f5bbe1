//! Script-backed behavior
//!
//! The core never talks to an interpreter directly. Anything that can run a
//! script implements [`ScriptHost`]; behaviours attached to entities and whole
//! systems declared by path both dispatch through it. [`NativeScriptHost`]
//! maps script paths to Rust implementations and is what the engine ships
//! with.

mod system;

pub use system::ScriptedSystem;

use crate::ecs::Entity;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Lifecycle hook being invoked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptHook {
    /// Once, when the script is attached or its system initialized
    Init,
    /// Variable-step update
    Update,
    /// Fixed-step update
    FixedUpdate,
    /// Draw phase
    Draw,
}

impl fmt::Display for ScriptHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Update => "update",
            Self::FixedUpdate => "fixed_update",
            Self::Draw => "draw",
        };
        f.write_str(name)
    }
}

/// Arguments of one hook call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScriptContext {
    /// Entity the behaviour is attached to; `None` for system scripts
    pub entity: Option<Entity>,
    /// Frame or fixed step length in seconds
    pub delta_time: f32,
}

impl ScriptContext {
    /// Context for a system-level call
    pub fn system(delta_time: f32) -> Self {
        Self { entity: None, delta_time }
    }

    /// Context for a call on behalf of `entity`
    pub fn entity(entity: Entity, delta_time: f32) -> Self {
        Self {
            entity: Some(entity),
            delta_time,
        }
    }
}

/// Script errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScriptError {
    /// No script is known under this path
    #[error("Script not found: {0}")]
    NotFound(String),

    /// The script raised an error
    #[error("Script `{script}` failed in {hook}: {message}")]
    Runtime {
        /// Script path
        script: String,
        /// Hook that failed
        hook: ScriptHook,
        /// Error message from the script
        message: String,
    },
}

/// Runs scripts by path
pub trait ScriptHost {
    /// Make `path` callable; loading an already-loaded script is a no-op
    fn load(&mut self, path: &str) -> Result<(), ScriptError>;

    /// Invoke `hook` of the script at `path`
    fn call(&mut self, path: &str, hook: ScriptHook, context: ScriptContext) -> Result<(), ScriptError>;

    /// Whether `path` is loaded
    fn is_loaded(&self, path: &str) -> bool;
}

/// Shared script host handle
pub type SharedScriptHost = Rc<RefCell<dyn ScriptHost>>;

/// Script implemented in Rust
///
/// Every hook defaults to doing nothing. Errors are plain messages; the host
/// wraps them with the script path and hook.
pub trait NativeScript {
    /// Called for [`ScriptHook::Init`]
    fn init(&mut self, _context: ScriptContext) -> Result<(), String> {
        Ok(())
    }

    /// Called for [`ScriptHook::Update`]
    fn update(&mut self, _context: ScriptContext) -> Result<(), String> {
        Ok(())
    }

    /// Called for [`ScriptHook::FixedUpdate`]
    fn fixed_update(&mut self, _context: ScriptContext) -> Result<(), String> {
        Ok(())
    }

    /// Called for [`ScriptHook::Draw`]
    fn draw(&mut self, _context: ScriptContext) -> Result<(), String> {
        Ok(())
    }
}

/// Script host backed by registered Rust implementations
#[derive(Default)]
pub struct NativeScriptHost {
    available: HashMap<String, Box<dyn NativeScript>>,
    loaded: HashSet<String>,
}

impl NativeScriptHost {
    /// Create an empty host
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `script` available under `path`
    pub fn register(&mut self, path: impl Into<String>, script: impl NativeScript + 'static) {
        let path = path.into();
        log::debug!("Registered native script {}", path);
        self.available.insert(path, Box::new(script));
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_script(mut self, path: impl Into<String>, script: impl NativeScript + 'static) -> Self {
        self.register(path, script);
        self
    }

    /// Wrap for sharing between behaviours and scripted systems
    pub fn into_shared(self) -> SharedScriptHost {
        Rc::new(RefCell::new(self))
    }
}

impl ScriptHost for NativeScriptHost {
    fn load(&mut self, path: &str) -> Result<(), ScriptError> {
        if !self.available.contains_key(path) {
            return Err(ScriptError::NotFound(path.to_string()));
        }
        self.loaded.insert(path.to_string());
        Ok(())
    }

    fn call(&mut self, path: &str, hook: ScriptHook, context: ScriptContext) -> Result<(), ScriptError> {
        if !self.is_loaded(path) {
            return Err(ScriptError::NotFound(path.to_string()));
        }
        let script = self
            .available
            .get_mut(path)
            .ok_or_else(|| ScriptError::NotFound(path.to_string()))?;
        let result = match hook {
            ScriptHook::Init => script.init(context),
            ScriptHook::Update => script.update(context),
            ScriptHook::FixedUpdate => script.fixed_update(context),
            ScriptHook::Draw => script.draw(context),
        };
        result.map_err(|message| ScriptError::Runtime {
            script: path.to_string(),
            hook,
            message,
        })
    }

    fn is_loaded(&self, path: &str) -> bool {
        self.loaded.contains(path)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records every call it receives, failing on request
    #[derive(Clone, Default)]
    pub(crate) struct Journal {
        pub calls: Rc<RefCell<Vec<(ScriptHook, Option<Entity>)>>>,
        pub fail_on: Option<ScriptHook>,
    }

    impl Journal {
        fn record(&self, hook: ScriptHook, context: ScriptContext) -> Result<(), String> {
            self.calls.borrow_mut().push((hook, context.entity));
            if self.fail_on == Some(hook) {
                return Err(format!("{hook} refused"));
            }
            Ok(())
        }
    }

    impl NativeScript for Journal {
        fn init(&mut self, context: ScriptContext) -> Result<(), String> {
            self.record(ScriptHook::Init, context)
        }

        fn update(&mut self, context: ScriptContext) -> Result<(), String> {
            self.record(ScriptHook::Update, context)
        }

        fn fixed_update(&mut self, context: ScriptContext) -> Result<(), String> {
            self.record(ScriptHook::FixedUpdate, context)
        }

        fn draw(&mut self, context: ScriptContext) -> Result<(), String> {
            self.record(ScriptHook::Draw, context)
        }
    }

    #[test]
    fn test_call_requires_load() {
        let journal = Journal::default();
        let mut host = NativeScriptHost::new().with_script("scripts/miner.py", journal.clone());

        let context = ScriptContext::system(0.016);
        assert!(matches!(
            host.call("scripts/miner.py", ScriptHook::Update, context),
            Err(ScriptError::NotFound(_))
        ));
        host.load("scripts/miner.py").unwrap();
        host.call("scripts/miner.py", ScriptHook::Update, context).unwrap();
        assert_eq!(journal.calls.borrow().as_slice(), &[(ScriptHook::Update, None)]);

        assert!(matches!(host.load("scripts/ghost.py"), Err(ScriptError::NotFound(_))));
    }

    #[test]
    fn test_runtime_error_is_wrapped() {
        let journal = Journal {
            fail_on: Some(ScriptHook::Draw),
            ..Journal::default()
        };
        let mut host = NativeScriptHost::new().with_script("a.py", journal);
        host.load("a.py").unwrap();
        let error = host.call("a.py", ScriptHook::Draw, ScriptContext::system(0.0)).unwrap_err();
        assert_eq!(
            error,
            ScriptError::Runtime {
                script: "a.py".to_string(),
                hook: ScriptHook::Draw,
                message: "draw refused".to_string(),
            }
        );
    }
}
