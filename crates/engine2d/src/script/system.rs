//! System whose phases run a script

use super::{ScriptContext, ScriptError, ScriptHook, SharedScriptHost};
use crate::ecs::{EcsError, EcsResult, SharedSystem, System};
use std::cell::RefCell;
use std::rc::Rc;

/// Schedules a script like any native system
pub struct ScriptedSystem {
    path: String,
    host: SharedScriptHost,
}

impl ScriptedSystem {
    /// System running the script at `path` through `host`
    pub fn new(path: impl Into<String>, host: SharedScriptHost) -> Self {
        Self {
            path: path.into(),
            host,
        }
    }

    /// Script path, also the system name
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Wrap for the scheduler
    pub fn into_shared(self) -> SharedSystem {
        Rc::new(RefCell::new(self))
    }

    fn call(&self, hook: ScriptHook, delta_time: f32) -> Result<(), ScriptError> {
        let mut host = self.host.try_borrow_mut().map_err(|_| ScriptError::Runtime {
            script: self.path.clone(),
            hook,
            message: "script host is busy".to_string(),
        })?;
        host.call(&self.path, hook, ScriptContext::system(delta_time))
    }

    fn failure(&self, phase: &'static str, error: &ScriptError) -> EcsError {
        EcsError::SystemFailure {
            system: self.path.clone(),
            phase,
            reason: error.to_string(),
        }
    }
}

impl System for ScriptedSystem {
    fn name(&self) -> &str {
        &self.path
    }

    fn init(&mut self) -> EcsResult<()> {
        let loaded = self
            .host
            .try_borrow_mut()
            .map_err(|_| EcsError::init_failure(&self.path, "script host is busy"))?
            .load(&self.path);
        loaded.map_err(|e| EcsError::init_failure(&self.path, e.to_string()))?;
        self.call(ScriptHook::Init, 0.0)
            .map_err(|e| EcsError::init_failure(&self.path, e.to_string()))
    }

    fn update(&mut self, delta_time: f32) -> EcsResult<()> {
        self.call(ScriptHook::Update, delta_time)
            .map_err(|e| self.failure("update", &e))
    }

    fn fixed_update(&mut self, fixed_delta_time: f32) -> EcsResult<()> {
        self.call(ScriptHook::FixedUpdate, fixed_delta_time)
            .map_err(|e| self.failure("fixed_update", &e))
    }

    fn draw(&mut self) -> EcsResult<()> {
        self.call(ScriptHook::Draw, 0.0).map_err(|e| self.failure("draw", &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::{SystemScheduler, SystemState};
    use crate::script::tests::Journal;
    use crate::script::NativeScriptHost;

    #[test]
    fn test_scheduled_like_native() {
        let journal = Journal::default();
        let host = NativeScriptHost::new()
            .with_script("scripts/weather.py", journal.clone())
            .into_shared();

        let mut scheduler = SystemScheduler::new(0.02, 5);
        let system = Rc::new(RefCell::new(ScriptedSystem::new("scripts/weather.py", host)));
        let (key, result) = scheduler.add_and_init(system);
        result.unwrap();
        scheduler.frame(0.02);

        let hooks: Vec<_> = journal.calls.borrow().iter().map(|(hook, _)| *hook).collect();
        assert_eq!(
            hooks,
            vec![ScriptHook::Init, ScriptHook::Update, ScriptHook::FixedUpdate, ScriptHook::Draw]
        );
        assert_eq!(scheduler.state(key), Some(SystemState::Enabled));
    }

    #[test]
    fn test_missing_script_fails_init() {
        let host = NativeScriptHost::new().into_shared();
        let mut scheduler = SystemScheduler::new(0.02, 5);
        let system = Rc::new(RefCell::new(ScriptedSystem::new("scripts/none.py", host)));
        let (key, result) = scheduler.add_and_init(system);
        assert!(matches!(result, Err(EcsError::SystemInitFailure { .. })));
        assert_eq!(scheduler.state(key), Some(SystemState::Disabled));
    }
}
