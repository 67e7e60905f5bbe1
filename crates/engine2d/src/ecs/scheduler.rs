//! System scheduling
//!
//! The scheduler owns the per-frame pipeline. Within a frame every enabled
//! system runs `update`, then deferred destructions are applied, then every
//! accumulated fixed slice runs `fixed_update` on every enabled system, then
//! every enabled system runs `draw`. Within a phase systems run in
//! registration order.
//!
//! Frame callbacks never propagate failures to the caller: an error or a panic
//! is logged and the offending system is disabled for the following frames.

use super::{EcsError, EcsResult, SharedSystem, System, SystemState};
use crate::core::EngineConfig;
use crate::foundation::time::{FixedTimestep, Stopwatch};
use slotmap::{new_key_type, SlotMap};
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

new_key_type! {
    /// Handle to a registered system
    pub struct SystemKey;
}

/// Timing and counters of the last frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Frame number, starting at 1
    pub frame: u64,
    /// Fixed slices run this frame
    pub fixed_steps: u32,
    /// Components destroyed by deferred destruction
    pub destroyed: usize,
    /// Time spent in the update phase
    pub update_time: Duration,
    /// Time spent in all fixed slices
    pub fixed_time: Duration,
    /// Time spent in the draw phase
    pub draw_time: Duration,
}

struct SystemEntry {
    system: SharedSystem,
    name: String,
    state: SystemState,
    initialized: bool,
}

/// Runs registered systems through the frame pipeline
pub struct SystemScheduler {
    systems: SlotMap<SystemKey, SystemEntry>,
    order: Vec<SystemKey>,
    by_name: HashMap<String, SystemKey>,
    timestep: FixedTimestep,
    stats: FrameStats,
}

impl SystemScheduler {
    /// Create a scheduler with the given fixed step (seconds) and step cap
    pub fn new(fixed_delta_time: f32, max_fixed_steps: u32) -> Self {
        Self {
            systems: SlotMap::with_key(),
            order: Vec::new(),
            by_name: HashMap::new(),
            timestep: FixedTimestep::new(fixed_delta_time, max_fixed_steps),
            stats: FrameStats::default(),
        }
    }

    /// Create a scheduler from the engine configuration
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.fixed_delta_time, config.max_fixed_steps_per_frame)
    }

    /// Append a system to the schedule; it stays uninitialized until [`init`](Self::init)
    pub fn add_system(&mut self, system: SharedSystem) -> SystemKey {
        let name = system
            .try_borrow()
            .map(|system| system.name().to_string())
            .unwrap_or_else(|_| format!("system#{}", self.order.len()));
        let key = self.systems.insert(SystemEntry {
            system,
            name: name.clone(),
            state: SystemState::Uninitialized,
            initialized: false,
        });
        if let Some(previous) = self.by_name.insert(name.clone(), key) {
            log::warn!("System `{}` registered twice; lookups now return the newest ({:?})", name, previous);
        }
        self.order.push(key);
        log::debug!("Registered system `{}`", name);
        key
    }

    /// Register and initialize in one call
    pub fn add_and_init(&mut self, system: SharedSystem) -> (SystemKey, EcsResult<()>) {
        let key = self.add_system(system);
        let result = self.init(key);
        (key, result)
    }

    /// Initialize a system; a second call on an initialized system is a no-op
    ///
    /// On failure the error is logged and the system stays disabled.
    pub fn init(&mut self, key: SystemKey) -> EcsResult<()> {
        let Some(entry) = self.systems.get_mut(key) else {
            return Err(EcsError::init_failure(format!("{key:?}"), "unknown system"));
        };
        if entry.initialized {
            return Ok(());
        }

        let result = invoke(entry, "init", |system| system.init());
        match result {
            Ok(()) => {
                entry.initialized = true;
                entry.state = SystemState::Enabled;
                log::info!("System `{}` initialized", entry.name);
                Ok(())
            }
            Err(e) => {
                entry.state = SystemState::Disabled;
                log::error!("System `{}` disabled: {}", entry.name, e);
                Err(match e {
                    EcsError::SystemFailure { system, reason, .. } => EcsError::SystemInitFailure { system, reason },
                    other => other,
                })
            }
        }
    }

    /// Initialize every uninitialized system in registration order
    ///
    /// Returns the failures; failing systems stay disabled and the others run.
    pub fn init_all(&mut self) -> Vec<EcsError> {
        let keys = self.order.clone();
        keys.into_iter().filter_map(|key| self.init(key).err()).collect()
    }

    /// Run one frame of `delta_time` seconds
    pub fn frame(&mut self, delta_time: f32) -> FrameStats {
        let mut stats = FrameStats {
            frame: self.stats.frame + 1,
            ..FrameStats::default()
        };

        let watch = Stopwatch::start_new();
        self.run_phase("update", |system| system.update(delta_time));
        stats.destroyed = self.apply_pending_destroys();
        stats.update_time = watch.elapsed();

        let watch = Stopwatch::start_new();
        let steps = self.timestep.advance(delta_time);
        let fixed_delta_time = self.timestep.step();
        for _ in 0..steps {
            self.run_phase("fixed_update", |system| system.fixed_update(fixed_delta_time));
        }
        stats.fixed_steps = steps;
        stats.fixed_time = watch.elapsed();

        let watch = Stopwatch::start_new();
        self.run_phase("draw", |system| system.draw());
        stats.draw_time = watch.elapsed();

        self.stats = stats;
        stats
    }

    /// Stats of the last completed frame
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    /// Re-enable a disabled system; only initialized systems can be enabled
    pub fn enable(&mut self, key: SystemKey) -> bool {
        match self.systems.get_mut(key) {
            Some(entry) if entry.initialized => {
                entry.state = SystemState::Enabled;
                true
            }
            _ => false,
        }
    }

    /// Skip a system in subsequent frames
    pub fn disable(&mut self, key: SystemKey) -> bool {
        match self.systems.get_mut(key) {
            Some(entry) if entry.state != SystemState::Destroyed => {
                entry.state = SystemState::Disabled;
                true
            }
            _ => false,
        }
    }

    /// Clear then collect a system; it must be initialized again to run
    pub fn destroy(&mut self, key: SystemKey) {
        let Some(entry) = self.systems.get_mut(key) else { return };
        match entry.system.try_borrow_mut() {
            Ok(mut system) => {
                system.clear();
                system.collect();
            }
            Err(_) => log::error!("System `{}` is busy and cannot be destroyed", entry.name),
        }
        entry.initialized = false;
        entry.state = SystemState::Destroyed;
        log::debug!("System `{}` destroyed", entry.name);
    }

    /// Destroy every system, in reverse registration order
    pub fn destroy_all(&mut self) {
        let keys: Vec<_> = self.order.iter().rev().copied().collect();
        for key in keys {
            self.destroy(key);
        }
    }

    /// Clear every system without changing its state
    pub fn clear_all(&mut self) {
        self.for_each_system(|system| system.clear());
    }

    /// Collect every system without changing its state
    pub fn collect_all(&mut self) {
        self.for_each_system(|system| system.collect());
    }

    /// Destroy and unregister one system
    pub fn remove(&mut self, key: SystemKey) -> Option<SharedSystem> {
        self.destroy(key);
        let entry = self.systems.remove(key)?;
        self.order.retain(|k| *k != key);
        if self.by_name.get(&entry.name) == Some(&key) {
            self.by_name.remove(&entry.name);
        }
        Some(entry.system)
    }

    /// Destroy and unregister every system
    pub fn remove_all(&mut self) {
        self.destroy_all();
        self.systems.clear();
        self.order.clear();
        self.by_name.clear();
        self.timestep.reset();
    }

    /// Lifecycle state of a system
    pub fn state(&self, key: SystemKey) -> Option<SystemState> {
        self.systems.get(key).map(|entry| entry.state)
    }

    /// Key of the system registered under `name`
    pub fn key_of(&self, name: &str) -> Option<SystemKey> {
        self.by_name.get(name).copied()
    }

    /// Handle of the system registered under `name`
    pub fn get(&self, name: &str) -> Option<SharedSystem> {
        self.key_of(name)
            .and_then(|key| self.systems.get(key))
            .map(|entry| entry.system.clone())
    }

    /// System names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|key| self.systems.get(*key))
            .map(|entry| entry.name.as_str())
            .collect()
    }

    /// Number of registered systems
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no system is registered
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of systems currently enabled
    pub fn enabled_count(&self) -> usize {
        self.systems.values().filter(|entry| entry.state.is_enabled()).count()
    }

    fn run_phase(&mut self, phase: &'static str, mut call: impl FnMut(&mut dyn System) -> EcsResult<()>) {
        for key in &self.order {
            let Some(entry) = self.systems.get_mut(*key) else { continue };
            if !entry.state.is_enabled() {
                continue;
            }
            if let Err(e) = invoke(entry, phase, &mut call) {
                entry.state = SystemState::Disabled;
                log::error!("System `{}` disabled after {} failure: {}", entry.name, phase, e);
            }
        }
    }

    fn apply_pending_destroys(&mut self) -> usize {
        let mut destroyed = 0;
        for key in &self.order {
            let Some(entry) = self.systems.get(*key) else { continue };
            if entry.state == SystemState::Destroyed {
                continue;
            }
            match entry.system.try_borrow_mut() {
                Ok(mut system) => destroyed += system.apply_pending_destroys(),
                Err(_) => log::warn!("System `{}` busy, deferred destroys postponed", entry.name),
            }
        }
        destroyed
    }

    fn for_each_system(&mut self, mut call: impl FnMut(&mut dyn System)) {
        for key in &self.order {
            let Some(entry) = self.systems.get(*key) else { continue };
            match entry.system.try_borrow_mut() {
                Ok(mut system) => call(&mut *system),
                Err(_) => log::warn!("System `{}` busy, skipped", entry.name),
            }
        }
    }
}

impl Default for SystemScheduler {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// Call into a system, turning borrow conflicts and panics into errors
fn invoke(
    entry: &SystemEntry,
    phase: &'static str,
    call: impl FnOnce(&mut dyn System) -> EcsResult<()>,
) -> EcsResult<()> {
    let failure = |reason: String| EcsError::SystemFailure {
        system: entry.name.clone(),
        phase,
        reason,
    };

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        let mut system = entry
            .system
            .try_borrow_mut()
            .map_err(|_| failure("system is already borrowed".to_string()))?;
        call(&mut *system)
    }));

    match outcome {
        Ok(result) => result,
        Err(payload) => Err(failure(format!("panicked: {}", panic_message(payload.as_ref())))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
