//! System trait and lifecycle states

use super::{EcsResult, Shared};
use std::cell::RefCell;
use std::rc::Rc;

/// A scheduled unit of per-frame behavior
///
/// Every phase has a no-op default, so a system only implements the phases it
/// takes part in. Native managers and script-backed systems implement the same
/// trait and are scheduled identically.
pub trait System {
    /// Stable name used for lookup and diagnostics
    fn name(&self) -> &str;

    /// Acquire collaborators; called once before the first frame
    fn init(&mut self) -> EcsResult<()> {
        Ok(())
    }

    /// Variable-step logic, once per frame
    fn update(&mut self, _delta_time: f32) -> EcsResult<()> {
        Ok(())
    }

    /// Deterministic logic, once per accumulated fixed slice
    fn fixed_update(&mut self, _fixed_delta_time: f32) -> EcsResult<()> {
        Ok(())
    }

    /// Emit draw work, once per frame after all fixed slices
    fn draw(&mut self) -> EcsResult<()> {
        Ok(())
    }

    /// Apply destructions deferred during the update phase
    fn apply_pending_destroys(&mut self) -> usize {
        0
    }

    /// Reset the logical state owned by this system
    fn clear(&mut self) {}

    /// Reclaim memory after a clear
    fn collect(&mut self) {}
}

/// Type-erased shared system handle
pub type SharedSystem = Rc<RefCell<dyn System>>;

/// Upcast a shared concrete system for registration
pub fn as_system<S: System + 'static>(system: &Shared<S>) -> SharedSystem {
    system.clone()
}

/// Lifecycle state of a scheduled system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    /// Registered, `init` not yet run
    Uninitialized,
    /// Initialized and running every frame
    Enabled,
    /// Skipped each frame (init failure, frame error, or by request)
    Disabled,
    /// Cleared and collected; must be re-initialized to run again
    Destroyed,
}

impl SystemState {
    /// Whether the system takes part in frames
    pub fn is_enabled(self) -> bool {
        self == Self::Enabled
    }
}
