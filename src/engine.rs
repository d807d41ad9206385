//! Contract for the external state-machine engine.
//!
//! The engine owns the machine semantics: states, transitions, activities,
//! timers. This crate only observes it through the getters here and calls
//! back into it through the three control operations. A Provider never
//! reaches into engine internals.

use crate::types::{ExtStateUpdate, HandlerId, Snapshot, StateDescriptor};
use serde_json::Value;
use std::sync::Arc;

/// Callback invoked synchronously on every committed change.
pub type ChangeHandler = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// The external finite-state-machine engine, injected into every Provider.
///
/// Implementations deliver `change` notifications synchronously from
/// `init`, `transition`, and `set_extstate` once the resulting state is
/// committed. Unsubscribing an unknown or already-removed handler must be
/// a no-op.
pub trait Engine: Send + Sync {
    /// Current state, `None` before `init` has run.
    fn current_state(&self) -> Option<StateDescriptor>;

    /// Current external (extended) state.
    fn current_extstate(&self) -> Value;

    /// Start the machine. Calling it twice is at the engine's discretion.
    fn init(&self);

    /// Request a transition by event name.
    fn transition(&self, event: &str);

    /// Replace or update the external state.
    fn set_extstate(&self, update: ExtStateUpdate);

    /// Register a change handler; returns the id used to unsubscribe.
    fn subscribe(&self, handler: ChangeHandler) -> HandlerId;

    /// Remove a change handler. Safe no-op for unknown ids.
    fn unsubscribe(&self, handler: HandlerId);

    /// One consistent observation of the engine's current state.
    fn snapshot(&self) -> Snapshot {
        Snapshot::new(self.current_state(), self.current_extstate())
    }
}
