//! Shared test fixture: a small in-process engine with a flat transition
//! table, per-state activities, and synchronous change notification.

// Not every test binary uses every fixture helper.
#![allow(dead_code)]

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use statebind::{
    ChangeHandler, Engine, ExtStateUpdate, HandlerId, Snapshot, StateDescriptor, StateValue,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Build a nested state value from a dotted path, so fixture states like
/// `"lit.green"` exercise hierarchical matching.
pub fn value_from_path(path: &str) -> StateValue {
    let mut segments = path.rsplit('.');
    let mut value = StateValue::leaf(segments.next().unwrap());
    for segment in segments {
        value = StateValue::nested(segment, value);
    }
    value
}

pub struct TestEngine {
    initial: String,
    /// (from-state, event) -> to-state.
    transitions: HashMap<(String, String), String>,
    /// state -> activities running while in it.
    activities: HashMap<String, Vec<String>>,
    /// Every activity name the machine knows about.
    all_activities: Vec<String>,
    current: Mutex<Option<String>>,
    extstate: Mutex<Value>,
    handlers: RwLock<HashMap<HandlerId, ChangeHandler>>,
    next_handler: AtomicU64,
}

impl TestEngine {
    pub fn new(initial: &str) -> Self {
        Self {
            initial: initial.to_string(),
            transitions: HashMap::new(),
            activities: HashMap::new(),
            all_activities: Vec::new(),
            current: Mutex::new(None),
            extstate: Mutex::new(Value::Null),
            handlers: RwLock::new(HashMap::new()),
            next_handler: AtomicU64::new(1),
        }
    }

    pub fn with_transition(mut self, from: &str, event: &str, to: &str) -> Self {
        self.transitions
            .insert((from.to_string(), event.to_string()), to.to_string());
        self
    }

    pub fn with_activity(mut self, state: &str, activity: &str) -> Self {
        self.activities
            .entry(state.to_string())
            .or_default()
            .push(activity.to_string());
        if !self.all_activities.iter().any(|a| a == activity) {
            self.all_activities.push(activity.to_string());
        }
        self
    }

    pub fn with_extstate(self, value: Value) -> Self {
        *self.extstate.lock() = value;
        self
    }

    fn descriptor(&self, state: &str) -> StateDescriptor {
        let running = self.activities.get(state).cloned().unwrap_or_default();
        let mut descriptor = StateDescriptor {
            value: value_from_path(state),
            activities: HashMap::new(),
        };
        for name in &self.all_activities {
            descriptor
                .activities
                .insert(name.clone(), running.iter().any(|a| a == name));
        }
        descriptor
    }

    /// Notify every handler with the current snapshot. Handlers are
    /// captured first so one of them may transition re-entrantly.
    fn emit(&self) {
        let snapshot = self.snapshot();
        let handlers: Vec<ChangeHandler> = self.handlers.read().values().cloned().collect();
        for handler in &handlers {
            handler(&snapshot);
        }
    }
}

impl Engine for TestEngine {
    fn current_state(&self) -> Option<StateDescriptor> {
        self.current.lock().as_ref().map(|s| self.descriptor(s))
    }

    fn current_extstate(&self) -> Value {
        self.extstate.lock().clone()
    }

    fn init(&self) {
        *self.current.lock() = Some(self.initial.clone());
        self.emit();
    }

    fn transition(&self, event: &str) {
        let moved = {
            let mut current = self.current.lock();
            let next = current
                .as_ref()
                .and_then(|state| self.transitions.get(&(state.clone(), event.to_string())))
                .cloned();
            match next {
                Some(next) => {
                    *current = Some(next);
                    true
                }
                None => false,
            }
        };
        // Unknown events resolve to no transition and no notification.
        if moved {
            self.emit();
        }
    }

    fn set_extstate(&self, update: ExtStateUpdate) {
        {
            let mut extstate = self.extstate.lock();
            let prev = extstate.take();
            *extstate = update.resolve(prev);
        }
        self.emit();
    }

    fn subscribe(&self, handler: ChangeHandler) -> HandlerId {
        let id = HandlerId(self.next_handler.fetch_add(1, Ordering::SeqCst));
        self.handlers.write().insert(id, handler);
        id
    }

    fn unsubscribe(&self, handler: HandlerId) {
        self.handlers.write().remove(&handler);
    }
}

/// Convenience for asserting against snapshots.
pub fn state_name(snapshot: &Snapshot) -> Option<String> {
    snapshot
        .state
        .as_ref()
        .map(|s| serde_json::to_string(&s.value).unwrap())
}
