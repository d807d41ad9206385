//! Core types shared across the binding layer.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Identifier for a change handler registered with an engine.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerId(pub u64);

impl fmt::Debug for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HandlerId({})", self.0)
    }
}

/// Identifier for a consumer attached to a broadcast context.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConsumerId(pub u64);

impl fmt::Debug for ConsumerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ConsumerId({})", self.0)
    }
}

/// Identifier for an off-tree watcher.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

impl fmt::Debug for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WatchId({})", self.0)
    }
}

/// The current position of a machine.
///
/// A simple state is a leaf name; compound and parallel states nest, with
/// one key per active region. Serializes untagged, so `"idle"` and
/// `{"lit": "green"}` round-trip to the same JSON shapes the engine emits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    /// An atomic state, e.g. `"idle"`.
    Leaf(String),
    /// A compound or parallel state, one entry per active child region.
    Compound(HashMap<String, StateValue>),
}

impl StateValue {
    /// Build a leaf value.
    pub fn leaf(name: impl Into<String>) -> Self {
        StateValue::Leaf(name.into())
    }

    /// Build a single-region compound value.
    pub fn nested(region: impl Into<String>, child: StateValue) -> Self {
        let mut map = HashMap::new();
        map.insert(region.into(), child);
        StateValue::Compound(map)
    }

    /// Hierarchical path match: true iff this value equals the dotted
    /// `selector` path or is a descendant of it.
    ///
    /// `"a"` matches `a`, `a.b`, and `a.b.c`; `"a.b"` does not match `a.c`,
    /// nor does it match a value that is only `a`.
    pub fn matches(&self, selector: &str) -> bool {
        self.matches_segments(&selector.split('.').collect::<Vec<_>>())
    }

    fn matches_segments(&self, segments: &[&str]) -> bool {
        match (self, segments) {
            // Selector exhausted: value is at or below the selector path.
            (_, []) => true,
            (StateValue::Leaf(name), [seg]) => name == seg,
            // Selector is deeper than the value.
            (StateValue::Leaf(_), _) => false,
            (StateValue::Compound(regions), [seg, rest @ ..]) => regions
                .get(*seg)
                .map_or(false, |child| child.matches_segments(rest)),
        }
    }
}

impl From<&str> for StateValue {
    fn from(name: &str) -> Self {
        StateValue::Leaf(name.to_string())
    }
}

impl From<String> for StateValue {
    fn from(name: String) -> Self {
        StateValue::Leaf(name)
    }
}

/// What the engine reports about its current state: the state value plus
/// the activity-name → active mapping.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StateDescriptor {
    pub value: StateValue,
    #[serde(default)]
    pub activities: HashMap<String, bool>,
}

impl StateDescriptor {
    /// Descriptor with no activities.
    pub fn new(value: impl Into<StateValue>) -> Self {
        Self {
            value: value.into(),
            activities: HashMap::new(),
        }
    }

    /// Add an activity entry.
    pub fn with_activity(mut self, name: impl Into<String>, active: bool) -> Self {
        self.activities.insert(name.into(), active);
        self
    }

    /// Is the named activity currently active? Unknown names are inactive.
    pub fn activity_active(&self, name: &str) -> bool {
        self.activities.get(name).copied().unwrap_or(false)
    }
}

/// One immutable observation of the engine: current state (None before the
/// engine has been initialized) plus external state. Replaced wholesale on
/// every change event, never mutated in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub state: Option<StateDescriptor>,
    pub extstate: Value,
}

impl Snapshot {
    pub fn new(state: Option<StateDescriptor>, extstate: Value) -> Self {
        Self { state, extstate }
    }

    /// Snapshot of an engine that has not been initialized yet.
    pub fn uninitialized() -> Self {
        Self {
            state: None,
            extstate: Value::Null,
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::uninitialized()
    }
}

/// Argument to `set_extstate`: either a replacement value or a function of
/// the previous external state.
pub enum ExtStateUpdate {
    Replace(Value),
    Apply(Box<dyn FnOnce(Value) -> Value + Send>),
}

impl ExtStateUpdate {
    /// Updater form, from a closure over the previous value.
    pub fn apply(f: impl FnOnce(Value) -> Value + Send + 'static) -> Self {
        ExtStateUpdate::Apply(Box::new(f))
    }

    /// Resolve against the previous external state.
    pub fn resolve(self, prev: Value) -> Value {
        match self {
            ExtStateUpdate::Replace(value) => value,
            ExtStateUpdate::Apply(f) => f(prev),
        }
    }
}

impl From<Value> for ExtStateUpdate {
    fn from(value: Value) -> Self {
        ExtStateUpdate::Replace(value)
    }
}

impl fmt::Debug for ExtStateUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtStateUpdate::Replace(value) => f.debug_tuple("Replace").field(value).finish(),
            ExtStateUpdate::Apply(_) => f.debug_tuple("Apply").field(&"<fn>").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leaf_matches_itself() {
        let value = StateValue::leaf("idle");
        assert!(value.matches("idle"));
        assert!(!value.matches("busy"));
    }

    #[test]
    fn test_descendant_matches_ancestor_selector() {
        // value = lit.green
        let value = StateValue::nested("lit", StateValue::leaf("green"));
        assert!(value.matches("lit"));
        assert!(value.matches("lit.green"));
        assert!(!value.matches("lit.red"));
        assert!(!value.matches("lit.green.flashing"));
    }

    #[test]
    fn test_parallel_regions_match_independently() {
        let mut regions = HashMap::new();
        regions.insert("vehicle".to_string(), StateValue::leaf("go"));
        regions.insert("pedestrian".to_string(), StateValue::leaf("wait"));
        let value = StateValue::Compound(regions);

        assert!(value.matches("vehicle"));
        assert!(value.matches("vehicle.go"));
        assert!(value.matches("pedestrian.wait"));
        assert!(!value.matches("pedestrian.walk"));
    }

    #[test]
    fn test_state_value_serializes_untagged() {
        let leaf = StateValue::leaf("idle");
        assert_eq!(serde_json::to_value(&leaf).unwrap(), json!("idle"));

        let nested = StateValue::nested("lit", StateValue::leaf("green"));
        assert_eq!(
            serde_json::to_value(&nested).unwrap(),
            json!({"lit": "green"})
        );

        let parsed: StateValue = serde_json::from_value(json!({"lit": "green"})).unwrap();
        assert_eq!(parsed, nested);
    }

    #[test]
    fn test_activity_lookup_defaults_inactive() {
        let descriptor = StateDescriptor::new("buzzing").with_activity("beeping", true);
        assert!(descriptor.activity_active("beeping"));
        assert!(!descriptor.activity_active("humming"));
    }

    #[test]
    fn test_extstate_update_resolution() {
        let replace = ExtStateUpdate::from(json!({"foo": 9}));
        assert_eq!(replace.resolve(json!({"foo": 1})), json!({"foo": 9}));

        let bump = ExtStateUpdate::apply(|prev| {
            let foo = prev["foo"].as_i64().unwrap();
            json!({ "foo": foo + 1 })
        });
        assert_eq!(bump.resolve(json!({"foo": 1})), json!({"foo": 2}));
    }
}
