//! Selector compilation for the State and Activity renderers.
//!
//! Selectors arrive on two axes, `is` and `not`, and are compiled into a
//! [`Cond`] before evaluation. The two axes are independent predicates,
//! not negations of each other: with no current state (engine not yet
//! initialized), every `is` selector evaluates false and every `not`
//! selector evaluates true. Once a state exists they are exact negations.

use super::cond::Cond;
use crate::types::{Snapshot, StateDescriptor, StateValue};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Selector over the machine's state value.
#[derive(Clone)]
pub enum StateSelector {
    /// Dotted state path, matched hierarchically.
    Path(String),
    /// Matches if any path matches.
    AnyOf(Vec<String>),
    /// Arbitrary test of the state value.
    Test(Arc<dyn Fn(&StateValue) -> bool + Send + Sync>),
}

impl StateSelector {
    pub fn test(f: impl Fn(&StateValue) -> bool + Send + Sync + 'static) -> Self {
        StateSelector::Test(Arc::new(f))
    }

    fn hit(&self, state: &StateDescriptor) -> bool {
        match self {
            StateSelector::Path(path) => state.value.matches(path),
            StateSelector::AnyOf(paths) => paths.iter().any(|path| state.value.matches(path)),
            StateSelector::Test(f) => f(&state.value),
        }
    }
}

impl From<&str> for StateSelector {
    fn from(path: &str) -> Self {
        StateSelector::Path(path.to_string())
    }
}

impl From<String> for StateSelector {
    fn from(path: String) -> Self {
        StateSelector::Path(path)
    }
}

impl From<Vec<&str>> for StateSelector {
    fn from(paths: Vec<&str>) -> Self {
        StateSelector::AnyOf(paths.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for StateSelector {
    fn from(paths: Vec<String>) -> Self {
        StateSelector::AnyOf(paths)
    }
}

impl fmt::Debug for StateSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateSelector::Path(path) => f.debug_tuple("Path").field(path).finish(),
            StateSelector::AnyOf(paths) => f.debug_tuple("AnyOf").field(paths).finish(),
            StateSelector::Test(_) => f.debug_tuple("Test").field(&"<fn>").finish(),
        }
    }
}

/// Selector over the activity-active mapping.
#[derive(Clone)]
pub enum ActivitySelector {
    /// Exact activity name; unknown names are inactive.
    Name(String),
    /// Matches if any named activity is active.
    AnyOf(Vec<String>),
    /// Arbitrary test of the activity mapping.
    Test(Arc<dyn Fn(&HashMap<String, bool>) -> bool + Send + Sync>),
}

impl ActivitySelector {
    pub fn test(f: impl Fn(&HashMap<String, bool>) -> bool + Send + Sync + 'static) -> Self {
        ActivitySelector::Test(Arc::new(f))
    }

    fn hit(&self, state: &StateDescriptor) -> bool {
        match self {
            ActivitySelector::Name(name) => state.activity_active(name),
            ActivitySelector::AnyOf(names) => names.iter().any(|name| state.activity_active(name)),
            ActivitySelector::Test(f) => f(&state.activities),
        }
    }
}

impl From<&str> for ActivitySelector {
    fn from(name: &str) -> Self {
        ActivitySelector::Name(name.to_string())
    }
}

impl From<String> for ActivitySelector {
    fn from(name: String) -> Self {
        ActivitySelector::Name(name)
    }
}

impl From<Vec<&str>> for ActivitySelector {
    fn from(names: Vec<&str>) -> Self {
        ActivitySelector::AnyOf(names.into_iter().map(str::to_string).collect())
    }
}

impl From<Vec<String>> for ActivitySelector {
    fn from(names: Vec<String>) -> Self {
        ActivitySelector::AnyOf(names)
    }
}

impl fmt::Debug for ActivitySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivitySelector::Name(name) => f.debug_tuple("Name").field(name).finish(),
            ActivitySelector::AnyOf(names) => f.debug_tuple("AnyOf").field(names).finish(),
            ActivitySelector::Test(_) => f.debug_tuple("Test").field(&"<fn>").finish(),
        }
    }
}

/// Compile `is`/`not` state selectors into a condition.
///
/// `is` wins when both are given; neither given means always match.
pub fn compile_state(is: Option<&StateSelector>, not: Option<&StateSelector>) -> Cond {
    match (is, not) {
        (Some(selector), _) => {
            let selector = selector.clone();
            Cond::test(move |snapshot: &Snapshot| {
                snapshot
                    .state
                    .as_ref()
                    .map_or(false, |state| selector.hit(state))
            })
        }
        (None, Some(selector)) => {
            let selector = selector.clone();
            // Independent predicate: absent state IS a `not` match.
            Cond::test(move |snapshot: &Snapshot| {
                !snapshot
                    .state
                    .as_ref()
                    .map_or(false, |state| selector.hit(state))
            })
        }
        (None, None) => Cond::Always,
    }
}

/// Compile `is`/`not` activity selectors into a condition. Same axis rules
/// as [`compile_state`].
pub fn compile_activity(is: Option<&ActivitySelector>, not: Option<&ActivitySelector>) -> Cond {
    match (is, not) {
        (Some(selector), _) => {
            let selector = selector.clone();
            Cond::test(move |snapshot: &Snapshot| {
                snapshot
                    .state
                    .as_ref()
                    .map_or(false, |state| selector.hit(state))
            })
        }
        (None, Some(selector)) => {
            let selector = selector.clone();
            Cond::test(move |snapshot: &Snapshot| {
                !snapshot
                    .state
                    .as_ref()
                    .map_or(false, |state| selector.hit(state))
            })
        }
        (None, None) => Cond::Always,
    }
}
