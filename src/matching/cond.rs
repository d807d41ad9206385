//! The condition specification evaluated by conditional renderers.

use crate::types::Snapshot;
use std::fmt;
use std::sync::Arc;

/// Test function over the current snapshot. Failures inside the caller's
/// function are not caught: a panicking predicate is an application bug
/// and propagates to the caller of the render pass.
pub type CondFn = Arc<dyn Fn(&Snapshot) -> bool + Send + Sync>;

/// A condition specification.
///
/// `Always` is the no-predicate case: a renderer without a condition is a
/// pure pass-through and matches every snapshot.
#[derive(Clone)]
pub enum Cond {
    Always,
    Value(bool),
    Test(CondFn),
}

impl Cond {
    /// Condition from a test function.
    pub fn test(f: impl Fn(&Snapshot) -> bool + Send + Sync + 'static) -> Self {
        Cond::Test(Arc::new(f))
    }

    /// Evaluate against a snapshot.
    pub fn evaluate(&self, snapshot: &Snapshot) -> bool {
        match self {
            Cond::Always => true,
            Cond::Value(value) => *value,
            Cond::Test(f) => f(snapshot),
        }
    }
}

impl Default for Cond {
    fn default() -> Self {
        Cond::Always
    }
}

impl From<bool> for Cond {
    fn from(value: bool) -> Self {
        Cond::Value(value)
    }
}

impl fmt::Debug for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cond::Always => write!(f, "Cond::Always"),
            Cond::Value(value) => write!(f, "Cond::Value({})", value),
            Cond::Test(_) => write!(f, "Cond::Test(<fn>)"),
        }
    }
}
