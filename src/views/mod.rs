//! Conditional renderers and the lifecycle hook.
//!
//! A view produces an output node from the current context value; a
//! mounted view is re-rendered on every broadcast. The node type `N` is
//! whatever the host UI works with — a widget, a virtual-DOM node, a
//! plain string in tests.

mod activity;
mod control;
mod machine;
mod state;

pub use activity::ActivityView;
pub use control::{Control, ControlMount};
pub use machine::MachineView;
pub use state::StateView;

use crate::context::{BroadcastContext, ViewContext};
use crate::types::ConsumerId;
use parking_lot::RwLock;
use std::sync::Arc;

/// Anything that can render against a context value.
pub trait View<N> {
    /// Produce the output for this value, or `None` to render nothing.
    fn render(&self, value: &ViewContext) -> Option<N>;
}

/// A component instantiated with the full context value on match. The
/// seam for reusable output types, as opposed to one-off `render`
/// closures.
pub trait Component<N>: Send + Sync {
    fn create(&self, value: &ViewContext) -> N;
}

impl<N, F> Component<N> for F
where
    F: Fn(&ViewContext) -> N + Send + Sync,
{
    fn create(&self, value: &ViewContext) -> N {
        self(value)
    }
}

/// The `children` rendering strategy.
pub enum Children<N> {
    /// Plain node, rendered only on match.
    Node(N),
    /// Function-as-children: always invoked, receives the match result.
    Build(Box<dyn Fn(&ViewContext, bool) -> N + Send + Sync>),
}

impl<N> std::fmt::Debug for Children<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Children::Node(_) => write!(f, "Children::Node"),
            Children::Build(_) => write!(f, "Children::Build(<fn>)"),
        }
    }
}

/// A mounted view: holds the latest rendered output, re-rendered per
/// broadcast, detached from the context on drop.
pub struct Mount<N> {
    id: ConsumerId,
    context: Arc<BroadcastContext>,
    output: Arc<RwLock<Option<N>>>,
}

impl<N> Mount<N> {
    pub(crate) fn new(
        id: ConsumerId,
        context: Arc<BroadcastContext>,
        output: Arc<RwLock<Option<N>>>,
    ) -> Self {
        Self {
            id,
            context,
            output,
        }
    }

    pub fn id(&self) -> ConsumerId {
        self.id
    }

    /// Latest rendered output; `None` when the view rendered nothing.
    pub fn output(&self) -> Option<N>
    where
        N: Clone,
    {
        self.output.read().clone()
    }

    /// Did the last render produce output?
    pub fn is_rendered(&self) -> bool {
        self.output.read().is_some()
    }
}

impl<N> Drop for Mount<N> {
    fn drop(&mut self) {
        self.context.detach(self.id);
    }
}

impl<N> std::fmt::Debug for Mount<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mount")
            .field("id", &self.id)
            .field("rendered", &self.is_rendered())
            .finish()
    }
}
