//! Conditional renderer keyed on the machine's active activities.

use super::{Component, MachineView, View};
use crate::context::ViewContext;
use crate::matching::{compile_activity, ActivitySelector};

/// Renders when an activity is (or is not) active. String selectors are
/// exact names looked up in the activity mapping — no hierarchy, unlike
/// [`StateView`](super::StateView). Axis rules are shared: missing state
/// means `is` never matches and `not` always does, and `is` wins when
/// both are given.
pub struct ActivityView<N> {
    is: Option<ActivitySelector>,
    not: Option<ActivitySelector>,
    inner: MachineView<N>,
}

impl<N> ActivityView<N> {
    pub fn new() -> Self {
        Self {
            is: None,
            not: None,
            inner: MachineView::new(),
        }
    }

    /// Match while the selected activity is active.
    pub fn is(mut self, selector: impl Into<ActivitySelector>) -> Self {
        self.is = Some(selector.into());
        self
    }

    /// Match while the selected activity is not active.
    pub fn not(mut self, selector: impl Into<ActivitySelector>) -> Self {
        self.not = Some(selector.into());
        self
    }

    pub fn component(mut self, component: impl Component<N> + 'static) -> Self {
        self.inner = self.inner.component(component);
        self
    }

    pub fn render_with(mut self, render: impl Fn(&ViewContext) -> N + Send + Sync + 'static) -> Self {
        self.inner = self.inner.render_with(render);
        self
    }

    pub fn children(mut self, node: N) -> Self {
        self.inner = self.inner.children(node);
        self
    }

    pub fn children_with(
        mut self,
        build: impl Fn(&ViewContext, bool) -> N + Send + Sync + 'static,
    ) -> Self {
        self.inner = self.inner.children_with(build);
        self
    }
}

impl<N> Default for ActivityView<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Clone> View<N> for ActivityView<N> {
    fn render(&self, value: &ViewContext) -> Option<N> {
        let cond = compile_activity(self.is.as_ref(), self.not.as_ref());
        let matched = cond.evaluate(&value.snapshot);
        self.inner.dispatch(matched, value)
    }
}

impl<N> std::fmt::Debug for ActivityView<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityView")
            .field("is", &self.is)
            .field("not", &self.not)
            .field("inner", &self.inner)
            .finish()
    }
}
