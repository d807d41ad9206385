//! Conditional renderer keyed on the machine's state value.

use super::{Component, MachineView, View};
use crate::context::ViewContext;
use crate::matching::{compile_state, StateSelector};

/// Renders when the current state matches (`is`) or does not match
/// (`not`) a selector. Selectors are compiled into a condition and the
/// rest is the generic [`MachineView`] dispatch, unchanged.
///
/// String selectors match hierarchically: `is = "lit"` matches `lit` and
/// any of its descendants. Before the engine is initialized there is no
/// state: `is` never matches, `not` always does. When both axes are
/// given, `is` wins.
pub struct StateView<N> {
    is: Option<StateSelector>,
    not: Option<StateSelector>,
    inner: MachineView<N>,
}

impl<N> StateView<N> {
    pub fn new() -> Self {
        Self {
            is: None,
            not: None,
            inner: MachineView::new(),
        }
    }

    /// Match when the selector hits the current state.
    pub fn is(mut self, selector: impl Into<StateSelector>) -> Self {
        self.is = Some(selector.into());
        self
    }

    /// Match when the selector misses the current state.
    pub fn not(mut self, selector: impl Into<StateSelector>) -> Self {
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

impl<N> Default for StateView<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Clone> View<N> for StateView<N> {
    fn render(&self, value: &ViewContext) -> Option<N> {
        let cond = compile_state(self.is.as_ref(), self.not.as_ref());
        let matched = cond.evaluate(&value.snapshot);
        self.inner.dispatch(matched, value)
    }
}

impl<N> std::fmt::Debug for StateView<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateView")
            .field("is", &self.is)
            .field("not", &self.not)
            .field("inner", &self.inner)
            .finish()
    }
}
