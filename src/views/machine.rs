//! The generic conditional renderer.

use super::{Children, Component, View};
use crate::context::ViewContext;
use crate::matching::Cond;

/// Renders by condition, dispatching to the first strategy supplied, in
/// order: `component`, `render`, function-children, plain children.
///
/// Only function-children runs on a non-match; it receives the match
/// result so the caller can branch. Every other strategy renders nothing
/// when the condition fails. Supplying several strategies is not an
/// error, the precedence order decides.
pub struct MachineView<N> {
    cond: Cond,
    component: Option<Box<dyn Component<N>>>,
    render: Option<Box<dyn Fn(&ViewContext) -> N + Send + Sync>>,
    children: Option<Children<N>>,
}

impl<N> MachineView<N> {
    /// Renderer with no condition: matches every snapshot.
    pub fn new() -> Self {
        Self {
            cond: Cond::Always,
            component: None,
            render: None,
            children: None,
        }
    }

    /// Set the condition.
    pub fn cond(mut self, cond: impl Into<Cond>) -> Self {
        self.cond = cond.into();
        self
    }

    /// Supply a component, instantiated with the context value on match.
    pub fn component(mut self, component: impl Component<N> + 'static) -> Self {
        self.component = Some(Box::new(component));
        self
    }

    /// Supply a render function, invoked with the context value on match.
    pub fn render_with(mut self, render: impl Fn(&ViewContext) -> N + Send + Sync + 'static) -> Self {
        self.render = Some(Box::new(render));
        self
    }

    /// Supply a plain child node, rendered only on match.
    pub fn children(mut self, node: N) -> Self {
        self.children = Some(Children::Node(node));
        self
    }

    /// Supply function-as-children, invoked on every render with the
    /// match result.
    pub fn children_with(
        mut self,
        build: impl Fn(&ViewContext, bool) -> N + Send + Sync + 'static,
    ) -> Self {
        self.children = Some(Children::Build(Box::new(build)));
        self
    }

    /// Strategy dispatch for a precomputed match result. Shared with the
    /// selector views, which compute their own match first.
    pub(crate) fn dispatch(&self, matched: bool, value: &ViewContext) -> Option<N>
    where
        N: Clone,
    {
        if let Some(component) = &self.component {
            return matched.then(|| component.create(value));
        }

        if let Some(render) = &self.render {
            return matched.then(|| render(value));
        }

        match &self.children {
            Some(Children::Build(build)) => Some(build(value, matched)),
            Some(Children::Node(node)) => matched.then(|| node.clone()),
            None => None,
        }
    }
}

impl<N> Default for MachineView<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: Clone> View<N> for MachineView<N> {
    fn render(&self, value: &ViewContext) -> Option<N> {
        let matched = self.cond.evaluate(&value.snapshot);
        self.dispatch(matched, value)
    }
}

impl<N> std::fmt::Debug for MachineView<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MachineView")
            .field("cond", &self.cond)
            .field("component", &self.component.is_some())
            .field("render", &self.render.is_some())
            .field("children", &self.children)
            .finish()
    }
}
