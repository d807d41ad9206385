//! Lifecycle hook: callbacks on mount and unmount, children always
//! rendered, no predicate.

use crate::context::{BroadcastContext, ViewContext};
use crate::error::{BindError, Result};
use std::sync::Arc;

type LifecycleFn = Box<dyn FnOnce(&ViewContext) + Send>;

/// Declarative lifecycle hook.
///
/// `on_did_mount` runs exactly once when the control is mounted,
/// `on_will_unmount` exactly once when the mount is dropped. Both receive
/// the context value current at that edge — the unmount callback sees any
/// transitions made since mount, not a stale capture. The callbacks are
/// `FnOnce`, so a second invocation cannot happen by construction.
pub struct Control<N> {
    children: N,
    on_did_mount: Option<LifecycleFn>,
    on_will_unmount: Option<LifecycleFn>,
}

impl<N> Control<N> {
    /// A control always has children; they render unconditionally.
    pub fn new(children: N) -> Self {
        Self {
            children,
            on_did_mount: None,
            on_will_unmount: None,
        }
    }

    /// Callback for the mount edge.
    pub fn on_did_mount(mut self, f: impl FnOnce(&ViewContext) + Send + 'static) -> Self {
        self.on_did_mount = Some(Box::new(f));
        self
    }

    /// Callback for the unmount edge.
    pub fn on_will_unmount(mut self, f: impl FnOnce(&ViewContext) + Send + 'static) -> Self {
        self.on_will_unmount = Some(Box::new(f));
        self
    }
}

impl<N: std::fmt::Debug> std::fmt::Debug for Control<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Control")
            .field("children", &self.children)
            .field("on_did_mount", &self.on_did_mount.is_some())
            .field("on_will_unmount", &self.on_will_unmount.is_some())
            .finish()
    }
}

/// A mounted [`Control`]. Dropping it is the unmount edge.
pub struct ControlMount<N> {
    children: N,
    context: Arc<BroadcastContext>,
    on_will_unmount: Option<LifecycleFn>,
}

impl<N> ControlMount<N> {
    pub(crate) fn attach(control: Control<N>, context: Arc<BroadcastContext>) -> Result<Self> {
        if !context.is_open() {
            return Err(BindError::ProviderShutDown);
        }

        let Control {
            children,
            on_did_mount,
            on_will_unmount,
        } = control;

        if let Some(f) = on_did_mount {
            // Current value at the mount edge, which may itself move the
            // machine if the callback transitions.
            f(&context.current());
        }

        Ok(Self {
            children,
            context,
            on_will_unmount,
        })
    }

    /// The children, rendered whatever the machine is doing.
    pub fn children(&self) -> &N {
        &self.children
    }
}

impl<N> Drop for ControlMount<N> {
    fn drop(&mut self) {
        if let Some(f) = self.on_will_unmount.take() {
            // The value held now, not the one captured at mount time.
            f(&self.context.current());
        }
    }
}

impl<N: std::fmt::Debug> std::fmt::Debug for ControlMount<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlMount")
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}
