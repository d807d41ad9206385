//! Provider: binds one engine to one broadcast context.
//!
//! Construction takes the engine snapshot synchronously (the state may
//! still be `None` if the engine has not been initialized), binds the
//! three control operations once, and subscribes to the engine's change
//! events. Teardown unsubscribes and closes the context; a change
//! notification that arrives after teardown hits a dead `Weak` and is
//! dropped.
//!
//! Several Providers may be built over one shared engine. Each keeps an
//! independent snapshot copy and receives the same change events.
//! Supported, but unusual; typical usage is one Provider per engine.

use crate::context::{BroadcastContext, Controls, ViewContext, WatchHandle};
use crate::engine::Engine;
use crate::error::Result;
use crate::types::{ConsumerId, HandlerId, Snapshot, WatchId};
use crate::views::{Control, ControlMount, Mount, View};
use parking_lot::RwLock;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Snapshot store over an external engine.
pub struct Provider {
    engine: Arc<dyn Engine>,
    context: Arc<BroadcastContext>,
    /// Engine-side handler registration; taken on shutdown.
    handler: Option<HandlerId>,
}

impl Provider {
    /// Bind a provider to the given engine.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        let controls = Controls::new(Arc::clone(&engine));
        let context = Arc::new(BroadcastContext::new(ViewContext {
            snapshot: engine.snapshot(),
            controls,
        }));

        // The handler holds only a Weak: once the context is gone, a
        // floating engine notification is a no-op rather than a call into
        // a torn-down tree.
        let weak: Weak<BroadcastContext> = Arc::downgrade(&context);
        let handler = engine.subscribe(Arc::new(move |snapshot: &Snapshot| {
            if let Some(context) = weak.upgrade() {
                context.broadcast(snapshot.clone());
            }
        }));
        debug!(?handler, "provider bound to engine");

        Self {
            engine,
            context,
            handler: Some(handler),
        }
    }

    /// The broadcast context shared by everything mounted under this
    /// provider.
    pub fn context(&self) -> Arc<BroadcastContext> {
        Arc::clone(&self.context)
    }

    /// The latest snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.context.current().snapshot
    }

    /// The bound control operations.
    pub fn controls(&self) -> Controls {
        self.context.current().controls
    }

    /// Mount a conditional renderer. It renders immediately against the
    /// current value and re-renders on every broadcast until the returned
    /// mount is dropped.
    pub fn mount<N, V>(&self, view: V) -> Result<Mount<N>>
    where
        N: Send + Sync + 'static,
        V: View<N> + Send + Sync + 'static,
    {
        let output = Arc::new(RwLock::new(None));
        let sink = Arc::clone(&output);
        let id = self.context.attach(Arc::new(move |value: &ViewContext| {
            *sink.write() = view.render(value);
        }))?;

        Ok(Mount::new(id, self.context(), output))
    }

    /// Attach a raw consumer invoked with every context value, match-free.
    /// The counterpart of mounting a bare context consumer.
    pub fn observe(
        &self,
        callback: impl Fn(&ViewContext) + Send + Sync + 'static,
    ) -> Result<Observer> {
        let id = self.context.attach(Arc::new(callback))?;
        Ok(Observer {
            id,
            context: self.context(),
        })
    }

    /// Mount a lifecycle hook. `on_did_mount` fires here, exactly once;
    /// `on_will_unmount` fires when the returned mount is dropped, with
    /// the snapshot held at that moment.
    pub fn mount_control<N>(&self, control: Control<N>) -> Result<ControlMount<N>> {
        ControlMount::attach(control, self.context())
    }

    /// Watch snapshot changes from outside the render tree, over a
    /// bounded channel with the default buffer.
    pub fn watch(&self) -> Result<WatchHandle> {
        self.context.watch_default()
    }

    /// Watch with an explicit buffer size. Watchers that fall behind the
    /// buffer are dropped.
    pub fn watch_with_buffer(&self, buffer: usize) -> Result<WatchHandle> {
        self.context.watch(buffer)
    }

    /// Stop watching. Safe no-op for unknown ids.
    pub fn unwatch(&self, id: WatchId) {
        self.context.unwatch(id);
    }

    /// Detach a consumer by id. Safe no-op for unknown ids; mounts do
    /// this automatically on drop.
    pub fn detach(&self, id: ConsumerId) {
        self.context.detach(id);
    }

    /// Tear down before drop: unsubscribe from the engine and close the
    /// context. Idempotent; later mounts and watches are refused with
    /// [`BindError::ProviderShutDown`](crate::BindError::ProviderShutDown).
    pub fn shutdown(&mut self) {
        if let Some(handler) = self.handler.take() {
            self.engine.unsubscribe(handler);
            debug!(?handler, "provider unbound from engine");
        }
        self.context.close();
    }

    /// Has this provider been shut down?
    pub fn is_shut_down(&self) -> bool {
        self.handler.is_none()
    }
}

impl Drop for Provider {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("handler", &self.handler)
            .field("consumers", &self.context.consumer_count())
            .finish_non_exhaustive()
    }
}

/// Guard for a raw consumer; detaches on drop.
pub struct Observer {
    id: ConsumerId,
    context: Arc<BroadcastContext>,
}

impl Observer {
    pub fn id(&self) -> ConsumerId {
        self.id
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        self.context.detach(self.id);
    }
}

impl std::fmt::Debug for Observer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observer").field("id", &self.id).finish()
    }
}
