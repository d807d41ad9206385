//! Broadcast context: one shared value fanned out to many consumers.
//!
//! A Provider owns exactly one [`BroadcastContext`]. Descendant consumers
//! attach a callback and receive the current value immediately, then every
//! later value. Each broadcast delivers the identical [`ViewContext`] to
//! every consumer attached at scan time, so no consumer can observe a mix
//! of old and new snapshot fields within one pass.
//!
//! Off-tree watchers receive snapshots over a bounded channel instead;
//! watchers that fall behind are dropped rather than allowed to stall the
//! broadcast.

use crate::engine::Engine;
use crate::error::{BindError, Result};
use crate::types::{ConsumerId, ExtStateUpdate, Snapshot, WatchId};
use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{trace, warn};

/// Default buffer size for watch channels.
const DEFAULT_WATCH_BUFFER: usize = 1024;

/// The three control operations, bound once at Provider construction.
///
/// Clones share the same engine `Arc`, so handing a `Controls` down through
/// many layers never produces a fresh binding.
#[derive(Clone)]
pub struct Controls {
    engine: Arc<dyn Engine>,
}

impl Controls {
    pub(crate) fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Start the machine.
    pub fn init(&self) {
        self.engine.init();
    }

    /// Request a transition by event name.
    pub fn transition(&self, event: &str) {
        self.engine.transition(event);
    }

    /// Replace the external state or update it from the previous value.
    pub fn set_extstate(&self, update: impl Into<ExtStateUpdate>) {
        self.engine.set_extstate(update.into());
    }

    /// Updater-form convenience for `set_extstate`.
    pub fn update_extstate(&self, f: impl FnOnce(Value) -> Value + Send + 'static) {
        self.engine.set_extstate(ExtStateUpdate::apply(f));
    }

    /// Do two `Controls` drive the same engine binding?
    pub fn same_binding(&self, other: &Controls) -> bool {
        Arc::ptr_eq(&self.engine, &other.engine)
    }
}

impl std::fmt::Debug for Controls {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controls").finish_non_exhaustive()
    }
}

/// The broadcast value: current snapshot plus the bound control operations.
#[derive(Clone, Debug)]
pub struct ViewContext {
    pub snapshot: Snapshot,
    pub controls: Controls,
}

impl ViewContext {
    /// Shorthand for `snapshot.state`.
    pub fn state(&self) -> Option<&crate::types::StateDescriptor> {
        self.snapshot.state.as_ref()
    }

    /// Shorthand for `snapshot.extstate`.
    pub fn extstate(&self) -> &Value {
        &self.snapshot.extstate
    }
}

type Consumer = Arc<dyn Fn(&ViewContext) + Send + Sync>;

/// Why a watcher stopped receiving events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Send buffer overflowed (slow watcher).
    BufferOverflow,
    /// Explicitly unwatched.
    Unwatched,
    /// The owning Provider was torn down.
    ProviderShutDown,
}

/// Events delivered to off-tree watchers.
#[derive(Clone, Debug)]
pub enum WatchEvent {
    /// A new snapshot was broadcast.
    Change(Snapshot),
    /// The watch ended; no further events follow.
    Dropped { reason: DropReason },
}

/// Handle for receiving watch events.
pub struct WatchHandle {
    pub id: WatchId,
    receiver: Receiver<WatchEvent>,
}

impl WatchHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<WatchEvent> {
        self.receiver
            .recv()
            .map_err(|e| BindError::WatchDropped(e.to_string()))
    }

    /// Try to receive an event (non-blocking). `None` when empty.
    pub fn try_recv(&self) -> Option<WatchEvent> {
        self.receiver.try_recv().ok()
    }

    /// Receive with timeout.
    pub fn recv_timeout(&self, timeout: std::time::Duration) -> Result<WatchEvent> {
        self.receiver
            .recv_timeout(timeout)
            .map_err(|e| BindError::WatchDropped(e.to_string()))
    }
}

struct Watcher {
    sender: Sender<WatchEvent>,
}

impl Watcher {
    /// Try to send an event. False means the watcher should be dropped.
    fn try_send(&self, event: WatchEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }
}

/// Provider-scoped publish/subscribe channel for context values.
pub struct BroadcastContext {
    /// Latest broadcast value.
    value: RwLock<ViewContext>,
    /// Attached consumers by id.
    consumers: RwLock<HashMap<ConsumerId, Consumer>>,
    /// Off-tree watchers by id.
    watchers: RwLock<HashMap<WatchId, Watcher>>,
    /// Counter for consumer and watch ids.
    next_id: AtomicU64,
    /// False once the owning Provider has been torn down.
    open: AtomicBool,
    /// Snapshots queued by re-entrant broadcasts during a scan.
    pending: Mutex<VecDeque<Snapshot>>,
    /// True while a scan is draining the queue.
    scanning: AtomicBool,
}

impl BroadcastContext {
    pub(crate) fn new(initial: ViewContext) -> Self {
        Self {
            value: RwLock::new(initial),
            consumers: RwLock::new(HashMap::new()),
            watchers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            open: AtomicBool::new(true),
            pending: Mutex::new(VecDeque::new()),
            scanning: AtomicBool::new(false),
        }
    }

    /// The latest broadcast value.
    pub fn current(&self) -> ViewContext {
        self.value.read().clone()
    }

    /// Is the owning Provider still alive?
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Number of attached consumers.
    pub fn consumer_count(&self) -> usize {
        self.consumers.read().len()
    }

    /// Number of attached watchers.
    pub fn watcher_count(&self) -> usize {
        self.watchers.read().len()
    }

    /// Attach a consumer. It is invoked synchronously with the current
    /// value before this returns, then once per broadcast.
    pub(crate) fn attach(&self, consumer: Consumer) -> Result<ConsumerId> {
        if !self.is_open() {
            return Err(BindError::ProviderShutDown);
        }

        let id = ConsumerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.consumers.write().insert(id, consumer.clone());

        // Initial delivery, outside the registry lock: the consumer may
        // trigger a transition and re-enter broadcast().
        let current = self.current();
        consumer(&current);

        Ok(id)
    }

    /// Detach a consumer. Safe no-op for unknown ids and after shutdown.
    pub(crate) fn detach(&self, id: ConsumerId) {
        self.consumers.write().remove(&id);
    }

    /// Attach an off-tree watcher with the given buffer size.
    pub(crate) fn watch(&self, buffer: usize) -> Result<WatchHandle> {
        if !self.is_open() {
            return Err(BindError::ProviderShutDown);
        }

        let id = WatchId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(buffer.max(1));
        self.watchers.write().insert(id, Watcher { sender });

        Ok(WatchHandle { id, receiver })
    }

    /// Attach a watcher with the default buffer size.
    pub(crate) fn watch_default(&self) -> Result<WatchHandle> {
        self.watch(DEFAULT_WATCH_BUFFER)
    }

    /// Remove a watcher. Safe no-op for unknown ids.
    pub(crate) fn unwatch(&self, id: WatchId) {
        if let Some(watcher) = self.watchers.write().remove(&id) {
            let _ = watcher.try_send(WatchEvent::Dropped {
                reason: DropReason::Unwatched,
            });
        }
    }

    /// Replace the value and propagate to every consumer and watcher.
    ///
    /// The consumer list is captured once per scan and every callback
    /// receives a reference to the same value, which is the
    /// atomic-snapshot guarantee. A consumer that triggers a transition
    /// mid-scan re-enters here; the new snapshot is queued and delivered
    /// in its own full scan once the current one finishes, so no consumer
    /// observes values out of order.
    pub(crate) fn broadcast(&self, snapshot: Snapshot) {
        if !self.is_open() {
            // Floating notification after teardown; deliberately inert.
            return;
        }

        self.pending.lock().push_back(snapshot);
        if self.scanning.swap(true, Ordering::SeqCst) {
            // A scan further up the stack will drain the queue.
            return;
        }

        loop {
            // Pop under a short-lived lock: the guard must not be held
            // across `deliver`, which may re-enter `broadcast`.
            loop {
                let next = self.pending.lock().pop_front();
                match next {
                    Some(next) => self.deliver(next),
                    None => break,
                }
            }
            self.scanning.store(false, Ordering::SeqCst);
            if self.pending.lock().is_empty() || self.scanning.swap(true, Ordering::SeqCst) {
                break;
            }
        }
    }

    /// One atomic scan: all consumers and watchers see this exact value.
    fn deliver(&self, snapshot: Snapshot) {
        let value = {
            let mut guard = self.value.write();
            guard.snapshot = snapshot;
            guard.clone()
        };
        trace!(consumers = self.consumer_count(), "broadcasting snapshot");

        // Capture the registry, then invoke without holding the lock so
        // consumers may attach, detach, or transition during the scan.
        let consumers: Vec<Consumer> = self.consumers.read().values().cloned().collect();
        for consumer in &consumers {
            consumer(&value);
        }

        self.notify_watchers(&value.snapshot);
    }

    fn notify_watchers(&self, snapshot: &Snapshot) {
        let mut overflowed = Vec::new();
        {
            let watchers = self.watchers.read();
            for (id, watcher) in watchers.iter() {
                if !watcher.try_send(WatchEvent::Change(snapshot.clone())) {
                    overflowed.push(*id);
                }
            }
        }

        if !overflowed.is_empty() {
            let mut watchers = self.watchers.write();
            for id in overflowed {
                if let Some(watcher) = watchers.remove(&id) {
                    warn!(?id, "dropping slow watcher");
                    let _ = watcher.try_send(WatchEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }

    /// Stop accepting broadcasts and notify watchers. Consumers are kept
    /// until their mounts detach; they simply receive nothing further.
    pub(crate) fn close(&self) {
        if !self.open.swap(false, Ordering::SeqCst) {
            return;
        }

        let mut watchers = self.watchers.write();
        for (_, watcher) in watchers.drain() {
            let _ = watcher.try_send(WatchEvent::Dropped {
                reason: DropReason::ProviderShutDown,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ChangeHandler, Engine};
    use crate::types::{HandlerId, StateDescriptor};
    use parking_lot::Mutex;
    use serde_json::json;

    /// Inert engine: the context tests only need `Controls` to exist.
    struct NullEngine;

    impl Engine for NullEngine {
        fn current_state(&self) -> Option<StateDescriptor> {
            None
        }
        fn current_extstate(&self) -> Value {
            Value::Null
        }
        fn init(&self) {}
        fn transition(&self, _event: &str) {}
        fn set_extstate(&self, _update: ExtStateUpdate) {}
        fn subscribe(&self, _handler: ChangeHandler) -> HandlerId {
            HandlerId(0)
        }
        fn unsubscribe(&self, _handler: HandlerId) {}
    }

    fn test_context() -> BroadcastContext {
        let controls = Controls::new(Arc::new(NullEngine));
        BroadcastContext::new(ViewContext {
            snapshot: Snapshot::uninitialized(),
            controls,
        })
    }

    fn snapshot_in(state: &str) -> Snapshot {
        Snapshot::new(Some(StateDescriptor::new(state)), json!({}))
    }

    #[test]
    fn test_attach_delivers_current_value_immediately() {
        let context = test_context();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&seen);
        context
            .attach(Arc::new(move |value: &ViewContext| {
                sink.lock().push(value.snapshot.clone());
            }))
            .unwrap();

        assert_eq!(seen.lock().len(), 1);
        assert_eq!(seen.lock()[0], Snapshot::uninitialized());
    }

    #[test]
    fn test_broadcast_reaches_all_consumers_with_same_value() {
        let context = test_context();
        let first = Arc::new(Mutex::new(Vec::new()));
        let second = Arc::new(Mutex::new(Vec::new()));

        for sink in [&first, &second] {
            let sink = Arc::clone(sink);
            context
                .attach(Arc::new(move |value: &ViewContext| {
                    sink.lock().push(value.snapshot.clone());
                }))
                .unwrap();
        }

        context.broadcast(snapshot_in("second"));

        let first = first.lock();
        let second = second.lock();
        assert_eq!(*first, *second);
        assert_eq!(first.last().unwrap(), &snapshot_in("second"));
    }

    #[test]
    fn test_detach_stops_delivery_and_is_idempotent() {
        let context = test_context();
        let seen = Arc::new(Mutex::new(0usize));

        let sink = Arc::clone(&seen);
        let id = context
            .attach(Arc::new(move |_: &ViewContext| {
                *sink.lock() += 1;
            }))
            .unwrap();
        assert_eq!(*seen.lock(), 1);

        context.detach(id);
        context.detach(id); // double detach is a no-op
        context.broadcast(snapshot_in("second"));
        assert_eq!(*seen.lock(), 1);
    }

    #[test]
    fn test_closed_context_drops_broadcasts() {
        let context = test_context();
        context.close();

        // Defined no-op, not a crash.
        context.broadcast(snapshot_in("second"));
        assert_eq!(context.current().snapshot, Snapshot::uninitialized());

        assert!(matches!(
            context.attach(Arc::new(|_: &ViewContext| {})),
            Err(BindError::ProviderShutDown)
        ));
        assert!(matches!(
            context.watch_default(),
            Err(BindError::ProviderShutDown)
        ));
    }

    #[test]
    fn test_watcher_receives_snapshots() {
        let context = test_context();
        let handle = context.watch_default().unwrap();

        context.broadcast(snapshot_in("second"));

        match handle.recv_timeout(std::time::Duration::from_millis(100)).unwrap() {
            WatchEvent::Change(snapshot) => assert_eq!(snapshot, snapshot_in("second")),
            other => panic!("expected Change, got {:?}", other),
        }
    }

    #[test]
    fn test_slow_watcher_dropped_on_overflow() {
        let context = test_context();
        let handle = context.watch(2).unwrap();

        for i in 0..10 {
            context.broadcast(snapshot_in(&format!("s{}", i)));
        }

        assert_eq!(context.watcher_count(), 0);
        // Buffered events are still readable, ending in a drop notice or
        // a disconnected channel.
        let mut dropped = false;
        while let Some(event) = handle.try_recv() {
            if let WatchEvent::Dropped { reason } = event {
                assert_eq!(reason, DropReason::BufferOverflow);
                dropped = true;
            }
        }
        assert!(dropped || handle.try_recv().is_none());
    }

    #[test]
    fn test_close_notifies_watchers() {
        let context = test_context();
        let handle = context.watch_default().unwrap();

        context.close();

        match handle.recv_timeout(std::time::Duration::from_millis(100)).unwrap() {
            WatchEvent::Dropped { reason } => assert_eq!(reason, DropReason::ProviderShutDown),
            other => panic!("expected Dropped, got {:?}", other),
        }
    }

    #[test]
    fn test_consumer_clone_of_value_does_not_feed_back() {
        let context = test_context();

        let grabbed = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&grabbed);
        context
            .attach(Arc::new(move |value: &ViewContext| {
                *sink.lock() = Some(value.clone());
            }))
            .unwrap();

        // A consumer mutating its own clone cannot inject a value into
        // the broadcast.
        let mut own = grabbed.lock().take().unwrap();
        own.snapshot = snapshot_in("forged");
        assert_eq!(own.snapshot, snapshot_in("forged"));
        assert_eq!(context.current().snapshot, Snapshot::uninitialized());
    }
}
