//! # statebind
//!
//! Declarative view bindings over an external finite-state-machine
//! engine. The engine owns the machine semantics; this crate fans its
//! live state out to any number of conditional renderers, each with its
//! own match predicate, with one consistent snapshot per change.
//!
//! ## Core Concepts
//!
//! - **Provider**: binds an engine, holds the latest snapshot, owns the
//!   subscribe/unsubscribe lifecycle
//! - **Broadcast context**: one shared value propagated atomically to
//!   every attached consumer
//! - **Views**: `MachineView` (condition), `StateView` (state selector),
//!   `ActivityView` (activity selector), each with four rendering
//!   strategies
//! - **Control**: mount/unmount lifecycle callbacks
//!
//! ## Example
//!
//! ```ignore
//! use statebind::{Provider, StateView};
//! use std::sync::Arc;
//!
//! let provider = Provider::new(Arc::new(engine));
//! let mount = provider.mount(
//!     StateView::new().is("lit.green").children("walk".to_string()),
//! )?;
//!
//! provider.controls().init();
//! provider.controls().transition("TIMER");
//! assert!(mount.is_rendered());
//! ```

pub mod context;
pub mod engine;
pub mod error;
pub mod matching;
pub mod provider;
pub mod types;
pub mod views;

// Re-exports
pub use context::{
    BroadcastContext, Controls, DropReason, ViewContext, WatchEvent, WatchHandle,
};
pub use engine::{ChangeHandler, Engine};
pub use error::{BindError, Result};
pub use matching::{compile_activity, compile_state, ActivitySelector, Cond, StateSelector};
pub use provider::{Observer, Provider};
pub use types::*;
pub use views::{
    ActivityView, Children, Component, Control, ControlMount, MachineView, Mount, StateView, View,
};
