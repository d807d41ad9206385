//! Pure match-predicate evaluation.
//!
//! Conditional renderers never inspect snapshots directly; they compile
//! their props into a [`Cond`] and ask it for a boolean. Selector
//! compilation lives here too, including the deliberate asymmetry between
//! `is` and `not` when no state exists yet (see `selector.rs`).

mod cond;
mod selector;

pub use cond::Cond;
pub use selector::{compile_activity, compile_state, ActivitySelector, StateSelector};
