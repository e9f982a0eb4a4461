//=========================================================================
// State System
//=========================================================================
//
// Defines what a state is and what it may ask of its manager.
//
// Architecture:
//   StateRegistry
//     └─ name → Arc<Mutex<Box<dyn State<T>>>>
//   InitTracker
//     └─ name → { initialized, loading }
//   StateContext  (handed to every callback)
//     ├─ request_exit() → channel → manager
//     └─ sibling()      → registry lookup
//
//=========================================================================

//=== Module Declarations =================================================

mod context;
mod init_tracker;
mod registry;
mod transition_queue;

//=== External Dependencies ===============================================

use std::collections::BTreeMap;
use std::time::Duration;

//=== Internal Dependencies ===============================================

use crate::error::HookResult;

//=== Public API ==========================================================

pub use context::{ExitRequest, StateContext};
pub use init_tracker::InitTracker;
pub use registry::{SharedState, StateRegistry};
pub(crate) use registry::lock_state;
pub use transition_queue::TransitionQueue;

//=== State Trait =========================================================

/// A named screen of the application.
///
/// States are registered once in a [`StateRegistry`] and activated by a
/// manager. Lifecycle hooks may run on a background worker, so a state
/// must be `Send`. Every callback receives a [`StateContext`] through
/// which the state can request a transition or look up its siblings.
///
/// # Minimal Implementation
///
/// Only `update()` and `draw()` are required:
///
/// ```rust
/// # use std::time::Duration;
/// # use aetheric_states::prelude::*;
/// struct Credits;
///
/// impl State<String> for Credits {
///     fn update(&mut self, _dt: Duration, _ctx: &StateContext<String>) {}
///
///     fn draw(&mut self, target: &mut String, _ctx: &StateContext<String>) {
///         target.push_str("credits");
///     }
/// }
/// ```
pub trait State<T: 'static>: Send {
    /// Called once, on the first activation of the state.
    fn on_init(&mut self, _ctx: &StateContext<T>) -> HookResult {
        Ok(())
    }

    /// Called on every activation, after `on_init` when that was needed.
    fn on_enter(&mut self, _from: &str, _args: &TransitionArgs, _ctx: &StateContext<T>) -> HookResult {
        Ok(())
    }

    /// Called right before the manager leaves this state for `to`.
    fn on_exit(&mut self, _to: &str, _ctx: &StateContext<T>) -> HookResult {
        Ok(())
    }

    /// Called once per tick while the state is current and ready.
    fn update(&mut self, dt: Duration, ctx: &StateContext<T>);

    /// Called once per tick after `update`.
    fn draw(&mut self, target: &mut T, ctx: &StateContext<T>);
}

//=== TransitionArgs ======================================================

/// Named arguments passed along with a transition.
///
/// Delivered to the target state's `on_enter`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionArgs {
    values: BTreeMap<String, String>,
}

impl TransitionArgs {
    /// Creates an empty argument set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an argument, replacing a previous value under the same key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
