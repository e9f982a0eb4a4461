//=========================================================================
// State Managers
//=========================================================================
//
// Two ways of driving the same registry:
//
//   StateManager       direct replace, background init, loading overlay
//   StackStateManager  navigation stack, synchronous init
//
// Both route update/draw to the active state and turn exit requests
// coming from states into transitions.
//
//=========================================================================

//=== Module Declarations =================================================

mod stack_manager;
mod state_manager;

//=== Public API ==========================================================

pub use stack_manager::{StackStateManager, StackStateManagerBuilder};
pub use state_manager::{StateManager, StateManagerBuilder};
