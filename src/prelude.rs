//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use aetheric_states::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Managers
pub use crate::manager::{
    StackStateManager, StackStateManagerBuilder, StateManager, StateManagerBuilder,
};

// States
pub use crate::core::state::{State, StateContext, StateRegistry, TransitionArgs};

// Loading projection
pub use crate::core::loading::{Canvas, LoadingProjection, Spinner};

// Errors
pub use crate::error::{HookResult, StateError};
