//=========================================================================
// Aetheric States — Library Root
//
// Screen state management for interactive applications.
//
// Responsibilities:
// - Keep a registry of named states (menu, play, pause, ...)
// - Initialize states lazily on background workers while the frame
//   loop keeps running
// - Show a loading projection in place of a state that is not ready
// - Mediate transitions, either direct-replace or stack-based
//
// Typical usage:
// ```no_run
// use aetheric_states::prelude::*;
//
// let registry = StateRegistry::new()
//     .with_state("menu", menu)?
//     .with_state("play", play)?;
// let mut manager = StateManagerBuilder::new(registry).with_start("menu").build()?;
//
// loop {
//     manager.tick(dt, &mut screen)?;
// }
// ```
//
//=========================================================================

//--- Public Modules ------------------------------------------------------
//
// `core` holds the building blocks shared by both managers: the state
// trait and registry, init bookkeeping, the task supervisor and the
// loading projection.
//
// `manager` holds the two managers and their builders.
//
pub mod core;
pub mod error;
pub mod manager;
pub mod prelude;

//--- Public Exports ------------------------------------------------------

pub use error::{HookError, HookPhase, HookResult, StateError};
pub use manager::{StackStateManager, StackStateManagerBuilder, StateManager, StateManagerBuilder};
