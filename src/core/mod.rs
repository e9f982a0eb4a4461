//=========================================================================
// Core Building Blocks
//
// Shared machinery used by both state managers.
//
// Responsibilities:
// - Describe what a state is and how it talks back (`state`)
// - Supervise background workers (`task_runner`)
// - Provide the placeholder shown while a state loads (`loading`)
//
// Notes:
// Nothing in here decides *when* a transition happens. That policy
// lives in the managers (`crate::manager`), which compose these pieces.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod loading;
pub mod state;
pub mod task_runner;

//=== Re-exports ==========================================================

pub use loading::{Canvas, LoadingProjection, Spinner};
pub use state::{
    ExitRequest, InitTracker, SharedState, State, StateContext, StateRegistry, TransitionArgs,
    TransitionQueue,
};
pub use task_runner::{TaskFailure, TaskId, TaskKind, TaskOutcome, TaskRunner};
