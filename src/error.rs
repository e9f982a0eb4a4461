//=========================================================================
// State Errors
//=========================================================================
//
// Error taxonomy shared by both managers.
//
// Usage errors are returned at the call site. Worker failures are
// produced inside background tasks and surfaced through the task
// supervisor as `TaskFailure` records.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::fmt;
use std::io;

use thiserror::Error;

//=== Hook Types ==========================================================

/// Error type returned by state lifecycle hooks.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by state lifecycle hooks.
pub type HookResult = Result<(), HookError>;

//=== HookPhase ===========================================================

/// Lifecycle hook that produced a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    Init,
    Enter,
    Exit,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HookPhase::Init => "on_init",
            HookPhase::Enter => "on_enter",
            HookPhase::Exit => "on_exit",
        };
        f.write_str(name)
    }
}

//=== StateError ==========================================================

/// Errors reported by the state managers.
#[derive(Debug, Error)]
pub enum StateError {
    /// `tick`, `update` or `draw` called before the manager was started.
    #[error("state manager wasn't started yet")]
    NotStarted,

    /// A name that is not present in the registry.
    #[error("unknown state `{0}`")]
    UnknownState(String),

    /// The empty (or whitespace-only) name is reserved.
    #[error("the empty string cannot be the name of a state")]
    BlankName,

    /// Registering the same name twice.
    #[error("state `{0}` is already registered")]
    DuplicateState(String),

    /// A lifecycle hook returned an error.
    #[error("{phase} of state `{state}` failed")]
    Hook {
        state: String,
        phase: HookPhase,
        #[source]
        source: HookError,
    },

    /// A state's lock was poisoned by a panicking worker.
    #[error("state `{0}` was poisoned by a panicking worker")]
    Poisoned(String),

    /// A background worker panicked.
    #[error("worker `{task}` panicked: {message}")]
    WorkerPanicked { task: String, message: String },

    /// The OS refused to spawn a worker thread.
    #[error("failed to spawn worker thread")]
    Spawn(#[from] io::Error),
}

impl StateError {
    pub(crate) fn hook(state: &str, phase: HookPhase, source: HookError) -> Self {
        StateError::Hook {
            state: state.to_owned(),
            phase,
            source,
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn hook_error_keeps_source() {
        let err = StateError::hook("play", HookPhase::Enter, "board file missing".into());
        assert_eq!(err.to_string(), "on_enter of state `play` failed");
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("board file missing"));
    }

    #[test]
    fn usage_errors_render_names() {
        assert_eq!(
            StateError::UnknownState("credits".into()).to_string(),
            "unknown state `credits`"
        );
        assert_eq!(StateError::NotStarted.to_string(), "state manager wasn't started yet");
    }
}
