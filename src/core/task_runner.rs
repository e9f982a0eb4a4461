//=========================================================================
// Task Runner
//=========================================================================
//
// Supervisor for background initialization and transition workers.
//
// Architecture:
//   spawn() ──> thread::Builder ──> worker
//                                    │ (drop guard)
//   poll()  <── Receiver<TaskId> <───┘ completion signal
//     └─ remove from map, join, report outcome
//
// The supervisor owns the task map exclusively. Workers never touch it;
// they only send their id when they finish (or unwind). Entries are
// removed after the worker has been joined.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::{debug, error};

//=== Internal Dependencies ===============================================

use crate::error::StateError;

//=== TaskId ==============================================================

/// Opaque identifier of a spawned worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

//=== TaskKind ============================================================

/// What a worker was spawned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Init,
    Transition,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Init => f.write_str("init"),
            TaskKind::Transition => f.write_str("transition"),
        }
    }
}

//=== TaskFailure / TaskOutcome ===========================================

/// A worker that ended with an error or a panic.
#[derive(Debug)]
pub struct TaskFailure {
    pub id: TaskId,
    pub kind: TaskKind,
    /// State the task was initializing or transitioning to.
    pub state: String,
    pub error: StateError,
}

/// Result of a reaped worker.
#[derive(Debug)]
pub enum TaskOutcome {
    Completed(TaskId),
    Failed(TaskFailure),
}

impl TaskOutcome {
    pub fn id(&self) -> TaskId {
        match self {
            TaskOutcome::Completed(id) => *id,
            TaskOutcome::Failed(failure) => failure.id,
        }
    }
}

//=== CompletionSignal ====================================================

// Sends the task id when the worker body returns or unwinds.
struct CompletionSignal {
    id: TaskId,
    done: Sender<TaskId>,
}

impl Drop for CompletionSignal {
    fn drop(&mut self) {
        let _ = self.done.send(self.id);
    }
}

//=== TaskRunner ==========================================================

struct Task {
    kind: TaskKind,
    state: String,
    handle: JoinHandle<Result<(), StateError>>,
}

/// Spawns one thread per unit of work and joins it when it signals.
pub struct TaskRunner {
    next_id: u64,
    tasks: HashMap<TaskId, Task>,
    done_tx: Sender<TaskId>,
    done_rx: Receiver<TaskId>,
}

impl TaskRunner {
    pub fn new() -> Self {
        let (done_tx, done_rx) = unbounded();
        Self {
            next_id: 0,
            tasks: HashMap::new(),
            done_tx,
            done_rx,
        }
    }

    //--- Spawning ---------------------------------------------------------

    /// Runs `work` on a new named thread.
    pub fn spawn<F>(&mut self, kind: TaskKind, state: &str, work: F) -> Result<TaskId, StateError>
    where
        F: FnOnce() -> Result<(), StateError> + Send + 'static,
    {
        let id = TaskId(self.next_id);
        self.next_id += 1;

        let signal = CompletionSignal {
            id,
            done: self.done_tx.clone(),
        };
        let handle = thread::Builder::new()
            .name(format!("state-{}-{}", kind, state))
            .spawn(move || {
                let _signal = signal;
                work()
            })?;

        debug!("Spawned {} task {} for state {:?}", kind, id, state);
        self.tasks.insert(
            id,
            Task {
                kind,
                state: state.to_owned(),
                handle,
            },
        );
        Ok(id)
    }

    //--- Supervision ------------------------------------------------------

    /// Joins every worker that has signalled completion. Never waits on
    /// a worker that is still running.
    pub fn poll(&mut self) -> Vec<TaskOutcome> {
        let mut outcomes = Vec::new();
        while let Ok(id) = self.done_rx.try_recv() {
            if let Some(task) = self.tasks.remove(&id) {
                outcomes.push(Self::join(id, task));
            }
        }
        outcomes
    }

    /// Blocks until the oldest running worker finishes, then reaps
    /// everything that has finished by then.
    pub fn wait_next(&mut self) -> Vec<TaskOutcome> {
        if self.tasks.is_empty() {
            return Vec::new();
        }
        let mut outcomes = Vec::new();
        if let Ok(id) = self.done_rx.recv() {
            if let Some(task) = self.tasks.remove(&id) {
                outcomes.push(Self::join(id, task));
            }
        }
        outcomes.extend(self.poll());
        outcomes
    }

    /// Joins every outstanding worker, oldest first.
    pub fn drain(&mut self) -> Vec<TaskOutcome> {
        let mut ids: Vec<TaskId> = self.tasks.keys().copied().collect();
        ids.sort();

        let outcomes = ids
            .into_iter()
            .filter_map(|id| self.tasks.remove(&id).map(|task| Self::join(id, task)))
            .collect();

        while self.done_rx.try_recv().is_ok() {}
        outcomes
    }

    /// Number of workers not yet reaped.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_running(&self, id: TaskId) -> bool {
        self.tasks.contains_key(&id)
    }

    //--- Internal Helpers -------------------------------------------------

    fn join(id: TaskId, task: Task) -> TaskOutcome {
        let name = format!("{}-{}", task.kind, task.state);
        let error = match task.handle.join() {
            Ok(Ok(())) => {
                debug!("Task {} ({}) finished", id, name);
                return TaskOutcome::Completed(id);
            }
            Ok(Err(err)) => err,
            Err(payload) => StateError::WorkerPanicked {
                task: name,
                message: panic_message(payload.as_ref()),
            },
        };

        error!("Task {} ({} {:?}) failed: {}", id, task.kind, task.state, error);
        TaskOutcome::Failed(TaskFailure {
            id,
            kind: task.kind,
            state: task.state,
            error,
        })
    }
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HookPhase;
    use crossbeam_channel::bounded;

    #[test]
    fn poll_does_not_reap_running_tasks() {
        let mut runner = TaskRunner::new();
        let (release_tx, release_rx) = bounded::<()>(0);

        let id = runner
            .spawn(TaskKind::Init, "menu", move || {
                let _ = release_rx.recv();
                Ok(())
            })
            .unwrap();

        assert!(runner.poll().is_empty());
        assert!(runner.is_running(id));

        release_tx.send(()).unwrap();
        let outcomes = runner.wait_next();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes[0], TaskOutcome::Completed(done) if done == id));
        assert_eq!(runner.in_flight(), 0);
    }

    #[test]
    fn hook_errors_become_failures() {
        let mut runner = TaskRunner::new();
        runner
            .spawn(TaskKind::Transition, "play", || {
                Err(StateError::hook("play", HookPhase::Init, "no puzzles".into()))
            })
            .unwrap();

        let outcomes = runner.drain();
        match &outcomes[..] {
            [TaskOutcome::Failed(failure)] => {
                assert_eq!(failure.kind, TaskKind::Transition);
                assert_eq!(failure.state, "play");
                assert!(matches!(failure.error, StateError::Hook { phase: HookPhase::Init, .. }));
            }
            other => panic!("unexpected outcomes: {:?}", other),
        }
    }

    #[test]
    fn panics_are_captured_with_message() {
        let mut runner = TaskRunner::new();
        runner
            .spawn(TaskKind::Init, "pause", || panic!("font missing"))
            .unwrap();

        let outcomes = runner.wait_next();
        match &outcomes[..] {
            [TaskOutcome::Failed(failure)] => match &failure.error {
                StateError::WorkerPanicked { task, message } => {
                    assert_eq!(task, "init-pause");
                    assert_eq!(message, "font missing");
                }
                other => panic!("unexpected error: {:?}", other),
            },
            other => panic!("unexpected outcomes: {:?}", other),
        }
    }

    #[test]
    fn drain_joins_everything_in_spawn_order() {
        let mut runner = TaskRunner::new();
        let ids: Vec<TaskId> = (0..4)
            .map(|_| runner.spawn(TaskKind::Init, "menu", || Ok(())).unwrap())
            .collect();

        let reaped: Vec<TaskId> = runner.drain().iter().map(TaskOutcome::id).collect();
        assert_eq!(reaped, ids);
        assert_eq!(runner.in_flight(), 0);
        assert!(runner.poll().is_empty());
    }
}
