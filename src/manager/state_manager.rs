//=========================================================================
// State Manager
//=========================================================================
//
// Direct-replace state machine with background initialization.
//
// Architecture:
// ```text
//   UI thread                          workers
//   ─────────                          ───────
//   update(dt)
//     ├─ runner.poll()   <──────────── completion signals
//     ├─ exits.try_recv() <─────────── StateContext::request_exit
//     ├─ dispatch()  ──spawn──────────> on_exit → on_init? → on_enter
//     └─ loading? projection : state.update
//   draw(target)
//     └─ loading? projection : state.draw
// ```
//
// Only one task (initialization or transition) runs at a time. Exit
// requests that arrive while a task is in flight wait in a FIFO queue
// and start once the task has been reaped, so concurrent requests can
// never race on the same state.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::{Arc, TryLockError};
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};
use log::{debug, info, warn};

//=== Internal Dependencies ===============================================

use crate::core::state::lock_state;
use crate::core::{
    Canvas, ExitRequest, InitTracker, LoadingProjection, Spinner, StateContext, StateRegistry,
    TaskFailure, TaskKind, TaskOutcome, TaskRunner, TransitionArgs, TransitionQueue,
};
use crate::error::{HookPhase, StateError};

//=== StateManagerBuilder =================================================

/// Builder for configuring and constructing a [`StateManager`].
///
/// # Default Values
///
/// - **Start state**: none, unless exactly one state is registered
/// - **Preload**: off
/// - **Loading projection**: [`Spinner`] (requires a [`Canvas`] target)
///
/// # Examples
///
/// ```no_run
/// # use std::time::Duration;
/// # use aetheric_states::prelude::*;
/// # struct Screen;
/// # impl Canvas for Screen {
/// #     fn center(&self) -> (f32, f32) { (0.0, 0.0) }
/// #     fn draw_label(&mut self, _: &str, _: (f32, f32)) {}
/// #     fn draw_arc(&mut self, _: (f32, f32), _: f32, _: f32, _: f32) {}
/// # }
/// # struct Menu;
/// # impl State<Screen> for Menu {
/// #     fn update(&mut self, _: Duration, _: &StateContext<Screen>) {}
/// #     fn draw(&mut self, _: &mut Screen, _: &StateContext<Screen>) {}
/// # }
/// # struct Play;
/// # impl State<Screen> for Play {
/// #     fn update(&mut self, _: Duration, _: &StateContext<Screen>) {}
/// #     fn draw(&mut self, _: &mut Screen, _: &StateContext<Screen>) {}
/// # }
/// let registry = StateRegistry::new()
///     .with_state("menu", Menu)?
///     .with_state("play", Play)?;
///
/// let mut manager = StateManagerBuilder::new(registry)
///     .with_start("menu")
///     .with_preload(true)
///     .build()?;
///
/// let mut screen = Screen;
/// manager.tick(Duration::from_millis(16), &mut screen)?;
/// # Ok::<(), StateError>(())
/// ```
pub struct StateManagerBuilder<T: 'static> {
    registry: StateRegistry<T>,
    start: Option<String>,
    preload: bool,
    loading: Box<dyn LoadingProjection<T>>,
}

impl<T: Canvas + 'static> StateManagerBuilder<T> {
    /// Creates a builder that shows the default [`Spinner`] while loading.
    pub fn new(registry: StateRegistry<T>) -> Self {
        Self::with_projection(registry, Spinner::new())
    }
}

impl<T: 'static> StateManagerBuilder<T> {
    /// Creates a builder with a custom loading projection.
    ///
    /// Works with any draw target, not only [`Canvas`] ones.
    pub fn with_projection<P>(registry: StateRegistry<T>, projection: P) -> Self
    where
        P: LoadingProjection<T> + 'static,
    {
        Self {
            registry,
            start: None,
            preload: false,
            loading: Box::new(projection),
        }
    }

    /// Starts the manager on `name` as part of [`build`](Self::build).
    pub fn with_start(mut self, name: impl Into<String>) -> Self {
        self.start = Some(name.into());
        self
    }

    /// Initializes every registered state in the background at build time.
    ///
    /// Default: false
    pub fn with_preload(mut self, preload: bool) -> Self {
        self.preload = preload;
        self
    }

    /// Replaces the loading projection.
    pub fn with_loading_projection<P>(mut self, projection: P) -> Self
    where
        P: LoadingProjection<T> + 'static,
    {
        self.loading = Box::new(projection);
        self
    }

    /// Builds the manager.
    ///
    /// Fails if the configured start state is not registered.
    pub fn build(self) -> Result<StateManager<T>, StateError> {
        let registry = Arc::new(self.registry);
        let tracker = Arc::new(InitTracker::new(registry.names()));
        let (exit_tx, exit_rx) = unbounded();

        let start = match self.start {
            Some(name) => Some(name),
            None => registry.sole().map(|name| {
                info!("Only one state registered, starting {:?} automatically", name);
                name.to_owned()
            }),
        };

        let mut manager = StateManager {
            context: StateContext::new(Arc::clone(&registry), exit_tx),
            registry,
            tracker,
            runner: TaskRunner::new(),
            loading: self.loading,
            exits: exit_rx,
            pending: TransitionQueue::new(),
            current: None,
            failures: Vec::new(),
        };

        if self.preload {
            let names: Vec<String> = manager.registry.names().map(str::to_owned).collect();
            info!("Preloading {} states", names.len());
            for name in &names {
                manager.init_state(name)?;
            }
        }

        if let Some(name) = start {
            manager.start(&name)?;
        }

        Ok(manager)
    }
}

//=== StateManager ========================================================

/// Direct-replace state manager.
///
/// Exactly one state is current at a time. Initialization and
/// transitions run on background workers; while the current state is
/// loading, [`update`](Self::update) and [`draw`](Self::draw) go to the
/// loading projection instead.
///
/// Dropping the manager joins every outstanding worker.
pub struct StateManager<T: 'static> {
    registry: Arc<StateRegistry<T>>,
    tracker: Arc<InitTracker>,
    runner: TaskRunner,
    loading: Box<dyn LoadingProjection<T>>,
    context: StateContext<T>,
    exits: Receiver<ExitRequest>,
    pending: TransitionQueue,
    current: Option<String>,
    failures: Vec<TaskFailure>,
}

impl<T: 'static> StateManager<T> {
    //--- Lifecycle --------------------------------------------------------

    /// Starts the manager on `name` and begins initializing it.
    ///
    /// Returns `Ok(false)` if the manager was already started.
    pub fn start(&mut self, name: &str) -> Result<bool, StateError> {
        if let Some(current) = &self.current {
            warn!("State manager already started on {:?}, ignoring start({:?})", current, name);
            return Ok(false);
        }

        self.registry.validate(name)?;
        info!("Starting state manager with {:?}", name);
        self.current = Some(name.to_owned());
        self.init_state(name)?;
        Ok(true)
    }

    /// Requests a transition from the current state to `to`.
    ///
    /// Before [`start`](Self::start) this starts the manager on `to`
    /// instead. Unknown or blank names fail without changing anything.
    /// If another task is still in flight the transition is queued.
    pub fn request_exit(&mut self, to: &str, args: TransitionArgs) -> Result<(), StateError> {
        if self.current.is_none() {
            warn!("request_exit({:?}) called before start, starting there instead", to);
            self.start(to)?;
            return Ok(());
        }

        self.registry.validate(to)?;
        self.pending.push(ExitRequest::new(to, args));
        self.dispatch()
    }

    /// Waits until no task is in flight and no transition is queued.
    ///
    /// Blocks the caller; meant for shutdown paths and tests, not for
    /// the frame loop.
    pub fn wait_idle(&mut self) -> Result<(), StateError> {
        loop {
            self.collect_requests();
            self.dispatch()?;
            if self.runner.in_flight() == 0 {
                return Ok(());
            }
            let outcomes = self.runner.wait_next();
            self.record(outcomes);
        }
    }

    /// Joins every outstanding worker and returns all unclaimed failures.
    ///
    /// Queued transitions that never started are discarded.
    pub fn shutdown(mut self) -> Vec<TaskFailure> {
        self.join_all();
        std::mem::take(&mut self.failures)
    }

    //--- Frame Loop -------------------------------------------------------

    /// Updates and draws the current state (or the loading projection).
    pub fn tick(&mut self, dt: Duration, target: &mut T) -> Result<(), StateError> {
        self.update(dt)?;
        self.draw(target)
    }

    /// Reaps finished workers, applies exit requests, then updates the
    /// current state. Never blocks on a worker.
    pub fn update(&mut self, dt: Duration) -> Result<(), StateError> {
        if self.current.is_none() {
            return Err(StateError::NotStarted);
        }

        let outcomes = self.runner.poll();
        self.record(outcomes);
        self.collect_requests();
        self.dispatch()?;

        let current = self.current.as_deref().ok_or(StateError::NotStarted)?;
        if self.tracker.is_loading(current) {
            self.loading.update(dt, current);
            return Ok(());
        }

        match self.registry.get(current)?.try_lock() {
            Ok(mut state) => state.update(dt, &self.context),
            Err(TryLockError::WouldBlock) => self.loading.update(dt, current),
            Err(TryLockError::Poisoned(_)) => return Err(StateError::Poisoned(current.to_owned())),
        }
        Ok(())
    }

    /// Draws the current state, or the loading projection while it loads.
    pub fn draw(&mut self, target: &mut T) -> Result<(), StateError> {
        let current = self.current.as_deref().ok_or(StateError::NotStarted)?;
        if self.tracker.is_loading(current) {
            self.loading.draw(target);
            return Ok(());
        }

        match self.registry.get(current)?.try_lock() {
            Ok(mut state) => state.draw(target, &self.context),
            Err(TryLockError::WouldBlock) => self.loading.draw(target),
            Err(TryLockError::Poisoned(_)) => return Err(StateError::Poisoned(current.to_owned())),
        }
        Ok(())
    }

    //--- Queries ----------------------------------------------------------

    /// Name of the current state. Set as soon as a transition begins, so
    /// it does not imply the state is ready; see [`is_ready`](Self::is_ready).
    pub fn current_state(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// True once started and the current state is not loading.
    pub fn is_ready(&self) -> bool {
        self.current
            .as_deref()
            .is_some_and(|name| !self.tracker.is_loading(name))
    }

    pub fn is_loading(&self, name: &str) -> bool {
        self.tracker.is_loading(name)
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        self.tracker.is_initialized(name)
    }

    /// Number of transitions waiting for the in-flight task.
    pub fn pending_transitions(&self) -> usize {
        self.pending.len()
    }

    /// Number of workers not yet reaped.
    pub fn tasks_in_flight(&self) -> usize {
        self.runner.in_flight()
    }

    /// A context equivalent to the one states receive.
    pub fn context(&self) -> StateContext<T> {
        self.context.clone()
    }

    pub fn registry(&self) -> &StateRegistry<T> {
        &self.registry
    }

    /// Takes the worker failures reaped so far.
    pub fn take_failures(&mut self) -> Vec<TaskFailure> {
        std::mem::take(&mut self.failures)
    }

    //--- Internal Helpers -------------------------------------------------

    fn init_state(&mut self, name: &str) -> Result<(), StateError> {
        if self.tracker.is_initialized(name) || self.tracker.is_loading(name) {
            return Ok(());
        }

        let state = Arc::clone(self.registry.get(name)?);
        let tracker = Arc::clone(&self.tracker);
        let ctx = self.context.clone();
        let owned = name.to_owned();

        self.tracker.begin_loading(name);
        let spawned = self.runner.spawn(TaskKind::Init, name, move || {
            {
                let mut state = lock_state(&owned, &state)?;
                if !tracker.is_initialized(&owned) {
                    state
                        .on_init(&ctx)
                        .map_err(|e| StateError::hook(&owned, HookPhase::Init, e))?;
                    tracker.mark_initialized(&owned);
                }
            }
            tracker.finish_loading(&owned);
            Ok(())
        });

        if let Err(err) = spawned {
            self.tracker.finish_loading(name);
            return Err(err);
        }
        Ok(())
    }

    fn change_state(&mut self, request: ExitRequest) -> Result<(), StateError> {
        let ExitRequest { to, args } = request;
        let from = self.current.clone().ok_or(StateError::NotStarted)?;
        let old_state = Arc::clone(self.registry.get(&from)?);
        let new_state = Arc::clone(self.registry.get(&to)?);
        let tracker = Arc::clone(&self.tracker);
        let ctx = self.context.clone();

        debug!("Transition {:?} -> {:?}", from, to);
        self.tracker.begin_loading(&to);
        self.current = Some(to.clone());

        let (old, new) = (from.clone(), to.clone());
        let spawned = self.runner.spawn(TaskKind::Transition, &to, move || {
            lock_state(&old, &old_state)?
                .on_exit(&new, &ctx)
                .map_err(|e| StateError::hook(&old, HookPhase::Exit, e))?;

            {
                let mut state = lock_state(&new, &new_state)?;
                if !tracker.is_initialized(&new) {
                    state
                        .on_init(&ctx)
                        .map_err(|e| StateError::hook(&new, HookPhase::Init, e))?;
                    tracker.mark_initialized(&new);
                }
                state
                    .on_enter(&old, &args, &ctx)
                    .map_err(|e| StateError::hook(&new, HookPhase::Enter, e))?;
            }

            // Transitions never overlap, so any remaining hold belongs to
            // an earlier worker that failed.
            tracker.clear_loading(&new);
            Ok(())
        });

        if let Err(err) = spawned {
            self.tracker.finish_loading(&to);
            self.current = Some(from);
            return Err(err);
        }
        Ok(())
    }

    // Starts the next queued transition if nothing is in flight.
    fn dispatch(&mut self) -> Result<(), StateError> {
        if self.runner.in_flight() > 0 {
            if !self.pending.is_empty() {
                debug!("{} transition(s) waiting for in-flight task", self.pending.len());
            }
            return Ok(());
        }
        match self.pending.pop() {
            Some(request) => self.change_state(request),
            None => Ok(()),
        }
    }

    fn collect_requests(&mut self) {
        while let Ok(request) = self.exits.try_recv() {
            self.pending.push(request);
        }
    }

    fn record(&mut self, outcomes: Vec<TaskOutcome>) {
        for outcome in outcomes {
            if let TaskOutcome::Failed(failure) = outcome {
                self.failures.push(failure);
            }
        }
    }

    fn join_all(&mut self) {
        if !self.pending.is_empty() {
            debug!("Discarding {} queued transition(s)", self.pending.len());
            self.pending.clear();
        }
        let in_flight = self.runner.in_flight();
        if in_flight > 0 {
            info!("Joining {} outstanding state task(s)", in_flight);
        }
        let outcomes = self.runner.drain();
        self.record(outcomes);
    }
}

impl<T: 'static> Drop for StateManager<T> {
    fn drop(&mut self) {
        self.join_all();
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
