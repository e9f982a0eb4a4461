//=========================================================================
// Stack State Manager
//=========================================================================
//
// Synchronous state manager with a navigation stack.
//
// Architecture:
//   StackStateManager
//     ├─ base: Option<String>       (set by start / set_state)
//     └─ stack: Vec<String>         (push_state / pop_state)
//
//   active = stack.top() or base
//
// Initialization and transitions run on the caller's thread, so there
// is no suspension point and no loading projection.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver};
use log::{debug, info, warn};

//=== Internal Dependencies ===============================================

use crate::core::state::lock_state;
use crate::core::{ExitRequest, InitTracker, StateContext, StateRegistry, TransitionArgs};
use crate::error::{HookPhase, StateError};

//=== StackStateManagerBuilder ============================================

/// Builder for a [`StackStateManager`].
///
/// When exactly one state is registered and no start state is given,
/// the manager starts on that state.
pub struct StackStateManagerBuilder<T: 'static> {
    registry: StateRegistry<T>,
    start: Option<String>,
}

impl<T: 'static> StackStateManagerBuilder<T> {
    pub fn new(registry: StateRegistry<T>) -> Self {
        Self {
            registry,
            start: None,
        }
    }

    /// Starts the manager on `name` as part of [`build`](Self::build).
    pub fn with_start(mut self, name: impl Into<String>) -> Self {
        self.start = Some(name.into());
        self
    }

    /// Builds the manager, running the start state's `on_init` inline.
    pub fn build(self) -> Result<StackStateManager<T>, StateError> {
        let registry = Arc::new(self.registry);
        let (exit_tx, exit_rx) = unbounded();

        let start = match self.start {
            Some(name) => Some(name),
            None => registry.sole().map(|name| {
                info!("Only one state registered, starting {:?} automatically", name);
                name.to_owned()
            }),
        };

        let mut manager = StackStateManager {
            context: StateContext::new(Arc::clone(&registry), exit_tx),
            tracker: InitTracker::new(registry.names()),
            registry,
            exits: exit_rx,
            stack: Vec::new(),
            base: None,
        };

        if let Some(name) = start {
            manager.start(&name)?;
        }
        Ok(manager)
    }
}

//=== StackStateManager ===================================================

/// Stack-based state manager.
///
/// The base state is replaced by [`set_state`](Self::set_state); screens
/// pushed on top of it with [`push_state`](Self::push_state) take over
/// update and draw until they are popped.
pub struct StackStateManager<T: 'static> {
    registry: Arc<StateRegistry<T>>,
    tracker: InitTracker,
    context: StateContext<T>,
    exits: Receiver<ExitRequest>,
    stack: Vec<String>,
    base: Option<String>,
}

impl<T: 'static> StackStateManager<T> {
    //--- Lifecycle --------------------------------------------------------

    /// Starts on `name`, initializing it before returning.
    ///
    /// Returns `Ok(false)` if the manager was already started.
    pub fn start(&mut self, name: &str) -> Result<bool, StateError> {
        if let Some(base) = &self.base {
            warn!("Stack manager already started on {:?}, ignoring start({:?})", base, name);
            return Ok(false);
        }

        self.registry.validate(name)?;
        info!("Starting stack manager with {:?}", name);
        self.init_state(name)?;
        self.base = Some(name.to_owned());
        Ok(true)
    }

    /// Replaces the base state: `on_exit`, `on_init` if needed, then
    /// `on_enter`, all before returning. The stack is left untouched.
    ///
    /// Before [`start`](Self::start) this starts the manager on `name`.
    pub fn set_state(&mut self, name: &str, args: TransitionArgs) -> Result<(), StateError> {
        let Some(from) = self.base.clone() else {
            warn!("set_state({:?}) called before start, starting there instead", name);
            self.start(name)?;
            return Ok(());
        };

        self.registry.validate(name)?;
        debug!("Transition {:?} -> {:?}", from, name);

        lock_state(&from, self.registry.get(&from)?)?
            .on_exit(name, &self.context)
            .map_err(|e| StateError::hook(&from, HookPhase::Exit, e))?;

        self.base = Some(name.to_owned());
        self.init_state(name)?;

        lock_state(name, self.registry.get(name)?)?
            .on_enter(&from, &args, &self.context)
            .map_err(|e| StateError::hook(name, HookPhase::Enter, e))
    }

    //--- Navigation Stack -------------------------------------------------

    /// Pushes `name`, initializing it first if it never was.
    pub fn push_state(&mut self, name: &str) -> Result<(), StateError> {
        self.registry.validate(name)?;
        self.init_state(name)?;
        debug!("Pushing state {:?} onto stack", name);
        self.stack.push(name.to_owned());
        Ok(())
    }

    /// Removes and returns the top of the stack, or `None` when empty.
    pub fn pop_state(&mut self) -> Option<String> {
        let popped = self.stack.pop();
        if let Some(name) = &popped {
            debug!("Popped state {:?} from stack", name);
        }
        popped
    }

    /// Top of the stack, without touching it.
    pub fn peek_state(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    pub fn stack(&self) -> &[String] {
        &self.stack
    }

    //--- Frame Loop -------------------------------------------------------

    pub fn tick(&mut self, dt: Duration, target: &mut T) -> Result<(), StateError> {
        self.update(dt)?;
        self.draw(target)
    }

    /// Updates the active state, then applies exit requests it made.
    pub fn update(&mut self, dt: Duration) -> Result<(), StateError> {
        let active = self.active_state().ok_or(StateError::NotStarted)?;
        lock_state(active, self.registry.get(active)?)?.update(dt, &self.context);

        while let Ok(request) = self.exits.try_recv() {
            self.set_state(&request.to, request.args)?;
        }
        Ok(())
    }

    pub fn draw(&mut self, target: &mut T) -> Result<(), StateError> {
        let active = self.active_state().ok_or(StateError::NotStarted)?;
        lock_state(active, self.registry.get(active)?)?.draw(target, &self.context);
        Ok(())
    }

    //--- Queries ----------------------------------------------------------

    /// Top of the stack if any, else the base state. `None` before start.
    pub fn active_state(&self) -> Option<&str> {
        self.base.as_deref()?;
        self.peek_state().or(self.base.as_deref())
    }

    /// The base state.
    pub fn current_state(&self) -> Option<&str> {
        self.base.as_deref()
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        self.tracker.is_initialized(name)
    }

    /// A context equivalent to the one states receive.
    pub fn context(&self) -> StateContext<T> {
        self.context.clone()
    }

    //--- Internal Helpers -------------------------------------------------

    fn init_state(&mut self, name: &str) -> Result<(), StateError> {
        if self.tracker.is_initialized(name) {
            return Ok(());
        }
        lock_state(name, self.registry.get(name)?)?
            .on_init(&self.context)
            .map_err(|e| StateError::hook(name, HookPhase::Init, e))?;
        self.tracker.mark_initialized(name);
        Ok(())
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
