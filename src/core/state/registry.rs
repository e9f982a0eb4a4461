//=========================================================================
// State Registry
//=========================================================================
//
// Maps state names to state instances.
//
// States are stored behind their own mutex so that a background worker
// running a lifecycle hook and the UI thread drawing never touch the
// same state at once. The registry is filled before it is handed to a
// manager and is read-only from then on.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

//=== Internal Dependencies ===============================================

use super::State;
use crate::error::StateError;

//=== Types ===============================================================

/// A registered state, shared between the manager and its workers.
pub type SharedState<T> = Arc<Mutex<Box<dyn State<T>>>>;

//=== StateRegistry =======================================================

/// Name → state mapping, fixed once a manager owns it.
pub struct StateRegistry<T: 'static> {
    states: HashMap<String, SharedState<T>>,
    order: Vec<String>,
}

impl<T: 'static> StateRegistry<T> {
    //--- Construction -----------------------------------------------------

    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            states: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Registers a state under `name`.
    ///
    /// Blank names and duplicates are rejected.
    pub fn register<S>(&mut self, name: impl Into<String>, state: S) -> Result<(), StateError>
    where
        S: State<T> + 'static,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(StateError::BlankName);
        }
        if self.states.contains_key(&name) {
            return Err(StateError::DuplicateState(name));
        }

        debug!("Registered state {:?}", name);
        let boxed: Box<dyn State<T>> = Box::new(state);
        self.states.insert(name.clone(), Arc::new(Mutex::new(boxed)));
        self.order.push(name);
        Ok(())
    }

    /// Chaining form of [`StateRegistry::register`].
    pub fn with_state<S>(mut self, name: impl Into<String>, state: S) -> Result<Self, StateError>
    where
        S: State<T> + 'static,
    {
        self.register(name, state)?;
        Ok(self)
    }

    //--- Queries ----------------------------------------------------------

    /// Checks that `name` can be the target of a transition.
    pub fn validate(&self, name: &str) -> Result<(), StateError> {
        if name.trim().is_empty() {
            Err(StateError::BlankName)
        } else if !self.states.contains_key(name) {
            Err(StateError::UnknownState(name.to_owned()))
        } else {
            Ok(())
        }
    }

    /// Looks up a state by name.
    pub fn get(&self, name: &str) -> Result<&SharedState<T>, StateError> {
        self.validate(name)?;
        self.states
            .get(name)
            .ok_or_else(|| StateError::UnknownState(name.to_owned()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// Registered names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// The only registered name, if exactly one state is registered.
    pub fn sole(&self) -> Option<&str> {
        match self.order.as_slice() {
            [only] => Some(only.as_str()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl<T: 'static> Default for StateRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

//=== Locking =============================================================

/// Locks a state, reporting a poisoned lock as a [`StateError`].
pub(crate) fn lock_state<'a, T: 'static>(
    name: &str,
    state: &'a SharedState<T>,
) -> Result<MutexGuard<'a, Box<dyn State<T>>>, StateError> {
    state
        .lock()
        .map_err(|_| StateError::Poisoned(name.to_owned()))
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::StateContext;
    use std::time::Duration;

    struct Blank;

    impl State<()> for Blank {
        fn update(&mut self, _dt: Duration, _ctx: &StateContext<()>) {}
        fn draw(&mut self, _target: &mut (), _ctx: &StateContext<()>) {}
    }

    #[test]
    fn rejects_blank_names() {
        let mut registry = StateRegistry::<()>::new();
        assert!(matches!(registry.register("", Blank), Err(StateError::BlankName)));
        assert!(matches!(registry.register("   ", Blank), Err(StateError::BlankName)));
        assert!(registry.is_empty());
    }

    #[test]
    fn rejects_duplicates() {
        let mut registry = StateRegistry::<()>::new();
        registry.register("menu", Blank).unwrap();
        let err = registry.register("menu", Blank).unwrap_err();
        assert!(matches!(err, StateError::DuplicateState(name) if name == "menu"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn validate_distinguishes_blank_and_unknown() {
        let registry = StateRegistry::<()>::new().with_state("menu", Blank).unwrap();
        assert!(registry.validate("menu").is_ok());
        assert!(matches!(registry.validate(""), Err(StateError::BlankName)));
        assert!(matches!(registry.validate("play"), Err(StateError::UnknownState(_))));
    }

    #[test]
    fn sole_only_for_single_state() {
        let one = StateRegistry::<()>::new().with_state("menu", Blank).unwrap();
        assert_eq!(one.sole(), Some("menu"));

        let two = one.with_state("play", Blank).unwrap();
        assert_eq!(two.sole(), None);
        assert_eq!(two.names().collect::<Vec<_>>(), vec!["menu", "play"]);
    }
}
