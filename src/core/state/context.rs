//=========================================================================
// State Context
//=========================================================================
//
// The capability a state receives instead of a pointer to its manager.
//
// Exit requests are validated against the registry at the call site
// and then sent over a channel. The manager drains that channel at the
// next update and turns each request into a transition.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::sync::Arc;

use crossbeam_channel::Sender;
use log::debug;

//=== Internal Dependencies ===============================================

use super::{SharedState, StateRegistry, TransitionArgs};
use crate::error::StateError;

//=== ExitRequest =========================================================

/// A request to leave the current state for `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitRequest {
    pub to: String,
    pub args: TransitionArgs,
}

impl ExitRequest {
    pub fn new(to: impl Into<String>, args: TransitionArgs) -> Self {
        Self { to: to.into(), args }
    }
}

//=== StateContext ========================================================

/// Handed to every state callback.
pub struct StateContext<T: 'static> {
    registry: Arc<StateRegistry<T>>,
    exits: Sender<ExitRequest>,
}

impl<T: 'static> StateContext<T> {
    pub(crate) fn new(registry: Arc<StateRegistry<T>>, exits: Sender<ExitRequest>) -> Self {
        Self { registry, exits }
    }

    /// Asks the manager to transition to `to`.
    ///
    /// Fails with [`StateError::UnknownState`] or [`StateError::BlankName`]
    /// without queueing anything. The transition itself starts at the
    /// manager's next update.
    pub fn request_exit(&self, to: &str, args: TransitionArgs) -> Result<(), StateError> {
        self.registry.validate(to)?;
        if self.exits.send(ExitRequest::new(to, args)).is_err() {
            debug!("Exit request to {:?} dropped, manager is gone", to);
        }
        Ok(())
    }

    /// Looks up a sibling state by name.
    ///
    /// The returned handle must be locked before use. Locking a state
    /// that is in the middle of a transition blocks until the worker is
    /// done with it; prefer `try_lock` from `draw`.
    pub fn sibling(&self, name: &str) -> Result<&SharedState<T>, StateError> {
        self.registry.get(name)
    }
}

impl<T: 'static> Clone for StateContext<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            exits: self.exits.clone(),
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::State;
    use crossbeam_channel::unbounded;
    use std::time::Duration;

    struct Named(&'static str);

    impl State<Vec<&'static str>> for Named {
        fn update(&mut self, _dt: Duration, _ctx: &StateContext<Vec<&'static str>>) {}
        fn draw(&mut self, target: &mut Vec<&'static str>, _ctx: &StateContext<Vec<&'static str>>) {
            target.push(self.0);
        }
    }

    fn context() -> (StateContext<Vec<&'static str>>, crossbeam_channel::Receiver<ExitRequest>) {
        let registry = StateRegistry::new()
            .with_state("menu", Named("menu"))
            .and_then(|r| r.with_state("play", Named("play")))
            .unwrap();
        let (tx, rx) = unbounded();
        (StateContext::new(Arc::new(registry), tx), rx)
    }

    #[test]
    fn request_exit_sends_validated_request() {
        let (ctx, rx) = context();
        let args = TransitionArgs::new().with("difficulty", "Easy");
        ctx.request_exit("play", args.clone()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), ExitRequest::new("play", args));
    }

    #[test]
    fn request_exit_to_unknown_sends_nothing() {
        let (ctx, rx) = context();
        assert!(matches!(
            ctx.request_exit("credits", TransitionArgs::new()),
            Err(StateError::UnknownState(_))
        ));
        assert!(matches!(ctx.request_exit("", TransitionArgs::new()), Err(StateError::BlankName)));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn request_exit_after_manager_dropped_is_ok() {
        let (ctx, rx) = context();
        drop(rx);
        assert!(ctx.request_exit("play", TransitionArgs::new()).is_ok());
    }

    #[test]
    fn sibling_can_draw() {
        let (ctx, _rx) = context();
        let mut frame = Vec::new();
        let play = ctx.sibling("play").unwrap();
        play.lock().unwrap().draw(&mut frame, &ctx);
        assert_eq!(frame, vec!["play"]);
    }
}
