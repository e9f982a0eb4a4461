//=========================================================================
// Transition Queue
//=========================================================================
//
// FIFO of exit requests waiting for the in-flight task to finish.
//
// Requests that arrive while a transition or initialization is still
// running are parked here. The manager starts the next one only once
// the previous task has been reaped.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::VecDeque;

//=== Internal Dependencies ===============================================

use super::ExitRequest;

//=== Transition Queue ====================================================

/// Queue of pending transitions, processed in arrival order.
#[derive(Debug, Default)]
pub struct TransitionQueue {
    queue: VecDeque<ExitRequest>,
}

impl TransitionQueue {
    /// Creates a new empty transition queue.
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    /// Queues a transition behind the ones already waiting.
    pub fn push(&mut self, request: ExitRequest) {
        self.queue.push_back(request);
    }

    /// Takes the oldest queued transition.
    pub fn pop(&mut self) -> Option<ExitRequest> {
        self.queue.pop_front()
    }

    /// Returns true if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Returns the number of queued transitions.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Drops every queued transition.
    pub fn clear(&mut self) {
        self.queue.clear()
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::state::TransitionArgs;

    #[test]
    fn pops_in_arrival_order() {
        let mut queue = TransitionQueue::new();
        queue.push(ExitRequest::new("play", TransitionArgs::new()));
        queue.push(ExitRequest::new("pause", TransitionArgs::new()));
        assert_eq!(queue.len(), 2);

        assert_eq!(queue.pop().map(|r| r.to).as_deref(), Some("play"));
        assert_eq!(queue.pop().map(|r| r.to).as_deref(), Some("pause"));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn clear_empties_queue() {
        let mut queue = TransitionQueue::default();
        queue.push(ExitRequest::new("menu", TransitionArgs::new()));
        queue.clear();
        assert!(queue.is_empty());
    }
}
