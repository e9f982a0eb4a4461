//=========================================================================
// Init Tracker
//=========================================================================
//
// Per-state `initialized` / `loading` bookkeeping.
//
// Written by background workers and read by the UI thread every tick,
// so both flags live behind a single mutex. The lock is only ever held
// for a flag read or write, never across a lifecycle hook.
//
// `loading` is kept as a count of in-flight tasks that hold the state
// in the loading phase. A preload and a transition targeting the same
// state then cannot clear each other's flag early.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

//=== InitFlags ===========================================================

#[derive(Debug, Default, Clone, Copy)]
struct InitFlags {
    initialized: bool,
    loading: u32,
}

//=== InitTracker =========================================================

/// Thread-safe initialized/loading flags for every registered state.
#[derive(Debug, Default)]
pub struct InitTracker {
    flags: Mutex<HashMap<String, InitFlags>>,
}

impl InitTracker {
    /// Creates a tracker with every name uninitialized and idle.
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let flags = names
            .into_iter()
            .map(|name| (name.to_owned(), InitFlags::default()))
            .collect();
        Self {
            flags: Mutex::new(flags),
        }
    }

    pub fn is_initialized(&self, name: &str) -> bool {
        self.flags().get(name).is_some_and(|f| f.initialized)
    }

    pub fn is_loading(&self, name: &str) -> bool {
        self.flags().get(name).is_some_and(|f| f.loading > 0)
    }

    /// Marks `name` as loading on behalf of one more task.
    pub fn begin_loading(&self, name: &str) {
        self.flags().entry(name.to_owned()).or_default().loading += 1;
    }

    /// Releases one task's hold on the loading flag.
    pub fn finish_loading(&self, name: &str) {
        if let Some(flags) = self.flags().get_mut(name) {
            flags.loading = flags.loading.saturating_sub(1);
        }
    }

    /// Drops every hold on the loading flag, including ones left behind
    /// by workers that failed before releasing theirs.
    pub fn clear_loading(&self, name: &str) {
        if let Some(flags) = self.flags().get_mut(name) {
            flags.loading = 0;
        }
    }

    /// Records that `on_init` completed. Returns `false` if it already had.
    pub fn mark_initialized(&self, name: &str) -> bool {
        let mut flags = self.flags();
        let entry = flags.entry(name.to_owned()).or_default();
        !std::mem::replace(&mut entry.initialized, true)
    }

    // Flags stay consistent even if a holder panicked: every write is a
    // single field store.
    fn flags(&self) -> MutexGuard<'_, HashMap<String, InitFlags>> {
        self.flags.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

//=========================================================================
// Unit Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn starts_idle_and_uninitialized() {
        let tracker = InitTracker::new(["menu", "play"]);
        assert!(!tracker.is_initialized("menu"));
        assert!(!tracker.is_loading("play"));
        assert!(!tracker.is_loading("unknown"));
    }

    #[test]
    fn mark_initialized_reports_first_time_only() {
        let tracker = InitTracker::new(["menu"]);
        assert!(tracker.mark_initialized("menu"));
        assert!(!tracker.mark_initialized("menu"));
        assert!(tracker.is_initialized("menu"));
    }

    #[test]
    fn loading_clears_after_every_holder_finishes() {
        let tracker = InitTracker::new(["play"]);
        tracker.begin_loading("play");
        tracker.begin_loading("play");
        tracker.finish_loading("play");
        assert!(tracker.is_loading("play"));
        tracker.finish_loading("play");
        assert!(!tracker.is_loading("play"));

        // Extra finishes never underflow.
        tracker.finish_loading("play");
        assert!(!tracker.is_loading("play"));
    }

    #[test]
    fn clear_loading_drops_stale_holds() {
        let tracker = InitTracker::new(["play"]);
        tracker.begin_loading("play");
        tracker.begin_loading("play");
        tracker.clear_loading("play");
        assert!(!tracker.is_loading("play"));
    }

    #[test]
    fn concurrent_writers_leave_consistent_flags() {
        let tracker = Arc::new(InitTracker::new(["play"]));
        let workers: Vec<_> = (0..8)
            .map(|_| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    tracker.begin_loading("play");
                    tracker.mark_initialized("play");
                    tracker.finish_loading("play");
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        assert!(tracker.is_initialized("play"));
        assert!(!tracker.is_loading("play"));
    }
}
