//! Scoped loading flag shared by the workflows

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

/// Raises a loading flag for as long as it lives.
///
/// The flag drops back to `false` when the last guard goes away, whether the
/// operation finished, failed, or its future was dropped mid-request.
pub(crate) struct LoadingGuard<'a, S> {
    state: &'a watch::Sender<S>,
    in_flight: &'a AtomicUsize,
    set: fn(&mut S, bool),
}

impl<'a, S> LoadingGuard<'a, S> {
    pub(crate) fn start(
        state: &'a watch::Sender<S>,
        in_flight: &'a AtomicUsize,
        set: fn(&mut S, bool),
    ) -> Self {
        state.send_modify(|s| {
            in_flight.fetch_add(1, Ordering::SeqCst);
            set(s, true);
        });
        Self {
            state,
            in_flight,
            set,
        }
    }
}

impl<S> Drop for LoadingGuard<'_, S> {
    fn drop(&mut self) {
        let (in_flight, set) = (self.in_flight, self.set);
        // The counter only moves under the channel's write lock, so a guard
        // starting concurrently cannot have its flag cleared here.
        self.state.send_if_modified(|s| {
            if in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
                set(s, false);
                true
            } else {
                false
            }
        });
    }
}
