//! Immutable snapshot store
//!
//! State is replaced wholesale by a reducer; readers and subscribers only
//! ever see complete snapshots.

use std::sync::Arc;

use tokio::sync::watch;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;

/// Holds the current snapshot of `T` and notifies subscribers on change
#[derive(Debug)]
pub struct StateStore<T> {
    tx: watch::Sender<Arc<T>>,
}

impl<T: Send + Sync + 'static> StateStore<T> {
    /// Create a store holding `initial`
    pub fn new(initial: T) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self { tx }
    }

    /// Current snapshot
    pub fn current(&self) -> Arc<T> {
        self.tx.borrow().clone()
    }

    /// Replace the snapshot with `reducer(current)` and return the new one
    pub fn dispatch(&self, reducer: impl FnOnce(&T) -> T) -> Arc<T> {
        let mut next = None;
        self.tx.send_modify(|state| {
            let reduced = Arc::new(reducer(state.as_ref()));
            next = Some(reduced.clone());
            *state = reduced;
        });
        next.unwrap_or_else(|| self.current())
    }

    /// Receiver that observes every subsequent snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<T>> {
        self.tx.subscribe()
    }
}

impl<T: Default + Send + Sync + 'static> Default for StateStore<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
