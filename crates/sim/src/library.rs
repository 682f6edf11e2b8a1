//! Scriptable progress library.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use pageveil_core::{LibraryEvent, Listener, ListenerId, OverlayError, ProgressLibrary, Result};
use tracing::debug;

/// Progress library whose `start`/`done` events are fired by hand.
#[derive(Default)]
pub struct SimLibrary {
    listeners: Mutex<BTreeMap<ListenerId, Listener<LibraryEvent>>>,
    next_id: AtomicU64,
    rejecting: AtomicBool,
}

impl SimLibrary {
    /// Create a library with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to every subscriber. Returns how many received it.
    pub fn emit(&self, event: LibraryEvent) -> usize {
        let listeners: Vec<_> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        debug!(%event, subscribers = listeners.len(), "library event");
        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    /// Make every later `subscribe` call fail.
    pub fn reject_subscriptions(&self, reject: bool) {
        self.rejecting.store(reject, Ordering::Release);
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl ProgressLibrary for SimLibrary {
    fn subscribe(&self, listener: Listener<LibraryEvent>) -> Result<ListenerId> {
        if self.rejecting.load(Ordering::Acquire) {
            return Err(OverlayError::Library("event bus not ready".to_string()));
        }
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, listener);
        Ok(id)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id);
    }
}
