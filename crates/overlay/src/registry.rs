//! Single-session registry slot.
//!
//! One slot per page. Whoever constructs a loader claims the slot; later
//! constructions find it occupied and get the existing handle back. Only
//! the owning session's force-hide clears it.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use pageveil_core::SessionId;
use tracing::{debug, info};

use crate::handle::LoaderHandle;

/// Result of trying to claim the registry slot.
#[derive(Debug, Clone)]
pub enum Claim {
    /// The slot was empty and now holds this handle
    Claimed(LoaderHandle),
    /// The slot already held a session
    Occupied(LoaderHandle),
}

/// Injectable slot holding the page's live loader session.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    slot: Arc<Mutex<Option<LoaderHandle>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<LoaderHandle>> {
        // The slot holds plain data; a panic elsewhere cannot leave it torn.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Put `candidate` in the slot unless a session is already registered.
    pub fn claim(&self, candidate: LoaderHandle) -> Claim {
        let mut slot = self.lock();
        match slot.as_ref() {
            Some(existing) => {
                debug!(existing = %existing.id(), rejected = %candidate.id(), "registry slot occupied");
                Claim::Occupied(existing.clone())
            }
            None => {
                info!(session = %candidate.id(), "session registered");
                *slot = Some(candidate.clone());
                Claim::Claimed(candidate)
            }
        }
    }

    /// The registered session, if any.
    pub fn current(&self) -> Option<LoaderHandle> {
        self.lock().clone()
    }

    /// Whether any session is registered.
    pub fn is_occupied(&self) -> bool {
        self.lock().is_some()
    }

    /// Whether `id` is the registered session.
    pub fn holds(&self, id: SessionId) -> bool {
        self.lock().as_ref().is_some_and(|handle| handle.id() == id)
    }

    /// Clear the slot if `id` owns it. Returns whether it was cleared.
    pub fn release(&self, id: SessionId) -> bool {
        let mut slot = self.lock();
        if slot.as_ref().is_some_and(|handle| handle.id() == id) {
            *slot = None;
            info!(session = %id, "session released from registry");
            true
        } else {
            false
        }
    }
}
