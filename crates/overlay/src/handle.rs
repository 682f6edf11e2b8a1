//! Cloneable handle to a running loader session.

use pageveil_core::{LoaderEvent, PageSignal, SessionId, SessionOutcome};
use tokio::sync::{mpsc, watch};

/// Handle to a loader session.
///
/// Requests are posted to the session's event loop and take effect in
/// arrival order with everything else the session reacts to.
#[derive(Debug, Clone)]
pub struct LoaderHandle {
    id: SessionId,
    events: mpsc::UnboundedSender<LoaderEvent>,
    outcome: watch::Receiver<Option<SessionOutcome>>,
}

impl LoaderHandle {
    pub(crate) fn new(
        id: SessionId,
        events: mpsc::UnboundedSender<LoaderEvent>,
        outcome: watch::Receiver<Option<SessionOutcome>>,
    ) -> Self {
        Self { id, events, outcome }
    }

    /// Session this handle points at.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Ask for a faded hide. Returns false once the session has ended.
    pub fn hide(&self) -> bool {
        self.send(LoaderEvent::Hide)
    }

    /// Ask for an immediate hide that also releases the registry slot.
    pub fn force_hide(&self) -> bool {
        self.send(LoaderEvent::ForceHide)
    }

    /// Forward a page lifecycle signal.
    pub fn notify_page(&self, signal: PageSignal) -> bool {
        self.send(LoaderEvent::Page(signal))
    }

    /// Whether the session's event loop has exited.
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    /// How the session was hidden, if it has been.
    pub fn outcome(&self) -> Option<SessionOutcome> {
        *self.outcome.borrow()
    }

    /// Wait until the session is hidden.
    ///
    /// Resolves to `None` only if the session ended without ever hiding.
    pub async fn hidden(&self) -> Option<SessionOutcome> {
        let mut outcome = self.outcome.clone();
        let seen = match outcome.wait_for(|value| value.is_some()).await {
            Ok(value) => *value,
            Err(_) => None,
        };
        seen.or_else(|| *outcome.borrow())
    }

    fn send(&self, event: LoaderEvent) -> bool {
        self.events.send(event).is_ok()
    }
}
