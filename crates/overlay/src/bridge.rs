//! Event bridge - routes progress library notifications into the session.

use std::sync::Arc;

use pageveil_core::{
    LibraryEvent, Listener, ListenerId, LoadMode, LoaderEvent, ProgressLibrary, Result,
};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

/// What a library notification asks the controller to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeAction {
    /// Re-assert the overlay
    Show,
    /// Hide with a fade
    Hide,
    /// Keep the library's container on screen despite its own completion
    HoldVisible,
}

/// Subscription to the library's `start` and `done` notifications.
pub struct EventBridge {
    library: Arc<dyn ProgressLibrary>,
    subscription: Option<ListenerId>,
}

impl EventBridge {
    /// Subscribe to `library`, forwarding every notification to `events`.
    pub fn wire(
        library: Arc<dyn ProgressLibrary>,
        events: UnboundedSender<LoaderEvent>,
    ) -> Result<Self> {
        let listener: Listener<LibraryEvent> = Arc::new(move |event| {
            if events.send(LoaderEvent::Library(event)).is_err() {
                trace!(%event, "library event after session ended");
            }
        });
        let subscription = library.subscribe(listener)?;
        debug!(%subscription, "subscribed to progress library");
        Ok(Self {
            library,
            subscription: Some(subscription),
        })
    }

    /// Decide what a notification means under `mode`.
    ///
    /// `start` always re-asserts the overlay. `done` is the hide trigger
    /// only when the page waits for completion; on the landing page the
    /// primary timer owns the hide and `done` just holds the container up.
    pub fn route(mode: LoadMode, event: LibraryEvent) -> BridgeAction {
        match (event, mode) {
            (LibraryEvent::Start, _) => BridgeAction::Show,
            (LibraryEvent::Done, LoadMode::AwaitCompletion) => BridgeAction::Hide,
            (LibraryEvent::Done, LoadMode::FixedDuration) => BridgeAction::HoldVisible,
        }
    }

    /// Drop the subscription. Safe to call more than once.
    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            self.library.unsubscribe(subscription);
            debug!(%subscription, "unsubscribed from progress library");
        }
    }

    /// Whether the subscription is still live.
    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }
}

impl Drop for EventBridge {
    fn drop(&mut self) {
        self.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageveil_sim::SimLibrary;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn test_route_start_always_shows() {
        assert_eq!(EventBridge::route(LoadMode::FixedDuration, LibraryEvent::Start), BridgeAction::Show);
        assert_eq!(EventBridge::route(LoadMode::AwaitCompletion, LibraryEvent::Start), BridgeAction::Show);
    }

    #[test]
    fn test_route_done_depends_on_mode() {
        assert_eq!(EventBridge::route(LoadMode::AwaitCompletion, LibraryEvent::Done), BridgeAction::Hide);
        assert_eq!(
            EventBridge::route(LoadMode::FixedDuration, LibraryEvent::Done),
            BridgeAction::HoldVisible
        );
    }

    #[test]
    fn test_wire_forwards_events() {
        let library = Arc::new(SimLibrary::new());
        let (tx, mut rx) = unbounded_channel();
        let _bridge = EventBridge::wire(library.clone(), tx).unwrap();

        library.emit(LibraryEvent::Start);
        library.emit(LibraryEvent::Done);

        assert_eq!(rx.try_recv().unwrap(), LoaderEvent::Library(LibraryEvent::Start));
        assert_eq!(rx.try_recv().unwrap(), LoaderEvent::Library(LibraryEvent::Done));
    }

    #[test]
    fn test_detach_and_drop_unsubscribe() {
        let library = Arc::new(SimLibrary::new());
        let (tx, _rx) = unbounded_channel();

        let mut bridge = EventBridge::wire(library.clone(), tx.clone()).unwrap();
        assert_eq!(library.subscriber_count(), 1);
        bridge.detach();
        bridge.detach();
        assert!(!bridge.is_attached());
        assert_eq!(library.subscriber_count(), 0);

        {
            let _scoped = EventBridge::wire(library.clone(), tx).unwrap();
            assert_eq!(library.subscriber_count(), 1);
        }
        assert_eq!(library.subscriber_count(), 0);
    }
}
