//! Host capability traits.
//!
//! The controller never talks to a DOM directly. A page host exposes the
//! few lookups it needs, the progress library exposes its event
//! subscription, and the library's container is reduced to a handful of
//! visual-state operations so its class names stay behind this boundary.

use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::event::{LibraryEvent, PageSignal};
use crate::id::ListenerId;
use crate::state::ReadyState;

/// Callback registered with a host or library.
pub type Listener<E> = Arc<dyn Fn(E) + Send + Sync>;

/// The page a loader session runs in.
pub trait PageHost: Send + Sync {
    /// The progress library's global handle, once it has loaded.
    fn library(&self) -> Option<Arc<dyn ProgressLibrary>>;

    /// Look up the library's container element.
    fn find_container(&self, selector: &str) -> Option<Arc<dyn ProgressContainer>>;

    /// Whether any element matches the selector.
    fn matches(&self, selector: &str) -> bool;

    /// Current document readiness.
    fn ready_state(&self) -> ReadyState;

    /// Register for unload and page-hide notifications.
    fn on_page_signal(&self, listener: Listener<PageSignal>) -> ListenerId;

    /// Drop a page-signal listener. Unknown ids are ignored.
    fn remove_page_listener(&self, id: ListenerId);
}

/// The external progress-tracking library.
pub trait ProgressLibrary: Send + Sync {
    /// Subscribe to `start` and `done` notifications.
    fn subscribe(&self, listener: Listener<LibraryEvent>) -> Result<ListenerId>;

    /// Remove a subscription. Unknown ids are ignored.
    fn unsubscribe(&self, id: ListenerId);
}

/// Visual-state capability over the library's container element.
pub trait ProgressContainer: Send + Sync {
    /// Hide the library's own spinner and bar.
    fn suppress_default_visuals(&self) -> Result<()>;

    /// Add a marker class.
    fn add_marker(&self, class: &str) -> Result<()>;

    /// Whether the library currently flags itself as running.
    fn is_running(&self) -> bool;

    /// Flag as running and force the container on screen.
    fn mark_running(&self) -> Result<()>;

    /// Flag as done. Does not change visibility.
    fn mark_done(&self) -> Result<()>;

    /// Start fading the container out over `duration`.
    fn begin_fade(&self, duration: Duration) -> Result<()>;

    /// Take the container off screen immediately.
    fn conceal(&self) -> Result<()>;

    /// Build a fresh overlay element inside the container, replacing any
    /// stale one, and display it.
    fn create_overlay(&self) -> Result<Box<dyn OverlayElement>>;
}

/// The animated overlay element owned by a session.
pub trait OverlayElement: Send + Sync {
    /// Whether the element is still part of the document.
    fn is_attached(&self) -> bool;

    /// Whether the element is currently displayed.
    fn is_displayed(&self) -> bool;

    /// Display the element at full opacity.
    fn reveal(&self) -> Result<()>;

    /// Start fading the element out over `duration`.
    fn begin_fade(&self, duration: Duration) -> Result<()>;

    /// Take the element off screen immediately.
    fn conceal(&self) -> Result<()>;

    /// Finish a fade: undisplay and restore opacity for any later reveal.
    fn settle_after_fade(&self) -> Result<()>;
}
