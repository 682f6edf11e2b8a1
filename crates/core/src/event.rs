//! Loader events - everything the session's event loop reacts to.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Lifecycle notification emitted by the progress-tracking library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LibraryEvent {
    /// Tracking (re)started; may fire several times per page
    Start,
    /// Tracking finished
    Done,
}

impl std::fmt::Display for LibraryEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LibraryEvent::Start => write!(f, "start"),
            LibraryEvent::Done => write!(f, "done"),
        }
    }
}

/// Page lifecycle notification that tears the session down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PageSignal {
    /// `beforeunload`
    BeforeUnload,
    /// `pagehide`
    PageHide,
}

impl std::fmt::Display for PageSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageSignal::BeforeUnload => write!(f, "beforeunload"),
            PageSignal::PageHide => write!(f, "pagehide"),
        }
    }
}

/// The three named timers owned by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// Fixed display duration (landing page only)
    Primary,
    /// Safety net, always armed
    Fallback,
    /// Periodic remaining-time log (landing page only)
    ProgressLog,
}

impl TimerKind {
    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerKind::Primary => "primary",
            TimerKind::Fallback => "fallback",
            TimerKind::ProgressLog => "progress-log",
        }
    }
}

impl std::fmt::Display for TimerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cosmetic one-shot callbacks that never decide visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeferredKind {
    /// Tag the container so its label can appear
    ReadyMarker,
    /// Re-show the overlay if something removed or concealed it
    VisibilityCheck,
    /// Finish the fade-out started by a hide
    FadeComplete,
}

/// One unit of work for the session event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderEvent {
    /// Progress library notification
    Library(LibraryEvent),
    /// A named timer expired
    Timer(TimerKind),
    /// Progress-log tick with the time left on the primary timer
    ProgressTick {
        /// Remaining primary duration
        remaining: Duration,
    },
    /// A cosmetic callback came due
    Deferred(DeferredKind),
    /// Page lifecycle notification
    Page(PageSignal),
    /// Request a faded hide
    Hide,
    /// Request an immediate, unconditional hide
    ForceHide,
}
