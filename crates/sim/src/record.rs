//! Effect log.

use std::time::Duration;

/// A visual change made through one of the host capabilities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Library spinner and bar suppressed
    DefaultsSuppressed,
    /// Marker class added to the container
    Marker(String),
    /// Container flagged running and forced on screen
    ContainerRunning,
    /// Container flagged done
    ContainerDone,
    /// Container fade-out started
    ContainerFade,
    /// Container taken off screen
    ContainerConcealed,
    /// Overlay element built (by generation)
    OverlayCreated(u64),
    /// Stale overlay element removed before building a new one
    OverlayReplaced(u64),
    /// Overlay displayed
    OverlayRevealed,
    /// Overlay fade-out started
    OverlayFade,
    /// Overlay taken off screen immediately
    OverlayConcealed,
    /// Overlay fade finished
    OverlaySettled,
    /// Overlay removed by someone other than the loader
    OverlayRemovedExternally,
}

/// An effect and when it happened, relative to page creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    /// Time since the page was created
    pub at: Duration,

    /// What changed
    pub effect: Effect,
}

impl std::fmt::Display for Recorded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:>6}ms  {:?}", self.at.as_millis(), self.effect)
    }
}
