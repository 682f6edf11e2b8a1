//! Session lifecycle model - state, mode and how a session ended.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::event::PageSignal;

/// Visibility state of a loader session.
///
/// States only ever move forward in declaration order. `Visible` may be
/// re-entered from `Visible`; nothing leaves `Hidden`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LoaderState {
    /// Constructed, gate not yet started
    Uninitialized,
    /// Waiting for the progress library's global handle
    AwaitingDependency,
    /// Waiting for the overlay container element
    AwaitingContainer,
    /// Overlay is on screen
    Visible,
    /// Overlay has been hidden for good
    Hidden,
}

impl LoaderState {
    /// Whether the session has reached its terminal state.
    pub fn is_hidden(self) -> bool {
        matches!(self, LoaderState::Hidden)
    }

    /// Whether moving from `self` to `next` respects the lifecycle order.
    pub fn can_transition_to(self, next: LoaderState) -> bool {
        match (self, next) {
            (LoaderState::Hidden, _) => false,
            (LoaderState::Visible, LoaderState::Visible) => true,
            (from, to) => to > from,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoaderState::Uninitialized => "uninitialized",
            LoaderState::AwaitingDependency => "awaiting-dependency",
            LoaderState::AwaitingContainer => "awaiting-container",
            LoaderState::Visible => "visible",
            LoaderState::Hidden => "hidden",
        }
    }
}

impl std::fmt::Display for LoaderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which trigger is authoritative for hiding the overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoadMode {
    /// Landing page: a constant timer decides, library completion is ignored
    FixedDuration,
    /// Every other page: the library's completion decides, bounded by a fallback
    AwaitCompletion,
}

impl LoadMode {
    /// Pick the mode from the landing-page predicate.
    pub fn for_page(is_landing: bool) -> Self {
        if is_landing {
            LoadMode::FixedDuration
        } else {
            LoadMode::AwaitCompletion
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadMode::FixedDuration => "fixed-duration",
            LoadMode::AwaitCompletion => "await-completion",
        }
    }
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document readiness as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadyState {
    /// Still parsing
    Loading,
    /// Parsed, subresources pending
    Interactive,
    /// Fully loaded
    Complete,
}

/// The trigger that moved a session to `Hidden`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HideCause {
    /// Library reported completion (await-completion mode)
    LibraryDone,
    /// Primary duration timer expired (fixed-duration mode)
    PrimaryTimer,
    /// Fallback safety timer expired
    FallbackTimer,
    /// Page is going away
    Teardown(PageSignal),
    /// A caller asked for it through the session handle
    Explicit,
    /// Setup failed and the session was torn down
    SetupFailure,
}

impl std::fmt::Display for HideCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HideCause::LibraryDone => write!(f, "library-done"),
            HideCause::PrimaryTimer => write!(f, "primary-timer"),
            HideCause::FallbackTimer => write!(f, "fallback-timer"),
            HideCause::Teardown(signal) => write!(f, "teardown({})", signal),
            HideCause::Explicit => write!(f, "explicit"),
            HideCause::SetupFailure => write!(f, "setup-failure"),
        }
    }
}

/// How and when a session reached `Hidden`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOutcome {
    /// What triggered the hide
    pub cause: HideCause,

    /// Time between session construction and the hide
    pub elapsed: Duration,

    /// Whether the immediate path was taken instead of a fade
    pub forced: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_only_move_forward() {
        assert!(LoaderState::Uninitialized.can_transition_to(LoaderState::AwaitingDependency));
        assert!(LoaderState::AwaitingContainer.can_transition_to(LoaderState::Visible));
        assert!(LoaderState::Uninitialized.can_transition_to(LoaderState::Hidden));
        assert!(!LoaderState::Visible.can_transition_to(LoaderState::AwaitingContainer));
        assert!(!LoaderState::AwaitingContainer.can_transition_to(LoaderState::AwaitingContainer));
    }

    #[test]
    fn test_visible_may_be_reentered() {
        assert!(LoaderState::Visible.can_transition_to(LoaderState::Visible));
        assert!(LoaderState::Visible.can_transition_to(LoaderState::Hidden));
    }

    #[test]
    fn test_hidden_is_terminal() {
        for next in [
            LoaderState::Uninitialized,
            LoaderState::AwaitingDependency,
            LoaderState::AwaitingContainer,
            LoaderState::Visible,
            LoaderState::Hidden,
        ] {
            assert!(!LoaderState::Hidden.can_transition_to(next));
        }
    }

    #[test]
    fn test_mode_for_page() {
        assert_eq!(LoadMode::for_page(true), LoadMode::FixedDuration);
        assert_eq!(LoadMode::for_page(false), LoadMode::AwaitCompletion);
    }

    #[test]
    fn test_hide_cause_display() {
        assert_eq!(HideCause::PrimaryTimer.to_string(), "primary-timer");
        assert_eq!(
            HideCause::Teardown(PageSignal::PageHide).to_string(),
            "teardown(pagehide)"
        );
    }
}
