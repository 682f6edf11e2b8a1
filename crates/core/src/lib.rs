//! pageveil core data models.
//!
//! This crate defines the vocabulary shared by the overlay lifecycle
//! controller and the page hosts it runs against: session state, load
//! modes, loader events, configuration, errors and the host capability
//! traits.

#![warn(missing_docs)]

// Identities
mod id;

// Lifecycle model
mod state;
mod event;

// Settings and failures
mod config;
mod error;

// Page collaborators
pub mod host;

// Re-exports
pub use id::{ListenerId, SessionId};

pub use state::{HideCause, LoadMode, LoaderState, ReadyState, SessionOutcome};
pub use event::{DeferredKind, LibraryEvent, LoaderEvent, PageSignal, TimerKind};

pub use config::LoaderConfig;
pub use error::{OverlayError, Result};

pub use host::{Listener, OverlayElement, PageHost, ProgressContainer, ProgressLibrary};

/// Wall-clock timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
