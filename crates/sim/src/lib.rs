//! In-memory page host.
//!
//! [`SimPage`] stands in for a browser page: it owns a scriptable progress
//! library, the library's container and the overlay element, and records
//! every visual change with the (tokio) time it happened at. Scenario
//! tests run it under paused time to check exactly when the overlay was
//! shown and hidden.

#![warn(missing_docs)]

pub mod page;
pub mod library;
pub mod elements;
pub mod record;

pub use page::{SimPage, SimPageBuilder};
pub use library::SimLibrary;
pub use elements::{ContainerView, OverlayView, SimContainer, SimOverlay};
pub use record::{Effect, Recorded};
