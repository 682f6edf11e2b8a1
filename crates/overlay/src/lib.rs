//! Overlay lifecycle controller.
//!
//! Shows a full-page loading overlay and hides it exactly once, whichever
//! of the competing triggers fires first:
//!
//! ```text
//! Readiness Gate → Session Controller ← Event Bridge (library start/done)
//!                                     ← Timer Set (primary, fallback, progress log)
//!                                     ← page teardown signals
//! ```
//!
//! Every trigger is delivered as a [`LoaderEvent`](pageveil_core::LoaderEvent)
//! into one per-session event loop, so transitions never interleave.

#![warn(missing_docs)]

pub mod registry;
pub mod handle;
pub mod gate;
pub mod timers;
pub mod bridge;
pub mod controller;
pub mod driver;
pub mod bootstrap;

pub use registry::{Claim, SessionRegistry};
pub use handle::LoaderHandle;
pub use gate::ReadinessGate;
pub use timers::{TimerPlan, TimerSet};
pub use bridge::{BridgeAction, EventBridge};
pub use controller::SessionController;
pub use driver::{construct, Construction};
pub use bootstrap::{BootTrigger, Bootstrap};
