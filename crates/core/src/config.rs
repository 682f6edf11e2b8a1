//! Loader configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::Result;
use crate::state::LoadMode;

/// Timings and selectors for a loader session.
///
/// Durations are (de)serialized as whole milliseconds. Missing fields in a
/// config file fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Retry interval of the readiness gate
    #[serde(with = "millis", rename = "poll_interval_ms")]
    pub poll_interval: Duration,

    /// How long the landing page keeps the overlay up
    #[serde(with = "millis", rename = "primary_duration_ms")]
    pub primary_duration: Duration,

    /// Extra time after the primary duration before the fallback fires
    #[serde(with = "millis", rename = "fallback_grace_ms")]
    pub fallback_grace: Duration,

    /// Fallback deadline for pages waiting on library completion
    #[serde(with = "millis", rename = "completion_fallback_ms")]
    pub completion_fallback: Duration,

    /// Period of the progress-log ticker
    #[serde(with = "millis", rename = "progress_tick_ms")]
    pub progress_tick: Duration,

    /// Length of the cosmetic fade-out
    #[serde(with = "millis", rename = "fade_duration_ms")]
    pub fade_duration: Duration,

    /// Delay before the post-setup visibility check
    #[serde(with = "millis", rename = "visibility_check_delay_ms")]
    pub visibility_check_delay: Duration,

    /// Ready-marker delay on the landing page
    #[serde(with = "millis", rename = "ready_delay_landing_ms")]
    pub ready_delay_landing: Duration,

    /// Ready-marker delay on every other page
    #[serde(with = "millis", rename = "ready_delay_regular_ms")]
    pub ready_delay_regular: Duration,

    /// Selector of the progress library's container
    pub container_selector: String,

    /// Selector that only matches on the landing page
    pub landing_selector: String,

    /// Class added to the container on the landing page
    pub landing_marker: String,

    /// Class added to the container once the loader is ready
    pub ready_marker: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            primary_duration: Duration::from_millis(2000),
            fallback_grace: Duration::from_millis(2000),
            completion_fallback: Duration::from_millis(5000),
            progress_tick: Duration::from_millis(1000),
            fade_duration: Duration::from_millis(500),
            visibility_check_delay: Duration::from_millis(500),
            ready_delay_landing: Duration::from_millis(400),
            ready_delay_regular: Duration::from_millis(200),
            container_selector: ".pace".to_string(),
            landing_selector: "#global-container.index-page".to_string(),
            landing_marker: "index-page".to_string(),
            ready_marker: "loader-ready".to_string(),
        }
    }
}

impl LoaderConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Render the configuration as pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Set the readiness poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the landing-page display duration.
    pub fn with_primary_duration(mut self, duration: Duration) -> Self {
        self.primary_duration = duration;
        self
    }

    /// Set the grace period between primary expiry and the fallback.
    pub fn with_fallback_grace(mut self, grace: Duration) -> Self {
        self.fallback_grace = grace;
        self
    }

    /// Set the await-completion fallback deadline.
    pub fn with_completion_fallback(mut self, deadline: Duration) -> Self {
        self.completion_fallback = deadline;
        self
    }

    /// Set the fade-out length.
    pub fn with_fade_duration(mut self, duration: Duration) -> Self {
        self.fade_duration = duration;
        self
    }

    /// Set the container selector.
    pub fn with_container_selector(mut self, selector: impl Into<String>) -> Self {
        self.container_selector = selector.into();
        self
    }

    /// When the fallback timer fires for the given mode.
    pub fn fallback_delay(&self, mode: LoadMode) -> Duration {
        match mode {
            LoadMode::FixedDuration => self.primary_duration + self.fallback_grace,
            LoadMode::AwaitCompletion => self.completion_fallback,
        }
    }

    /// When the ready marker is applied for the given mode.
    pub fn ready_delay(&self, mode: LoadMode) -> Duration {
        match mode {
            LoadMode::FixedDuration => self.ready_delay_landing,
            LoadMode::AwaitCompletion => self.ready_delay_regular,
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}
