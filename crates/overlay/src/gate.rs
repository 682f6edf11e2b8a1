//! Readiness gate - waits for the page collaborators to exist.
//!
//! Both waits re-check on a fixed interval and never give up: without the
//! progress library or its container there is nothing useful the loader
//! could do, so the session simply stays parked. The driver races these
//! futures against its event channel, which keeps teardown responsive.

use std::sync::Arc;
use std::time::Duration;

use pageveil_core::{PageHost, ProgressContainer, ProgressLibrary};
use tokio::time::sleep;
use tracing::debug;

/// Polls the host until a precondition holds.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessGate {
    interval: Duration,
}

impl ReadinessGate {
    /// Create a gate polling at `interval`.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Retry interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Resolve once the progress library's global handle exists.
    pub async fn await_dependency(&self, host: &dyn PageHost) -> Arc<dyn ProgressLibrary> {
        let mut attempts: u32 = 0;
        loop {
            if let Some(library) = host.library() {
                debug!(attempts, "progress library available");
                return library;
            }
            if attempts == 0 {
                debug!(interval_ms = self.interval.as_millis() as u64, "waiting for progress library");
            }
            attempts += 1;
            sleep(self.interval).await;
        }
    }

    /// Resolve once an element matching `selector` is in the document.
    pub async fn await_container(
        &self,
        host: &dyn PageHost,
        selector: &str,
    ) -> Arc<dyn ProgressContainer> {
        let mut attempts: u32 = 0;
        loop {
            if let Some(container) = host.find_container(selector) {
                debug!(selector, attempts, "container found");
                return container;
            }
            if attempts == 0 {
                debug!(selector, "container not found, retrying");
            }
            attempts += 1;
            sleep(self.interval).await;
        }
    }
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageveil_sim::SimPage;
    use tokio::time::Instant;

    #[test]
    fn test_default_interval() {
        assert_eq!(ReadinessGate::default().interval(), Duration::from_millis(100));
        assert_eq!(ReadinessGate::new(Duration::from_millis(250)).interval(), Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dependency_already_present_resolves_immediately() {
        let page = SimPage::builder().build();
        let start = Instant::now();

        ReadinessGate::default().await_dependency(&page).await;

        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dependency_polled_on_interval() {
        let page = Arc::new(SimPage::builder().library_installed(false).build());
        let installer = Arc::clone(&page);
        tokio::spawn(async move {
            sleep(Duration::from_millis(350)).await;
            installer.install_library();
        });
        let start = Instant::now();

        ReadinessGate::default().await_dependency(page.as_ref()).await;

        // Polls at 0, 100, 200, 300 miss; the one at 400 hits.
        assert_eq!(start.elapsed(), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn test_container_polled_until_inserted() {
        let page = Arc::new(SimPage::builder().container_present(false).build());
        let inserter = Arc::clone(&page);
        tokio::spawn(async move {
            sleep(Duration::from_millis(900)).await;
            inserter.insert_container();
        });
        let start = Instant::now();

        ReadinessGate::new(Duration::from_millis(250))
            .await_container(page.as_ref(), ".pace")
            .await;

        assert_eq!(start.elapsed(), Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_selector_never_resolves() {
        let page = SimPage::builder().build();
        let gate = ReadinessGate::default();

        let waited = tokio::time::timeout(
            Duration::from_secs(60),
            gate.await_container(&page, "#not-there"),
        )
        .await;

        assert!(waited.is_err());
    }
}
