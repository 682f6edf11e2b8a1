//! Page-script entry point.
//!
//! A page runs the loader script once, then may see DOM-ready and window
//! `load` afterwards. Each of those is a chance to start the loader; only
//! the first one that finds the document parsed actually does.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pageveil_core::{LoaderConfig, PageHost, ReadyState};
use tracing::{debug, info};

use crate::driver::{construct, Construction};
use crate::registry::SessionRegistry;

/// What gave the bootstrap a chance to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootTrigger {
    /// The loader script itself was evaluated
    ScriptLoaded,
    /// `DOMContentLoaded`
    DomReady,
    /// Window `load`
    WindowLoad,
}

/// Starts the loader at most once per page.
pub struct Bootstrap {
    host: Arc<dyn PageHost>,
    registry: SessionRegistry,
    config: LoaderConfig,
    initialized: AtomicBool,
}

impl Bootstrap {
    /// Create a bootstrap for `host`.
    pub fn new(host: Arc<dyn PageHost>, registry: SessionRegistry, config: LoaderConfig) -> Self {
        Self {
            host,
            registry,
            config,
            initialized: AtomicBool::new(false),
        }
    }

    /// Whether a construction attempt has already been made.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// React to a trigger. Returns the construction result the first time
    /// the loader is started, `None` otherwise.
    pub fn trigger(&self, trigger: BootTrigger) -> Option<Construction> {
        if trigger == BootTrigger::ScriptLoaded && self.host.ready_state() == ReadyState::Loading {
            debug!(?trigger, "document still loading, waiting for dom-ready");
            return None;
        }
        if self.initialized.swap(true, Ordering::AcqRel) {
            debug!(?trigger, "loader already initialized, skipping");
            return None;
        }
        info!(?trigger, "initializing loader");
        Some(construct(
            Arc::clone(&self.host),
            &self.registry,
            self.config.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pageveil_sim::SimPage;

    fn bootstrap(ready: ReadyState) -> (Bootstrap, SessionRegistry) {
        let page = Arc::new(SimPage::builder().ready_state(ready).build());
        let registry = SessionRegistry::new();
        (
            Bootstrap::new(page, registry.clone(), LoaderConfig::default()),
            registry,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_load_defers_while_loading() {
        let (boot, registry) = bootstrap(ReadyState::Loading);

        assert!(boot.trigger(BootTrigger::ScriptLoaded).is_none());
        assert!(!boot.is_initialized());
        assert!(!registry.is_occupied());

        let started = boot.trigger(BootTrigger::DomReady).unwrap();
        assert!(started.is_new());
        assert!(boot.trigger(BootTrigger::WindowLoad).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_load_starts_when_parsed() {
        let (boot, registry) = bootstrap(ReadyState::Interactive);

        let started = boot.trigger(BootTrigger::ScriptLoaded).unwrap();
        assert!(started.is_new());
        assert_eq!(registry.current().map(|h| h.id()), Some(started.handle().id()));

        assert!(boot.trigger(BootTrigger::DomReady).is_none());
        assert!(boot.trigger(BootTrigger::WindowLoad).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_load_retried_after_parse() {
        let page = Arc::new(SimPage::builder().build());
        let boot = Bootstrap::new(page.clone(), SessionRegistry::new(), LoaderConfig::default());

        assert!(boot.trigger(BootTrigger::ScriptLoaded).is_none());
        page.set_ready_state(ReadyState::Interactive);

        assert!(boot.trigger(BootTrigger::ScriptLoaded).is_some_and(|c| c.is_new()));
        assert!(boot.is_initialized());
    }

    #[tokio::test(start_paused = true)]
    async fn test_separate_bootstraps_share_the_registry() {
        let (first, registry) = bootstrap(ReadyState::Complete);
        let page = Arc::new(SimPage::builder().build());
        let second = Bootstrap::new(page, registry.clone(), LoaderConfig::default());

        let created = first.trigger(BootTrigger::WindowLoad).unwrap();
        let reused = second.trigger(BootTrigger::WindowLoad).unwrap();

        assert!(created.is_new());
        assert!(!reused.is_new());
        assert_eq!(created.handle().id(), reused.handle().id());
    }
}
