//! Session construction and the per-session event loop.

use std::future::Future;
use std::sync::Arc;

use pageveil_core::{
    HideCause, LoaderConfig, LoaderEvent, LoaderState, PageHost, SessionId, SessionOutcome,
};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::controller::SessionController;
use crate::gate::ReadinessGate;
use crate::handle::LoaderHandle;
use crate::registry::{Claim, SessionRegistry};

/// Result of a construction attempt.
#[derive(Debug)]
pub enum Construction {
    /// A new session was registered and its event loop spawned
    Created {
        /// Handle to the new session
        handle: LoaderHandle,
        /// The event loop; resolves once the session is fully torn down
        task: JoinHandle<Option<SessionOutcome>>,
    },
    /// A session was already registered; nothing was started
    Existing(LoaderHandle),
}

impl Construction {
    /// Handle to whichever session is live.
    pub fn handle(&self) -> &LoaderHandle {
        match self {
            Construction::Created { handle, .. } => handle,
            Construction::Existing(handle) => handle,
        }
    }

    /// Whether this attempt started a new session.
    pub fn is_new(&self) -> bool {
        matches!(self, Construction::Created { .. })
    }
}

/// Construct a loader session for `host`, unless `registry` already holds one.
///
/// Must be called from within a tokio runtime. The new session immediately
/// starts waiting for the progress library and its container.
pub fn construct(
    host: Arc<dyn PageHost>,
    registry: &SessionRegistry,
    config: LoaderConfig,
) -> Construction {
    let id = SessionId::new();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (outcome_tx, outcome_rx) = watch::channel(None);
    let candidate = LoaderHandle::new(id, events_tx.clone(), outcome_rx);

    let handle = match registry.claim(candidate) {
        Claim::Occupied(existing) => {
            info!(session = %existing.id(), "loader session already exists, skipping initialization");
            return Construction::Existing(existing);
        }
        Claim::Claimed(handle) => handle,
    };

    let gate = ReadinessGate::new(config.poll_interval);
    let controller = SessionController::new(
        id,
        Arc::clone(&host),
        registry.clone(),
        config,
        events_tx,
        outcome_tx,
    );
    let driver = SessionDriver {
        controller,
        events: events_rx,
        host,
        gate,
    };
    let task = tokio::spawn(driver.run());
    Construction::Created { handle, task }
}

struct SessionDriver {
    controller: SessionController,
    events: mpsc::UnboundedReceiver<LoaderEvent>,
    host: Arc<dyn PageHost>,
    gate: ReadinessGate,
}

impl SessionDriver {
    async fn run(mut self) -> Option<SessionOutcome> {
        info!(
            session = %self.controller.id(),
            started = %self.controller.started_wall().format("%H:%M:%S%.3f"),
            poll_ms = self.gate.interval().as_millis() as u64,
            "loader session constructed"
        );

        self.controller.enter(LoaderState::AwaitingDependency);
        let gate = self.gate;
        let host = Arc::clone(&self.host);
        let Some(library) = self
            .until(async move { gate.await_dependency(host.as_ref()).await })
            .await
        else {
            return self.drain().await;
        };

        self.controller.enter(LoaderState::AwaitingContainer);
        let host = Arc::clone(&self.host);
        let selector = self.controller_selector();
        let Some(container) = self
            .until(async move { gate.await_container(host.as_ref(), &selector).await })
            .await
        else {
            return self.drain().await;
        };

        if let Err(err) = self.controller.setup(library, container) {
            error!(session = %self.controller.id(), error = %err, "overlay setup failed");
            self.controller.force_hide(HideCause::SetupFailure);
        }

        self.drain().await
    }

    fn controller_selector(&self) -> String {
        self.controller.config().container_selector.clone()
    }

    /// Wait for `ready` while still serving the event queue, so a teardown
    /// during the readiness wait takes effect at once. Returns `None` if the
    /// session was hidden first.
    async fn until<T>(&mut self, ready: impl Future<Output = T>) -> Option<T> {
        tokio::pin!(ready);
        loop {
            tokio::select! {
                biased;
                event = self.events.recv() => match event {
                    Some(event) => {
                        self.controller.handle(event);
                        if self.controller.state().is_hidden() {
                            return None;
                        }
                    }
                    None => return None,
                },
                value = &mut ready => return Some(value),
            }
        }
    }

    async fn drain(mut self) -> Option<SessionOutcome> {
        while !self.controller.is_finished() {
            match self.events.recv().await {
                Some(event) => self.controller.handle(event),
                None => break,
            }
        }
        debug!(session = %self.controller.id(), "session event loop finished");
        self.controller.outcome()
    }
}
