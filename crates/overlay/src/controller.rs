//! Session controller - the overlay state machine.
//!
//! Owns the session state, the overlay element and the library container,
//! and is the only code that changes what is on screen. Every path that can
//! hide the overlay checks and sets `state` before doing anything else, so
//! whichever trigger arrives first wins and the rest fall through as no-ops.

use std::sync::Arc;
use std::time::Duration;

use pageveil_core::{
    DeferredKind, HideCause, LibraryEvent, Listener, ListenerId, LoadMode, LoaderConfig,
    LoaderEvent, LoaderState, OverlayElement, OverlayError, PageHost, PageSignal,
    ProgressContainer, ProgressLibrary, ReadyState, Result, SessionId, SessionOutcome, Time,
    TimerKind,
};
use tokio::sync::{mpsc::UnboundedSender, watch};
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::bridge::{BridgeAction, EventBridge};
use crate::registry::SessionRegistry;
use crate::timers::TimerSet;

/// The overlay state machine for one page load.
pub struct SessionController {
    id: SessionId,
    config: LoaderConfig,
    host: Arc<dyn PageHost>,
    registry: SessionRegistry,
    events: UnboundedSender<LoaderEvent>,
    published: watch::Sender<Option<SessionOutcome>>,
    started_at: Instant,
    started_wall: Time,
    state: LoaderState,
    mode: Option<LoadMode>,
    container: Option<Arc<dyn ProgressContainer>>,
    overlay: Option<Box<dyn OverlayElement>>,
    timers: TimerSet,
    bridge: Option<EventBridge>,
    page_listener: Option<ListenerId>,
    outcome: Option<SessionOutcome>,
    fading: bool,
}

impl SessionController {
    /// Create a controller in the `Uninitialized` state.
    ///
    /// `events` is the session's own queue: timers and subscriptions post
    /// into it. `published` receives the outcome once the session hides.
    pub fn new(
        id: SessionId,
        host: Arc<dyn PageHost>,
        registry: SessionRegistry,
        config: LoaderConfig,
        events: UnboundedSender<LoaderEvent>,
        published: watch::Sender<Option<SessionOutcome>>,
    ) -> Self {
        Self {
            id,
            config,
            host,
            registry,
            timers: TimerSet::new(events.clone()),
            events,
            published,
            started_at: Instant::now(),
            started_wall: chrono::Utc::now(),
            state: LoaderState::Uninitialized,
            mode: None,
            container: None,
            overlay: None,
            bridge: None,
            page_listener: None,
            outcome: None,
            fading: false,
        }
    }

    /// Session id.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current state.
    pub fn state(&self) -> LoaderState {
        self.state
    }

    /// Session configuration.
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Mode chosen at setup.
    pub fn mode(&self) -> Option<LoadMode> {
        self.mode
    }

    /// The session's timers.
    pub fn timers(&self) -> &TimerSet {
        &self.timers
    }

    /// How the session was hidden, once it has been.
    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    /// Wall-clock construction time.
    pub fn started_wall(&self) -> Time {
        self.started_wall
    }

    /// Time since construction.
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Whether the library subscription is live.
    pub fn is_subscribed(&self) -> bool {
        self.bridge.as_ref().is_some_and(EventBridge::is_attached)
    }

    /// Whether the event loop has nothing left to do: hidden, fade
    /// finished, teardown listener gone and registry slot released.
    pub fn is_finished(&self) -> bool {
        self.state.is_hidden()
            && !self.fading
            && self.page_listener.is_none()
            && !self.registry.holds(self.id)
    }

    /// Move to `next` if the lifecycle allows it.
    pub fn enter(&mut self, next: LoaderState) -> bool {
        if !self.state.can_transition_to(next) {
            debug!(session = %self.id, from = %self.state, to = %next, "transition refused");
            return false;
        }
        if self.state != next {
            debug!(session = %self.id, from = %self.state, to = %next, "state transition");
        }
        self.state = next;
        true
    }

    /// Bring the overlay up once both collaborators exist.
    ///
    /// Runs at most once per session. An error leaves the session for the
    /// caller to tear down with [`force_hide`](Self::force_hide).
    pub fn setup(
        &mut self,
        library: Arc<dyn ProgressLibrary>,
        container: Arc<dyn ProgressContainer>,
    ) -> Result<()> {
        if self.state.is_hidden() {
            debug!(session = %self.id, "session hidden before setup, skipping");
            return Ok(());
        }
        if self.mode.is_some() {
            warn!(session = %self.id, "setup already ran, ignoring");
            return Ok(());
        }

        container.suppress_default_visuals()?;

        let mode = LoadMode::for_page(self.host.matches(&self.config.landing_selector));
        self.mode = Some(mode);
        match mode {
            LoadMode::FixedDuration => {
                container.add_marker(&self.config.landing_marker)?;
                info!(session = %self.id, %mode, "landing page detected, holding overlay for a fixed time");
            }
            LoadMode::AwaitCompletion => {
                info!(session = %self.id, %mode, "regular page detected, waiting for library completion");
            }
        }

        self.overlay = Some(container.create_overlay()?);
        self.container = Some(Arc::clone(&container));
        self.enter(LoaderState::Visible);

        let plan = self.timers.arm(mode, &self.config);
        info!(
            session = %self.id,
            primary_ms = plan.primary.map(|d| d.as_millis() as u64),
            fallback_ms = plan.fallback.as_millis() as u64,
            "timers armed"
        );

        self.bridge = Some(EventBridge::wire(library, self.events.clone())?);

        if container.is_running() {
            self.show();
        }
        self.check_page_load_state();

        self.timers
            .defer(DeferredKind::VisibilityCheck, self.config.visibility_check_delay);
        self.timers
            .defer(DeferredKind::ReadyMarker, self.config.ready_delay(mode));

        self.wire_page_signals();
        Ok(())
    }

    fn wire_page_signals(&mut self) {
        let events = self.events.clone();
        let listener: Listener<PageSignal> = Arc::new(move |signal| {
            let _ = events.send(LoaderEvent::Page(signal));
        });
        self.page_listener = Some(self.host.on_page_signal(listener));
    }

    fn overlay_attached(&self) -> bool {
        self.overlay.as_ref().is_some_and(|overlay| overlay.is_attached())
    }

    /// Put the overlay on screen. No-op once hidden; rebuilds the overlay
    /// element if something removed it.
    pub fn show(&mut self) {
        if self.state.is_hidden() {
            debug!(session = %self.id, "overlay hidden, not showing again");
            return;
        }
        if let Err(err) = self.try_show() {
            warn!(session = %self.id, error = %err, "could not show overlay");
        }
    }

    fn try_show(&mut self) -> Result<()> {
        let container = self
            .container
            .clone()
            .ok_or_else(|| OverlayError::ContainerMissing(self.config.container_selector.clone()))?;
        container.mark_running()?;

        if self.overlay_attached() {
            if let Some(overlay) = &self.overlay {
                overlay.reveal()?;
            }
        } else {
            info!(session = %self.id, "overlay element missing, recreating");
            self.overlay = Some(container.create_overlay()?);
        }

        self.enter(LoaderState::Visible);
        Ok(())
    }

    /// Re-assert the container's visible state after the library finished
    /// on its own. No-op once hidden.
    pub fn hold_visible(&mut self) {
        if self.state.is_hidden() {
            debug!(session = %self.id, "overlay hidden, skipping hold");
            return;
        }
        let Some(container) = &self.container else {
            return;
        };
        match container.mark_running() {
            Ok(()) => debug!(session = %self.id, "library completion ignored, overlay held"),
            Err(err) => warn!(session = %self.id, error = %err, "could not hold overlay"),
        }
    }

    /// Hide with a fade. Returns whether this call performed the transition.
    ///
    /// State is `Hidden` and every timer is cancelled before the fade
    /// starts. Falls back to [`force_hide`](Self::force_hide) when the
    /// overlay element is gone or the fade cannot start.
    pub fn hide(&mut self, cause: HideCause) -> bool {
        if self.state.is_hidden() {
            debug!(session = %self.id, %cause, "overlay already hidden, ignoring");
            return false;
        }
        if !self.overlay_attached() {
            warn!(session = %self.id, %cause, "overlay element not found, hiding immediately");
            return self.force_hide(cause);
        }

        self.enter(LoaderState::Hidden);
        let cancelled = self.timers.cancel_all();
        self.detach_library();
        self.record_outcome(cause, false);
        info!(
            session = %self.id,
            %cause,
            elapsed_ms = self.elapsed().as_millis() as u64,
            cancelled,
            "hiding overlay"
        );

        if let Err(err) = self.begin_fade() {
            error!(session = %self.id, error = %err, "fade-out failed, hiding immediately");
            self.force_hide(cause);
            self.record_outcome(cause, true);
            return true;
        }
        self.fading = true;
        self.timers
            .defer(DeferredKind::FadeComplete, self.config.fade_duration);
        true
    }

    fn begin_fade(&self) -> Result<()> {
        let fade = self.config.fade_duration;
        if let Some(container) = &self.container {
            container.mark_done()?;
            container.begin_fade(fade)?;
        }
        self.overlay
            .as_ref()
            .ok_or(OverlayError::OverlayMissing)?
            .begin_fade(fade)
    }

    /// Hide immediately and release the registry slot. Returns whether this
    /// call performed the transition.
    ///
    /// Unconditional and repeatable: even when already hidden it cancels
    /// timers, drops listeners, conceals both elements and releases the
    /// slot. DOM failures are logged, never returned.
    pub fn force_hide(&mut self, cause: HideCause) -> bool {
        let transitioned = self.enter(LoaderState::Hidden);
        if transitioned {
            self.record_outcome(cause, true);
        }
        info!(
            session = %self.id,
            %cause,
            elapsed_ms = self.elapsed().as_millis() as u64,
            "force hiding overlay"
        );

        self.timers.cancel_all();
        self.detach_library();
        self.detach_page_signals();
        self.fading = false;

        if let Err(err) = self.conceal_all() {
            error!(session = %self.id, error = %err, "could not conceal overlay");
        }
        self.registry.release(self.id);
        transitioned
    }

    fn conceal_all(&self) -> Result<()> {
        let mut first_error = None;
        if let Some(container) = &self.container {
            if let Err(err) = container.conceal().and_then(|()| container.mark_done()) {
                first_error.get_or_insert(err);
            }
        }
        if let Some(overlay) = &self.overlay {
            if let Err(err) = overlay.conceal() {
                first_error.get_or_insert(err);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn detach_library(&mut self) {
        if let Some(bridge) = self.bridge.as_mut() {
            bridge.detach();
        }
    }

    fn detach_page_signals(&mut self) {
        if let Some(listener) = self.page_listener.take() {
            self.host.remove_page_listener(listener);
        }
    }

    fn record_outcome(&mut self, cause: HideCause, forced: bool) {
        let outcome = SessionOutcome {
            cause,
            elapsed: self.elapsed(),
            forced,
        };
        self.outcome = Some(outcome);
        self.published.send_replace(Some(outcome));
    }

    /// Consult document readiness once: a page still loading gets the
    /// overlay; a loaded page keeps whatever is on screen until its
    /// trigger fires.
    pub fn check_page_load_state(&mut self) {
        match self.host.ready_state() {
            ReadyState::Loading => self.show(),
            ReadyState::Interactive => debug!(session = %self.id, "document interactive"),
            ReadyState::Complete => {
                info!(session = %self.id, "page already loaded, overlay stays until its trigger fires")
            }
        }
    }

    /// Apply one event from the session queue.
    pub fn handle(&mut self, event: LoaderEvent) {
        match event {
            LoaderEvent::Library(event) => self.on_library(event),
            LoaderEvent::Timer(kind) => self.on_timer(kind),
            LoaderEvent::ProgressTick { remaining } => {
                if !self.state.is_hidden() {
                    debug!(
                        session = %self.id,
                        remaining_ms = remaining.as_millis() as u64,
                        elapsed_ms = self.config.primary_duration.saturating_sub(remaining).as_millis() as u64,
                        actual_ms = self.elapsed().as_millis() as u64,
                        "loading timer"
                    );
                }
            }
            LoaderEvent::Deferred(kind) => self.on_deferred(kind),
            LoaderEvent::Page(signal) => {
                info!(session = %self.id, %signal, "page teardown");
                self.force_hide(HideCause::Teardown(signal));
            }
            LoaderEvent::Hide => {
                self.hide(HideCause::Explicit);
            }
            LoaderEvent::ForceHide => {
                self.force_hide(HideCause::Explicit);
            }
        }
    }

    fn on_library(&mut self, event: LibraryEvent) {
        let Some(mode) = self.mode else {
            debug!(session = %self.id, %event, "library event before setup, ignoring");
            return;
        };
        debug!(session = %self.id, %event, %mode, "library event");
        match EventBridge::route(mode, event) {
            BridgeAction::Show => self.show(),
            BridgeAction::Hide => {
                self.hide(HideCause::LibraryDone);
            }
            BridgeAction::HoldVisible => self.hold_visible(),
        }
    }

    fn on_timer(&mut self, kind: TimerKind) {
        if self.state.is_hidden() {
            debug!(session = %self.id, timer = %kind, "timer fired after hide, ignoring");
            return;
        }
        self.timers.complete(kind);
        match kind {
            TimerKind::Primary => {
                let expected = self.config.primary_duration;
                let actual = self.elapsed();
                let drift = if actual > expected { actual - expected } else { expected - actual };
                info!(
                    session = %self.id,
                    expected_ms = expected.as_millis() as u64,
                    actual_ms = actual.as_millis() as u64,
                    drift_ms = drift.as_millis() as u64,
                    "primary timer completed"
                );
                self.hide(HideCause::PrimaryTimer);
            }
            TimerKind::Fallback => {
                warn!(session = %self.id, "fallback timer triggered, forcing hide");
                self.force_hide(HideCause::FallbackTimer);
            }
            TimerKind::ProgressLog => {}
        }
    }

    fn on_deferred(&mut self, kind: DeferredKind) {
        match kind {
            DeferredKind::ReadyMarker => {
                if self.state.is_hidden() {
                    return;
                }
                if let Some(container) = &self.container {
                    match container.add_marker(&self.config.ready_marker) {
                        Ok(()) => info!(session = %self.id, "loader ready"),
                        Err(err) => warn!(session = %self.id, error = %err, "could not mark loader ready"),
                    }
                }
            }
            DeferredKind::VisibilityCheck => {
                let displayed = self
                    .overlay
                    .as_ref()
                    .is_some_and(|overlay| overlay.is_attached() && overlay.is_displayed());
                if !self.state.is_hidden() && !displayed {
                    info!(session = %self.id, "overlay not on screen, showing again");
                    self.show();
                }
            }
            DeferredKind::FadeComplete => {
                if !self.fading {
                    return;
                }
                self.fading = false;
                if let Some(container) = &self.container {
                    if let Err(err) = container.conceal() {
                        warn!(session = %self.id, error = %err, "could not finish container fade");
                    }
                }
                if let Some(overlay) = &self.overlay {
                    if let Err(err) = overlay.settle_after_fade() {
                        warn!(session = %self.id, error = %err, "could not finish overlay fade");
                    }
                }
                debug!(session = %self.id, "fade-out complete");
            }
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.detach_page_signals();
    }
}
