//! Timer set - the session's named timers and cosmetic callbacks.
//!
//! Every timer is a spawned task that sleeps and then posts a
//! [`LoaderEvent`] to the session. Cancelling aborts the task; an event that
//! was already queued when its timer was cancelled still arrives, and the
//! controller's state guard turns it into a no-op.

use std::time::Duration;

use pageveil_core::{DeferredKind, LoadMode, LoaderConfig, LoaderEvent, TimerKind};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep_until, Instant};
use tracing::{debug, warn};

/// What [`TimerSet::arm`] scheduled, relative to when it ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerPlan {
    /// Primary timer delay, if armed
    pub primary: Option<Duration>,
    /// Fallback timer delay
    pub fallback: Duration,
    /// Whether the progress-log ticker runs
    pub progress_log: bool,
}

#[derive(Debug)]
struct TimerHandle {
    deadline: Instant,
    task: JoinHandle<()>,
}

impl TimerHandle {
    fn cancel(self) {
        self.task.abort();
    }
}

/// The three named timers plus any pending cosmetic callbacks.
///
/// At most one timer of each kind is alive at a time.
#[derive(Debug)]
pub struct TimerSet {
    events: UnboundedSender<LoaderEvent>,
    primary: Option<TimerHandle>,
    fallback: Option<TimerHandle>,
    progress_log: Option<TimerHandle>,
    deferred: Vec<JoinHandle<()>>,
}

impl TimerSet {
    /// Create an empty set posting to `events`.
    pub fn new(events: UnboundedSender<LoaderEvent>) -> Self {
        Self {
            events,
            primary: None,
            fallback: None,
            progress_log: None,
            deferred: Vec::new(),
        }
    }

    /// Cancel whatever is armed, then arm the timers `mode` calls for.
    pub fn arm(&mut self, mode: LoadMode, config: &LoaderConfig) -> TimerPlan {
        let cancelled = self.cancel_all();
        if cancelled > 0 {
            warn!(cancelled, "timer set re-armed, previous timers cancelled");
        }

        let fallback = config.fallback_delay(mode);
        self.fallback = Some(self.one_shot(TimerKind::Fallback, fallback));

        match mode {
            LoadMode::FixedDuration => {
                let primary = config.primary_duration;
                self.primary = Some(self.one_shot(TimerKind::Primary, primary));
                self.progress_log = Some(self.ticker(primary, config.progress_tick));
                debug!(
                    primary_ms = primary.as_millis() as u64,
                    fallback_ms = fallback.as_millis() as u64,
                    "fixed-duration timers armed"
                );
                TimerPlan {
                    primary: Some(primary),
                    fallback,
                    progress_log: true,
                }
            }
            LoadMode::AwaitCompletion => {
                debug!(fallback_ms = fallback.as_millis() as u64, "completion fallback armed");
                TimerPlan {
                    primary: None,
                    fallback,
                    progress_log: false,
                }
            }
        }
    }

    fn one_shot(&self, kind: TimerKind, delay: Duration) -> TimerHandle {
        let events = self.events.clone();
        let deadline = Instant::now() + delay;
        let task = tokio::spawn(async move {
            sleep_until(deadline).await;
            let _ = events.send(LoaderEvent::Timer(kind));
        });
        TimerHandle { deadline, task }
    }

    fn ticker(&self, total: Duration, tick: Duration) -> TimerHandle {
        let events = self.events.clone();
        let start = Instant::now();
        let task = tokio::spawn(async move {
            if tick.is_zero() {
                return;
            }
            let mut interval = interval_at(start + tick, tick);
            let mut remaining = total;
            loop {
                interval.tick().await;
                remaining = remaining.saturating_sub(tick);
                if remaining.is_zero() {
                    break;
                }
                if events.send(LoaderEvent::ProgressTick { remaining }).is_err() {
                    break;
                }
            }
        });
        TimerHandle {
            deadline: start + total,
            task,
        }
    }

    /// Post `kind` after `delay`. Deferred callbacks are not named timers
    /// and survive `cancel_all`; the controller guards each one itself.
    pub fn defer(&mut self, kind: DeferredKind, delay: Duration) {
        self.deferred.retain(|task| !task.is_finished());
        let events = self.events.clone();
        let deadline = Instant::now() + delay;
        self.deferred.push(tokio::spawn(async move {
            sleep_until(deadline).await;
            let _ = events.send(LoaderEvent::Deferred(kind));
        }));
    }

    fn slot(&self, kind: TimerKind) -> &Option<TimerHandle> {
        match kind {
            TimerKind::Primary => &self.primary,
            TimerKind::Fallback => &self.fallback,
            TimerKind::ProgressLog => &self.progress_log,
        }
    }

    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<TimerHandle> {
        match kind {
            TimerKind::Primary => &mut self.primary,
            TimerKind::Fallback => &mut self.fallback,
            TimerKind::ProgressLog => &mut self.progress_log,
        }
    }

    /// Forget a timer whose event has been delivered.
    pub fn complete(&mut self, kind: TimerKind) {
        self.slot_mut(kind).take();
    }

    /// Cancel one timer. Returns whether it was armed.
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        match self.slot_mut(kind).take() {
            Some(handle) => {
                handle.cancel();
                debug!(timer = %kind, "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancel all three named timers. Returns how many were armed.
    pub fn cancel_all(&mut self) -> usize {
        [TimerKind::Primary, TimerKind::Fallback, TimerKind::ProgressLog]
            .into_iter()
            .filter(|kind| self.cancel(*kind))
            .count()
    }

    /// Whether a timer of `kind` is scheduled and has not fired yet.
    pub fn is_armed(&self, kind: TimerKind) -> bool {
        self.slot(kind)
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Whether no named timer is held.
    pub fn is_idle(&self) -> bool {
        self.primary.is_none() && self.fallback.is_none() && self.progress_log.is_none()
    }

    /// Time left until `kind` fires.
    pub fn remaining(&self, kind: TimerKind) -> Option<Duration> {
        self.slot(kind)
            .as_ref()
            .map(|handle| handle.deadline.saturating_duration_since(Instant::now()))
    }
}

impl Drop for TimerSet {
    fn drop(&mut self) {
        self.cancel_all();
        for task in self.deferred.drain(..) {
            task.abort();
        }
    }
}
