//! The simulated page.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use pageveil_core::{
    Listener, ListenerId, PageHost, PageSignal, ProgressContainer, ProgressLibrary, ReadyState,
};
use tokio::time::Instant;
use tracing::debug;

use crate::elements::{ContainerView, OverlayView, SimContainer};
use crate::library::SimLibrary;
use crate::record::{Effect, Recorded};

/// Selector that marks the landing page under the default configuration.
pub const LANDING_SELECTOR: &str = "#global-container.index-page";

pub(crate) type SharedPage = Arc<Mutex<PageState>>;

pub(crate) fn lock(page: &SharedPage) -> MutexGuard<'_, PageState> {
    page.lock().unwrap_or_else(PoisonError::into_inner)
}

pub(crate) struct PageState {
    origin: Instant,
    library_installed: bool,
    container_present: bool,
    elements: HashSet<String>,
    ready_state: ReadyState,
    pub(crate) container: ContainerView,
    pub(crate) overlay: Option<OverlayView>,
    pub(crate) generation: u64,
    page_listeners: BTreeMap<ListenerId, Listener<PageSignal>>,
    next_listener: u64,
    effects: Vec<Recorded>,
    pub(crate) fail_fades: bool,
    pub(crate) fail_conceal: bool,
}

impl PageState {
    pub(crate) fn record(&mut self, effect: Effect) {
        let at = Instant::now().saturating_duration_since(self.origin);
        self.effects.push(Recorded { at, effect });
    }
}

/// Builder for [`SimPage`].
#[derive(Debug, Clone)]
pub struct SimPageBuilder {
    container_selector: String,
    elements: HashSet<String>,
    library_installed: bool,
    container_present: bool,
    ready_state: ReadyState,
    running: bool,
}

impl Default for SimPageBuilder {
    fn default() -> Self {
        Self {
            container_selector: ".pace".to_string(),
            elements: HashSet::new(),
            library_installed: true,
            container_present: true,
            ready_state: ReadyState::Loading,
            running: false,
        }
    }
}

impl SimPageBuilder {
    /// Mark the page as the landing page.
    pub fn landing(mut self, landing: bool) -> Self {
        if landing {
            return self.element(LANDING_SELECTOR);
        }
        self.elements.remove(LANDING_SELECTOR);
        self
    }

    /// Add an element matched by `selector`.
    pub fn element(mut self, selector: impl Into<String>) -> Self {
        self.elements.insert(selector.into());
        self
    }

    /// Selector the container answers to.
    pub fn container_selector(mut self, selector: impl Into<String>) -> Self {
        self.container_selector = selector.into();
        self
    }

    /// Whether the library is loaded from the start.
    pub fn library_installed(mut self, installed: bool) -> Self {
        self.library_installed = installed;
        self
    }

    /// Whether the container exists from the start.
    pub fn container_present(mut self, present: bool) -> Self {
        self.container_present = present;
        self
    }

    /// Initial document readiness.
    pub fn ready_state(mut self, state: ReadyState) -> Self {
        self.ready_state = state;
        self
    }

    /// Whether the library already flags itself as running.
    pub fn running(mut self, running: bool) -> Self {
        self.running = running;
        self
    }

    /// Build the page. Its clock starts now.
    pub fn build(self) -> SimPage {
        let state = PageState {
            origin: Instant::now(),
            library_installed: self.library_installed,
            container_present: self.container_present,
            elements: self.elements,
            ready_state: self.ready_state,
            container: ContainerView::new(self.running),
            overlay: None,
            generation: 0,
            page_listeners: BTreeMap::new(),
            next_listener: 0,
            effects: Vec::new(),
            fail_fades: false,
            fail_conceal: false,
        };
        SimPage {
            state: Arc::new(Mutex::new(state)),
            library: Arc::new(SimLibrary::new()),
            container_selector: self.container_selector,
        }
    }
}

/// A page with a progress library, its container and an effect log.
pub struct SimPage {
    state: SharedPage,
    library: Arc<SimLibrary>,
    container_selector: String,
}

impl SimPage {
    /// Start building a page.
    pub fn builder() -> SimPageBuilder {
        SimPageBuilder::default()
    }

    /// Make the library's global handle available.
    pub fn install_library(&self) {
        lock(&self.state).library_installed = true;
    }

    /// Insert the container into the document.
    pub fn insert_container(&self) {
        lock(&self.state).container_present = true;
    }

    /// Change document readiness.
    pub fn set_ready_state(&self, state: ReadyState) {
        lock(&self.state).ready_state = state;
    }

    /// Fire a library event. Returns how many subscribers received it.
    pub fn emit(&self, event: pageveil_core::LibraryEvent) -> usize {
        self.library.emit(event)
    }

    /// Fire a page lifecycle signal. Returns how many listeners received it.
    pub fn signal(&self, signal: PageSignal) -> usize {
        let listeners: Vec<_> = lock(&self.state).page_listeners.values().cloned().collect();
        debug!(%signal, listeners = listeners.len(), "page signal");
        for listener in &listeners {
            listener(signal);
        }
        listeners.len()
    }

    /// Remove the overlay element behind the loader's back.
    pub fn remove_overlay(&self) -> bool {
        let mut page = lock(&self.state);
        let removed = page.overlay.take().is_some();
        if removed {
            page.record(Effect::OverlayRemovedExternally);
        }
        removed
    }

    /// Undisplay the overlay element behind the loader's back.
    pub fn undisplay_overlay(&self) {
        if let Some(view) = lock(&self.state).overlay.as_mut() {
            view.displayed = false;
        }
    }

    /// Make every fade-out fail.
    pub fn fail_fades(&self, fail: bool) {
        lock(&self.state).fail_fades = fail;
    }

    /// Make every immediate conceal fail.
    pub fn fail_conceal(&self, fail: bool) {
        lock(&self.state).fail_conceal = fail;
    }

    /// Current container state.
    pub fn container(&self) -> ContainerView {
        lock(&self.state).container.clone()
    }

    /// Current overlay element, if one is in the document.
    pub fn overlay(&self) -> Option<OverlayView> {
        lock(&self.state).overlay
    }

    /// Every effect so far, in order.
    pub fn effects(&self) -> Vec<Recorded> {
        lock(&self.state).effects.clone()
    }

    /// When `effect` first happened.
    pub fn first(&self, effect: &Effect) -> Option<Duration> {
        lock(&self.state)
            .effects
            .iter()
            .find(|recorded| &recorded.effect == effect)
            .map(|recorded| recorded.at)
    }

    /// How many times `effect` happened.
    pub fn count(&self, effect: &Effect) -> usize {
        lock(&self.state)
            .effects
            .iter()
            .filter(|recorded| &recorded.effect == effect)
            .count()
    }

    /// The library handle, regardless of whether it is installed yet.
    pub fn library_handle(&self) -> Arc<SimLibrary> {
        Arc::clone(&self.library)
    }

    /// Number of page-signal listeners.
    pub fn page_listener_count(&self) -> usize {
        lock(&self.state).page_listeners.len()
    }

    /// Number of library subscriptions.
    pub fn library_listener_count(&self) -> usize {
        self.library.subscriber_count()
    }
}

impl PageHost for SimPage {
    fn library(&self) -> Option<Arc<dyn ProgressLibrary>> {
        if lock(&self.state).library_installed {
            let library: Arc<dyn ProgressLibrary> = self.library.clone();
            Some(library)
        } else {
            None
        }
    }

    fn find_container(&self, selector: &str) -> Option<Arc<dyn ProgressContainer>> {
        let present = lock(&self.state).container_present;
        if present && selector == self.container_selector {
            let container: Arc<dyn ProgressContainer> =
                Arc::new(SimContainer::new(self.state.clone()));
            Some(container)
        } else {
            None
        }
    }

    fn matches(&self, selector: &str) -> bool {
        lock(&self.state).elements.contains(selector)
    }

    fn ready_state(&self) -> ReadyState {
        lock(&self.state).ready_state
    }

    fn on_page_signal(&self, listener: Listener<PageSignal>) -> ListenerId {
        let mut page = lock(&self.state);
        page.next_listener += 1;
        let id = ListenerId(page.next_listener);
        page.page_listeners.insert(id, listener);
        id
    }

    fn remove_page_listener(&self, id: ListenerId) {
        lock(&self.state).page_listeners.remove(&id);
    }
}
