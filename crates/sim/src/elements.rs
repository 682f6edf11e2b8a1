//! Container and overlay elements backed by the shared page state.

use std::collections::BTreeSet;
use std::time::Duration;

use pageveil_core::{OverlayElement, OverlayError, ProgressContainer, Result};

use crate::page::{lock, SharedPage};
use crate::record::Effect;

const RUNNING: &str = "pace-running";
const DONE: &str = "pace-done";

/// Observable state of the library container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerView {
    /// Class list
    pub classes: BTreeSet<String>,
    /// `display` is not `none`
    pub displayed: bool,
    /// `visibility` is `visible`
    pub visible: bool,
    /// Opacity in percent
    pub opacity: u8,
}

impl ContainerView {
    pub(crate) fn new(running: bool) -> Self {
        let mut classes = BTreeSet::from(["pace".to_string()]);
        if running {
            classes.insert(RUNNING.to_string());
        }
        Self {
            classes,
            displayed: true,
            visible: true,
            opacity: 100,
        }
    }

    /// Whether the class list contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    /// Whether the container is fully on screen.
    pub fn is_on_screen(&self) -> bool {
        self.displayed && self.visible && self.opacity > 0
    }
}

/// Observable state of the overlay element currently in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayView {
    /// Which build of the overlay this is
    pub generation: u64,
    /// `display` is not `none`
    pub displayed: bool,
    /// Opacity in percent
    pub opacity: u8,
}

/// The progress library's container.
pub struct SimContainer {
    page: SharedPage,
}

impl SimContainer {
    pub(crate) fn new(page: SharedPage) -> Self {
        Self { page }
    }
}

impl ProgressContainer for SimContainer {
    fn suppress_default_visuals(&self) -> Result<()> {
        lock(&self.page).record(Effect::DefaultsSuppressed);
        Ok(())
    }

    fn add_marker(&self, class: &str) -> Result<()> {
        let mut page = lock(&self.page);
        page.container.classes.insert(class.to_string());
        page.record(Effect::Marker(class.to_string()));
        Ok(())
    }

    fn is_running(&self) -> bool {
        lock(&self.page).container.has_class(RUNNING)
    }

    fn mark_running(&self) -> Result<()> {
        let mut page = lock(&self.page);
        let container = &mut page.container;
        container.classes.remove(DONE);
        container.classes.insert(RUNNING.to_string());
        container.displayed = true;
        container.visible = true;
        container.opacity = 100;
        page.record(Effect::ContainerRunning);
        Ok(())
    }

    fn mark_done(&self) -> Result<()> {
        let mut page = lock(&self.page);
        page.container.classes.remove(RUNNING);
        page.container.classes.insert(DONE.to_string());
        page.record(Effect::ContainerDone);
        Ok(())
    }

    fn begin_fade(&self, _duration: Duration) -> Result<()> {
        let mut page = lock(&self.page);
        if page.fail_fades {
            return Err(OverlayError::Dom("container transition rejected".to_string()));
        }
        page.container.opacity = 0;
        page.record(Effect::ContainerFade);
        Ok(())
    }

    fn conceal(&self) -> Result<()> {
        let mut page = lock(&self.page);
        if page.fail_conceal {
            return Err(OverlayError::Dom("container style locked".to_string()));
        }
        page.container.displayed = false;
        page.container.visible = false;
        page.container.opacity = 0;
        page.record(Effect::ContainerConcealed);
        Ok(())
    }

    fn create_overlay(&self) -> Result<Box<dyn OverlayElement>> {
        let mut page = lock(&self.page);
        if let Some(stale) = page.overlay.take() {
            page.record(Effect::OverlayReplaced(stale.generation));
        }
        page.generation += 1;
        let generation = page.generation;
        page.overlay = Some(OverlayView {
            generation,
            displayed: true,
            opacity: 100,
        });
        page.record(Effect::OverlayCreated(generation));
        Ok(Box::new(SimOverlay {
            generation,
            page: self.page.clone(),
        }))
    }
}

/// One build of the overlay element.
///
/// Once removed from the page, mutations are silently dropped, the way a
/// detached DOM node absorbs style changes.
pub struct SimOverlay {
    generation: u64,
    page: SharedPage,
}

impl SimOverlay {
    fn update(&self, effect: Effect, apply: impl FnOnce(&mut OverlayView)) {
        let mut page = lock(&self.page);
        let generation = self.generation;
        if let Some(view) = page.overlay.as_mut().filter(|view| view.generation == generation) {
            apply(view);
            page.record(effect);
        }
    }
}

impl OverlayElement for SimOverlay {
    fn is_attached(&self) -> bool {
        lock(&self.page)
            .overlay
            .is_some_and(|view| view.generation == self.generation)
    }

    fn is_displayed(&self) -> bool {
        lock(&self.page)
            .overlay
            .is_some_and(|view| view.generation == self.generation && view.displayed)
    }

    fn reveal(&self) -> Result<()> {
        self.update(Effect::OverlayRevealed, |view| {
            view.displayed = true;
            view.opacity = 100;
        });
        Ok(())
    }

    fn begin_fade(&self, _duration: Duration) -> Result<()> {
        if lock(&self.page).fail_fades {
            return Err(OverlayError::Dom("overlay transition rejected".to_string()));
        }
        self.update(Effect::OverlayFade, |view| view.opacity = 0);
        Ok(())
    }

    fn conceal(&self) -> Result<()> {
        if lock(&self.page).fail_conceal {
            return Err(OverlayError::Dom("overlay style locked".to_string()));
        }
        self.update(Effect::OverlayConcealed, |view| {
            view.displayed = false;
            view.opacity = 0;
        });
        Ok(())
    }

    fn settle_after_fade(&self) -> Result<()> {
        self.update(Effect::OverlaySettled, |view| {
            view.displayed = false;
            view.opacity = 100;
        });
        Ok(())
    }
}
