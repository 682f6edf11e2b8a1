//! End-to-end session scenarios against the simulated page, on paused time.

use std::sync::Arc;
use std::time::Duration;

use pageveil_core::{HideCause, LibraryEvent, LoaderConfig, PageSignal, SessionOutcome};
use pageveil_overlay::{construct, Construction, LoaderHandle, SessionRegistry};
use pageveil_sim::{Effect, SimPage};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};

fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

fn start(
    page: &Arc<SimPage>,
    registry: &SessionRegistry,
) -> (LoaderHandle, JoinHandle<Option<SessionOutcome>>) {
    match construct(page.clone(), registry, LoaderConfig::default()) {
        Construction::Created { handle, task } => (handle, task),
        Construction::Existing(_) => panic!("registry should have been empty"),
    }
}

async fn sleep_until_ms(origin: Instant, millis: u64) {
    tokio::time::sleep_until(origin + ms(millis)).await;
}

#[tokio::test(start_paused = true)]
async fn landing_page_hides_when_primary_timer_expires() {
    let page = Arc::new(SimPage::builder().landing(true).build());
    let registry = SessionRegistry::new();
    let (handle, task) = start(&page, &registry);

    let outcome = handle.hidden().await.unwrap();
    assert_eq!(outcome.cause, HideCause::PrimaryTimer);
    assert_eq!(outcome.elapsed, ms(2000));
    assert!(!outcome.forced);

    // Past the 4000ms fallback: it must have been cancelled.
    sleep(ms(8000)).await;
    assert!(registry.is_occupied());
    assert_eq!(page.count(&Effect::OverlayConcealed), 0);
    assert_eq!(page.first(&Effect::OverlayFade), Some(ms(2000)));
    assert_eq!(page.first(&Effect::OverlaySettled), Some(ms(2500)));

    page.signal(PageSignal::PageHide);
    let last = task.await.unwrap().unwrap();
    assert_eq!(last.cause, HideCause::PrimaryTimer);
    assert!(!registry.is_occupied());
}

#[tokio::test(start_paused = true)]
async fn landing_page_ignores_early_done() {
    let origin = Instant::now();
    let page = Arc::new(SimPage::builder().landing(true).build());
    let registry = SessionRegistry::new();
    let (handle, _task) = start(&page, &registry);

    sleep_until_ms(origin, 500).await;
    assert_eq!(page.emit(LibraryEvent::Done), 1);

    sleep_until_ms(origin, 1500).await;
    assert!(handle.outcome().is_none());
    let container = page.container();
    assert!(container.has_class("pace-running"));
    assert!(container.is_on_screen());

    let outcome = handle.hidden().await.unwrap();
    assert_eq!(outcome.cause, HideCause::PrimaryTimer);
    assert_eq!(outcome.elapsed, ms(2000));
}

#[tokio::test(start_paused = true)]
async fn regular_page_hides_on_done() {
    let origin = Instant::now();
    let page = Arc::new(SimPage::builder().build());
    let registry = SessionRegistry::new();
    let (handle, _task) = start(&page, &registry);

    sleep_until_ms(origin, 300).await;
    page.emit(LibraryEvent::Done);

    let outcome = handle.hidden().await.unwrap();
    assert_eq!(outcome.cause, HideCause::LibraryDone);
    assert_eq!(outcome.elapsed, ms(300));
    assert!(!outcome.forced);

    // The 5000ms fallback was cancelled with the hide.
    sleep_until_ms(origin, 7000).await;
    assert_eq!(handle.outcome().map(|o| o.cause), Some(HideCause::LibraryDone));
    assert!(registry.is_occupied());
    assert_eq!(page.count(&Effect::OverlayConcealed), 0);
    assert_eq!(page.library_listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn regular_page_without_done_is_forced_at_fallback() {
    let page = Arc::new(SimPage::builder().build());
    let registry = SessionRegistry::new();
    let (handle, task) = start(&page, &registry);

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome.cause, HideCause::FallbackTimer);
    assert_eq!(outcome.elapsed, ms(5000));
    assert!(outcome.forced);

    assert!(!registry.is_occupied());
    assert!(handle.is_closed());
    assert_eq!(page.first(&Effect::OverlayConcealed), Some(ms(5000)));
    assert_eq!(page.page_listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn page_hide_tears_down_immediately() {
    let origin = Instant::now();
    let page = Arc::new(SimPage::builder().landing(true).build());
    let registry = SessionRegistry::new();
    let (_handle, task) = start(&page, &registry);

    sleep_until_ms(origin, 100).await;
    assert_eq!(page.signal(PageSignal::PageHide), 1);

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome.cause, HideCause::Teardown(PageSignal::PageHide));
    assert_eq!(outcome.elapsed, ms(100));
    assert!(outcome.forced);
    assert!(!registry.is_occupied());

    // Nothing scheduled before the teardown may touch the page afterwards.
    sleep_until_ms(origin, 10_000).await;
    assert!(page.effects().iter().all(|recorded| recorded.at <= ms(100)));
}

#[tokio::test(start_paused = true)]
async fn second_construction_is_a_no_op() {
    let page = Arc::new(SimPage::builder().build());
    let registry = SessionRegistry::new();
    let (handle, _task) = start(&page, &registry);

    let again = construct(page.clone(), &registry, LoaderConfig::default());
    assert!(!again.is_new());
    assert_eq!(again.handle().id(), handle.id());

    sleep(ms(50)).await;
    assert_eq!(page.count(&Effect::OverlayCreated(1)), 1);
    assert_eq!(page.overlay().map(|view| view.generation), Some(1));
    assert_eq!(page.library_listener_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn slot_is_reusable_after_teardown() {
    let page = Arc::new(SimPage::builder().build());
    let registry = SessionRegistry::new();
    let (first, task) = start(&page, &registry);

    first.notify_page(PageSignal::BeforeUnload);
    task.await.unwrap();

    let next = construct(page.clone(), &registry, LoaderConfig::default());
    assert!(next.is_new());
    assert_ne!(next.handle().id(), first.id());
}

#[tokio::test(start_paused = true)]
async fn fallback_counts_from_setup_not_construction() {
    let origin = Instant::now();
    let page = Arc::new(SimPage::builder().library_installed(false).build());
    let registry = SessionRegistry::new();
    let (_handle, task) = start(&page, &registry);

    sleep_until_ms(origin, 250).await;
    page.install_library();

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome.cause, HideCause::FallbackTimer);
    // Gate polls at 0, 100, 200 miss; 300 hits; fallback 5000ms later.
    assert_eq!(outcome.elapsed, ms(5300));
    assert_eq!(page.first(&Effect::OverlayCreated(1)), Some(ms(300)));
}

#[tokio::test(start_paused = true)]
async fn force_hide_during_readiness_wait() {
    let origin = Instant::now();
    let page = Arc::new(SimPage::builder().container_present(false).build());
    let registry = SessionRegistry::new();
    let (handle, task) = start(&page, &registry);

    sleep_until_ms(origin, 1000).await;
    assert!(handle.outcome().is_none());
    assert!(handle.force_hide());

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome.cause, HideCause::Explicit);
    assert_eq!(outcome.elapsed, ms(1000));
    assert!(!registry.is_occupied());

    // A container showing up later must not resurrect the session.
    page.insert_container();
    sleep(ms(1000)).await;
    assert!(page.overlay().is_none());
}

#[tokio::test(start_paused = true)]
async fn done_after_overlay_removed_recovers() {
    let origin = Instant::now();
    let page = Arc::new(SimPage::builder().build());
    let registry = SessionRegistry::new();
    let (_handle, task) = start(&page, &registry);

    sleep_until_ms(origin, 200).await;
    assert!(page.remove_overlay());
    sleep_until_ms(origin, 300).await;
    page.emit(LibraryEvent::Done);

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome.cause, HideCause::LibraryDone);
    assert_eq!(outcome.elapsed, ms(300));
    assert!(outcome.forced);
    assert!(!registry.is_occupied());
    assert!(!page.container().is_on_screen());
}

#[tokio::test(start_paused = true)]
async fn interleaved_events_hide_exactly_once() {
    let origin = Instant::now();
    let page = Arc::new(SimPage::builder().build());
    let registry = SessionRegistry::new();
    let (handle, _task) = start(&page, &registry);

    sleep_until_ms(origin, 100).await;
    page.emit(LibraryEvent::Start);
    page.emit(LibraryEvent::Start);
    sleep_until_ms(origin, 400).await;
    page.emit(LibraryEvent::Done);
    page.emit(LibraryEvent::Start);
    page.emit(LibraryEvent::Done);
    handle.hide();
    handle.hide();

    sleep_until_ms(origin, 6000).await;
    let outcome = handle.outcome().unwrap();
    assert_eq!(outcome.cause, HideCause::LibraryDone);
    assert_eq!(outcome.elapsed, ms(400));
    assert_eq!(page.count(&Effect::OverlayFade), 1);
    assert_eq!(page.count(&Effect::ContainerFade), 1);
    assert!(registry.is_occupied());
}

#[tokio::test(start_paused = true)]
async fn explicit_hide_beats_fallback() {
    let origin = Instant::now();
    let page = Arc::new(SimPage::builder().build());
    let registry = SessionRegistry::new();
    let (handle, _task) = start(&page, &registry);

    sleep_until_ms(origin, 1200).await;
    assert!(handle.hide());

    let outcome = handle.hidden().await.unwrap();
    assert_eq!(outcome.cause, HideCause::Explicit);
    assert_eq!(outcome.elapsed, ms(1200));
}

#[tokio::test(start_paused = true)]
async fn cosmetic_callbacks_follow_the_schedule() {
    let origin = Instant::now();
    let page = Arc::new(SimPage::builder().landing(true).build());
    let registry = SessionRegistry::new();
    let (_handle, _task) = start(&page, &registry);

    sleep_until_ms(origin, 200).await;
    page.undisplay_overlay();

    sleep_until_ms(origin, 600).await;
    assert_eq!(page.first(&Effect::Marker("loader-ready".to_string())), Some(ms(400)));
    assert!(page.overlay().unwrap().displayed);
    assert!(page
        .effects()
        .iter()
        .any(|recorded| recorded.effect == Effect::OverlayRevealed && recorded.at == ms(500)));
}

#[tokio::test(start_paused = true)]
async fn rejected_subscription_tears_session_down() {
    let page = Arc::new(SimPage::builder().build());
    page.library_handle().reject_subscriptions(true);
    let registry = SessionRegistry::new();
    let (_handle, task) = start(&page, &registry);

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome.cause, HideCause::SetupFailure);
    assert_eq!(outcome.elapsed, Duration::ZERO);
    assert!(outcome.forced);
    assert!(!registry.is_occupied());
    assert_eq!(page.first(&Effect::OverlayConcealed), Some(Duration::ZERO));
}

#[tokio::test(start_paused = true)]
async fn custom_selector_and_fallback_are_honoured() {
    let page = Arc::new(SimPage::builder().container_selector("#loader").build());
    let registry = SessionRegistry::new();
    let config = LoaderConfig::default()
        .with_container_selector("#loader")
        .with_completion_fallback(ms(3000));

    let Construction::Created { task, .. } = construct(page.clone(), &registry, config) else {
        panic!("registry should have been empty");
    };

    let outcome = task.await.unwrap().unwrap();
    assert_eq!(outcome.cause, HideCause::FallbackTimer);
    assert_eq!(outcome.elapsed, ms(3000));
    assert_eq!(page.first(&Effect::OverlayCreated(1)), Some(Duration::ZERO));
}
