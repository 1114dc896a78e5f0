use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::coordinator::FetchCoordinator;
use super::cycle::{CycleOutcome, Trigger};
use super::view_state::{ViewState, ViewStore};

/// Default period between timer-triggered refreshes.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    CycleInFlight,
}

/// A view that is currently mounted: owns its `ViewStore` and the task that
/// turns mount, timer and manual triggers into fetch cycles.
///
/// Dropping a `MountedView` unmounts it. The timer stops immediately; cycles
/// already in flight run to completion in the background and their results
/// are discarded.
pub struct MountedView {
    store: Arc<ViewStore>,
    triggers: mpsc::UnboundedSender<Trigger>,
    driver: JoinHandle<()>,
    outcomes: watch::Receiver<Option<CycleOutcome>>,
}

impl MountedView {
    /// Mount a view and start its initial fetch. An `interval` of zero
    /// disables timer-triggered refreshes.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(coordinator: FetchCoordinator, interval: Duration) -> Self {
        let store = Arc::new(ViewStore::new());
        let (triggers, rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcomes) = watch::channel(None);
        let _ = triggers.send(Trigger::Mount);

        let driver = tokio::spawn(drive(
            Arc::new(coordinator),
            Arc::downgrade(&store),
            rx,
            interval,
            outcome_tx,
        ));

        Self {
            store,
            triggers,
            driver,
            outcomes,
        }
    }

    /// Request an immediate refresh. Never blocks or queues behind a cycle
    /// already in flight.
    pub fn refresh(&self) {
        let _ = self.triggers.send(Trigger::Manual);
    }

    pub fn state(&self) -> ViewState {
        self.store.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.store.subscribe()
    }

    /// Terminal outcome of the most recently finished cycle, including
    /// superseded ones.
    pub fn outcomes(&self) -> watch::Receiver<Option<CycleOutcome>> {
        self.outcomes.clone()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        if self.store.current().has_cycle_in_flight() {
            SchedulerState::CycleInFlight
        } else {
            SchedulerState::Idle
        }
    }
}

impl Drop for MountedView {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

async fn drive(
    coordinator: Arc<FetchCoordinator>,
    store: Weak<ViewStore>,
    mut triggers: mpsc::UnboundedReceiver<Trigger>,
    interval: Duration,
    outcomes: watch::Sender<Option<CycleOutcome>>,
) {
    let mut ticker = (!interval.is_zero()).then(|| {
        let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    loop {
        let trigger = tokio::select! {
            received = triggers.recv() => match received {
                Some(trigger) => trigger,
                None => break,
            },
            _ = tick(&mut ticker) => Trigger::Timer,
        };

        let Some(strong) = store.upgrade() else {
            break;
        };
        let cycle = coordinator.begin(&strong, trigger);
        drop(strong);

        let coordinator = Arc::clone(&coordinator);
        let store = store.clone();
        let outcomes = outcomes.clone();
        tokio::spawn(async move {
            let outcome = coordinator.complete(store, cycle).await;
            outcomes.send_replace(Some(outcome));
        });
    }
    tracing::debug!("view unmounted, refresh scheduler stopped");
}

async fn tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refresh::cycle::Snapshot;
    use crate::refresh::source::{FetchPlan, RequestSpec};
    use crate::refresh::test_support::ScriptedSource;
    use crate::refresh::view_state::ViewStatus;
    use serde_json::json;

    const SUMMARY: &str = "/api/dashboard/summary";

    fn coordinator(source: Arc<ScriptedSource>) -> FetchCoordinator {
        FetchCoordinator::new(
            source,
            FetchPlan::new().with(RequestSpec::new("summary", SUMMARY)),
        )
    }

    async fn settled(view: &MountedView) -> ViewState {
        let mut rx = view.subscribe();
        rx.wait_for(|s| !s.has_cycle_in_flight() && s.latest_started() > 0)
            .await
            .unwrap()
            .clone()
    }

    #[tokio::test(start_paused = true)]
    async fn test_mount_fetches_immediately() {
        let source = Arc::new(ScriptedSource::new().respond(SUMMARY, json!({"wau": 3})));
        let view = MountedView::mount(coordinator(source.clone()), DEFAULT_REFRESH_INTERVAL);

        let state = settled(&view).await;
        assert_eq!(state.status(), ViewStatus::Ready);
        assert_eq!(
            state.snapshot().and_then(|s| s.get("summary")).cloned(),
            Some(json!({"wau": 3}))
        );
        assert_eq!(source.calls(SUMMARY), 1);
        assert_eq!(view.scheduler_state(), SchedulerState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_triggers_refresh_each_period() {
        let source = Arc::new(ScriptedSource::new().respond(SUMMARY, json!({})));
        let view = MountedView::mount(coordinator(source.clone()), Duration::from_secs(30));
        settled(&view).await;
        assert_eq!(source.calls(SUMMARY), 1);

        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(source.calls(SUMMARY), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(source.calls(SUMMARY), 2);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.calls(SUMMARY), 3);
        assert_eq!(view.state().latest_started(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_disables_timer() {
        let source = Arc::new(ScriptedSource::new().respond(SUMMARY, json!({})));
        let view = MountedView::mount(coordinator(source.clone()), Duration::ZERO);
        settled(&view).await;

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(source.calls(SUMMARY), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_refresh_does_not_wait_for_in_flight_cycle() {
        let source = Arc::new(ScriptedSource::new().respond(SUMMARY, json!({"wau": 2})));
        let first = source.gate(SUMMARY);
        let view = MountedView::mount(coordinator(source.clone()), Duration::ZERO);

        let mut rx = view.subscribe();
        rx.wait_for(|s| s.latest_started() == 1).await.unwrap();
        while source.calls(SUMMARY) == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(view.scheduler_state(), SchedulerState::CycleInFlight);

        view.refresh();
        let state = settled(&view).await;
        assert_eq!(state.latest_started(), 2);
        assert_eq!(
            state.snapshot().and_then(|s| s.get("summary")).cloned(),
            Some(json!({"wau": 2}))
        );

        let mut outcomes = view.outcomes();
        first.release(Ok(json!({"wau": 1})));
        let late = outcomes
            .wait_for(|o| o.as_ref().is_some_and(|o| o.seq() == 1))
            .await
            .unwrap()
            .clone();
        assert_eq!(late, Some(CycleOutcome::Superseded { seq: 1, newer: Some(2) }));
        assert_eq!(
            view.state().snapshot().and_then(|s| s.get("summary")).cloned(),
            Some(json!({"wau": 2}))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_refreshing_flag_only_after_first_load() {
        let source = Arc::new(ScriptedSource::new().respond(SUMMARY, json!({})));
        let first = source.gate(SUMMARY);
        let view = MountedView::mount(coordinator(source.clone()), Duration::ZERO);

        let mut rx = view.subscribe();
        let loading = rx.wait_for(|s| s.latest_started() == 1).await.unwrap().clone();
        assert!(loading.is_loading());
        assert!(!loading.is_refreshing());
        first.release(Ok(json!({})));
        settled(&view).await;

        let second = source.gate(SUMMARY);
        view.refresh();
        let refreshing = rx.wait_for(|s| s.latest_started() == 2).await.unwrap().clone();
        assert!(refreshing.is_refreshing());
        assert!(!refreshing.is_loading());
        second.release(Ok(json!({})));

        let done = settled(&view).await;
        assert!(!done.is_refreshing());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_stops_timer_and_discards_in_flight_result() {
        let source = Arc::new(ScriptedSource::new().respond(SUMMARY, json!({})));
        let gate = source.gate(SUMMARY);
        let view = MountedView::mount(coordinator(source.clone()), Duration::from_secs(30));

        let mut rx = view.subscribe();
        rx.wait_for(|s| s.latest_started() == 1).await.unwrap();
        let mut outcomes = view.outcomes();
        drop(rx);
        drop(view);

        gate.release(Ok(json!({"wau": 1})));
        let outcome = outcomes.wait_for(Option::is_some).await.unwrap().clone();
        assert_eq!(outcome, Some(CycleOutcome::Superseded { seq: 1, newer: None }));

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(source.calls(SUMMARY), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_snapshot_visible() {
        let source = Arc::new(ScriptedSource::new().respond(SUMMARY, json!({"wau": 4})));
        let view = MountedView::mount(coordinator(source.clone()), Duration::ZERO);
        let ok = settled(&view).await;

        source
            .gate(SUMMARY)
            .release(Err(crate::refresh::test_support::server_error(SUMMARY)));
        view.refresh();
        let mut rx = view.subscribe();
        let failed = rx
            .wait_for(|s| s.latest_started() == 2 && !s.has_cycle_in_flight())
            .await
            .unwrap()
            .clone();

        assert_eq!(failed.status(), ViewStatus::Stale);
        assert_eq!(failed.snapshot(), ok.snapshot());
        assert_eq!(failed.last_updated(), ok.last_updated());
        assert!(failed.snapshot().is_some_and(|s: &Snapshot| !s.is_empty()));
    }
}
