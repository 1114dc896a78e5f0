use chrono::{DateTime, Utc};
use tokio::sync::watch;

use super::cycle::Snapshot;
use crate::errors::CycleFailure;

/// What a view should present, derived from its `ViewState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    /// No cycle has reached a terminal outcome yet.
    Loading,
    /// The first load failed and there is nothing to show.
    Unavailable,
    /// Showing the last committed snapshot.
    Ready,
    /// Showing the last committed snapshot; the latest refresh failed.
    Stale,
}

/// Per-view memory: last committed snapshot plus loading/refreshing flags.
#[derive(Debug, Clone)]
pub struct ViewState {
    snapshot: Option<Snapshot>,
    is_loading: bool,
    is_refreshing: bool,
    last_updated: Option<DateTime<Utc>>,
    last_error: Option<CycleFailure>,
    latest_started: u64,
    latest_settled: u64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            snapshot: None,
            is_loading: true,
            is_refreshing: false,
            last_updated: None,
            last_error: None,
            latest_started: 0,
            latest_settled: 0,
        }
    }
}

impl ViewState {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_refreshing(&self) -> bool {
        self.is_refreshing
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Failure of the most recent terminal cycle, cleared by the next commit.
    pub fn last_error(&self) -> Option<&CycleFailure> {
        self.last_error.as_ref()
    }

    /// Highest sequence number ever started for this view.
    pub fn latest_started(&self) -> u64 {
        self.latest_started
    }

    /// True while the most recently started cycle has not settled.
    pub fn has_cycle_in_flight(&self) -> bool {
        self.latest_started > self.latest_settled
    }

    pub fn status(&self) -> ViewStatus {
        match (&self.snapshot, &self.last_error) {
            _ if self.is_loading => ViewStatus::Loading,
            (None, _) => ViewStatus::Unavailable,
            (Some(_), Some(_)) => ViewStatus::Stale,
            (Some(_), None) => ViewStatus::Ready,
        }
    }
}

/// Single source of truth for one mounted view.
///
/// Every mutation runs inside the `watch` channel's write lock, so the
/// sequence check and the write it guards cannot interleave with another
/// cycle's. Subscribers are notified only when something actually changed.
#[derive(Debug)]
pub struct ViewStore {
    tx: watch::Sender<ViewState>,
}

impl Default for ViewStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ViewState::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ViewState {
        self.tx.borrow().clone()
    }

    /// Allocate the next sequence number. Raises `is_refreshing` unless the
    /// view is still on its initial load.
    pub fn begin_cycle(&self) -> u64 {
        let mut seq = 0;
        self.tx.send_modify(|state| {
            state.latest_started += 1;
            seq = state.latest_started;
            if !state.is_loading {
                state.is_refreshing = true;
            }
        });
        seq
    }

    /// Replace the snapshot wholesale if `seq` is still the newest cycle.
    /// Returns `false` (and changes nothing) when a newer cycle has started.
    pub fn commit(&self, seq: u64, snapshot: Snapshot, at: DateTime<Utc>) -> bool {
        self.tx.send_if_modified(|state| {
            if seq != state.latest_started {
                return false;
            }
            state.snapshot = Some(snapshot);
            state.last_updated = Some(at);
            state.last_error = None;
            state.is_loading = false;
            state.is_refreshing = false;
            state.latest_settled = seq;
            true
        })
    }

    /// Record a failed cycle if `seq` is still the newest. The snapshot and
    /// `last_updated` are left untouched.
    pub fn commit_failure(&self, seq: u64, failure: CycleFailure) -> bool {
        self.tx.send_if_modified(|state| {
            if seq != state.latest_started {
                return false;
            }
            state.last_error = Some(failure);
            state.is_loading = false;
            state.is_refreshing = false;
            state.latest_settled = seq;
            true
        })
    }
}
