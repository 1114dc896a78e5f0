use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;

use super::cycle::{CycleOutcome, FetchCycle, Snapshot, Trigger};
use super::source::{FetchPlan, RemoteSource};
use super::view_state::ViewStore;
use crate::errors::{CycleFailure, FetchError};

/// Default per-request timeout; the same order as the refresh period.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes one view's `FetchPlan` and commits or discards the result.
pub struct FetchCoordinator {
    source: Arc<dyn RemoteSource>,
    plan: FetchPlan,
    request_timeout: Duration,
}

impl FetchCoordinator {
    pub fn new(source: Arc<dyn RemoteSource>, plan: FetchPlan) -> Self {
        Self {
            source,
            plan,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn plan(&self) -> &FetchPlan {
        &self.plan
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Start a new cycle against `store`, superseding any cycle in flight.
    pub fn begin(&self, store: &ViewStore, trigger: Trigger) -> FetchCycle {
        let seq = store.begin_cycle();
        tracing::debug!(seq, trigger = trigger.as_str(), "fetch cycle started");
        FetchCycle {
            seq,
            trigger,
            started_at: Utc::now(),
            pending: self.plan.names(),
        }
    }

    /// Issue every sub-request concurrently and wait for all of them to
    /// settle. Any failure fails the whole cycle; no partial snapshot is
    /// ever produced.
    pub async fn fetch(&self, cycle: &FetchCycle) -> Result<Snapshot, CycleFailure> {
        let timeout = self.request_timeout;
        let requests = self.plan.requests().iter().map(|request| async move {
            let result = match tokio::time::timeout(timeout, self.source.fetch(request)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout {
                    path: request.path().to_string(),
                    after: timeout,
                }),
            };
            (request.name().to_string(), result)
        });

        let settled = join_all(requests).await;

        let mut results = BTreeMap::new();
        let mut failures = Vec::new();
        for (name, result) in settled {
            match result {
                Ok(value) => {
                    results.insert(name, value);
                }
                Err(e) => failures.push((name, e)),
            }
        }

        if failures.is_empty() {
            Ok(Snapshot::new(results))
        } else {
            tracing::debug!(seq = cycle.seq, failed = failures.len(), "fetch cycle had failures");
            Err(CycleFailure {
                requested: self.plan.len(),
                failures,
            })
        }
    }

    /// Run `cycle` to completion and commit its result into the view, unless
    /// a newer cycle has started or the view has been unmounted.
    ///
    /// Holds only a weak reference while the requests are outstanding so an
    /// unmounted view is never kept alive by its in-flight cycles.
    pub async fn complete(&self, store: Weak<ViewStore>, cycle: FetchCycle) -> CycleOutcome {
        let seq = cycle.seq;
        let result = self.fetch(&cycle).await;

        let Some(store) = store.upgrade() else {
            tracing::debug!(seq, "view unmounted, discarding fetch cycle");
            return CycleOutcome::Superseded { seq, newer: None };
        };

        match result {
            Ok(snapshot) => {
                if store.commit(seq, snapshot, Utc::now()) {
                    tracing::debug!(seq, "fetch cycle committed");
                    CycleOutcome::Succeeded { seq }
                } else {
                    superseded(&store, seq)
                }
            }
            Err(failure) => {
                if store.commit_failure(seq, failure.clone()) {
                    tracing::warn!(seq, trigger = cycle.trigger.as_str(), "refresh failed: {}", failure);
                    CycleOutcome::Failed { seq, failure }
                } else {
                    superseded(&store, seq)
                }
            }
        }
    }

    /// `begin` + `complete` for callers that own the store and want to await
    /// a single cycle inline.
    pub async fn run_once(&self, store: &Arc<ViewStore>, trigger: Trigger) -> CycleOutcome {
        let cycle = self.begin(store, trigger);
        self.complete(Arc::downgrade(store), cycle).await
    }
}

fn superseded(store: &ViewStore, seq: u64) -> CycleOutcome {
    let newer = store.current().latest_started();
    tracing::debug!(seq, newer, "fetch cycle superseded, discarding");
    CycleOutcome::Superseded {
        seq,
        newer: Some(newer),
    }
}
