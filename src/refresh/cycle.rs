use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::errors::CycleFailure;

/// What started a fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Mount,
    Timer,
    Manual,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mount => "mount",
            Self::Timer => "timer",
            Self::Manual => "manual",
        }
    }
}

/// Immutable, fully-populated bundle of named results from one fetch cycle.
///
/// Cloning is cheap; every clone shares the same results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    results: Arc<BTreeMap<String, Value>>,
}

impl Snapshot {
    pub fn new(results: BTreeMap<String, Value>) -> Self {
        Self {
            results: Arc::new(results),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.results.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// The snapshot as a single JSON object keyed by result name.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.results
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl FromIterator<(String, Value)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// One attempt to refresh a view's snapshot.
#[derive(Debug, Clone)]
pub struct FetchCycle {
    pub seq: u64,
    pub trigger: Trigger,
    pub started_at: DateTime<Utc>,
    /// Result names still owed by this cycle.
    pub pending: Vec<String>,
}

/// Terminal outcome of a fetch cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Succeeded { seq: u64 },
    Failed { seq: u64, failure: CycleFailure },
    /// Result discarded without touching the view. `newer` is the sequence
    /// number that won, or `None` when the view was unmounted.
    Superseded { seq: u64, newer: Option<u64> },
}

impl CycleOutcome {
    pub fn seq(&self) -> u64 {
        match self {
            Self::Succeeded { seq } | Self::Failed { seq, .. } | Self::Superseded { seq, .. } => {
                *seq
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "succeeded",
            Self::Failed { .. } => "failed",
            Self::Superseded { .. } => "superseded",
        }
    }
}
