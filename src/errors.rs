//! Typed error hierarchy for copilot-pulse.
//!
//! - `FetchError`: one sub-request of a refresh cycle against the API
//! - `CycleFailure`: the single aggregate failure of a refresh cycle
//! - `DashboardError`: API handlers, storage and GitHub sync

use std::time::Duration;

use thiserror::Error;

/// Failure of a single sub-request inside a fetch cycle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("Network error requesting {path}: {message}")]
    Network { path: String, message: String },

    #[error("Server returned {status} for {path}")]
    Server { path: String, status: u16 },

    #[error("Request to {path} timed out after {after:?}")]
    Timeout { path: String, after: Duration },

    #[error("Invalid JSON from {path}: {message}")]
    Decode { path: String, message: String },
}

impl FetchError {
    pub fn path(&self) -> &str {
        match self {
            Self::Network { path, .. }
            | Self::Server { path, .. }
            | Self::Timeout { path, .. }
            | Self::Decode { path, .. } => path,
        }
    }
}

/// Aggregate outcome of a fetch cycle in which at least one sub-request failed.
///
/// Carries every sub-request error by result name so the view can surface
/// one indicator for the whole cycle.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{} of {requested} requests failed: {}", .failures.len(), describe(.failures))]
pub struct CycleFailure {
    pub requested: usize,
    pub failures: Vec<(String, FetchError)>,
}

fn describe(failures: &[(String, FetchError)]) -> String {
    failures
        .iter()
        .map(|(name, err)| format!("{}: {}", name, err))
        .collect::<Vec<_>>()
        .join("; ")
}

impl CycleFailure {
    pub fn failed_names(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|(name, _)| name.as_str())
    }
}

/// Errors from the dashboard API, storage and GitHub sync.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("User {id} not found")]
    UserNotFound { id: i64 },

    #[error("Organization {id} not found")]
    OrganizationNotFound { id: i64 },

    #[error("Metrics {id} not found")]
    MetricsNotFound { id: i64 },

    #[error("No metrics found")]
    NoMetrics,

    #[error("Username already exists: {0}")]
    DuplicateUsername(String),

    #[error("Organization already exists: {0}")]
    DuplicateOrganization(String),

    #[error("Invalid maturity level {0}: expected 0-5")]
    InvalidMaturityLevel(i64),

    #[error("Invalid window of {0} days")]
    InvalidWindow(u32),

    #[error("GitHub token and organization are required")]
    MissingGitHubCredentials,

    #[error("Token does not look like a GitHub token")]
    MalformedGitHubToken,

    #[error("GitHub API error: {0}")]
    GitHub(String),

    #[error("Database error: {0}")]
    Database(#[source] anyhow::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_server_carries_status_and_path() {
        let err = FetchError::Server {
            path: "/api/dashboard/summary".into(),
            status: 503,
        };
        assert_eq!(err.path(), "/api/dashboard/summary");
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn fetch_error_timeout_mentions_duration() {
        let err = FetchError::Timeout {
            path: "/api/dashboard/trends".into(),
            after: Duration::from_secs(30),
        };
        assert!(err.to_string().contains("30s"));
    }

    #[test]
    fn cycle_failure_lists_every_failed_result() {
        let failure = CycleFailure {
            requested: 3,
            failures: vec![
                (
                    "trends".into(),
                    FetchError::Network {
                        path: "/api/dashboard/trends".into(),
                        message: "connection refused".into(),
                    },
                ),
                (
                    "users".into(),
                    FetchError::Server {
                        path: "/api/users".into(),
                        status: 500,
                    },
                ),
            ],
        };
        let msg = failure.to_string();
        assert!(msg.starts_with("2 of 3 requests failed"));
        assert!(msg.contains("trends: Network error"));
        assert!(msg.contains("users: Server returned 500"));
        assert_eq!(failure.failed_names().collect::<Vec<_>>(), vec!["trends", "users"]);
    }

    #[test]
    fn dashboard_error_user_not_found_carries_id() {
        let err = DashboardError::UserNotFound { id: 42 };
        match &err {
            DashboardError::UserNotFound { id } => assert_eq!(*id, 42),
            _ => panic!("Expected UserNotFound"),
        }
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn dashboard_error_survives_anyhow_round_trip() {
        let err: anyhow::Error = DashboardError::DuplicateUsername("octocat".into()).into();
        match err.downcast_ref::<DashboardError>() {
            Some(DashboardError::DuplicateUsername(name)) => assert_eq!(name, "octocat"),
            other => panic!("Expected DuplicateUsername, got {:?}", other),
        }
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&FetchError::Decode {
            path: "/x".into(),
            message: "eof".into(),
        });
        assert_std_error(&CycleFailure {
            requested: 1,
            failures: vec![],
        });
        assert_std_error(&DashboardError::NoMetrics);
    }
}
