use std::fmt;
use std::str::FromStr;

use anyhow::bail;

use super::source::{FetchPlan, RequestSpec};

/// Default trailing window, in days, for time-series requests.
pub const DEFAULT_TREND_DAYS: u32 = 30;

/// The dashboard's views, each with its own declarative fetch plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Dashboard,
    Adoption,
    Productivity,
    Quality,
    Users,
}

impl ViewKind {
    pub fn all() -> &'static [ViewKind] {
        &[
            Self::Dashboard,
            Self::Adoption,
            Self::Productivity,
            Self::Quality,
            Self::Users,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dashboard => "dashboard",
            Self::Adoption => "adoption",
            Self::Productivity => "productivity",
            Self::Quality => "quality",
            Self::Users => "users",
        }
    }

    /// Sub-requests fetched together on every refresh of this view.
    pub fn plan(&self, days: u32) -> FetchPlan {
        match self {
            Self::Dashboard => FetchPlan::new()
                .with(RequestSpec::new("summary", "/api/dashboard/summary"))
                .with(RequestSpec::new("trends", "/api/dashboard/trends").with_query("days", days))
                .with(RequestSpec::new(
                    "maturity",
                    "/api/dashboard/maturity-distribution",
                )),
            Self::Adoption | Self::Productivity | Self::Quality => FetchPlan::new().with(
                RequestSpec::new("metrics", format!("/api/metrics/{}", self.as_str()))
                    .with_query("days", days),
            ),
            Self::Users => FetchPlan::new()
                .with(RequestSpec::new("users", "/api/users"))
                .with(RequestSpec::new("by_team", "/api/users/stats/by-team")),
        }
    }
}

impl fmt::Display for ViewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "dashboard" => Ok(Self::Dashboard),
            "adoption" => Ok(Self::Adoption),
            "productivity" => Ok(Self::Productivity),
            "quality" => Ok(Self::Quality),
            "users" => Ok(Self::Users),
            other => bail!("Unknown view: {}", other),
        }
    }
}
