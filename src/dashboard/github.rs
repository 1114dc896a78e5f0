use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::DashboardError;

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";
const USER_AGENT: &str = "copilot-pulse";
const API_VERSION: &str = "2022-11-28";
const PAGE_SIZE: usize = 100;

/// Known GitHub token prefixes.
/// See: https://github.blog/2021-04-05-behind-githubs-new-authentication-token-formats/
const GITHUB_TOKEN_PREFIXES: &[&str] = &[
    "ghp_",        // Personal access tokens (classic)
    "github_pat_", // Fine-grained personal access tokens
    "gho_",        // OAuth access tokens
    "ghu_",        // GitHub App user-to-server tokens
    "ghs_",        // GitHub App server-to-server tokens
    "ghr_",        // GitHub App refresh tokens
];

/// Format check only; says nothing about whether the token is live or has
/// the `read:org` and `copilot` scopes.
pub fn is_valid_github_token(token: &str) -> bool {
    !token.is_empty()
        && GITHUB_TOKEN_PREFIXES
            .iter()
            .any(|prefix| token.starts_with(prefix))
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct SeatBreakdown {
    #[serde(default)]
    pub total: i64,
    #[serde(default)]
    pub active_this_cycle: i64,
}

/// `GET /orgs/{org}/copilot/billing` (subset).
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct CopilotBilling {
    #[serde(default)]
    pub seat_breakdown: SeatBreakdown,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SeatAssignee {
    pub login: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CopilotSeat {
    pub assignee: SeatAssignee,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct SeatsPage {
    #[serde(default)]
    seats: Vec<CopilotSeat>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct OrgMember {
    pub login: String,
}

/// One day of `GET /orgs/{org}/copilot/usage`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct UsageDay {
    pub day: String,
    #[serde(default)]
    pub total_suggestions_count: i64,
    #[serde(default)]
    pub total_acceptances_count: i64,
    #[serde(default)]
    pub total_lines_suggested: i64,
    #[serde(default)]
    pub total_lines_accepted: i64,
    #[serde(default)]
    pub total_active_users: i64,
}

impl UsageDay {
    /// `day` may carry a time suffix; only the date part is used.
    pub fn date(&self) -> anyhow::Result<NaiveDate> {
        let prefix = self.day.get(..10).unwrap_or(&self.day);
        NaiveDate::parse_from_str(prefix, "%Y-%m-%d")
            .with_context(|| format!("Invalid usage day: {}", self.day))
    }
}

/// Client for the organization-level Copilot REST endpoints.
#[derive(Clone)]
pub struct CopilotClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    org: String,
}

impl CopilotClient {
    /// Rejects tokens without a known GitHub prefix before any network call.
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        org: impl Into<String>,
    ) -> Result<Self, DashboardError> {
        let token = token.into();
        let org = org.into();
        if token.is_empty() || org.is_empty() {
            return Err(DashboardError::MissingGitHubCredentials);
        }
        if !is_valid_github_token(&token) {
            return Err(DashboardError::MalformedGitHubToken);
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            org,
        })
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}/orgs/{}{}", self.base_url, self.org, path))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", USER_AGENT)
    }

    pub async fn billing(&self) -> anyhow::Result<CopilotBilling> {
        self.get("/copilot/billing")
            .send()
            .await
            .context("Failed to send Copilot billing request to GitHub")?
            .error_for_status()
            .context("GitHub Copilot billing API returned error status")?
            .json()
            .await
            .context("Failed to parse Copilot billing response from GitHub")
    }

    /// Logins holding a Copilot seat. Paginates through all pages.
    pub async fn seat_holders(&self) -> anyhow::Result<Vec<String>> {
        let mut logins = Vec::new();
        let mut page = 1u32;
        loop {
            let resp: SeatsPage = self
                .get("/copilot/billing/seats")
                .query(&[("per_page", PAGE_SIZE.to_string()), ("page", page.to_string())])
                .send()
                .await
                .context("Failed to send Copilot seats request to GitHub")?
                .error_for_status()
                .context("GitHub Copilot seats API returned error status")?
                .json()
                .await
                .context("Failed to parse Copilot seats response from GitHub")?;

            let count = resp.seats.len();
            logins.extend(resp.seats.into_iter().map(|s| s.assignee.login));
            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(logins)
    }

    /// All organization members. Paginates through all pages.
    pub async fn members(&self) -> anyhow::Result<Vec<OrgMember>> {
        let mut members = Vec::new();
        let mut page = 1u32;
        loop {
            let resp: Vec<OrgMember> = self
                .get("/members")
                .query(&[("per_page", PAGE_SIZE.to_string()), ("page", page.to_string())])
                .send()
                .await
                .context("Failed to send members request to GitHub")?
                .error_for_status()
                .context("GitHub members API returned error status")?
                .json()
                .await
                .context("Failed to parse members response from GitHub")?;

            let count = resp.len();
            members.extend(resp);
            if count < PAGE_SIZE {
                break;
            }
            page += 1;
        }
        Ok(members)
    }

    /// Daily usage since `since`. Only available on Copilot Enterprise.
    pub async fn usage(&self, since: NaiveDate) -> anyhow::Result<Vec<UsageDay>> {
        self.get("/copilot/usage")
            .query(&[("since", since.format("%Y-%m-%d").to_string())])
            .send()
            .await
            .context("Failed to send Copilot usage request to GitHub")?
            .error_for_status()
            .context("GitHub Copilot usage API returned error status")?
            .json()
            .await
            .context("Failed to parse Copilot usage response from GitHub")
    }
}
