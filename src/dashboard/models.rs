use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DashboardError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Organization {
    pub id: i64,
    pub github_org: String,
    pub name: Option<String>,
    pub total_seats: i64,
    pub copilot_seats: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOrganization {
    pub github_org: String,
    pub name: Option<String>,
    #[serde(default)]
    pub total_seats: i64,
    #[serde(default)]
    pub copilot_seats: i64,
}

/// Copilot maturity ladder, L0 (not enabled) through L5 (value user).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum MaturityLevel {
    L0,
    L1,
    L2,
    L3,
    L4,
    L5,
}

impl MaturityLevel {
    pub const ALL: [MaturityLevel; 6] = [
        Self::L0,
        Self::L1,
        Self::L2,
        Self::L3,
        Self::L4,
        Self::L5,
    ];

    pub fn as_i64(&self) -> i64 {
        *self as i64
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::L0 => "L0",
            Self::L1 => "L1",
            Self::L2 => "L2",
            Self::L3 => "L3",
            Self::L4 => "L4",
            Self::L5 => "L5",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::L0 => "Not Enabled",
            Self::L1 => "Enabled",
            Self::L2 => "Active User",
            Self::L3 => "Working User",
            Self::L4 => "Consistent User",
            Self::L5 => "Value User",
        }
    }

    /// Chart colour for the distribution view.
    pub fn color(&self) -> &'static str {
        match self {
            Self::L0 => "#ea4335",
            Self::L1 => "#fbbc05",
            Self::L2 => "#34a853",
            Self::L3 => "#4285f4",
            Self::L4 => "#9c27b0",
            Self::L5 => "#00bcd4",
        }
    }

    /// Users at L2 and above count as weekly active.
    pub fn is_weekly_active(&self) -> bool {
        *self >= Self::L2
    }

    /// Users at L1 and above count as monthly active.
    pub fn is_monthly_active(&self) -> bool {
        *self >= Self::L1
    }
}

impl TryFrom<i64> for MaturityLevel {
    type Error = DashboardError;

    fn try_from(level: i64) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Self::L0),
            1 => Ok(Self::L1),
            2 => Ok(Self::L2),
            3 => Ok(Self::L3),
            4 => Ok(Self::L4),
            5 => Ok(Self::L5),
            other => Err(DashboardError::InvalidMaturityLevel(other)),
        }
    }
}

impl From<MaturityLevel> for i64 {
    fn from(level: MaturityLevel) -> Self {
        level.as_i64()
    }
}

impl FromStr for MaturityLevel {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches(['L', 'l']);
        let level: i64 = digits
            .parse()
            .map_err(|_| DashboardError::InvalidMaturityLevel(-1))?;
        Self::try_from(level)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: i64,
    pub github_username: String,
    pub organization_id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub team: Option<String>,
    pub maturity_level: MaturityLevel,
    pub copilot_enabled: bool,
    pub is_weekly_active: bool,
    pub is_monthly_active: bool,
    /// Mirrors `copilot_enabled`; the web front-end reads this name.
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub github_username: String,
    pub organization_id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub team: Option<String>,
    #[serde(default)]
    pub maturity_level: Option<i64>,
    pub copilot_enabled: Option<bool>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub github_username: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub team: Option<String>,
    pub maturity_level: Option<i64>,
    pub copilot_enabled: Option<bool>,
    /// Alias for `copilot_enabled`; wins when both are sent.
    pub is_active: Option<bool>,
    pub is_weekly_active: Option<bool>,
    pub is_monthly_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    pub org_id: Option<i64>,
    pub team: Option<String>,
    pub maturity_level: Option<i64>,
    #[serde(default)]
    pub active_only: bool,
}

/// Daily counters shared by stored rows and the upsert payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricValues {
    // Adoption
    pub total_users: i64,
    pub enabled_users: i64,
    pub active_users: i64,
    pub weekly_active_users: i64,
    pub monthly_active_users: i64,
    pub activation_rate: f64,
    pub prompts_per_user: f64,
    pub features_utilized: i64,
    pub team_activation_rate: f64,
    // Productivity
    pub total_suggestions_shown: i64,
    pub total_suggestions_accepted: i64,
    pub acceptance_rate: f64,
    pub total_lines_suggested: i64,
    pub total_lines_accepted: i64,
    pub total_chat_interactions: i64,
    pub ai_assisted_commits: i64,
    pub ai_assisted_prs: i64,
    pub total_commits: i64,
    pub total_prs: i64,
    pub ai_code_lines: i64,
    // Quality
    pub ai_code_retention_rate: f64,
    pub ai_code_modification_rate: f64,
    pub ai_code_bug_rate: f64,
    pub pr_rejection_rate: f64,
    // Breakdowns, e.g. {"Rust": 40, "Python": 30}
    pub language_breakdown: Option<Value>,
    pub editor_breakdown: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailyMetrics {
    pub id: i64,
    pub organization_id: Option<i64>,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub values: MetricValues,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDailyMetrics {
    pub organization_id: i64,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub values: MetricValues,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsWindow {
    pub days: Option<u32>,
    pub org_id: Option<i64>,
}

impl MetricsWindow {
    pub fn days_or_default(&self) -> u32 {
        self.days.unwrap_or(crate::refresh::DEFAULT_TREND_DAYS)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiCategory {
    Adoption,
    Productivity,
    Quality,
}

impl KpiCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adoption => "adoption",
            Self::Productivity => "productivity",
            Self::Quality => "quality",
        }
    }
}

impl FromStr for KpiCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "adoption" => Ok(Self::Adoption),
            "productivity" => Ok(Self::Productivity),
            "quality" => Ok(Self::Quality),
            _ => Err(format!("Invalid KPI category: {}", s)),
        }
    }
}

/// Phase-progression KPI as the API reports it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Kpi {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub phase: i64,
    pub name: String,
    pub category: KpiCategory,
    pub target: f64,
    pub current: f64,
    pub achieved: bool,
}

impl Kpi {
    /// Phase 1-4 targets reported before any KPI has been measured.
    pub fn defaults() -> Vec<Kpi> {
        [
            (1, "Activation Rate", KpiCategory::Adoption, 60.0),
            (2, "Work Linkage", KpiCategory::Productivity, 50.0),
            (3, "Consistency Score", KpiCategory::Productivity, 40.0),
            (4, "KOIs Achieved", KpiCategory::Quality, 8.0),
        ]
        .into_iter()
        .map(|(phase, name, category, target)| Kpi {
            id: None,
            phase,
            name: name.to_string(),
            category,
            target,
            current: 0.0,
            achieved: false,
        })
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiStatus {
    pub target: f64,
    pub current: f64,
    pub achieved: bool,
}

/// Headline numbers for the dashboard landing view.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DashboardSummary {
    pub total_users: i64,
    pub enabled_users: i64,
    pub active_users: i64,
    pub weekly_active_users: i64,
    pub monthly_active_users: i64,

    pub activation_rate: f64,
    pub acceptance_rate: f64,
    pub prompts_per_user: f64,
    pub features_utilized: i64,
    pub team_activation_rate: f64,

    pub total_suggestions: i64,
    pub accepted_suggestions: i64,
    pub chat_interactions: i64,
    pub ai_assisted_commits: i64,
    pub ai_assisted_prs: i64,
    pub ai_code_lines: i64,

    pub code_retention_rate: f64,
    pub modification_rate: f64,
    pub bug_rate: f64,
    pub pr_rejection_rate: f64,

    pub l0_count: i64,
    pub l1_count: i64,
    pub l2_count: i64,
    pub l3_count: i64,
    pub l4_count: i64,
    pub l5_count: i64,

    pub kpis: BTreeMap<String, KpiStatus>,
    pub language_breakdown: Value,
    pub editor_breakdown: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub active_users: i64,
    pub activation_rate: f64,
    pub weekly_active_users: i64,
    pub acceptance_rate: f64,
    pub suggestions_shown: i64,
    pub suggestions_accepted: i64,
    pub chat_interactions: i64,
    pub ai_assisted_commits: i64,
    pub ai_code_lines: i64,
    pub code_retention_rate: f64,
    pub modification_rate: f64,
}

impl From<&DailyMetrics> for TrendPoint {
    fn from(m: &DailyMetrics) -> Self {
        let v = &m.values;
        Self {
            date: m.date,
            active_users: v.active_users,
            activation_rate: v.activation_rate,
            weekly_active_users: v.weekly_active_users,
            acceptance_rate: v.acceptance_rate,
            suggestions_shown: v.total_suggestions_shown,
            suggestions_accepted: v.total_suggestions_accepted,
            chat_interactions: v.total_chat_interactions,
            ai_assisted_commits: v.ai_assisted_commits,
            ai_code_lines: v.ai_code_lines,
            code_retention_rate: v.ai_code_retention_rate,
            modification_rate: v.ai_code_modification_rate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaturityBucket {
    pub level: i64,
    pub name: String,
    pub description: String,
    pub color: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaturityCount {
    pub level: i64,
    pub name: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamBreakdown {
    pub team: String,
    pub total_users: i64,
    pub enabled_users: i64,
    pub active_users: i64,
    pub avg_maturity: f64,
    pub activation_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TeamStats {
    pub team: String,
    pub count: i64,
    pub avg_maturity: f64,
}

/// `{summary, trends}` payload of the per-category metrics endpoints.
/// `summary` is `null` when the window holds no data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryReport<S, T> {
    pub summary: Option<S>,
    pub trends: Vec<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncRequest {
    pub token: Option<String>,
    pub org: Option<String>,
    #[serde(default = "default_true")]
    pub sync_users: bool,
    #[serde(default = "default_true")]
    pub sync_metrics: bool,
    #[serde(default = "default_sync_days")]
    pub days: u32,
}

impl Default for SyncRequest {
    fn default() -> Self {
        Self {
            token: None,
            org: None,
            sync_users: true,
            sync_metrics: true,
            days: default_sync_days(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_sync_days() -> u32 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncReport {
    pub success: bool,
    pub message: String,
    pub org_name: Option<String>,
    pub users_synced: u64,
    pub metrics_synced: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
    pub members_count: usize,
}
