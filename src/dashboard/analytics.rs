//! Read models computed from stored rows: the dashboard summary, the
//! maturity distribution and the per-category `{summary, trends}` reports.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::models::*;
use crate::errors::DashboardError;
use crate::ratio::{mean, percentage_or_zero, round1};

/// Label used on category trend charts, e.g. "Mar 01".
fn chart_label(m: &DailyMetrics) -> String {
    m.date.format("%b %d").to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdoptionSummary {
    pub wau: i64,
    pub mau: i64,
    pub activation_rate: f64,
    pub avg_prompts_per_user: f64,
    pub total_users: i64,
    pub enabled_users: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AdoptionTrend {
    pub date: String,
    pub active_users: i64,
    pub prompts: i64,
    pub suggestions: i64,
    pub activation_rate: f64,
}

pub type AdoptionReport = CategoryReport<AdoptionSummary, AdoptionTrend>;

/// Adoption view over `metrics`, which must be ordered oldest first.
pub fn adoption_report(metrics: &[DailyMetrics]) -> AdoptionReport {
    let summary = metrics.last().map(|latest| AdoptionSummary {
        wau: latest.values.weekly_active_users,
        mau: latest.values.monthly_active_users,
        activation_rate: latest.values.activation_rate,
        avg_prompts_per_user: mean(metrics.iter().map(|m| m.values.prompts_per_user))
            .unwrap_or(0.0),
        total_users: latest.values.total_users,
        enabled_users: latest.values.enabled_users,
    });
    let trends = metrics
        .iter()
        .map(|m| AdoptionTrend {
            date: chart_label(m),
            active_users: m.values.active_users,
            prompts: m.values.prompts_per_user as i64,
            suggestions: m.values.total_suggestions_shown,
            activation_rate: m.values.activation_rate,
        })
        .collect();
    CategoryReport { summary, trends }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductivitySummary {
    pub total_ai_commits: i64,
    pub total_ai_prs: i64,
    pub avg_acceptance_rate: f64,
    pub total_lines_generated: i64,
    pub total_suggestions: i64,
    pub total_accepted: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductivityTrend {
    pub date: String,
    pub suggestions_shown: i64,
    pub suggestions_accepted: i64,
    pub acceptance_rate: f64,
    pub ai_commits: i64,
    pub ai_prs: i64,
    pub lines_generated: i64,
}

pub type ProductivityReport = CategoryReport<ProductivitySummary, ProductivityTrend>;

pub fn productivity_report(metrics: &[DailyMetrics]) -> ProductivityReport {
    let summary = mean(metrics.iter().map(|m| m.values.acceptance_rate)).map(|avg_acceptance| {
        ProductivitySummary {
            total_ai_commits: metrics.iter().map(|m| m.values.ai_assisted_commits).sum(),
            total_ai_prs: metrics.iter().map(|m| m.values.ai_assisted_prs).sum(),
            avg_acceptance_rate: avg_acceptance,
            total_lines_generated: metrics.iter().map(|m| m.values.ai_code_lines).sum(),
            total_suggestions: metrics.iter().map(|m| m.values.total_suggestions_shown).sum(),
            total_accepted: metrics
                .iter()
                .map(|m| m.values.total_suggestions_accepted)
                .sum(),
        }
    });
    let trends = metrics
        .iter()
        .map(|m| ProductivityTrend {
            date: chart_label(m),
            suggestions_shown: m.values.total_suggestions_shown,
            suggestions_accepted: m.values.total_suggestions_accepted,
            acceptance_rate: m.values.acceptance_rate,
            ai_commits: m.values.ai_assisted_commits,
            ai_prs: m.values.ai_assisted_prs,
            lines_generated: m.values.ai_code_lines,
        })
        .collect();
    CategoryReport { summary, trends }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualitySummary {
    pub avg_retention_rate: f64,
    pub avg_modification_rate: f64,
    pub avg_bug_rate: f64,
    pub avg_pr_rejection_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QualityTrend {
    pub date: String,
    pub retention_rate: f64,
    pub modification_rate: f64,
    pub bug_rate: f64,
    pub pr_rejection_rate: f64,
}

pub type QualityReport = CategoryReport<QualitySummary, QualityTrend>;

pub fn quality_report(metrics: &[DailyMetrics]) -> QualityReport {
    let avg = |f: fn(&MetricValues) -> f64| mean(metrics.iter().map(|m| f(&m.values)));
    let summary = (!metrics.is_empty()).then(|| QualitySummary {
        avg_retention_rate: avg(|v| v.ai_code_retention_rate).unwrap_or(0.0),
        avg_modification_rate: avg(|v| v.ai_code_modification_rate).unwrap_or(0.0),
        avg_bug_rate: avg(|v| v.ai_code_bug_rate).unwrap_or(0.0),
        avg_pr_rejection_rate: avg(|v| v.pr_rejection_rate).unwrap_or(0.0),
    });
    let trends = metrics
        .iter()
        .map(|m| QualityTrend {
            date: chart_label(m),
            retention_rate: m.values.ai_code_retention_rate,
            modification_rate: m.values.ai_code_modification_rate,
            bug_rate: m.values.ai_code_bug_rate,
            pr_rejection_rate: m.values.pr_rejection_rate,
        })
        .collect();
    CategoryReport { summary, trends }
}

/// Inputs to the dashboard summary, gathered from the database.
pub struct SummaryInputs<'a> {
    pub latest: Option<&'a DailyMetrics>,
    pub total_users: i64,
    pub enabled_users: i64,
    pub active_users: i64,
    pub maturity: &'a BTreeMap<i64, i64>,
    pub kpis: &'a [Kpi],
}

/// Headline numbers. Counters without a latest metrics row report zero.
pub fn dashboard_summary(inputs: SummaryInputs<'_>) -> DashboardSummary {
    let level = |l: i64| inputs.maturity.get(&l).copied().unwrap_or(0);
    let mut summary = DashboardSummary {
        total_users: inputs.total_users,
        enabled_users: inputs.enabled_users,
        active_users: inputs.active_users,
        activation_rate: round1(percentage_or_zero(
            inputs.active_users as f64,
            inputs.enabled_users as f64,
        )),
        l0_count: level(0),
        l1_count: level(1),
        l2_count: level(2),
        l3_count: level(3),
        l4_count: level(4),
        l5_count: level(5),
        kpis: inputs
            .kpis
            .iter()
            .map(|k| {
                (
                    k.name.clone(),
                    KpiStatus {
                        target: k.target,
                        current: k.current,
                        achieved: k.achieved,
                    },
                )
            })
            .collect(),
        language_breakdown: json!({}),
        editor_breakdown: json!({}),
        ..Default::default()
    };

    if let Some(latest) = inputs.latest {
        let v = &latest.values;
        summary.weekly_active_users = v.weekly_active_users;
        summary.monthly_active_users = v.monthly_active_users;
        summary.acceptance_rate = v.acceptance_rate;
        summary.prompts_per_user = v.prompts_per_user;
        summary.features_utilized = v.features_utilized;
        summary.team_activation_rate = v.team_activation_rate;
        summary.total_suggestions = v.total_suggestions_shown;
        summary.accepted_suggestions = v.total_suggestions_accepted;
        summary.chat_interactions = v.total_chat_interactions;
        summary.ai_assisted_commits = v.ai_assisted_commits;
        summary.ai_assisted_prs = v.ai_assisted_prs;
        summary.ai_code_lines = v.ai_code_lines;
        summary.code_retention_rate = v.ai_code_retention_rate;
        summary.modification_rate = v.ai_code_modification_rate;
        summary.bug_rate = v.ai_code_bug_rate;
        summary.pr_rejection_rate = v.pr_rejection_rate;
        summary.language_breakdown = v.language_breakdown.clone().unwrap_or_else(|| json!({}));
        summary.editor_breakdown = v.editor_breakdown.clone().unwrap_or_else(|| json!({}));
    }
    summary
}

/// All six maturity levels, including empty ones, in ladder order.
pub fn maturity_distribution(counts: &BTreeMap<i64, i64>) -> Vec<MaturityBucket> {
    MaturityLevel::ALL
        .iter()
        .map(|level| MaturityBucket {
            level: level.as_i64(),
            name: level.name().to_string(),
            description: level.description().to_string(),
            color: level.color().to_string(),
            count: counts.get(&level.as_i64()).copied().unwrap_or(0),
        })
        .collect()
}

/// Only levels that have users, labelled "L2 - Active User".
pub fn maturity_counts(counts: &BTreeMap<i64, i64>) -> Vec<MaturityCount> {
    counts
        .iter()
        .map(|(&level, &count)| {
            let name = match MaturityLevel::try_from(level) {
                Ok(l) => format!("{} - {}", l.name(), l.description()),
                Err(_) => format!("L{}", level),
            };
            MaturityCount { level, name, count }
        })
        .collect()
}

/// First day of a `days`-long window ending on `today`.
pub fn window_start(today: NaiveDate, days: u32) -> Result<NaiveDate, DashboardError> {
    today
        .checked_sub_days(Days::new(u64::from(days)))
        .ok_or(DashboardError::InvalidWindow(days))
}

/// Stored KPIs, or the four phase defaults when none are stored.
pub fn kpis_or_defaults(stored: Vec<Kpi>) -> Vec<Kpi> {
    if stored.is_empty() {
        Kpi::defaults()
    } else {
        stored
    }
}
