//! Deterministic sample data for demos and local development.

use anyhow::Result;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde_json::json;

use super::db::DashboardDb;
use super::models::*;

const SAMPLE_DAYS: i64 = 30;

/// `(username, name, team, maturity level)`
const SAMPLE_USERS: &[(&str, &str, &str, i64)] = &[
    ("rahul.sharma", "Rahul Sharma", "Backend", 4),
    ("priya.patel", "Priya Patel", "Frontend", 3),
    ("amit.kumar", "Amit Kumar", "Platform", 5),
    ("sneha.gupta", "Sneha Gupta", "DevOps", 2),
    ("vikram.singh", "Vikram Singh", "QA", 1),
    ("arjun.menon", "Arjun Menon", "Backend", 3),
    ("meera.krishnan", "Meera Krishnan", "Frontend", 2),
    ("suresh.rajan", "Suresh Rajan", "Platform", 4),
    ("nisha.rao", "Nisha Rao", "DevOps", 0),
    ("rajesh.verma", "Rajesh Verma", "QA", 3),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub metric_days: usize,
    pub kpis: usize,
}

/// Populate an empty database. Returns `None` without touching anything when
/// the database already holds data.
pub fn seed_if_empty(db: &DashboardDb, today: NaiveDate) -> Result<Option<SeedReport>> {
    if !db.is_empty()? {
        tracing::debug!("database not empty, skipping sample data");
        return Ok(None);
    }

    let org = db.create_organization(&NewOrganization {
        github_org: "demo-org".to_string(),
        name: Some("Demo Organization".to_string()),
        total_seats: 50,
        copilot_seats: 25,
    })?;

    for &(username, name, team, level) in SAMPLE_USERS {
        db.create_user(&NewUser {
            github_username: username.to_string(),
            organization_id: Some(org.id),
            name: Some(name.to_string()),
            email: Some(format!("{}@example.com", username)),
            team: Some(team.to_string()),
            maturity_level: Some(level),
            copilot_enabled: Some(level > 0),
            is_active: None,
        })?;
    }

    for offset in 0..SAMPLE_DAYS {
        let date = today - Duration::days(offset);
        db.upsert_metrics(&NewDailyMetrics {
            organization_id: org.id,
            date,
            values: sample_values(date, offset),
        })?;
    }

    let kpis = sample_kpis();
    for kpi in &kpis {
        db.insert_kpi(kpi, Some(today))?;
    }

    let report = SeedReport {
        users: SAMPLE_USERS.len(),
        metric_days: SAMPLE_DAYS as usize,
        kpis: kpis.len(),
    };
    tracing::info!(
        users = report.users,
        metric_days = report.metric_days,
        kpis = report.kpis,
        "seeded sample data"
    );
    Ok(Some(report))
}

/// Day-to-day variation comes from the offset so reseeding gives the same rows.
fn sample_values(date: NaiveDate, offset: i64) -> MetricValues {
    let wobble = (offset * 7) % 5 - 2;
    let weekend = matches!(date.weekday(), Weekday::Sat | Weekday::Sun);

    let mut active = 7 + wobble;
    let mut shown = 900 + (offset * 37) % 500;
    let mut accepted = shown * (28 + offset % 10) / 100;
    if weekend {
        active = active * 2 / 5;
        shown = shown * 3 / 10;
        accepted = accepted * 3 / 10;
    }
    let lines_suggested = shown * 4;
    let lines_accepted = accepted * 4;
    let enabled = 9;

    MetricValues {
        total_users: SAMPLE_USERS.len() as i64,
        enabled_users: enabled,
        active_users: active,
        weekly_active_users: active,
        monthly_active_users: 9,
        activation_rate: crate::ratio::round1(crate::ratio::percentage_or_zero(
            active as f64,
            enabled as f64,
        )),
        prompts_per_user: 20.0 + (offset % 6) as f64 * 5.0,
        features_utilized: 4 + offset % 3,
        team_activation_rate: 60.0 + (offset % 5) as f64 * 4.0,
        total_suggestions_shown: shown,
        total_suggestions_accepted: accepted,
        acceptance_rate: crate::ratio::round1(crate::ratio::percentage_or_zero(
            accepted as f64,
            shown as f64,
        )),
        total_lines_suggested: lines_suggested,
        total_lines_accepted: lines_accepted,
        total_chat_interactions: 40 + (offset * 11) % 60,
        ai_assisted_commits: 10 + offset % 10,
        ai_assisted_prs: 2 + offset % 4,
        total_commits: 30 + offset % 15,
        total_prs: 8 + offset % 5,
        ai_code_lines: lines_accepted,
        ai_code_retention_rate: 70.0 + (offset % 8) as f64 * 2.5,
        ai_code_modification_rate: 15.0 + (offset % 6) as f64 * 2.0,
        ai_code_bug_rate: 2.0 + (offset % 4) as f64 * 0.5,
        pr_rejection_rate: 5.0 + (offset % 5) as f64,
        language_breakdown: Some(json!({
            "Rust": 35, "TypeScript": 30, "Python": 20, "Go": 10, "Other": 5
        })),
        editor_breakdown: Some(json!({
            "VS Code": 60, "JetBrains": 30, "Neovim": 10
        })),
    }
}

fn sample_kpis() -> Vec<Kpi> {
    let current = [58.5, 42.0, 35.0, 5.0];
    Kpi::defaults()
        .into_iter()
        .zip(current)
        .map(|(kpi, current)| Kpi {
            achieved: current >= kpi.target,
            current,
            ..kpi
        })
        .collect()
}
