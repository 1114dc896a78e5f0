//! Pull organization, member and usage data from GitHub into the database.

use std::collections::HashSet;

use chrono::Utc;

use super::analytics::window_start;
use super::db::DbHandle;
use super::github::{CopilotClient, UsageDay};
use super::models::{MetricValues, NewUser, SyncReport};
use crate::errors::DashboardError;
use crate::ratio::percentage_or_zero;

#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    pub sync_users: bool,
    pub sync_metrics: bool,
    pub days: u32,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            sync_users: true,
            sync_metrics: true,
            days: 30,
        }
    }
}

/// "acme-corp" -> "Acme-Corp"
fn title_case(login: &str) -> String {
    let mut out = String::with_capacity(login.len());
    let mut at_word_start = true;
    for c in login.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    out
}

fn usage_values(day: &UsageDay) -> MetricValues {
    MetricValues {
        active_users: day.total_active_users,
        total_suggestions_shown: day.total_suggestions_count,
        total_suggestions_accepted: day.total_acceptances_count,
        acceptance_rate: percentage_or_zero(
            day.total_acceptances_count as f64,
            day.total_suggestions_count as f64,
        ),
        total_lines_suggested: day.total_lines_suggested,
        total_lines_accepted: day.total_lines_accepted,
        ..Default::default()
    }
}

/// Sync one organization.
///
/// Billing and seat lookups are best effort: a failure is logged and treated
/// as zero seats. Usage data is Enterprise-only, so its failure is tolerated
/// too. Failing to list members fails the whole sync.
pub async fn sync_organization(
    db: &DbHandle,
    client: &CopilotClient,
    options: SyncOptions,
) -> Result<SyncReport, DashboardError> {
    let org_login = client.org().to_string();
    let since = if options.sync_metrics {
        Some(window_start(Utc::now().date_naive(), options.days)?)
    } else {
        None
    };

    let seats = match client.billing().await {
        Ok(billing) => billing.seat_breakdown,
        Err(e) => {
            tracing::warn!(org = %org_login, "Copilot billing unavailable, assuming zero seats: {:#}", e);
            Default::default()
        }
    };

    let org = {
        let login = org_login.clone();
        let name = title_case(&org_login);
        db.call(move |db| {
            db.upsert_organization_seats(&login, &name, seats.total, seats.active_this_cycle)
        })
        .await
        .map_err(DashboardError::Database)?
    };

    let mut users_synced = 0u64;
    if options.sync_users {
        let members = client
            .members()
            .await
            .map_err(|e| DashboardError::GitHub(format!("{:#}", e)))?;
        let seat_holders: HashSet<String> = match client.seat_holders().await {
            Ok(logins) => logins.into_iter().collect(),
            Err(e) => {
                tracing::warn!(org = %org_login, "Copilot seat list unavailable: {:#}", e);
                HashSet::new()
            }
        };

        let org_id = org.id;
        let domain = org_login.clone();
        users_synced = db
            .call(move |db| {
                let mut synced = 0u64;
                for member in members {
                    let has_seat = seat_holders.contains(&member.login);
                    match db.find_user_by_username(&member.login)? {
                        Some(existing) => db.set_copilot_enabled(existing.id, has_seat)?,
                        None => {
                            db.create_user(&NewUser {
                                github_username: member.login.clone(),
                                organization_id: Some(org_id),
                                name: Some(member.login.clone()),
                                email: Some(format!("{}@{}.com", member.login, domain)),
                                team: Some("Unassigned".to_string()),
                                maturity_level: Some(if has_seat { 1 } else { 0 }),
                                copilot_enabled: Some(has_seat),
                                is_active: None,
                            })?;
                        }
                    }
                    synced += 1;
                }
                Ok(synced)
            })
            .await
            .map_err(DashboardError::Database)?;
    }

    let mut metrics_synced = 0u64;
    if let Some(since) = since {
        match client.usage(since).await {
            Ok(days) => {
                let rows: Vec<_> = days
                    .into_iter()
                    .filter_map(|day| match day.date() {
                        Ok(date) => Some((date, usage_values(&day))),
                        Err(e) => {
                            tracing::warn!(org = %org_login, "Skipping usage day: {:#}", e);
                            None
                        }
                    })
                    .collect();
                let org_id = org.id;
                metrics_synced = db
                    .call(move |db| {
                        let mut synced = 0u64;
                        for (date, values) in &rows {
                            db.insert_metrics_if_missing(org_id, *date, values)?;
                            synced += 1;
                        }
                        Ok(synced)
                    })
                    .await
                    .map_err(DashboardError::Database)?;
            }
            Err(e) => {
                tracing::warn!(org = %org_login, "Copilot usage unavailable (Enterprise only): {:#}", e);
            }
        }
    }

    tracing::info!(
        org = %org_login,
        users_synced,
        metrics_synced,
        "GitHub sync completed"
    );
    Ok(SyncReport {
        success: true,
        message: "Sync completed successfully".to_string(),
        org_name: org.name,
        users_synced,
        metrics_synced,
    })
}
