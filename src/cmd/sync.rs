//! GitHub sync trigger: `copilot-pulse sync`.

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};

use copilot_pulse::config::DashboardToml;
use copilot_pulse::dashboard::models::SyncReport;

use crate::Cli;

pub async fn cmd_sync(
    cli: &Cli,
    org: Option<String>,
    days: u32,
    api_url: Option<String>,
) -> Result<()> {
    let toml = DashboardToml::resolve(cli.config.as_deref())?;
    let api_url = api_url.unwrap_or_else(|| toml.api_url());
    let org = org.or_else(|| toml.github_org());

    let report = request_sync(&api_url, toml.github_token(), org, days).await?;
    println!(
        "{} {}",
        console::style("Synced").green().bold(),
        report.org_name.as_deref().unwrap_or("organization")
    );
    println!("  users:   {}", report.users_synced);
    println!("  metrics: {} days", report.metrics_synced);
    Ok(())
}

/// POST to `/api/github/sync`. Missing credentials are left to the server's
/// own configuration.
async fn request_sync(
    api_url: &str,
    token: Option<String>,
    org: Option<String>,
    days: u32,
) -> Result<SyncReport> {
    let url = format!("{}/api/github/sync", api_url.trim_end_matches('/'));
    tracing::info!(url = %url, org = ?org, days, "requesting GitHub sync");

    let resp = reqwest::Client::new()
        .post(&url)
        .json(&json!({"token": token, "org": org, "days": days}))
        .send()
        .await
        .with_context(|| format!("Failed to reach {}", url))?;

    let status = resp.status();
    if !status.is_success() {
        let body: Value = resp.json().await.unwrap_or(Value::Null);
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("no error message");
        bail!("Sync failed ({}): {}", status, message);
    }

    resp.json()
        .await
        .context("Failed to parse sync response")
}
