//! Live terminal view: `copilot-pulse watch`.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use console::style;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};

use copilot_pulse::config::DashboardToml;
use copilot_pulse::ratio::{format_percentage, percentage};
use copilot_pulse::refresh::{
    DEFAULT_TREND_DAYS, FetchCoordinator, HttpSource, MountedView, Snapshot, ViewKind, ViewState,
    ViewStatus,
};

use crate::Cli;

pub async fn cmd_watch(
    cli: &Cli,
    view: ViewKind,
    api_url: Option<String>,
    interval: Option<u64>,
    once: bool,
) -> Result<()> {
    let toml = DashboardToml::resolve(cli.config.as_deref())?;
    let api_url = api_url.unwrap_or_else(|| toml.api_url());
    let interval = Duration::from_secs(interval.unwrap_or(toml.refresh.interval_secs));

    let source = Arc::new(HttpSource::new(api_url.clone()));
    let coordinator = FetchCoordinator::new(source, view.plan(DEFAULT_TREND_DAYS))
        .with_request_timeout(toml.request_timeout());

    tracing::info!(view = %view, api = %api_url, interval = ?interval, "mounting view");
    let mounted = MountedView::mount(coordinator, interval);

    if once {
        return print_first_load(mounted, view).await;
    }
    run_live(mounted, view, interval).await
}

/// Wait for the first cycle to settle, print it, and unmount.
async fn print_first_load(mounted: MountedView, view: ViewKind) -> Result<()> {
    let mut rx = mounted.subscribe();
    let state = rx
        .wait_for(|s| !s.is_loading())
        .await
        .context("View closed before its first load finished")?
        .clone();
    drop(mounted);

    println!("{}", render(view, &state));
    if state.status() == ViewStatus::Unavailable {
        bail!("Failed to load the {} view", view);
    }
    Ok(())
}

async fn run_live(mounted: MountedView, view: ViewKind, interval: Duration) -> Result<()> {
    let term = console::Term::stdout();
    let mut rx = mounted.subscribe();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    redraw(&term, view, &rx.borrow_and_update(), interval)?;
    loop {
        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = rx.borrow_and_update().clone();
                redraw(&term, view, &state, interval)?;
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(_)) => {
                    tracing::debug!(view = %view, "manual refresh requested");
                    mounted.refresh();
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    tracing::warn!("stdin closed: {}", e);
                    stdin_open = false;
                }
            },
            signal = &mut ctrl_c => {
                if let Err(e) = signal {
                    tracing::warn!("failed to listen for Ctrl-C: {}", e);
                }
                break;
            }
        }
    }

    drop(mounted);
    tracing::info!(view = %view, "view unmounted");
    Ok(())
}

fn redraw(term: &console::Term, view: ViewKind, state: &ViewState, interval: Duration) -> Result<()> {
    term.clear_screen().context("Failed to clear terminal")?;
    println!("{}", render(view, state));
    let timer = if interval.is_zero() {
        "auto refresh off".to_string()
    } else {
        format!("auto refresh every {}s", interval.as_secs())
    };
    println!(
        "{}",
        style(format!("Enter: refresh now | Ctrl-C: quit | {}", timer)).dim()
    );
    Ok(())
}

/// Render a view's state as text. Keeps showing the last snapshot while a
/// refresh is in flight or after a refresh failed.
pub(crate) fn render(view: ViewKind, state: &ViewState) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        style(format!("Copilot Pulse: {}", view)).bold().cyan(),
        status_line(state)
    );

    if let Some(snapshot) = state.snapshot() {
        out.push('\n');
        match view {
            ViewKind::Dashboard => render_dashboard(&mut out, snapshot),
            ViewKind::Adoption | ViewKind::Productivity | ViewKind::Quality => {
                render_category(&mut out, snapshot)
            }
            ViewKind::Users => render_users(&mut out, snapshot),
        }
    }
    out
}

fn status_line(state: &ViewState) -> String {
    let updated = state
        .last_updated()
        .map(|t| t.with_timezone(&chrono::Local).format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "never".to_string());
    let error = state
        .last_error()
        .map(|e| e.to_string())
        .unwrap_or_default();

    let mut line = match state.status() {
        ViewStatus::Loading => style("loading...".to_string()).yellow().to_string(),
        ViewStatus::Unavailable => style(format!("unavailable: {}", error)).red().to_string(),
        ViewStatus::Ready => style(format!("updated {}", updated)).green().to_string(),
        ViewStatus::Stale => style(format!(
            "refresh failed ({}), showing data from {}",
            error, updated
        ))
        .yellow()
        .to_string(),
    };
    if state.is_refreshing() {
        line.push_str(&style(" (refreshing)").dim().to_string());
    }
    line
}

fn int(value: &Value, key: &str) -> i64 {
    value.get(key).and_then(Value::as_i64).unwrap_or(0)
}

fn pct(part: i64, whole: i64) -> String {
    format_percentage(percentage(part as f64, whole as f64))
}

fn render_dashboard(out: &mut String, snapshot: &Snapshot) {
    if let Some(summary) = snapshot.get("summary") {
        let enabled = int(summary, "enabled_users");
        let active = int(summary, "active_users");
        let _ = writeln!(
            out,
            "  Users        total {}  enabled {}  active {}",
            int(summary, "total_users"),
            enabled,
            active
        );
        let _ = writeln!(out, "  Activation   {}", pct(active, enabled));
        let _ = writeln!(
            out,
            "  Acceptance   {}",
            pct(
                int(summary, "accepted_suggestions"),
                int(summary, "total_suggestions")
            )
        );
        let _ = writeln!(
            out,
            "  WAU / MAU    {} / {}",
            int(summary, "weekly_active_users"),
            int(summary, "monthly_active_users")
        );
    }

    if let Some(levels) = snapshot.get("maturity").and_then(Value::as_array) {
        let cells: Vec<String> = levels
            .iter()
            .map(|l| {
                format!(
                    "{} {}",
                    l.get("name").and_then(Value::as_str).unwrap_or("?"),
                    int(l, "count")
                )
            })
            .collect();
        let _ = writeln!(out, "  Maturity     {}", cells.join("  "));
    }

    if let Some(points) = snapshot.get("trends").and_then(Value::as_array) {
        match points.last() {
            Some(latest) => {
                let _ = writeln!(
                    out,
                    "  Trend        {} days, latest {}: {} weekly active",
                    points.len(),
                    latest.get("date").and_then(Value::as_str).unwrap_or("?"),
                    int(latest, "weekly_active_users")
                );
            }
            None => {
                let _ = writeln!(out, "  Trend        no data");
            }
        }
    }
}

fn render_category(out: &mut String, snapshot: &Snapshot) {
    let Some(report) = snapshot.get("metrics") else {
        return;
    };
    match report.get("summary").and_then(Value::as_object) {
        Some(summary) => {
            for (key, value) in summary {
                let shown = match value.as_f64() {
                    Some(f) if !value.is_i64() => format!("{:.1}", f),
                    _ => value.to_string(),
                };
                let _ = writeln!(out, "  {:<24} {}", key, shown);
            }
        }
        None => {
            let _ = writeln!(out, "  No data in the last {} days", DEFAULT_TREND_DAYS);
        }
    }
    let points = report
        .get("trends")
        .and_then(Value::as_array)
        .map_or(0, Vec::len);
    let _ = writeln!(out, "  {:<24} {}", "trend points", points);
}

fn render_users(out: &mut String, snapshot: &Snapshot) {
    if let Some(users) = snapshot.get("users").and_then(Value::as_array) {
        let enabled = users
            .iter()
            .filter(|u| u.get("copilot_enabled").and_then(Value::as_bool) == Some(true))
            .count() as i64;
        let _ = writeln!(
            out,
            "  {} users, {} with Copilot ({})",
            users.len(),
            enabled,
            pct(enabled, users.len() as i64)
        );
    }
    if let Some(teams) = snapshot.get("by_team").and_then(Value::as_array) {
        for team in teams {
            let _ = writeln!(
                out,
                "  {:<20} {:>4}  avg maturity {:.1}",
                team.get("team").and_then(Value::as_str).unwrap_or("?"),
                int(team, "count"),
                team.get("avg_maturity").and_then(Value::as_f64).unwrap_or(0.0)
            );
        }
    }
}
