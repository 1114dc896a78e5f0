use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::ToSql;
use rusqlite::{Connection, OptionalExtension, Row, params};
use serde_json::Value;

use super::models::*;
use crate::errors::DashboardError;

/// Async-safe handle to the metrics database.
///
/// Wraps `DashboardDb` behind `Arc<Mutex>` and runs all access on tokio's
/// blocking thread pool via `spawn_blocking`, so synchronous SQLite I/O never
/// ties up async worker threads.
#[derive(Clone)]
pub struct DbHandle {
    inner: Arc<std::sync::Mutex<DashboardDb>>,
}

impl DbHandle {
    pub fn new(db: DashboardDb) -> Self {
        Self {
            inner: Arc::new(std::sync::Mutex::new(db)),
        }
    }

    /// Run a closure with access to the database on a blocking thread.
    /// All data passed into `f` must be owned (`'static`).
    pub async fn call<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&DashboardDb) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let db = self.inner.clone();
        tokio::task::spawn_blocking(move || {
            let guard = db.lock().map_err(|e| anyhow::anyhow!("DB lock poisoned: {}", e))?;
            f(&guard)
        })
        .await
        .context("DB task panicked")?
    }
}

pub struct DashboardDb {
    conn: Connection,
}

const ORG_COLUMNS: &str = "id, github_org, name, total_seats, copilot_seats, created_at";

const USER_COLUMNS: &str = "id, github_username, organization_id, name, email, team, \
     maturity_level, copilot_enabled, is_weekly_active, is_monthly_active, created_at, updated_at";

const METRIC_VALUE_COLUMNS: &str = "total_users, enabled_users, active_users, \
     weekly_active_users, monthly_active_users, activation_rate, prompts_per_user, \
     features_utilized, team_activation_rate, total_suggestions_shown, \
     total_suggestions_accepted, acceptance_rate, total_lines_suggested, total_lines_accepted, \
     total_chat_interactions, ai_assisted_commits, ai_assisted_prs, total_commits, total_prs, \
     ai_code_lines, ai_code_retention_rate, ai_code_modification_rate, ai_code_bug_rate, \
     pr_rejection_rate, language_breakdown, editor_breakdown";

const METRIC_VALUE_COUNT: usize = 26;

impl DashboardDb {
    /// Open (or create) a SQLite database at the given path and run migrations.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let conn = Connection::open(path).context("Failed to open SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Create an in-memory SQLite database (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    fn init(&self) -> Result<()> {
        self.conn
            .execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        self.run_migrations().context("Failed to run migrations")?;
        Ok(())
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS organizations (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    github_org TEXT NOT NULL UNIQUE,
                    name TEXT,
                    total_seats INTEGER NOT NULL DEFAULT 0,
                    copilot_seats INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    github_username TEXT NOT NULL UNIQUE,
                    organization_id INTEGER REFERENCES organizations(id) ON DELETE SET NULL,
                    name TEXT,
                    email TEXT,
                    team TEXT,
                    maturity_level INTEGER NOT NULL DEFAULT 0
                        CHECK (maturity_level BETWEEN 0 AND 5),
                    copilot_enabled INTEGER NOT NULL DEFAULT 0,
                    is_weekly_active INTEGER NOT NULL DEFAULT 0,
                    is_monthly_active INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE TABLE IF NOT EXISTS daily_metrics (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    organization_id INTEGER REFERENCES organizations(id) ON DELETE CASCADE,
                    date TEXT NOT NULL,
                    total_users INTEGER NOT NULL DEFAULT 0,
                    enabled_users INTEGER NOT NULL DEFAULT 0,
                    active_users INTEGER NOT NULL DEFAULT 0,
                    weekly_active_users INTEGER NOT NULL DEFAULT 0,
                    monthly_active_users INTEGER NOT NULL DEFAULT 0,
                    activation_rate REAL NOT NULL DEFAULT 0,
                    prompts_per_user REAL NOT NULL DEFAULT 0,
                    features_utilized INTEGER NOT NULL DEFAULT 0,
                    team_activation_rate REAL NOT NULL DEFAULT 0,
                    total_suggestions_shown INTEGER NOT NULL DEFAULT 0,
                    total_suggestions_accepted INTEGER NOT NULL DEFAULT 0,
                    acceptance_rate REAL NOT NULL DEFAULT 0,
                    total_lines_suggested INTEGER NOT NULL DEFAULT 0,
                    total_lines_accepted INTEGER NOT NULL DEFAULT 0,
                    total_chat_interactions INTEGER NOT NULL DEFAULT 0,
                    ai_assisted_commits INTEGER NOT NULL DEFAULT 0,
                    ai_assisted_prs INTEGER NOT NULL DEFAULT 0,
                    total_commits INTEGER NOT NULL DEFAULT 0,
                    total_prs INTEGER NOT NULL DEFAULT 0,
                    ai_code_lines INTEGER NOT NULL DEFAULT 0,
                    ai_code_retention_rate REAL NOT NULL DEFAULT 0,
                    ai_code_modification_rate REAL NOT NULL DEFAULT 0,
                    ai_code_bug_rate REAL NOT NULL DEFAULT 0,
                    pr_rejection_rate REAL NOT NULL DEFAULT 0,
                    language_breakdown TEXT,
                    editor_breakdown TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    UNIQUE(organization_id, date)
                );

                CREATE TABLE IF NOT EXISTS kpis (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    category TEXT NOT NULL,
                    phase INTEGER NOT NULL,
                    target_value REAL NOT NULL,
                    current_value REAL NOT NULL DEFAULT 0,
                    is_achieved INTEGER NOT NULL DEFAULT 0,
                    measurement_date TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                );

                CREATE INDEX IF NOT EXISTS idx_users_org ON users(organization_id);
                CREATE INDEX IF NOT EXISTS idx_users_team ON users(team);
                CREATE INDEX IF NOT EXISTS idx_daily_metrics_date ON daily_metrics(date);
                ",
            )
            .context("Failed to create tables")?;
        Ok(())
    }

    /// True when no organization, user or metrics row exists yet.
    pub fn is_empty(&self) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM organizations)
                      + (SELECT COUNT(*) FROM users)
                      + (SELECT COUNT(*) FROM daily_metrics)",
                [],
                |row| row.get(0),
            )
            .context("Failed to count rows")?;
        Ok(count == 0)
    }

    // ── Organizations ─────────────────────────────────────────────────

    pub fn create_organization(&self, org: &NewOrganization) -> Result<Organization> {
        if self.find_organization_by_login(&org.github_org)?.is_some() {
            return Err(DashboardError::DuplicateOrganization(org.github_org.clone()).into());
        }
        self.conn
            .execute(
                "INSERT INTO organizations (github_org, name, total_seats, copilot_seats)
                 VALUES (?1, ?2, ?3, ?4)",
                params![org.github_org, org.name, org.total_seats, org.copilot_seats],
            )
            .context("Failed to insert organization")?;
        let id = self.conn.last_insert_rowid();
        self.get_organization(id)?
            .context("Organization not found after insert")
    }

    pub fn list_organizations(&self) -> Result<Vec<Organization>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ORG_COLUMNS} FROM organizations ORDER BY id"))
            .context("Failed to prepare list_organizations")?;
        let rows = stmt
            .query_map([], org_from_row)
            .context("Failed to query organizations")?;
        let mut orgs = Vec::new();
        for row in rows {
            orgs.push(row.context("Failed to read organization row")?);
        }
        Ok(orgs)
    }

    pub fn get_organization(&self, id: i64) -> Result<Option<Organization>> {
        self.conn
            .query_row(
                &format!("SELECT {ORG_COLUMNS} FROM organizations WHERE id = ?1"),
                params![id],
                org_from_row,
            )
            .optional()
            .context("Failed to query organization")
    }

    pub fn find_organization_by_login(&self, github_org: &str) -> Result<Option<Organization>> {
        self.conn
            .query_row(
                &format!("SELECT {ORG_COLUMNS} FROM organizations WHERE github_org = ?1"),
                params![github_org],
                org_from_row,
            )
            .optional()
            .context("Failed to query organization by login")
    }

    /// Insert the organization, or refresh its seat counts if it exists.
    pub fn upsert_organization_seats(
        &self,
        github_org: &str,
        name: &str,
        total_seats: i64,
        copilot_seats: i64,
    ) -> Result<Organization> {
        self.conn
            .execute(
                "INSERT INTO organizations (github_org, name, total_seats, copilot_seats)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(github_org) DO UPDATE SET
                    total_seats = excluded.total_seats,
                    copilot_seats = excluded.copilot_seats,
                    updated_at = datetime('now')",
                params![github_org, name, total_seats, copilot_seats],
            )
            .context("Failed to upsert organization")?;
        self.find_organization_by_login(github_org)?
            .context("Organization not found after upsert")
    }

    pub fn delete_organization(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM organizations WHERE id = ?1", params![id])
            .context("Failed to delete organization")?;
        Ok(affected > 0)
    }

    // ── Users ─────────────────────────────────────────────────────────

    pub fn create_user(&self, user: &NewUser) -> Result<User> {
        if self.find_user_by_username(&user.github_username)?.is_some() {
            return Err(DashboardError::DuplicateUsername(user.github_username.clone()).into());
        }
        let level = MaturityLevel::try_from(user.maturity_level.unwrap_or(0))?;
        let copilot_enabled = user.copilot_enabled.or(user.is_active).unwrap_or(false);
        let name = user.name.clone().unwrap_or_else(|| user.github_username.clone());

        self.conn
            .execute(
                "INSERT INTO users (github_username, organization_id, name, email, team,
                    maturity_level, copilot_enabled, is_weekly_active, is_monthly_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    user.github_username,
                    user.organization_id,
                    name,
                    user.email,
                    user.team,
                    level.as_i64(),
                    copilot_enabled,
                    level.is_weekly_active(),
                    level.is_monthly_active(),
                ],
            )
            .context("Failed to insert user")?;
        let id = self.conn.last_insert_rowid();
        self.get_user(id)?.context("User not found after insert")
    }

    /// Users matching `filter`, ordered by username.
    pub fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users
                 WHERE (?1 IS NULL OR organization_id = ?1)
                   AND (?2 IS NULL OR team = ?2)
                   AND (?3 IS NULL OR maturity_level = ?3)
                   AND (?4 = 0 OR is_weekly_active = 1)
                 ORDER BY github_username"
            ))
            .context("Failed to prepare list_users")?;
        let rows = stmt
            .query_map(
                params![
                    filter.org_id,
                    filter.team,
                    filter.maturity_level,
                    filter.active_only
                ],
                UserRow::from_row,
            )
            .context("Failed to query users")?;
        let mut users = Vec::new();
        for row in rows {
            let r = row.context("Failed to read user row")?;
            users.push(r.into_user()?);
        }
        Ok(users)
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                UserRow::from_row,
            )
            .optional()
            .context("Failed to query user")?;
        row.map(UserRow::into_user).transpose()
    }

    pub fn find_user_by_username(&self, github_username: &str) -> Result<Option<User>> {
        let row = self
            .conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE github_username = ?1"),
                params![github_username],
                UserRow::from_row,
            )
            .optional()
            .context("Failed to query user by username")?;
        row.map(UserRow::into_user).transpose()
    }

    /// Apply a partial update. Returns `None` when the user does not exist.
    pub fn update_user(&self, id: i64, update: &UserUpdate) -> Result<Option<User>> {
        let Some(mut user) = self.get_user(id)? else {
            return Ok(None);
        };

        if let Some(username) = &update.github_username
            && *username != user.github_username
        {
            if self.find_user_by_username(username)?.is_some() {
                return Err(DashboardError::DuplicateUsername(username.clone()).into());
            }
            user.github_username = username.clone();
        }
        if let Some(level) = update.maturity_level {
            user.maturity_level = MaturityLevel::try_from(level)?;
        }
        if update.name.is_some() {
            user.name = update.name.clone();
        }
        if update.email.is_some() {
            user.email = update.email.clone();
        }
        if update.team.is_some() {
            user.team = update.team.clone();
        }
        if let Some(enabled) = update.is_active.or(update.copilot_enabled) {
            user.copilot_enabled = enabled;
        }
        if let Some(weekly) = update.is_weekly_active {
            user.is_weekly_active = weekly;
        }
        if let Some(monthly) = update.is_monthly_active {
            user.is_monthly_active = monthly;
        }

        self.conn
            .execute(
                "UPDATE users SET github_username = ?1, name = ?2, email = ?3, team = ?4,
                    maturity_level = ?5, copilot_enabled = ?6, is_weekly_active = ?7,
                    is_monthly_active = ?8, updated_at = datetime('now')
                 WHERE id = ?9",
                params![
                    user.github_username,
                    user.name,
                    user.email,
                    user.team,
                    user.maturity_level.as_i64(),
                    user.copilot_enabled,
                    user.is_weekly_active,
                    user.is_monthly_active,
                    id,
                ],
            )
            .context("Failed to update user")?;
        self.get_user(id)
    }

    pub fn set_copilot_enabled(&self, id: i64, enabled: bool) -> Result<()> {
        self.conn
            .execute(
                "UPDATE users SET copilot_enabled = ?1, updated_at = datetime('now') WHERE id = ?2",
                params![enabled, id],
            )
            .context("Failed to update copilot_enabled")?;
        Ok(())
    }

    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![id])
            .context("Failed to delete user")?;
        Ok(affected > 0)
    }

    /// `(total, copilot_enabled, weekly_active)` user counts.
    pub fn user_counts(&self, org_id: Option<i64>) -> Result<(i64, i64, i64)> {
        self.conn
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(copilot_enabled), 0), COALESCE(SUM(is_weekly_active), 0)
                 FROM users WHERE (?1 IS NULL OR organization_id = ?1)",
                params![org_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .context("Failed to count users")
    }

    /// User count per maturity level; levels with no users are absent.
    pub fn maturity_counts(&self, org_id: Option<i64>) -> Result<BTreeMap<i64, i64>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT maturity_level, COUNT(*) FROM users
                 WHERE (?1 IS NULL OR organization_id = ?1)
                 GROUP BY maturity_level",
            )
            .context("Failed to prepare maturity_counts")?;
        let rows = stmt
            .query_map(params![org_id], |row| Ok((row.get(0)?, row.get(1)?)))
            .context("Failed to query maturity counts")?;
        let mut counts = BTreeMap::new();
        for row in rows {
            let (level, count) = row.context("Failed to read maturity count")?;
            counts.insert(level, count);
        }
        Ok(counts)
    }

    /// Per-team user totals. Users without a team are grouped as "Unassigned".
    pub fn team_breakdown(&self) -> Result<Vec<TeamBreakdown>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT COALESCE(team, 'Unassigned') AS t, COUNT(*),
                        COALESCE(SUM(copilot_enabled), 0), COALESCE(SUM(is_weekly_active), 0),
                        COALESCE(AVG(maturity_level), 0.0)
                 FROM users GROUP BY t ORDER BY t",
            )
            .context("Failed to prepare team_breakdown")?;
        let rows = stmt
            .query_map([], |row| {
                let enabled: i64 = row.get(2)?;
                let active: i64 = row.get(3)?;
                let avg: f64 = row.get(4)?;
                Ok(TeamBreakdown {
                    team: row.get(0)?,
                    total_users: row.get(1)?,
                    enabled_users: enabled,
                    active_users: active,
                    avg_maturity: crate::ratio::round1(avg),
                    activation_rate: crate::ratio::round1(crate::ratio::percentage_or_zero(
                        active as f64,
                        enabled as f64,
                    )),
                })
            })
            .context("Failed to query team breakdown")?;
        let mut teams = Vec::new();
        for row in rows {
            teams.push(row.context("Failed to read team row")?);
        }
        Ok(teams)
    }

    pub fn team_stats(&self) -> Result<Vec<TeamStats>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT COALESCE(team, 'Unassigned') AS t, COUNT(*), COALESCE(AVG(maturity_level), 0.0)
                 FROM users GROUP BY t ORDER BY t",
            )
            .context("Failed to prepare team_stats")?;
        let rows = stmt
            .query_map([], |row| {
                let avg: f64 = row.get(2)?;
                Ok(TeamStats {
                    team: row.get(0)?,
                    count: row.get(1)?,
                    avg_maturity: crate::ratio::round1(avg),
                })
            })
            .context("Failed to query team stats")?;
        let mut teams = Vec::new();
        for row in rows {
            teams.push(row.context("Failed to read team stats row")?);
        }
        Ok(teams)
    }

    // ── Daily metrics ─────────────────────────────────────────────────

    /// Insert or overwrite the row for `(organization_id, date)`.
    pub fn upsert_metrics(&self, metrics: &NewDailyMetrics) -> Result<DailyMetrics> {
        let placeholders = (3..3 + METRIC_VALUE_COUNT)
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        let updates = METRIC_VALUE_COLUMNS
            .split(',')
            .map(|c| {
                let c = c.trim();
                format!("{c} = excluded.{c}")
            })
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO daily_metrics (organization_id, date, {METRIC_VALUE_COLUMNS})
             VALUES (?1, ?2, {placeholders})
             ON CONFLICT(organization_id, date) DO UPDATE SET {updates}"
        );

        let mut bound: Vec<&dyn ToSql> = vec![&metrics.organization_id, &metrics.date];
        bound.extend(value_params(&metrics.values));
        self.conn
            .execute(&sql, bound.as_slice())
            .context("Failed to upsert daily metrics")?;

        self.metrics_for_day(metrics.organization_id, metrics.date)?
            .context("Metrics not found after upsert")
    }

    /// Insert a row only if none exists for `(organization_id, date)`.
    /// Returns whether a row was inserted.
    pub fn insert_metrics_if_missing(
        &self,
        organization_id: i64,
        date: NaiveDate,
        values: &MetricValues,
    ) -> Result<bool> {
        if self.metrics_for_day(organization_id, date)?.is_some() {
            return Ok(false);
        }
        self.upsert_metrics(&NewDailyMetrics {
            organization_id,
            date,
            values: values.clone(),
        })?;
        Ok(true)
    }

    pub fn metrics_for_day(
        &self,
        organization_id: i64,
        date: NaiveDate,
    ) -> Result<Option<DailyMetrics>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT id, organization_id, date, {METRIC_VALUE_COLUMNS}, created_at
                     FROM daily_metrics WHERE organization_id = ?1 AND date = ?2"
                ),
                params![organization_id, date],
                metrics_from_row,
            )
            .optional()
            .context("Failed to query daily metrics")
    }

    /// Rows dated on or after `since`, oldest first.
    pub fn metrics_since(&self, since: NaiveDate, org_id: Option<i64>) -> Result<Vec<DailyMetrics>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT id, organization_id, date, {METRIC_VALUE_COLUMNS}, created_at
                 FROM daily_metrics
                 WHERE date >= ?1 AND (?2 IS NULL OR organization_id = ?2)
                 ORDER BY date, id"
            ))
            .context("Failed to prepare metrics_since")?;
        let rows = stmt
            .query_map(params![since, org_id], metrics_from_row)
            .context("Failed to query daily metrics")?;
        let mut metrics = Vec::new();
        for row in rows {
            metrics.push(row.context("Failed to read daily metrics row")?);
        }
        Ok(metrics)
    }

    pub fn latest_metrics(&self, org_id: Option<i64>) -> Result<Option<DailyMetrics>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT id, organization_id, date, {METRIC_VALUE_COLUMNS}, created_at
                     FROM daily_metrics WHERE (?1 IS NULL OR organization_id = ?1)
                     ORDER BY date DESC, id DESC LIMIT 1"
                ),
                params![org_id],
                metrics_from_row,
            )
            .optional()
            .context("Failed to query latest metrics")
    }

    pub fn delete_metrics(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM daily_metrics WHERE id = ?1", params![id])
            .context("Failed to delete daily metrics")?;
        Ok(affected > 0)
    }

    // ── KPIs ──────────────────────────────────────────────────────────

    pub fn insert_kpi(&self, kpi: &Kpi, measured_on: Option<NaiveDate>) -> Result<Kpi> {
        self.conn
            .execute(
                "INSERT INTO kpis (name, category, phase, target_value, current_value, is_achieved, measurement_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    kpi.name,
                    kpi.category.as_str(),
                    kpi.phase,
                    kpi.target,
                    kpi.current,
                    kpi.achieved,
                    measured_on,
                ],
            )
            .context("Failed to insert KPI")?;
        Ok(Kpi {
            id: Some(self.conn.last_insert_rowid()),
            ..kpi.clone()
        })
    }

    /// Stored KPIs ordered by phase then name.
    pub fn list_kpis(&self) -> Result<Vec<Kpi>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, phase, name, category, target_value, current_value, is_achieved
                 FROM kpis ORDER BY phase, name",
            )
            .context("Failed to prepare list_kpis")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, f64>(4)?,
                    row.get::<_, f64>(5)?,
                    row.get::<_, bool>(6)?,
                ))
            })
            .context("Failed to query KPIs")?;
        let mut kpis = Vec::new();
        for row in rows {
            let (id, phase, name, category, target, current, achieved) =
                row.context("Failed to read KPI row")?;
            let category = category
                .parse::<KpiCategory>()
                .map_err(|e| anyhow::anyhow!(e))
                .context("Failed to parse KPI category")?;
            kpis.push(Kpi {
                id: Some(id),
                phase,
                name,
                category,
                target,
                current,
                achieved,
            });
        }
        Ok(kpis)
    }
}

fn org_from_row(row: &Row<'_>) -> rusqlite::Result<Organization> {
    Ok(Organization {
        id: row.get(0)?,
        github_org: row.get(1)?,
        name: row.get(2)?,
        total_seats: row.get(3)?,
        copilot_seats: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn metrics_from_row(row: &Row<'_>) -> rusqlite::Result<DailyMetrics> {
    Ok(DailyMetrics {
        id: row.get(0)?,
        organization_id: row.get(1)?,
        date: row.get(2)?,
        values: MetricValues {
            total_users: row.get(3)?,
            enabled_users: row.get(4)?,
            active_users: row.get(5)?,
            weekly_active_users: row.get(6)?,
            monthly_active_users: row.get(7)?,
            activation_rate: row.get(8)?,
            prompts_per_user: row.get(9)?,
            features_utilized: row.get(10)?,
            team_activation_rate: row.get(11)?,
            total_suggestions_shown: row.get(12)?,
            total_suggestions_accepted: row.get(13)?,
            acceptance_rate: row.get(14)?,
            total_lines_suggested: row.get(15)?,
            total_lines_accepted: row.get(16)?,
            total_chat_interactions: row.get(17)?,
            ai_assisted_commits: row.get(18)?,
            ai_assisted_prs: row.get(19)?,
            total_commits: row.get(20)?,
            total_prs: row.get(21)?,
            ai_code_lines: row.get(22)?,
            ai_code_retention_rate: row.get(23)?,
            ai_code_modification_rate: row.get(24)?,
            ai_code_bug_rate: row.get(25)?,
            pr_rejection_rate: row.get(26)?,
            language_breakdown: row.get::<_, Option<Value>>(27)?,
            editor_breakdown: row.get::<_, Option<Value>>(28)?,
        },
        created_at: row.get(29)?,
    })
}

/// Bind order matches `METRIC_VALUE_COLUMNS`.
fn value_params(v: &MetricValues) -> [&dyn ToSql; METRIC_VALUE_COUNT] {
    [
        &v.total_users,
        &v.enabled_users,
        &v.active_users,
        &v.weekly_active_users,
        &v.monthly_active_users,
        &v.activation_rate,
        &v.prompts_per_user,
        &v.features_utilized,
        &v.team_activation_rate,
        &v.total_suggestions_shown,
        &v.total_suggestions_accepted,
        &v.acceptance_rate,
        &v.total_lines_suggested,
        &v.total_lines_accepted,
        &v.total_chat_interactions,
        &v.ai_assisted_commits,
        &v.ai_assisted_prs,
        &v.total_commits,
        &v.total_prs,
        &v.ai_code_lines,
        &v.ai_code_retention_rate,
        &v.ai_code_modification_rate,
        &v.ai_code_bug_rate,
        &v.pr_rejection_rate,
        &v.language_breakdown,
        &v.editor_breakdown,
    ]
}

struct UserRow {
    id: i64,
    github_username: String,
    organization_id: Option<i64>,
    name: Option<String>,
    email: Option<String>,
    team: Option<String>,
    maturity_level: i64,
    copilot_enabled: bool,
    is_weekly_active: bool,
    is_monthly_active: bool,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            github_username: row.get(1)?,
            organization_id: row.get(2)?,
            name: row.get(3)?,
            email: row.get(4)?,
            team: row.get(5)?,
            maturity_level: row.get(6)?,
            copilot_enabled: row.get(7)?,
            is_weekly_active: row.get(8)?,
            is_monthly_active: row.get(9)?,
            created_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }

    fn into_user(self) -> Result<User> {
        let maturity_level =
            MaturityLevel::try_from(self.maturity_level).context("Failed to parse maturity level")?;
        Ok(User {
            id: self.id,
            github_username: self.github_username,
            organization_id: self.organization_id,
            name: self.name,
            email: self.email,
            team: self.team,
            maturity_level,
            copilot_enabled: self.copilot_enabled,
            is_weekly_active: self.is_weekly_active,
            is_monthly_active: self.is_monthly_active,
            is_active: self.copilot_enabled,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
