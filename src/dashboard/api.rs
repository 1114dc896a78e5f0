use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::Deserialize;

use super::analytics;
use super::db::DbHandle;
use super::github::{CopilotClient, DEFAULT_GITHUB_API_URL};
use super::models::*;
use super::sync::{SyncOptions, sync_organization};
use crate::errors::DashboardError;

// ── Shared application state ──────────────────────────────────────────

/// Server-side GitHub credentials, used when a request does not carry its own.
#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub api_url: String,
    pub token: Option<String>,
    pub org: Option<String>,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_GITHUB_API_URL.to_string(),
            token: None,
            org: None,
        }
    }
}

pub struct AppState {
    pub db: DbHandle,
    pub github: GitHubSettings,
}

pub type SharedState = Arc<AppState>;

// ── Query types ───────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct OrgQuery {
    pub org_id: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConnectionQuery {
    pub token: Option<String>,
    pub org: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                tracing::error!("Internal API error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        let msg = err.to_string();
        match err {
            DashboardError::UserNotFound { .. }
            | DashboardError::OrganizationNotFound { .. }
            | DashboardError::MetricsNotFound { .. }
            | DashboardError::NoMetrics => ApiError::NotFound(msg),
            DashboardError::DuplicateUsername(_)
            | DashboardError::DuplicateOrganization(_)
            | DashboardError::InvalidMaturityLevel(_)
            | DashboardError::InvalidWindow(_)
            | DashboardError::MissingGitHubCredentials
            | DashboardError::MalformedGitHubToken
            | DashboardError::GitHub(_) => ApiError::BadRequest(msg),
            DashboardError::Database(e) | DashboardError::Other(e) => {
                ApiError::Internal(format!("{:#}", e))
            }
        }
    }
}

/// Typed errors raised inside `DbHandle::call` arrive wrapped in `anyhow`.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<DashboardError>() {
            Ok(typed) => typed.into(),
            Err(other) => ApiError::Internal(format!("{:#}", other)),
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/api/health", get(health_check))
        // dashboard
        .route("/api/dashboard/summary", get(dashboard_summary))
        .route("/api/dashboard/trends", get(dashboard_trends))
        .route("/api/dashboard/maturity-distribution", get(maturity_distribution))
        .route("/api/dashboard/team-breakdown", get(team_breakdown))
        .route("/api/dashboard/kpis", get(list_kpis))
        // metrics
        .route("/api/metrics", get(list_metrics).post(upsert_metrics))
        .route("/api/metrics/latest", get(latest_metrics))
        .route("/api/metrics/adoption", get(adoption_metrics))
        .route("/api/metrics/productivity", get(productivity_metrics))
        .route("/api/metrics/quality", get(quality_metrics))
        .route("/api/metrics/{id}", axum::routing::delete(delete_metrics))
        // users
        .route("/api/users", get(list_users).post(create_user))
        .route("/api/users/stats/by-team", get(users_by_team))
        .route("/api/users/stats/by-maturity", get(users_by_maturity))
        .route(
            "/api/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        // organizations
        .route(
            "/api/organizations",
            get(list_organizations).post(create_organization),
        )
        .route(
            "/api/organizations/{id}",
            get(get_organization).delete(delete_organization),
        )
        // github
        .route("/api/github/test-connection", get(github_test_connection))
        .route("/api/github/sync", post(github_sync))
}

// ── Helpers ───────────────────────────────────────────────────────────

fn deleted(what: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({"message": format!("{} deleted successfully", what)}))
}

async fn metrics_window(state: &SharedState, window: &MetricsWindow) -> ApiResult<Vec<DailyMetrics>> {
    let since = analytics::window_start(Utc::now().date_naive(), window.days_or_default())?;
    let org_id = window.org_id;
    Ok(state
        .db
        .call(move |db| db.metrics_since(since, org_id))
        .await?)
}

/// Request credentials win; otherwise fall back to the server's configured ones.
fn copilot_client(
    settings: &GitHubSettings,
    token: Option<String>,
    org: Option<String>,
) -> Result<CopilotClient, DashboardError> {
    let token = token
        .filter(|t| !t.is_empty())
        .or_else(|| settings.token.clone())
        .ok_or(DashboardError::MissingGitHubCredentials)?;
    let org = org
        .filter(|o| !o.is_empty())
        .or_else(|| settings.org.clone())
        .ok_or(DashboardError::MissingGitHubCredentials)?;
    CopilotClient::new(settings.api_url.clone(), token, org)
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": env!("CARGO_PKG_NAME"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn dashboard_summary(
    State(state): State<SharedState>,
    Query(q): Query<OrgQuery>,
) -> ApiResult<Json<DashboardSummary>> {
    let org_id = q.org_id;
    let summary = state
        .db
        .call(move |db| {
            let latest = db.latest_metrics(org_id)?;
            let (total_users, enabled_users, active_users) = db.user_counts(org_id)?;
            let maturity = db.maturity_counts(org_id)?;
            let kpis = db.list_kpis()?;
            Ok(analytics::dashboard_summary(analytics::SummaryInputs {
                latest: latest.as_ref(),
                total_users,
                enabled_users,
                active_users,
                maturity: &maturity,
                kpis: &kpis,
            }))
        })
        .await?;
    Ok(Json(summary))
}

async fn dashboard_trends(
    State(state): State<SharedState>,
    Query(window): Query<MetricsWindow>,
) -> ApiResult<Json<Vec<TrendPoint>>> {
    let metrics = metrics_window(&state, &window).await?;
    Ok(Json(metrics.iter().map(TrendPoint::from).collect()))
}

async fn maturity_distribution(
    State(state): State<SharedState>,
    Query(q): Query<OrgQuery>,
) -> ApiResult<Json<Vec<MaturityBucket>>> {
    let org_id = q.org_id;
    let counts = state.db.call(move |db| db.maturity_counts(org_id)).await?;
    Ok(Json(analytics::maturity_distribution(&counts)))
}

async fn team_breakdown(State(state): State<SharedState>) -> ApiResult<Json<Vec<TeamBreakdown>>> {
    Ok(Json(state.db.call(|db| db.team_breakdown()).await?))
}

async fn list_kpis(State(state): State<SharedState>) -> ApiResult<Json<Vec<Kpi>>> {
    let stored = state.db.call(|db| db.list_kpis()).await?;
    Ok(Json(analytics::kpis_or_defaults(stored)))
}

/// Newest first.
async fn list_metrics(
    State(state): State<SharedState>,
    Query(window): Query<MetricsWindow>,
) -> ApiResult<Json<Vec<DailyMetrics>>> {
    let mut metrics = metrics_window(&state, &window).await?;
    metrics.reverse();
    Ok(Json(metrics))
}

async fn latest_metrics(
    State(state): State<SharedState>,
    Query(q): Query<OrgQuery>,
) -> ApiResult<Json<DailyMetrics>> {
    let org_id = q.org_id;
    state
        .db
        .call(move |db| db.latest_metrics(org_id))
        .await?
        .map(Json)
        .ok_or_else(|| DashboardError::NoMetrics.into())
}

async fn upsert_metrics(
    State(state): State<SharedState>,
    Json(req): Json<NewDailyMetrics>,
) -> ApiResult<Json<DailyMetrics>> {
    let metrics = state
        .db
        .call(move |db| {
            if db.get_organization(req.organization_id)?.is_none() {
                return Err(DashboardError::OrganizationNotFound {
                    id: req.organization_id,
                }
                .into());
            }
            db.upsert_metrics(&req)
        })
        .await?;
    Ok(Json(metrics))
}

async fn adoption_metrics(
    State(state): State<SharedState>,
    Query(window): Query<MetricsWindow>,
) -> ApiResult<Json<analytics::AdoptionReport>> {
    let metrics = metrics_window(&state, &window).await?;
    Ok(Json(analytics::adoption_report(&metrics)))
}

async fn productivity_metrics(
    State(state): State<SharedState>,
    Query(window): Query<MetricsWindow>,
) -> ApiResult<Json<analytics::ProductivityReport>> {
    let metrics = metrics_window(&state, &window).await?;
    Ok(Json(analytics::productivity_report(&metrics)))
}

async fn quality_metrics(
    State(state): State<SharedState>,
    Query(window): Query<MetricsWindow>,
) -> ApiResult<Json<analytics::QualityReport>> {
    let metrics = metrics_window(&state, &window).await?;
    Ok(Json(analytics::quality_report(&metrics)))
}

async fn delete_metrics(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.call(move |db| db.delete_metrics(id)).await? {
        return Err(DashboardError::MetricsNotFound { id }.into());
    }
    Ok(deleted("Metrics"))
}

async fn list_users(
    State(state): State<SharedState>,
    Query(filter): Query<UserFilter>,
) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.db.call(move |db| db.list_users(&filter)).await?))
}

async fn get_user(State(state): State<SharedState>, Path(id): Path<i64>) -> ApiResult<Json<User>> {
    state
        .db
        .call(move |db| db.get_user(id))
        .await?
        .map(Json)
        .ok_or_else(|| DashboardError::UserNotFound { id }.into())
}

async fn create_user(
    State(state): State<SharedState>,
    Json(req): Json<NewUser>,
) -> ApiResult<impl IntoResponse> {
    let user = state.db.call(move |db| db.create_user(&req)).await?;
    tracing::debug!(id = user.id, username = %user.github_username, "user created");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn update_user(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
    Json(req): Json<UserUpdate>,
) -> ApiResult<Json<User>> {
    state
        .db
        .call(move |db| db.update_user(id, &req))
        .await?
        .map(Json)
        .ok_or_else(|| DashboardError::UserNotFound { id }.into())
}

async fn delete_user(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.call(move |db| db.delete_user(id)).await? {
        return Err(DashboardError::UserNotFound { id }.into());
    }
    Ok(deleted("User"))
}

async fn users_by_team(State(state): State<SharedState>) -> ApiResult<Json<Vec<TeamStats>>> {
    Ok(Json(state.db.call(|db| db.team_stats()).await?))
}

async fn users_by_maturity(
    State(state): State<SharedState>,
) -> ApiResult<Json<Vec<MaturityCount>>> {
    let counts = state.db.call(|db| db.maturity_counts(None)).await?;
    Ok(Json(analytics::maturity_counts(&counts)))
}

async fn list_organizations(
    State(state): State<SharedState>,
) -> ApiResult<Json<Vec<Organization>>> {
    Ok(Json(state.db.call(|db| db.list_organizations()).await?))
}

async fn get_organization(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Organization>> {
    state
        .db
        .call(move |db| db.get_organization(id))
        .await?
        .map(Json)
        .ok_or_else(|| DashboardError::OrganizationNotFound { id }.into())
}

async fn create_organization(
    State(state): State<SharedState>,
    Json(req): Json<NewOrganization>,
) -> ApiResult<impl IntoResponse> {
    let org = state.db.call(move |db| db.create_organization(&req)).await?;
    Ok((StatusCode::CREATED, Json(org)))
}

async fn delete_organization(
    State(state): State<SharedState>,
    Path(id): Path<i64>,
) -> ApiResult<impl IntoResponse> {
    if !state.db.call(move |db| db.delete_organization(id)).await? {
        return Err(DashboardError::OrganizationNotFound { id }.into());
    }
    Ok(deleted("Organization"))
}

async fn github_test_connection(
    State(state): State<SharedState>,
    Query(q): Query<ConnectionQuery>,
) -> ApiResult<Json<ConnectionReport>> {
    let client = copilot_client(&state.github, q.token, q.org)?;
    let members = client
        .members()
        .await
        .map_err(|e| DashboardError::GitHub(format!("{:#}", e)))?;
    Ok(Json(ConnectionReport {
        success: true,
        message: format!("Successfully connected to {}", client.org()),
        members_count: members.len(),
    }))
}

async fn github_sync(
    State(state): State<SharedState>,
    Json(req): Json<SyncRequest>,
) -> ApiResult<Json<SyncReport>> {
    let client = copilot_client(&state.github, req.token, req.org)?;
    let options = SyncOptions {
        sync_users: req.sync_users,
        sync_metrics: req.sync_metrics,
        days: req.days,
    };
    Ok(Json(sync_organization(&state.db, &client, options).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use crate::dashboard::db::DashboardDb;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn test_state() -> SharedState {
        Arc::new(AppState {
            db: DbHandle::new(DashboardDb::new_in_memory().unwrap()),
            github: GitHubSettings::default(),
        })
    }

    fn test_app() -> Router {
        api_router().with_state(test_state())
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn today_minus(days: i64) -> String {
        (Utc::now().date_naive() - Duration::days(days))
            .format("%Y-%m-%d")
            .to_string()
    }

    async fn seed_org(app: &Router) -> i64 {
        let (status, org) = send(app, "POST", "/api/organizations", Some(json!({"github_org": "acme"}))).await;
        assert_eq!(status, StatusCode::CREATED);
        org["id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "copilot-pulse");
    }

    #[tokio::test]
    async fn test_empty_summary_reports_zeros() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/api/dashboard/summary", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["total_users"], 0);
        assert_eq!(body["activation_rate"], 0.0);
        assert_eq!(body["language_breakdown"], json!({}));
    }

    #[tokio::test]
    async fn test_maturity_distribution_has_six_levels() {
        let app = test_app();
        send(&app, "POST", "/api/users", Some(json!({"github_username": "mona", "maturity_level": 3}))).await;
        let (status, body) = send(&app, "GET", "/api/dashboard/maturity-distribution", None).await;
        assert_eq!(status, StatusCode::OK);
        let levels = body.as_array().unwrap();
        assert_eq!(levels.len(), 6);
        assert_eq!(levels[3]["count"], 1);
        assert_eq!(levels[3]["description"], "Working User");
    }

    #[tokio::test]
    async fn test_kpis_default_when_empty() {
        let app = test_app();
        let (_, body) = send(&app, "GET", "/api/dashboard/kpis", None).await;
        let kpis = body.as_array().unwrap();
        assert_eq!(kpis.len(), 4);
        assert_eq!(kpis[0]["name"], "Activation Rate");
        assert_eq!(kpis[0]["target"], 60.0);
    }

    #[tokio::test]
    async fn test_latest_metrics_404_when_empty() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/api/metrics/latest", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No metrics found");
    }

    #[tokio::test]
    async fn test_category_metrics_empty_has_null_summary() {
        let app = test_app();
        for category in ["adoption", "productivity", "quality"] {
            let (status, body) = send(&app, "GET", &format!("/api/metrics/{}", category), None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"summary": null, "trends": []}));
        }
    }

    #[tokio::test]
    async fn test_upsert_metrics_then_trends_and_latest() {
        let app = test_app();
        let org_id = seed_org(&app).await;
        for (offset, wau) in [(2, 5), (1, 8)] {
            let (status, _) = send(
                &app,
                "POST",
                "/api/metrics",
                Some(json!({
                    "organization_id": org_id,
                    "date": today_minus(offset),
                    "weekly_active_users": wau,
                    "acceptance_rate": 30.0
                })),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
        }

        let (_, trends) = send(&app, "GET", "/api/dashboard/trends?days=7", None).await;
        let trends = trends.as_array().unwrap();
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0]["weekly_active_users"], 5);

        let (_, latest) = send(&app, "GET", "/api/metrics/latest", None).await;
        assert_eq!(latest["weekly_active_users"], 8);

        let (_, listed) = send(&app, "GET", "/api/metrics", None).await;
        assert_eq!(listed[0]["weekly_active_users"], 8);

        let (_, adoption) = send(&app, "GET", "/api/metrics/adoption", None).await;
        assert_eq!(adoption["summary"]["wau"], 8);
        assert_eq!(adoption["trends"].as_array().unwrap().len(), 2);

        let (_, summary) = send(&app, "GET", "/api/dashboard/summary", None).await;
        assert_eq!(summary["weekly_active_users"], 8);
    }

    #[tokio::test]
    async fn test_upsert_metrics_unknown_org_is_404() {
        let app = test_app();
        let (status, _) = send(
            &app,
            "POST",
            "/api/metrics",
            Some(json!({"organization_id": 42, "date": today_minus(0)})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_metrics() {
        let app = test_app();
        let org_id = seed_org(&app).await;
        let (_, created) = send(
            &app,
            "POST",
            "/api/metrics",
            Some(json!({"organization_id": org_id, "date": today_minus(0)})),
        )
        .await;
        let uri = format!("/api/metrics/{}", created["id"]);
        let (status, body) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Metrics deleted successfully");
        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_user_crud_flow() {
        let app = test_app();
        let (status, user) = send(
            &app,
            "POST",
            "/api/users",
            Some(json!({"github_username": "mona", "maturity_level": 2, "team": "Backend", "is_active": true})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(user["name"], "mona");
        assert_eq!(user["is_weekly_active"], true);
        assert_eq!(user["is_active"], true);
        let id = user["id"].as_i64().unwrap();

        let (status, updated) = send(
            &app,
            "PUT",
            &format!("/api/users/{}", id),
            Some(json!({"is_active": false, "team": "Platform"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["copilot_enabled"], false);
        assert_eq!(updated["team"], "Platform");

        let (status, fetched) = send(&app, "GET", &format!("/api/users/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["team"], "Platform");

        let (status, _) = send(&app, "DELETE", &format!("/api/users/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = send(&app, "GET", &format!("/api/users/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_duplicate_username_is_400() {
        let app = test_app();
        send(&app, "POST", "/api/users", Some(json!({"github_username": "mona"}))).await;
        let (status, body) = send(&app, "POST", "/api/users", Some(json!({"github_username": "mona"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("already exists"));
    }

    #[tokio::test]
    async fn test_invalid_maturity_is_400() {
        let app = test_app();
        let (status, _) = send(
            &app,
            "POST",
            "/api/users",
            Some(json!({"github_username": "mona", "maturity_level": 9})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_user_filters_and_stats() {
        let app = test_app();
        for (name, level, team) in [("zed", 4, "Backend"), ("amy", 1, "Backend"), ("bob", 3, "QA")] {
            send(
                &app,
                "POST",
                "/api/users",
                Some(json!({"github_username": name, "maturity_level": level, "team": team, "copilot_enabled": true})),
            )
            .await;
        }
        let (_, active) = send(&app, "GET", "/api/users?active_only=true", None).await;
        let names: Vec<&str> = active
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["github_username"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["bob", "zed"]);

        let (_, backend) = send(&app, "GET", "/api/users?team=Backend", None).await;
        assert_eq!(backend.as_array().unwrap().len(), 2);

        let (_, by_team) = send(&app, "GET", "/api/users/stats/by-team", None).await;
        assert_eq!(by_team[0]["team"], "Backend");
        assert_eq!(by_team[0]["avg_maturity"], 2.5);

        let (_, by_maturity) = send(&app, "GET", "/api/users/stats/by-maturity", None).await;
        assert_eq!(by_maturity.as_array().unwrap().len(), 3);
        assert_eq!(by_maturity[0]["name"], "L1 - Enabled");

        let (_, teams) = send(&app, "GET", "/api/dashboard/team-breakdown", None).await;
        assert_eq!(teams[0]["activation_rate"], 50.0);
    }

    #[tokio::test]
    async fn test_organization_crud_and_duplicate() {
        let app = test_app();
        let id = seed_org(&app).await;
        let (status, _) = send(&app, "POST", "/api/organizations", Some(json!({"github_org": "acme"}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, list) = send(&app, "GET", "/api/organizations", None).await;
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, _) = send(&app, "DELETE", &format!("/api/organizations/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, "GET", &format!("/api/organizations/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_out_of_range_days_is_400() {
        let app = test_app();
        for uri in [
            "/api/dashboard/trends?days=4294967295",
            "/api/metrics?days=4294967295",
            "/api/metrics/adoption?days=4294967295",
            "/api/metrics/quality?days=4294967295",
        ] {
            let (status, body) = send(&app, "GET", uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert!(body["error"].as_str().unwrap().contains("4294967295"));
        }
    }

    #[tokio::test]
    async fn test_github_sync_requires_credentials() {
        let app = test_app();
        let (status, body) = send(&app, "POST", "/api/github/sync", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("required"));
    }

    #[tokio::test]
    async fn test_github_test_connection_rejects_bad_token() {
        let app = test_app();
        let (status, _) = send(
            &app,
            "GET",
            "/api/github/test-connection?token=hunter2&org=acme",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_github_sync_against_mock_api() {
        let base = crate::dashboard::sync::tests::mock_github(true, true).await;
        let state = Arc::new(AppState {
            db: DbHandle::new(DashboardDb::new_in_memory().unwrap()),
            github: GitHubSettings {
                api_url: base,
                token: Some("ghp_configured".into()),
                org: Some("acme".into()),
            },
        });
        let app = api_router().with_state(state);

        let (status, report) = send(&app, "POST", "/api/github/sync", Some(json!({"days": 7}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(report["success"], true);
        assert_eq!(report["users_synced"], 2);

        let (status, conn) = send(&app, "GET", "/api/github/test-connection", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(conn["members_count"], 2);

        let (status, body) = send(
            &app,
            "POST",
            "/api/github/sync",
            Some(json!({"days": 4294967295u32})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("Invalid window"));
    }

    #[test]
    fn test_anyhow_wrapped_dashboard_error_keeps_status() {
        let err: anyhow::Error = DashboardError::UserNotFound { id: 3 }.into();
        assert!(matches!(ApiError::from(err), ApiError::NotFound(_)));
        let err = anyhow::anyhow!("disk full");
        assert!(matches!(ApiError::from(err), ApiError::Internal(_)));
    }
}
