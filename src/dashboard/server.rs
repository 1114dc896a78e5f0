use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{Router, http::HeaderValue};
use chrono::Utc;
use tower_http::cors::{Any, CorsLayer};

use super::api::{self, AppState, GitHubSettings};
use super::db::{DashboardDb, DbHandle};
use super::seed::{self, SeedReport};

/// Configuration for the API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub cors_origins: Vec<String>,
    pub dev_mode: bool,
    pub seed: bool,
    pub github: GitHubSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            db_path: PathBuf::from(".copilot-pulse/metrics.db"),
            cors_origins: vec!["http://localhost:5173".to_string()],
            dev_mode: false,
            seed: false,
            github: GitHubSettings::default(),
        }
    }
}

/// Open (creating and migrating if needed) the database, seeding sample data
/// into it when `seed` is set and it is empty.
pub fn open_database(path: &Path, seed: bool) -> Result<(DashboardDb, Option<SeedReport>)> {
    let db = DashboardDb::new(path)
        .with_context(|| format!("Failed to initialize database at {}", path.display()))?;
    let report = if seed {
        seed::seed_if_empty(&db, Utc::now().date_naive()).context("Failed to seed sample data")?
    } else {
        None
    };
    Ok((db, report))
}

/// Dev mode allows any origin; otherwise only the configured ones.
pub fn cors_layer(origins: &[String], dev_mode: bool) -> CorsLayer {
    if dev_mode {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Build the full application router.
pub fn build_router(state: Arc<AppState>, cors: CorsLayer) -> Router {
    api::api_router().layer(cors).with_state(state)
}

/// Start the API server and run until Ctrl-C.
pub async fn start_server(config: ServerConfig) -> Result<()> {
    let (db, seeded) = open_database(&config.db_path, config.seed)?;
    if let Some(report) = seeded {
        tracing::info!(users = report.users, days = report.metric_days, "loaded sample data");
    }

    let state = Arc::new(AppState {
        db: DbHandle::new(db),
        github: config.github.clone(),
    });
    let app = build_router(state, cors_layer(&config.cors_origins, config.dev_mode));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!(
        db = %config.db_path.display(),
        dev = config.dev_mode,
        "copilot-pulse API listening on http://{}",
        local_addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    fn test_router(dev_mode: bool) -> Router {
        let state = Arc::new(AppState {
            db: DbHandle::new(DashboardDb::new_in_memory().unwrap()),
            github: GitHubSettings::default(),
        });
        build_router(
            state,
            cors_layer(&["http://localhost:5173".to_string()], dev_mode),
        )
    }

    #[tokio::test]
    async fn test_health_via_full_router() {
        let app = test_router(false);
        let req = Request::builder()
            .uri("/api/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let app = test_router(false);
        let req = Request::builder()
            .uri("/api/nope")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let app = test_router(false);
        let req = Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, "http://localhost:5173")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:5173"
        );
    }

    #[tokio::test]
    async fn test_cors_rejects_other_origin_outside_dev() {
        let app = test_router(false);
        let req = Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, "http://evil.example")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(
            resp.headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_dev_mode_is_permissive() {
        let app = test_router(true);
        let req = Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, "http://anything.example")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert!(
            resp.headers()
                .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        );
    }

    #[test]
    fn test_open_database_seeds_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/metrics.db");
        let (_, first) = open_database(&path, true).unwrap();
        assert!(first.is_some());
        assert!(path.exists());
        let (_, second) = open_database(&path, true).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.db_path, PathBuf::from(".copilot-pulse/metrics.db"));
        assert!(!config.dev_mode);
        assert!(!config.seed);
    }
}
