//! Metrics REST API: the remote data source the refresh core polls.
//!
//! ## Module Map
//!
//! ```text
//! ┌──────────┐   HTTP   ┌──────────────────────────────────────────────────┐
//! │  watch / │ ───────> │  server.rs  (axum Router, ServerConfig, CORS)     │
//! │  web UI  │ <─────── │    └─ api.rs  (route handlers, AppState)          │
//! └──────────┘          │         │                                        │
//!                       │         │ DbHandle::call() on the blocking pool   │
//!                       │         v                                        │
//!                       │  db.rs  (DashboardDb over SQLite)                 │
//!                       │         ^                                        │
//!                       │         │ upserts                                │
//!                       │  sync.rs  <── github.rs (CopilotClient, reqwest)  │
//!                       └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Supporting Modules
//!
//! | Module      | Responsibility                                            |
//! |-------------|-----------------------------------------------------------|
//! | `models`    | Row and payload types: `User`, `DailyMetrics`, `Kpi`      |
//! | `analytics` | Summary, maturity distribution, category reports          |
//! | `seed`      | Deterministic sample data for an empty database           |

pub mod analytics;
pub mod api;
pub mod db;
pub mod github;
pub mod models;
pub mod seed;
pub mod server;
pub mod sync;
