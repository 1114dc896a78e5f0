//! API server and database setup commands: `copilot-pulse serve` and `copilot-pulse init`.

use std::path::PathBuf;

use anyhow::Result;

use copilot_pulse::config::DashboardToml;
use copilot_pulse::dashboard::server::{ServerConfig, open_database, start_server};

use crate::Cli;

/// CLI overrides for `serve`; unset fields keep the config file's values.
pub struct ServeArgs {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub db_path: Option<PathBuf>,
    pub seed: bool,
    pub dev: bool,
}

impl ServeArgs {
    fn apply(self, config: &mut ServerConfig) {
        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(db_path) = self.db_path {
            config.db_path = db_path;
        }
        config.seed |= self.seed;
        config.dev_mode = self.dev;
    }
}

pub async fn cmd_serve(cli: &Cli, args: ServeArgs) -> Result<()> {
    let toml = DashboardToml::resolve(cli.config.as_deref())?;
    for warning in toml.validate() {
        tracing::warn!("config: {}", warning);
    }

    let mut config = toml.server_config();
    args.apply(&mut config);
    if config.github.token.is_none() {
        tracing::debug!("GITHUB_TOKEN not set; sync requests must carry their own token");
    }

    start_server(config).await
}

pub fn cmd_init(cli: &Cli, db_path: Option<PathBuf>, seed: bool) -> Result<()> {
    let toml = DashboardToml::resolve(cli.config.as_deref())?;
    let db_path = db_path.unwrap_or(toml.database.path);

    let (_, seeded) = open_database(&db_path, seed)?;
    println!(
        "{} {}",
        console::style("Database ready at").green(),
        db_path.display()
    );
    match seeded {
        Some(report) => println!(
            "  Loaded sample data: {} users, {} days of metrics, {} KPIs",
            report.users, report.metric_days, report.kpis
        ),
        None if seed => println!("  Database already has data; sample data not loaded."),
        None => {}
    }
    Ok(())
}
