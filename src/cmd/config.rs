//! Configuration view and validation commands: `copilot-pulse config`.

use anyhow::Result;

use copilot_pulse::config::{DashboardToml, default_config_path};

use super::super::{Cli, ConfigCommands};

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Copilot Pulse Configuration");
            println!("===========================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                DashboardToml::load(&config_path)?
            } else {
                println!("No dashboard.toml found at {}", config_path.display());
                println!("Using default configuration.");
                DashboardToml::default()
            };
            println!();

            println!("[server]");
            println!("  host = \"{}\"", toml.server.host);
            println!("  port = {}", toml.server.port);
            println!("  cors_origins = {:?}", toml.server.cors_origins);
            println!();

            println!("[database]");
            println!("  path = \"{}\"", toml.database.path.display());
            println!("  seed_sample_data = {}", toml.database.seed_sample_data);
            println!();

            println!("[github]");
            println!("  api_url = \"{}\"", toml.github.api_url);
            if let Some(org) = &toml.github.org {
                println!("  org = \"{}\"", org);
            }
            println!();

            println!("[refresh]");
            println!("  api_url = \"{}\"", toml.refresh.api_url);
            println!("  interval_secs = {}", toml.refresh.interval_secs);
            println!("  request_timeout_secs = {}", toml.refresh.request_timeout_secs);
            println!();

            println!("Effective values (with env overrides):");
            println!("  api_url = \"{}\"", toml.api_url());
            println!(
                "  github org = {}",
                toml.github_org().as_deref().unwrap_or("(not set)")
            );
            println!(
                "  github token = {}",
                if toml.github_token().is_some() {
                    "set"
                } else {
                    "(not set)"
                }
            );
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No dashboard.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = DashboardToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("dashboard.toml already exists at {}", config_path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }

            DashboardToml::default().save(&config_path)?;

            println!("Created dashboard.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] host, port, cors_origins");
            println!("  - [database] path, seed_sample_data");
            println!("  - [github] api_url, org (token via GITHUB_TOKEN)");
            println!("  - [refresh] api_url, interval_secs, request_timeout_secs");
            println!();
        }
    }

    Ok(())
}
