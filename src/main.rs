use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use copilot_pulse::logging::{LogFormat, init_logging};
use copilot_pulse::refresh::ViewKind;

mod cmd;

#[derive(Parser)]
#[command(name = "copilot-pulse")]
#[command(version, about = "Copilot adoption metrics dashboard")]
pub struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to dashboard.toml (default: .copilot-pulse/dashboard.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, value_enum, default_value = "text", global = true)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the metrics REST API
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(short, long)]
        port: Option<u16>,

        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Load sample data into an empty database
        #[arg(long)]
        seed: bool,

        /// Enable dev mode (CORS permissive for a local front-end dev server)
        #[arg(long)]
        dev: bool,
    },
    /// Create or migrate the database
    Init {
        #[arg(long)]
        db_path: Option<PathBuf>,

        /// Load sample data into an empty database
        #[arg(long)]
        seed: bool,
    },
    /// Show a live, self-refreshing view in the terminal
    Watch {
        #[arg(long, default_value = "dashboard")]
        view: ViewKind,

        /// Base URL of the API (default from config or COPILOT_PULSE_API_URL)
        #[arg(long)]
        api_url: Option<String>,

        /// Seconds between automatic refreshes; 0 disables the timer
        #[arg(long)]
        interval: Option<u64>,

        /// Print the first result and exit
        #[arg(long)]
        once: bool,
    },
    /// Ask the API to pull data from GitHub
    Sync {
        /// GitHub organization (default from config or GITHUB_ORG)
        #[arg(long)]
        org: Option<String>,

        #[arg(long, default_value = "30")]
        days: u32,

        #[arg(long)]
        api_url: Option<String>,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
    /// Initialize a default dashboard.toml file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    copilot_pulse::config::load_env_file();
    init_logging(cli.verbose, cli.log_format)?;

    match &cli.command {
        Commands::Serve {
            host,
            port,
            db_path,
            seed,
            dev,
        } => {
            cmd::cmd_serve(
                &cli,
                cmd::ServeArgs {
                    host: host.clone(),
                    port: *port,
                    db_path: db_path.clone(),
                    seed: *seed,
                    dev: *dev,
                },
            )
            .await?
        }
        Commands::Init { db_path, seed } => cmd::cmd_init(&cli, db_path.clone(), *seed)?,
        Commands::Watch {
            view,
            api_url,
            interval,
            once,
        } => cmd::cmd_watch(&cli, *view, api_url.clone(), *interval, *once).await?,
        Commands::Sync { org, days, api_url } => {
            cmd::cmd_sync(&cli, org.clone(), *days, api_url.clone()).await?
        }
        Commands::Config { command } => cmd::cmd_config(&cli, command.clone())?,
    }

    Ok(())
}
