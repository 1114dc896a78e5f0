use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "copilot_pulse=debug"
    } else {
        "copilot_pulse=info"
    }
}

/// A usable `RUST_LOG` wins outright; otherwise the crate logs at `info`,
/// or `debug` when `verbose` is set.
fn env_filter(rust_log: Option<&str>, verbose: bool) -> Result<EnvFilter> {
    if let Some(filter) = rust_log
        .filter(|s| !s.trim().is_empty())
        .and_then(|s| EnvFilter::try_new(s).ok())
    {
        return Ok(filter);
    }
    EnvFilter::try_new(default_directive(verbose)).context("Invalid log directive")
}

/// Initialize logging to stderr, leaving stdout to command output.
pub fn init_logging(verbose: bool, format: LogFormat) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = env_filter(rust_log.as_deref(), verbose)?;

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_current_span(false)
                    .with_span_list(false),
            )
            .try_init(),
    }
    .context("Failed to install tracing subscriber")
}
