mod admin_commands;
mod config_commands;
mod run_commands;

use std::path::PathBuf;

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    hookrelay_config::HookrelayConfig,
    tracing::info,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "hookrelay", about = "hookrelay: forward chat messages to IFTTT and NTFY")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Config file to load instead of searching the default locations.
    #[arg(long, global = true, env = "HOOKRELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Relay JSON-line chat events from a file or stdin.
    Run(run_commands::RunArgs),
    /// Run one admin command against a guild's settings.
    Command(admin_commands::CommandArgs),
    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr so stdout carries only command replies.
    if cli.json_logs {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

/// Load `--config` when given, otherwise search the default locations.
fn load_config(path: Option<&PathBuf>) -> anyhow::Result<HookrelayConfig> {
    match path {
        Some(path) => hookrelay_config::load_config(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(hookrelay_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_telemetry(&cli);

    info!(version = env!("CARGO_PKG_VERSION"), "hookrelay starting");

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Run(args) => run_commands::handle_run(config, args).await,
        Commands::Command(args) => admin_commands::handle_command(config, args).await,
        Commands::Config { action } => config_commands::handle_config(&config, action),
    }
}
