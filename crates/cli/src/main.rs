use std::path::PathBuf;

use {
    clap::Parser,
    tracing::{error, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use kotori_runtime::BotClient;

#[derive(Parser)]
#[command(name = "kotori", about = "kotori — OneBot plugin framework")]
struct Cli {
    /// Path to the bot config file.
    #[arg(long, default_value = "bot.yaml", env = "KOTORI_CONFIG")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_tracing(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.clone()));
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    let config = match kotori_config::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load config");
            return std::process::ExitCode::FAILURE;
        },
    };

    let client = match BotClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to assemble bot");
            return std::process::ExitCode::FAILURE;
        },
    };

    match client.run_front().await {
        Ok(()) => {
            info!("bye");
            std::process::ExitCode::SUCCESS
        },
        Err(e) => {
            error!(error = %e, "bot exited with error");
            std::process::ExitCode::FAILURE
        },
    }
}
