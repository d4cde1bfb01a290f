//! Pensum CLI entry point.

use anyhow::Result;
use clap::Parser;
use pensum::cli::{commands, Cli, Commands};
use pensum::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("pensum={}", log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(Some(&std::path::PathBuf::from(path)))?,
        None => Settings::load()?,
    };

    std::fs::create_dir_all(settings.data_dir())?;

    match &cli.command {
        Commands::Ask { question } => {
            commands::run_ask(question, settings).await?;
        }

        Commands::Chat => {
            commands::run_chat(settings).await?;
        }

        Commands::Ingest { path, clear } => {
            commands::run_ingest(path.as_deref(), *clear, settings).await?;
        }

        Commands::Courses => {
            commands::run_courses(settings).await?;
        }

        Commands::Serve { host, port } => {
            commands::run_serve(host, *port, settings).await?;
        }

        Commands::Config { action } => {
            commands::run_config(action, &settings)?;
        }
    }

    Ok(())
}
