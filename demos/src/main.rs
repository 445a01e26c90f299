//! Dynwire demo host

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use dynwire_config::load_config;
use dynwire_core::Context;
use dynwire_runtime::App;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dynwire-demo")]
#[command(about = "Wire plugin modules into a dependency-injection container", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the configured modules, start the app, then stop it
    Run {
        /// Path to configuration file
        #[arg(short, long, default_value = "plugins.yaml", env = "DYNWIRE_CONFIG")]
        config: PathBuf,

        /// Log level (trace, debug, info, warn, error)
        #[arg(short, long, default_value = "info")]
        log_level: String,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "plugins.yaml", env = "DYNWIRE_CONFIG")]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, log_level } => {
            init_tracing(&log_level)?;

            tracing::info!(config = %config.display(), "Loading plugin configuration");
            let config = load_config(&config)?;

            let app = App::new(config.provide());
            if let Some(err) = app.err() {
                bail!("{err}");
            }

            let ctx = Context::new();
            app.start(&ctx)?;
            tracing::info!("Application running");
            app.stop(&ctx)?;

            Ok(())
        }

        Commands::Validate { config } => {
            tracing_subscriber::fmt().with_target(false).init();

            match load_config(&config) {
                Ok(cfg) => {
                    tracing::info!(
                        plugins = cfg.plugins.len(),
                        sets = cfg.sets.len(),
                        "Configuration is valid"
                    );
                    Ok(())
                }
                Err(e) => {
                    tracing::error!(error = %e, "Configuration validation failed");
                    std::process::exit(1);
                }
            }
        }
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true),
        )
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(filter.into()))
        .init();

    Ok(())
}
