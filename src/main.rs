use anyhow::Result;
use clap::{Parser, Subcommand};
use co2track::log_format::TargetFirstFormat;
use co2track::tracker_config::{TrackerConfigFile, config_path};
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

/// `git describe` when built from a checkout, otherwise the Cargo version
fn version() -> &'static str {
    option_env!("VERGEN_GIT_DESCRIBE")
        .filter(|describe| !describe.is_empty() && !describe.starts_with("VERGEN_"))
        .unwrap_or(env!("CARGO_PKG_VERSION"))
}

#[derive(Parser, Debug)]
#[command(
    name = "co2track",
    about = "Estimate distance flown and CO2 emitted by aircraft seen by an ADS-B receiver",
    version = version()
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Poll the receiver and track totals until Ctrl+C
    Run {
        /// Config file (default: $CO2TRACK_CONFIG, then ./co2track.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Show the emission factor used for an aircraft classification
    Factor {
        /// ICAO type designator, e.g. B738
        type_code: Option<String>,
        /// Wake turbulence class (L, M, H, J)
        #[arg(long)]
        wtc: Option<String>,
        /// ADS-B emitter category (A1..A7, B1..)
        #[arg(long)]
        category: Option<String>,
    },
    /// Print the all-time totals once and exit
    Summary {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(explicit: Option<PathBuf>) -> Result<TrackerConfigFile> {
    let path = config_path(explicit.as_deref());
    let config = TrackerConfigFile::load_or_default(&path)?;
    info!("Using config {:?}", path);
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .event_format(TargetFirstFormat::new(std::io::stderr().is_terminal())),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            info!("co2track {} starting", version());
            commands::handle_run(load_config(config)?).await
        }
        Commands::Factor {
            type_code,
            wtc,
            category,
        } => commands::handle_factor(
            type_code.as_deref(),
            wtc.as_deref(),
            category.as_deref(),
        ),
        Commands::Summary { config } => commands::handle_summary(load_config(config)?).await,
    }
}
