//! drainhook: node lifecycle helper CLI.
//!
//! Runs the steps of a lifecycle episode that need no cloud client,
//! reading and writing parameter bags as JSON. Logs go to stderr so
//! stdout stays machine-readable.
//!
//! # Usage
//!
//! ```text
//! drainhook seed --kind drain --event event.json > bag.json
//! drainhook check-deadline --input bag.json
//! drainhook --config drainhook.toml config
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use drainhook_core::StaticConfig;
use tracing::debug;

mod commands;

#[derive(Parser)]
#[command(
    name = "drainhook",
    about = "Drain and readiness helpers for fleet node lifecycle hooks",
    version,
    propagate_version = true
)]
struct Cli {
    /// Read static configuration from a TOML file instead of the environment.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the first parameter bag of an episode from a lifecycle event.
    ///
    /// The event is the event-bus envelope (`{"detail": {...}}`) or the
    /// bare lifecycle event.
    Seed {
        /// Which workflow the bag is for.
        #[arg(short, long, value_enum)]
        kind: commands::seed::Kind,
        /// Event file, `-` for stdin.
        #[arg(short, long, default_value = "-")]
        event: String,
        /// Override the current time (RFC 3339).
        #[arg(long)]
        now: Option<String>,
    },
    /// Set PastDeadline on a parameter bag.
    CheckDeadline {
        /// Bag file, `-` for stdin.
        #[arg(short, long, default_value = "-")]
        input: String,
        /// Override the current time (RFC 3339).
        #[arg(long)]
        now: Option<String>,
    },
    /// Print the effective static configuration as TOML.
    Config,
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,drainhook=debug"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<StaticConfig> {
    let config = match path {
        Some(path) => StaticConfig::from_file(path)?,
        None => StaticConfig::from_env()?,
    };
    debug!(?config, "static configuration loaded");
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Commands::Seed { kind, event, now } => {
            let config = load_config(cli.config.as_ref())?;
            commands::seed::run(kind, &event, &config, now.as_deref())
        }
        Commands::CheckDeadline { input, now } => commands::deadline::run(&input, now.as_deref()),
        Commands::Config => {
            let config = load_config(cli.config.as_ref())?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}
