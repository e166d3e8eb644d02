//! `lanekit` - capability report, kernel bindings and variant profiling.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "lanekit")]
#[command(author, version, about = "Inspect and profile LaneKit kernel dispatch", long_about = None)]
struct Cli {
    /// Configuration file, instead of `lanekit.toml` or `LANEKIT_CONFIG`
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Ignore configuration files and environment, resolve automatically
    #[arg(long, global = true, conflicts_with = "config")]
    no_config: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Show detected capabilities, the selected machine and kernel bindings
    Info {
        /// Also list every builtin machine table
        #[arg(long)]
        all_machines: bool,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Time every implementation the CPU can run and pick the fastest
    Profile {
        /// Calls per variant
        #[arg(short, long, default_value_t = 1_000)]
        iterations: usize,

        /// Elements per call
        #[arg(short, long, default_value_t = 131_071)]
        points: usize,

        /// Write the full report as JSON
        #[arg(long)]
        json: Option<PathBuf>,

        /// Write a configuration file pinning the fastest variants
        #[arg(long)]
        write_config: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let registry = commands::build_registry(cli.config.as_deref(), cli.no_config)?;

    match cli.command {
        Command::Info { all_machines, json } => commands::info(&registry, all_machines, json),
        Command::Profile {
            iterations,
            points,
            json,
            write_config,
        } => commands::profile(
            &registry,
            iterations,
            points,
            json.as_deref(),
            write_config.as_deref(),
        ),
    }
}
