//! Polyvox CLI - drive the polyvox voice allocator from the command line.

mod commands;
mod error;
mod script;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "polyvox")]
#[command(author, version, about = "Polyvox voice allocator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a note script and print the allocator's events
    Replay(commands::replay::ReplayArgs),

    /// Print an equal-temperament tuning table
    Tuning(commands::tuning::TuningArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Replay(args) => commands::replay::run(args),
        Commands::Tuning(args) => commands::tuning::run(args),
    }
}
