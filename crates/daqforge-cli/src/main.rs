//! daqforge CLI - configuration generator for DAQ benchmarking rigs.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "daqforge")]
#[command(author, version, about = "DAQ rig configuration generator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate configuration documents and the symbol map
    Generate(commands::generate::GenerateArgs),

    /// Show the topology assignment without writing artifacts
    Plan(commands::plan::PlanArgs),

    /// Parse inventories and summarize the cabling graph
    Inspect(commands::inspect::InspectArgs),

    /// List fragment templates and show their contents
    Fragments(commands::fragments::FragmentsArgs),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate(args) => commands::generate::run(args),
        Commands::Plan(args) => commands::plan::run(args),
        Commands::Inspect(args) => commands::inspect::run(args),
        Commands::Fragments(args) => commands::fragments::run(args),
    }
}
