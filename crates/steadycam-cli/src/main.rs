mod commands;
mod session;
mod summary;
mod synthetic;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "steadycam", about = "Real-time video stabilization tool")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print or save a stabilization config as TOML
    Config(commands::config::ConfigArgs),
    /// Stabilize a synthetic sequence and report throughput
    Bench(commands::bench::BenchArgs),
    /// Stabilize a directory of image frames
    Run(commands::run::RunArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match &cli.command {
        Commands::Config(args) => commands::config::run(args),
        Commands::Bench(args) => commands::bench::run(args),
        Commands::Run(args) => commands::run::run(args),
    }
}
