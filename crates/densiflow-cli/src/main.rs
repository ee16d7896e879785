mod commands;
mod patch_set;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "densiflow", about = "Dense optical flow from patch motion estimates")]
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
    /// Densify a patch set into a per-pixel flow field
    Densify(commands::densify::DensifyArgs),
    /// Write a synthetic regular patch grid
    Grid(commands::grid::GridArgs),
    /// Build the resize/gradient pyramid of an image
    Pyramid(commands::pyramid::PyramidArgs),
    /// Print or save the default configuration
    Config(commands::config::ConfigArgs),
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
        Commands::Densify(args) => commands::densify::run(args),
        Commands::Grid(args) => commands::grid::run(args),
        Commands::Pyramid(args) => commands::pyramid::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
