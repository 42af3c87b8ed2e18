//! Josman CLI - versioned documentation sites.
//!
//! Provides commands for:
//! - `build`: Generate the site from `docs/` and past release tags
//! - `eval`: Precompute `$eval{}` expression results
//! - `gen-config`: Print a documented `josman.toml`

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, EvalArgs};
use output::Output;

/// Josman - versioned documentation site generator.
#[derive(Parser)]
#[command(name = "josman", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the documentation site.
    Build(BuildArgs),
    /// Evaluate the expressions of the docs and save their results.
    Eval(EvalArgs),
    /// Print a documented stock configuration.
    GenConfig,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Build(args) => args.verbose,
        Commands::Eval(args) => args.verbose,
        Commands::GenConfig => false,
    };

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Build(args) => args.execute(),
        Commands::Eval(args) => args.execute(),
        Commands::GenConfig => commands::gen_config::execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
