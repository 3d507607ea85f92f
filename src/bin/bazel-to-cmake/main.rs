//! bazel-to-cmake CLI - translate proto_library rules into CMake

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    if let Err(e) = run() {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Parse CLI
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("bazel_to_cmake=debug")
    } else {
        EnvFilter::new("bazel_to_cmake=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let color = !cli.no_color;
    match cli.command {
        Commands::Translate(args) => commands::translate::execute(args, color),
        Commands::Check(args) => commands::check::execute(args, color),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
