//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// bazel-to-cmake - translate proto_library rules into CMake
#[derive(Parser)]
#[command(name = "bazel-to-cmake")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Translate build files into CMake
    Translate(TranslateArgs),

    /// Evaluate build files and report diagnostics without writing output
    Check(CheckArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Inputs shared by `translate` and `check`.
#[derive(Args)]
pub struct InputArgs {
    /// Configuration file(s); later files take precedence
    #[arg(short, long = "config", required = true, env = "BAZEL_TO_CMAKE_CONFIG")]
    pub config: Vec<PathBuf>,

    /// BUILD.toml files, or directories to search for them
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

#[derive(Args)]
pub struct TranslateArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Write the CMake output here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub input: InputArgs,

    /// Treat warnings as errors
    #[arg(long)]
    pub deny_warnings: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}
