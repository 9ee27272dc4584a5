//! Command-line interface definition.
//!
//! - `graft build` - compile the project and write all artifacts
//! - `graft check` - run every validation without writing
//! - `graft impact <FILES>...` - list modules affected by changed files

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Graft - ahead-of-time dependency injection for TypeScript
#[derive(Parser, Debug)]
#[command(
    name = "graft",
    version,
    about = "Ahead-of-time dependency-injection compiler for decorated TypeScript",
    long_about = "Graft statically analyzes decorated TypeScript sources, validates the\n\
                  module/provider graph (visibility, scopes, cycles) and emits a\n\
                  deterministic container, metadata registry and JSON manifest."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile the project and write the generated artifacts
    Build(BuildArgs),

    /// Validate the project without writing anything
    ///
    /// Runs analysis, graph validation, adapter checks and generation, and
    /// fails on the first fatal diagnostic.
    Check(CheckArgs),

    /// Print the modules affected by a set of changed files
    ///
    /// Affected modules are the owners of the changed files plus every
    /// module that transitively depends on them, one name per line on stdout.
    Impact(ImpactArgs),
}

/// Where the project lives and how it is configured.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Directory to start config discovery from
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub root: PathBuf,

    /// Explicit config file (its directory becomes the project root)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

#[derive(Args, Debug)]
pub struct ImpactArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Changed files, relative to the current directory
    #[arg(required = true, value_name = "FILES")]
    pub files: Vec<PathBuf>,
}
