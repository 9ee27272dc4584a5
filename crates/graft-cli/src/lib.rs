//! Graft CLI - ahead-of-time dependency-injection compiler.
//!
//! - [`cli`] - clap argument definitions
//! - [`commands`] - `build`, `check` and `impact`
//! - [`error`] - CLI error type and miette reporting
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - terminal status messages

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};
