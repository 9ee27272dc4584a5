//! Error types for configuration loading and validation.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("config file not found: {}", path.display())]
    #[diagnostic(
        code(graft::config::not_found),
        help("pass an existing graft.toml or omit --config to use discovery")
    )]
    NotFound { path: PathBuf },

    #[error("invalid config value for '{field}'")]
    #[diagnostic(code(graft::config::invalid_value))]
    InvalidValue {
        field: String,
        #[help]
        hint: Option<String>,
    },

    // Schema validation errors (no filesystem checks)
    #[error("schema validation failed: {message}")]
    #[diagnostic(code(graft::config::schema))]
    SchemaValidation {
        message: String,
        #[help]
        hint: Option<String>,
    },

    #[error("source directory not found: {}", path.display())]
    #[diagnostic(
        code(graft::config::source_dir),
        help("set sourcePath in graft.toml to the directory holding your modules")
    )]
    SourceDirNotFound { path: PathBuf },

    #[error("I/O error: {0}")]
    #[diagnostic(code(graft::config::io))]
    Io(#[from] std::io::Error),
}
