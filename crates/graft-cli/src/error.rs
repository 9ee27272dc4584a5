//! CLI error type.
//!
//! Library errors already carry miette diagnostics, so they pass through
//! transparently; only argument and I/O failures originate here.

use miette::{Diagnostic, Report};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Graft(#[from] graft::Error),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] graft_config::ConfigError),

    #[error("path not found: {}", path.display())]
    #[diagnostic(code(graft::cli::path_not_found))]
    PathNotFound { path: PathBuf },

    #[error("I/O error: {0}")]
    #[diagnostic(code(graft::cli::io))]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Convert a CLI error into a miette report for display.
pub fn into_report(err: CliError) -> Report {
    Report::new(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_keeps_library_message() {
        let err = CliError::from(graft::Error::Graph(graft_graph_error()));
        let report = into_report(err);
        assert!(report.to_string().starts_with("[graft] Orphan files detected"));
    }

    fn graft_graph_error() -> graft::GraphError {
        graft::GraphError::OrphanFiles {
            files: vec![PathBuf::from("/app/src/stray.ts")],
        }
    }
}
