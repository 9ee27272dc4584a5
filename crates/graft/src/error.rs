//! Facade error type wrapping every stage of the pipeline.

use graft_adapter::AdapterError;
use graft_analyzer::{AnalyzerDiagnostic, RuntimeError};
use graft_config::ConfigError;
use graft_gen::GenError;
use graft_graph::GraphError;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// One or more files failed analysis. Diagnostics are sorted by path.
    #[error("[graft] Analysis failed for {} file(s)", diagnostics.len())]
    #[diagnostic(code(graft::analysis_failed))]
    Analysis {
        #[related]
        diagnostics: Vec<AnalyzerDiagnostic>,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Gen(#[from] GenError),

    #[error("[graft] {0}")]
    #[diagnostic(code(graft::io))]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, Error>;
