//! Analyzer diagnostics

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Why a file could not be analyzed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticReason {
    /// The parser reported errors
    ParseFailed,
    /// `addMiddlewares(...)` in `configure()` has an unsupported shape
    InvalidMiddlewareShape,
    /// `addErrorFilters(...)` in `configure()` has an unsupported shape
    InvalidErrorFilterShape,
    /// The lifecycle argument of `addMiddlewares` is not a string literal
    InvalidLifecycle,
}

impl fmt::Display for DiagnosticReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::ParseFailed => "parse-failed",
            Self::InvalidMiddlewareShape => "invalid-middleware-shape",
            Self::InvalidErrorFilterShape => "invalid-error-filter-shape",
            Self::InvalidLifecycle => "invalid-lifecycle",
        };
        f.write_str(text)
    }
}

/// A file-local analysis failure. Aborts that file's analysis only.
#[derive(Error, Debug, Clone, Diagnostic)]
#[error("[graft] {}: {message} ({reason})", path.display())]
#[diagnostic(code(graft::analyzer::file))]
pub struct AnalyzerDiagnostic {
    pub path: PathBuf,
    pub reason: DiagnosticReason,
    pub message: String,
}

impl AnalyzerDiagnostic {
    pub fn new(path: impl Into<PathBuf>, reason: DiagnosticReason, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason,
            message: message.into(),
        }
    }
}

/// Result of analyzing one file
pub type AnalyzeResult<T> = std::result::Result<T, AnalyzerDiagnostic>;
