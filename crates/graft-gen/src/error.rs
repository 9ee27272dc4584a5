//! Error types for artifact generation

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Shapes the generators refuse to render.
///
/// The graph is validated before generation; these errors only cover
/// input that would otherwise produce broken output.
#[derive(Error, Debug, Diagnostic)]
pub enum GenError {
    /// A dependency token has no provider visible from its consumer
    #[error("[graft] Cannot render '{consumer}' in module '{module}': no provider for token '{token}'")]
    #[diagnostic(code(graft::gen::unresolved_token))]
    UnresolvedToken {
        module: String,
        consumer: String,
        token: String,
    },

    /// An `inject()` call without a static token reached generation
    #[error("[graft] inject() token is not statically determinable in '{consumer}' (module '{module}')")]
    #[diagnostic(code(graft::gen::indeterminable_inject))]
    IndeterminableInject { module: String, consumer: String },

    /// Generated code needs a binding its file does not export
    #[error("[graft] '{name}' in {} is not exported and cannot be imported by generated code", .file.display())]
    #[diagnostic(
        code(graft::gen::unexported_binding),
        help("export the binding from its module")
    )]
    UnexportedBinding { name: String, file: PathBuf },

    /// Value shape with no code form
    #[error("[graft] Cannot render {what}: {reason}")]
    #[diagnostic(code(graft::gen::unrenderable))]
    Unrenderable { what: String, reason: String },

    #[error("[graft] Failed to serialize manifest: {0}")]
    #[diagnostic(code(graft::gen::manifest))]
    Manifest(#[from] serde_json::Error),
}

impl GenError {
    pub fn unrenderable(what: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unrenderable {
            what: what.into(),
            reason: reason.into(),
        }
    }
}

/// Result type for generation
pub type Result<T> = std::result::Result<T, GenError>;
