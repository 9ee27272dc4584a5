//! Graph construction and validation errors
//!
//! Every message starts with the `[graft]` tool tag; the text after it is
//! what users grep for, so the leading phrase of each variant is stable.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

fn list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("\n  - {}", p.display()))
        .collect()
}

fn chains(cycles: &[Vec<String>]) -> String {
    cycles
        .iter()
        .map(|cycle| {
            let mut chain = cycle.clone();
            if let Some(first) = cycle.first() {
                chain.push(first.clone());
            }
            format!("\n  {}", chain.join(" -> "))
        })
        .collect()
}

/// Errors raised while building or validating the module graph
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum GraphError {
    /// Source files not covered by any module marker
    #[error("[graft] Orphan files detected (no module marker in any ancestor directory):{}", list(.files))]
    #[diagnostic(
        code(graft::graph::orphan_files),
        help("add a module marker file to a parent directory or exclude these files")
    )]
    OrphanFiles { files: Vec<PathBuf> },

    #[error("[graft] Missing module definition in {}", .marker.display())]
    #[diagnostic(code(graft::graph::missing_definition))]
    MissingDefinition { marker: PathBuf },

    #[error("[graft] Multiple module definitions in {} ({count} found)", .marker.display())]
    #[diagnostic(code(graft::graph::multiple_definitions))]
    MultipleDefinitions { marker: PathBuf, count: usize },

    #[error("[graft] Module definition is not exported in {}", .marker.display())]
    #[diagnostic(code(graft::graph::unexported_definition))]
    UnexportedDefinition { marker: PathBuf },

    #[error("[graft] Duplicate module name '{name}': {} and {}", .first.display(), .second.display())]
    #[diagnostic(code(graft::graph::duplicate_module_name))]
    DuplicateModuleName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("[graft] Ambiguous provider '{token}' in module '{module}': declared more than once")]
    #[diagnostic(code(graft::graph::ambiguous_provider))]
    AmbiguousProvider { module: String, token: String },

    #[error("[graft] Invalid provider in module '{module}': {reason}")]
    #[diagnostic(code(graft::graph::invalid_provider))]
    InvalidProvider { module: String, reason: String },

    #[error("[graft] inject() token is not statically determinable in {} at offset {offset} (module '{module}')", .file.display())]
    #[diagnostic(
        code(graft::graph::indeterminable_token),
        help("pass an identifier or a thunk returning one: inject(Token) or inject(() => Token)")
    )]
    IndeterminableToken {
        module: String,
        file: PathBuf,
        offset: u32,
    },

    #[error("[graft] Invalid provider scope '{scope}' for '{token}' in module '{module}'")]
    #[diagnostic(
        code(graft::graph::invalid_scope),
        help("expected one of: singleton, transient, request, request-context")
    )]
    InvalidScope {
        module: String,
        token: String,
        scope: String,
    },

    #[error("[graft] Invalid visibility for '{token}' in module '{module}': {reason}")]
    #[diagnostic(
        code(graft::graph::invalid_visibility),
        help("expected 'all', 'module' or an array of imported module definitions")
    )]
    InvalidVisibility {
        module: String,
        token: String,
        reason: String,
    },

    #[error("[graft] Visibility Violation: '{token}' provided by module '{owner}' is not visible to module '{consumer}' ({visibility})")]
    #[diagnostic(code(graft::graph::visibility_violation))]
    VisibilityViolation {
        token: String,
        owner: String,
        consumer: String,
        visibility: String,
    },

    #[error("[graft] Scope Violation: singleton '{consumer}' in module '{module}' depends on request-scoped '{target}'{}", .via.as_ref().map(|v| format!(" (inherited from '{v}')")).unwrap_or_default())]
    #[diagnostic(
        code(graft::graph::scope_violation),
        help("make the consumer request-scoped or transient")
    )]
    ScopeViolation {
        module: String,
        consumer: String,
        target: String,
        via: Option<String>,
    },

    #[error("[graft] Circular dependency detected between modules:{}", chains(.cycles))]
    #[diagnostic(code(graft::graph::circular_dependency))]
    CircularDependency { cycles: Vec<Vec<String>> },
}

/// Result type for graph operations
pub type Result<T> = std::result::Result<T, GraphError>;
