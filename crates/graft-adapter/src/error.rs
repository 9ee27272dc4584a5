//! Adapter resolution errors
//!
//! One variant per violated shape contract; every message names the
//! offending adapter class or field.

use graft_analyzer::{AnalyzerDiagnostic, RuntimeError};
use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum AdapterError {
    #[error("[graft] No adapterSpec exports found in any imported package")]
    #[diagnostic(
        code(graft::adapter::no_adapter_spec),
        help("export `adapterSpec = defineAdapter(AdapterClass)` from the adapter package entry")
    )]
    NoAdapterSpec,

    #[error("[graft] adapterSpec in {} must be defineAdapter(AdapterClass)", .file.display())]
    #[diagnostic(code(graft::adapter::invalid_define_adapter))]
    InvalidDefineAdapter { file: PathBuf },

    #[error("[graft] Adapter class '{class}' referenced from {} could not be found", .file.display())]
    #[diagnostic(code(graft::adapter::unresolved_class))]
    UnresolvedAdapterClass { class: String, file: PathBuf },

    #[error("[graft] Adapter class '{class}' is missing static field '{field}'")]
    #[diagnostic(code(graft::adapter::missing_static_field))]
    MissingStaticField { class: String, field: String },

    #[error("[graft] Adapter class '{class}': adapterId must be a string literal")]
    #[diagnostic(code(graft::adapter::invalid_adapter_id))]
    InvalidAdapterId { class: String },

    #[error("[graft] Adapter class '{class}': invalid middlewarePhaseOrder ({reason})")]
    #[diagnostic(code(graft::adapter::invalid_phase_order))]
    InvalidPhaseOrder { class: String, reason: String },

    #[error("[graft] Adapter class '{class}': invalid supportedMiddlewarePhases ({reason})")]
    #[diagnostic(code(graft::adapter::invalid_supported_phases))]
    InvalidSupportedPhases { class: String, reason: String },

    #[error("[graft] Adapter class '{class}': invalid entryDecorators ({reason})")]
    #[diagnostic(code(graft::adapter::invalid_entry_decorators))]
    InvalidEntryDecorators { class: String, reason: String },

    #[error("[graft] Adapter class '{class}': invalid runtime hooks ({reason})")]
    #[diagnostic(code(graft::adapter::invalid_runtime_hooks))]
    InvalidRuntimeHooks { class: String, reason: String },

    #[error("[graft] Adapter class '{class}': invalid pipeline ({reason})")]
    #[diagnostic(code(graft::adapter::invalid_pipeline))]
    InvalidPipeline { class: String, reason: String },

    #[error("[graft] Adapter class '{class}': pipeline declares {middlewares} middleware slots but middlewarePhaseOrder has {phases} phases")]
    #[diagnostic(code(graft::adapter::pipeline_length_mismatch))]
    PipelineLengthMismatch {
        class: String,
        middlewares: usize,
        phases: usize,
    },

    #[error("[graft] Duplicate adapter id '{id}': {first} and {second}")]
    #[diagnostic(code(graft::adapter::duplicate_adapter_id))]
    DuplicateAdapterId {
        id: String,
        first: String,
        second: String,
    },

    #[error("[graft] Controller '{class}' is claimed by more than one adapter: {}", .adapters.join(", "))]
    #[diagnostic(code(graft::adapter::multiple_adapter_owners))]
    MultipleAdapterOwners { class: String, adapters: Vec<String> },

    #[error("[graft] Handler '{class}.{method}' uses a '{adapter}' handler decorator but '{class}' is not a '{adapter}' controller")]
    #[diagnostic(code(graft::adapter::handler_outside_controller))]
    HandlerOutsideController {
        class: String,
        method: String,
        adapter: String,
    },

    #[error("[graft] Module '{module}' configures unknown adapter '{adapter}'")]
    #[diagnostic(code(graft::adapter::unknown_adapter))]
    UnknownAdapter { module: String, adapter: String },

    #[error("[graft] Middleware phase '{phase}' is not supported by adapter '{adapter}' ({location})")]
    #[diagnostic(code(graft::adapter::unsupported_middleware_phase))]
    UnsupportedMiddlewarePhase {
        adapter: String,
        phase: String,
        location: String,
    },

    #[error("[graft] @Middlewares on {location} is outside an adapter-owned controller")]
    #[diagnostic(code(graft::adapter::middlewares_outside_controller))]
    MiddlewaresOutsideController { location: String },

    #[error("[graft] Invalid @Middlewares on {location}: {reason}")]
    #[diagnostic(code(graft::adapter::invalid_middlewares))]
    InvalidMiddlewares { location: String, reason: String },

    #[error("[graft] Failed to parse adapter source {}: {message}", .file.display())]
    #[diagnostic(code(graft::adapter::parse_failed))]
    ParseFailed { file: PathBuf, message: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Analyze(#[from] AnalyzerDiagnostic),

    #[error("[graft] {0}")]
    #[diagnostic(code(graft::adapter::io))]
    Runtime(#[from] RuntimeError),
}

pub type Result<T> = std::result::Result<T, AdapterError>;
