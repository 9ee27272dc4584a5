//! # graft-analyzer
//!
//! Per-file static analysis for the graft dependency-injection compiler.
//!
//! Each source file is parsed once and reduced to a [`FileAnalysis`]: its
//! decorated classes, import and re-export edges, export map, top-level
//! constant values, module-definition sites and raw `inject()` calls.
//! Nothing is ever executed; expressions that matter to the DI graph are
//! lowered into [`AnalyzerValue`] trees instead.
//!
//! ## Architecture
//!
//! ```text
//!  (path, source) ──▶ oxc parser ──▶ SourceAnalyzer ──▶ FileAnalysis
//!                                        │
//!                                        ├─ AnalyzerContext   (imports, core aliases)
//!                                        ├─ ImportResolver    (Runtime: probe / resolve)
//!                                        ├─ ClassExtractor    (decorators, ctor, configure())
//!                                        └─ ValueSerializer   (AnalyzerValue, factory capture)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use graft_analyzer::{NativeRuntime, SourceAnalyzer};
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = Arc::new(NativeRuntime::new(std::env::current_dir()?));
//! let analyzer = SourceAnalyzer::new(runtime);
//!
//! let source = "import { Injectable } from '@graft/core';\n@Injectable()\nexport class Clock {}";
//! let analysis = analyzer.analyze(Path::new("/app/src/clock.ts"), source)?;
//! assert_eq!(analysis.classes[0].name, "Clock");
//! # Ok(())
//! # }
//! ```

// Runtime abstraction
pub mod runtime;

mod analyzer;
pub mod cache;
mod class;
mod context;
pub mod error;
mod expr;
mod inject;
mod module_def;
pub mod program;
pub mod resolve;
mod syntax;
pub mod types;
pub mod value;

pub use analyzer::{AnalyzerOptions, DEFAULT_CORE_PACKAGE, SourceAnalyzer};
pub use cache::{AnalysisCache, content_hash};
pub use context::CoreFactory;
pub use error::{AnalyzeResult, AnalyzerDiagnostic, DiagnosticReason};
pub use module_def::MODULE_BINDING;
pub use program::{AnalysisMap, ExportTarget, ProgramIndex};
pub use resolve::{ImportResolver, ResolvedSpecifier, is_relative_specifier};
pub use types::{
    ClassMetadata, ConfigureMetadata, DecoratorMetadata, FileAnalysis, Heritage, HeritageClause,
    ImportBinding, ImportEdge, ImportedName, InjectKind, InjectSite, MethodMetadata,
    MiddlewareRef, MiddlewareRegistration, ModuleDefinition, ModuleDefinitionSite,
    ParameterMetadata, PropertyMetadata, ReExport, ReExportKind, SourceSpan, TypeArgument,
    TypeRef,
};
pub use value::{
    AnalyzerValue, CallValue, CapturedDependency, CapturedInject, FactoryCapture, NewValue,
    RecordEntry, RecordKey, SymbolRef,
};

// Re-export runtime types
pub use runtime::{Runtime, RuntimeError, RuntimeResult};

#[cfg(not(target_family = "wasm"))]
pub use runtime::native::NativeRuntime;

#[cfg(any(test, feature = "test-utils"))]
pub use runtime::memory::MemoryRuntime;

/// Re-exported oxc crates for consumers that re-parse sources.
pub mod oxc {
    pub use oxc_allocator::Allocator;
    pub use oxc_ast::ast;
    pub use oxc_ast_visit::{Visit, walk};
    pub use oxc_parser::{ParseOptions, Parser};
    pub use oxc_span::{GetSpan, SourceType, Span};
}
