//! Deterministic artifact generation for graft.
//!
//! Four artifacts are rendered from a validated [`ModuleGraph`], the
//! analysis map it was built from, the resolved adapter specs and the
//! handler index:
//!
//! - the injector: a container factory over a registry of provider
//!   factories keyed by node id (`<Module>::<token>`)
//! - the metadata registry: deep-frozen class descriptions in a sealed map,
//!   plus the node ids per scope
//! - the module config: per-module adapter configuration and the handler
//!   index
//! - the JSON manifest
//!
//! Generation is pure. Every loop runs over a sorted view, so identical
//! input renders byte-identical output. Business rules are not re-checked;
//! only shapes with no valid rendering (an unresolvable token, an
//! unexported binding) fail with a [`GenError`].

mod error;
mod imports;
mod injector;
mod manifest;
mod metadata;
mod module_config;
mod render;
mod runtime;
mod stable_key;
mod writer;

use graft_adapter::{AdapterSpecs, HandlerIndexEntry};
use graft_analyzer::{AnalysisMap, DEFAULT_CORE_PACKAGE};
use graft_graph::ModuleGraph;
use std::path::PathBuf;

pub use error::{GenError, Result};
pub use imports::{ImportTable, relative_specifier};
pub use injector::{RUN_IN_INJECTION_CONTEXT, generate_injector};
pub use manifest::{
    DiGraph, DiNode, Manifest, ManifestConfig, ManifestModule, NodeProvider, ResolvedModuleConfig,
    SCHEMA_VERSION, generate_manifest,
};
pub use metadata::{FlatProperty, flatten_properties, generate_metadata};
pub use module_config::generate_module_config;
pub use render::{InjectRenderer, Renderer, data, number};
pub use stable_key::{CIRCULAR, StableKey};
pub use writer::{CodeWriter, IndentStyle};

/// Everything the generators read.
#[derive(Debug, Clone, Copy)]
pub struct GenInput<'a> {
    pub graph: &'a ModuleGraph,
    pub program: &'a AnalysisMap,
    pub adapters: &'a AdapterSpecs,
    /// Sorted handler index.
    pub handler_index: &'a [HandlerIndexEntry],
}

#[derive(Debug, Clone)]
pub struct GenOptions {
    /// Project root; manifest and metadata paths are relative to it.
    pub root: PathBuf,
    /// Absolute directory the source artifacts are written to; generated
    /// imports are relative to it.
    pub out_dir: PathBuf,
    pub core_package: String,
    pub source_path: String,
    pub source_format: String,
    pub module_config_file: String,
}

impl GenOptions {
    pub fn new(root: impl Into<PathBuf>, out_dir: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            out_dir: out_dir.into(),
            core_package: DEFAULT_CORE_PACKAGE.to_string(),
            source_path: "src".to_string(),
            source_format: "ts".to_string(),
            module_config_file: "module-config.ts".to_string(),
        }
    }
}

/// Rendered artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifacts {
    pub injector: String,
    pub metadata: String,
    pub module_config: String,
    pub manifest: String,
}

/// Render all four artifacts.
pub fn generate(input: &GenInput<'_>, options: &GenOptions) -> Result<Artifacts> {
    let artifacts = Artifacts {
        injector: generate_injector(input, options)?,
        metadata: generate_metadata(input, options)?,
        module_config: generate_module_config(input, options)?,
        manifest: generate_manifest(input, options)?,
    };
    tracing::info!(
        modules = input.graph.len(),
        handlers = input.handler_index.len(),
        "artifacts generated"
    );
    Ok(artifacts)
}
