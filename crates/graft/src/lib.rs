//! # graft
//!
//! Ahead-of-time dependency-injection compiler for decorated TypeScript.
//!
//! The [`Compiler`] ties the workspace crates together:
//!
//! - `graft-analyzer` reduces each source file to a `FileAnalysis`
//! - `graft-graph` partitions files into modules and validates the DI graph
//! - `graft-adapter` reads protocol adapter specs and builds the handler index
//! - `graft-gen` renders the injector, metadata, module config and manifest
//!
//! Nothing in the target program is executed.

mod compiler;
mod error;
mod files;

pub use compiler::{BuildOutput, Compilation, Compiler, ImpactReport};
pub use error::{Error, Result};
pub use files::SourceFilter;

pub use graft_adapter::AdapterError;
pub use graft_config::{ConfigDiscovery, ConfigError, GraftConfig, ResolvedConfig};
pub use graft_gen::{Artifacts, GenError};
pub use graft_graph::{GraphError, GraphWarning, ModuleGraph};

pub use graft_analyzer::{Runtime, RuntimeError};

#[cfg(not(target_family = "wasm"))]
pub use graft_analyzer::NativeRuntime;

#[cfg(feature = "test-utils")]
pub use graft_analyzer::MemoryRuntime;
