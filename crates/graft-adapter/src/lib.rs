//! # graft-adapter
//!
//! Static protocol adapter specs.
//!
//! An adapter package exports `adapterSpec = defineAdapter(AdapterClass)`
//! from its entry file. The resolver follows every package import of the
//! program to such an export (through wildcard and named re-exports),
//! re-parses the adapter class and reads its static fields as literal
//! data. The validated specs then drive the controller, handler and
//! middleware-phase checks that produce the handler index.
//!
//! ```text
//!  package imports ──▶ find adapterSpec ──▶ defineAdapter(Class) ──▶ static fields
//!                                                                      │
//!  ModuleGraph + AnalysisMap ───────────────▶ build_handler_index ◀────┘
//! ```

pub mod error;
mod locate;
mod reader;
mod resolver;
mod static_spec;
mod validate;

pub use error::{AdapterError, Result};
pub use locate::{ADAPTER_SPEC_EXPORT, AdapterClassRef, DEFINE_ADAPTER, FileLoader, LoadedFile};
pub use reader::read_adapter_class;
pub use resolver::AdapterResolver;
pub use static_spec::{
    AdapterSpecs, AdapterStaticSpec, EntryDecorators, HandlerIndexEntry, PipelineSpec,
    RuntimeHooks,
};
pub use validate::{MIDDLEWARES_DECORATOR, build_handler_index, relative_path};
