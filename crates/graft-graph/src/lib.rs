//! # graft-graph
//!
//! Module discovery and the dependency-injection graph.
//!
//! Files are partitioned into modules by their nearest ancestor marker
//! file. Each module collects its providers (implicit `@Injectable`
//! classes, then explicit `providers[]` entries), controllers and loose
//! `inject()` calls. Once every module exists the graph is validated as a
//! whole: provider visibility, singleton/request scope capture and cycles
//! in the module dependency relation.
//!
//! ```text
//!  AnalysisMap ──▶ Discovery ──▶ GraphBuilder ──▶ ModuleGraph
//!                                   │
//!                                   ├─ visibility
//!                                   ├─ scopes (+ inheritance)
//!                                   ├─ cycles
//!                                   └─ advisories (optional SymbolResolver)
//! ```

mod builder;
mod classes;
pub mod cycles;
mod discovery;
pub mod error;
mod graph;
mod impact;
mod symbols;
pub mod types;
mod validate;

pub use builder::{DEFAULT_MARKER_FILE, GraphBuilder, GraphOptions};
pub use classes::ClassLocator;
pub use discovery::Discovery;
pub use error::{GraphError, Result};
pub use graph::{ModuleGraph, ResolvedProvider};
pub use impact::ModuleImpact;
pub use symbols::{GraphWarning, ProgramSymbols, SymbolResolver};
pub use types::{
    ClassTarget, ConstructorParam, Dependency, DependencyKind, FactoryProvider, ImportRef,
    ModuleNode, ProviderRef, ProviderStrategy, RawDependency, Scope, Visibility, node_id,
};
