//! JSON build manifest.

use graft_adapter::{AdapterSpecs, HandlerIndexEntry, relative_path};
use graft_graph::{ModuleGraph, Scope};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::Result;
use crate::{GenInput, GenOptions};

/// Bumped on any incompatible manifest change.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest<'a> {
    pub schema_version: u32,
    pub config: ManifestConfig,
    /// Sorted by id.
    pub modules: Vec<ManifestModule>,
    /// Keyed by adapter id.
    pub adapter_static_specs: &'a AdapterSpecs,
    pub di_graph: DiGraph,
    /// Sorted by id.
    pub handler_index: Vec<HandlerIndexEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestConfig {
    pub source_path: String,
    pub source_format: String,
    pub resolved_module_config: ResolvedModuleConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedModuleConfig {
    pub file_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestModule {
    /// Marker file, relative to the project root.
    pub id: String,
    pub name: String,
    pub root_dir: String,
    /// File holding the module definition.
    pub file: String,
}

#[derive(Debug, Serialize)]
pub struct DiGraph {
    /// Sorted by id.
    pub nodes: Vec<DiNode>,
}

#[derive(Debug, Serialize)]
pub struct DiNode {
    /// `<Module>::<token>`
    pub id: String,
    pub token: String,
    /// Resolved node ids (the bare token when unresolved), sorted.
    pub deps: Vec<String>,
    pub scope: Scope,
    pub provider: NodeProvider,
}

#[derive(Debug, Serialize)]
pub struct NodeProvider {
    pub token: String,
    pub kind: &'static str,
}

impl<'a> Manifest<'a> {
    pub fn build(input: &GenInput<'a>, options: &GenOptions) -> Self {
        let mut modules: Vec<ManifestModule> = input
            .graph
            .modules()
            .map(|module| ManifestModule {
                id: relative_path(&module.id, &options.root),
                name: module.name.clone(),
                root_dir: relative_path(&module.root_dir, &options.root),
                file: relative_path(&module.id, &options.root),
            })
            .collect();
        modules.sort_by(|a, b| a.id.cmp(&b.id));

        let mut handler_index = input.handler_index.to_vec();
        handler_index.sort_by(|a, b| a.id.cmp(&b.id));
        handler_index.dedup_by(|a, b| a.id == b.id);

        Self {
            schema_version: SCHEMA_VERSION,
            config: ManifestConfig {
                source_path: options.source_path.clone(),
                source_format: options.source_format.clone(),
                resolved_module_config: ResolvedModuleConfig {
                    file_name: options.module_config_file.clone(),
                },
            },
            modules,
            adapter_static_specs: input.adapters,
            di_graph: DiGraph {
                nodes: nodes(input.graph),
            },
            handler_index,
        }
    }
}

fn nodes(graph: &ModuleGraph) -> Vec<DiNode> {
    let mut nodes = Vec::new();
    for module in graph.modules() {
        for provider in module.providers.values() {
            let deps: BTreeSet<String> = provider
                .dependencies()
                .into_iter()
                .filter_map(|dep| match graph.resolve_token(&module.id, &dep.token) {
                    Some(resolved) => Some(resolved.module.node_id(&resolved.provider.token)),
                    None if dep.optional => None,
                    None => Some(dep.token),
                })
                .collect();
            nodes.push(DiNode {
                id: module.node_id(&provider.token),
                token: provider.token.clone(),
                deps: deps.into_iter().collect(),
                scope: provider.scope,
                provider: NodeProvider {
                    token: provider.token.clone(),
                    kind: strategy_kind(&provider.strategy),
                },
            });
        }
    }
    nodes.sort_by(|a, b| a.id.cmp(&b.id));
    nodes
}

fn strategy_kind(strategy: &graft_graph::ProviderStrategy) -> &'static str {
    use graft_graph::ProviderStrategy::*;
    match strategy {
        Value { .. } => "useValue",
        UseClass { .. } => "useClass",
        Existing { .. } => "useExisting",
        Factory(_) => "useFactory",
        Constructor { .. } => "class",
    }
}

/// Pretty-printed manifest with a trailing newline.
pub fn generate_manifest(input: &GenInput<'_>, options: &GenOptions) -> Result<String> {
    let manifest = Manifest::build(input, options);
    let mut json = serde_json::to_string_pretty(&manifest)?;
    json.push('\n');
    Ok(json)
}
