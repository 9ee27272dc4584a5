//! The validated module graph.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::symbols::GraphWarning;
use crate::types::{ModuleNode, ProviderRef};

/// A provider located in its owning module.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedProvider<'g> {
    pub module: &'g ModuleNode,
    pub provider: &'g ProviderRef,
}

/// Modules keyed by marker path, plus derived lookups.
///
/// Built once by [`GraphBuilder`](crate::GraphBuilder) and read-only after.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleGraph {
    pub(crate) modules: BTreeMap<PathBuf, ModuleNode>,
    pub(crate) file_owners: BTreeMap<PathBuf, PathBuf>,
    /// Module id -> ids of modules it depends on.
    pub(crate) edges: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    pub(crate) warnings: Vec<GraphWarning>,
}

impl ModuleGraph {
    /// Modules in id order.
    pub fn modules(&self) -> impl Iterator<Item = &ModuleNode> {
        self.modules.values()
    }

    pub fn module(&self, id: &Path) -> Option<&ModuleNode> {
        self.modules.get(id)
    }

    pub fn module_by_name(&self, name: &str) -> Option<&ModuleNode> {
        self.modules.values().find(|m| m.name == name)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Module owning a source file.
    pub fn owner_of(&self, file: &Path) -> Option<&ModuleNode> {
        self.file_owners.get(file).and_then(|id| self.modules.get(id))
    }

    pub fn warnings(&self) -> &[GraphWarning] {
        &self.warnings
    }

    /// Modules `id` depends on, sorted.
    pub fn dependencies_of(&self, id: &Path) -> impl Iterator<Item = &Path> {
        self.edges
            .get(id)
            .into_iter()
            .flat_map(|targets| targets.iter().map(PathBuf::as_path))
    }

    /// Modules depending on `id`, sorted.
    pub fn dependents_of<'g>(&'g self, id: &'g Path) -> impl Iterator<Item = &'g Path> + 'g {
        self.edges
            .iter()
            .filter(move |(_, targets)| targets.contains(id))
            .map(|(source, _)| source.as_path())
    }

    /// Resolve `token` as seen from module `consumer`.
    ///
    /// The consumer's own provider wins; otherwise the first module in id
    /// order whose provider is visible to the consumer, and failing that the
    /// first module providing the token at all (so visibility validation can
    /// report it).
    pub fn resolve_token(&self, consumer: &Path, token: &str) -> Option<ResolvedProvider<'_>> {
        let home = self.modules.get(consumer);
        if let Some(module) = home {
            if let Some(provider) = module.providers.get(token) {
                return Some(ResolvedProvider { module, provider });
            }
        }

        let consumer_name = home.map(|m| m.name.as_str()).unwrap_or_default();
        let mut fallback = None;
        for module in self.modules.values() {
            let Some(provider) = module.providers.get(token) else {
                continue;
            };
            if provider.visibility.allows(&module.name, consumer_name) {
                return Some(ResolvedProvider { module, provider });
            }
            fallback.get_or_insert(ResolvedProvider { module, provider });
        }
        fallback
    }
}
