//! Module impact analysis for incremental re-validation.

use graft_analyzer::AnalysisMap;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::graph::ModuleGraph;

/// Modules affected by a set of changed files.
///
/// Read-only over the graph; computing an impact never invalidates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleImpact {
    /// Modules owning a changed file.
    pub changed: BTreeSet<PathBuf>,
    /// Changed modules plus every module that transitively depends on one,
    /// or owns a file that transitively imports a changed file.
    pub affected: BTreeSet<PathBuf>,
}

impl ModuleImpact {
    pub fn compute(graph: &ModuleGraph, files: &AnalysisMap, changed: &[PathBuf]) -> Self {
        let mut importers: BTreeMap<&Path, Vec<&Path>> = BTreeMap::new();
        for (path, analysis) in files {
            for dep in analysis.local_dependencies() {
                importers.entry(Path::new(dep)).or_default().push(path.as_path());
            }
        }

        let mut impact = Self::default();
        for file in changed {
            if let Some(module) = graph.owner_of(file) {
                impact.changed.insert(module.id.clone());
            }
        }

        // File level: everything that imports a changed file.
        let mut seen: BTreeSet<&Path> = changed.iter().map(PathBuf::as_path).collect();
        let mut queue: VecDeque<&Path> = seen.iter().copied().collect();
        while let Some(file) = queue.pop_front() {
            if let Some(module) = graph.owner_of(file) {
                impact.affected.insert(module.id.clone());
            }
            for &importer in importers.get(file).into_iter().flatten() {
                if seen.insert(importer) {
                    queue.push_back(importer);
                }
            }
        }

        // Module level: reverse dependency closure.
        let mut queue: VecDeque<PathBuf> = impact.affected.iter().cloned().collect();
        while let Some(id) = queue.pop_front() {
            for dependent in graph.dependents_of(&id) {
                if impact.affected.insert(dependent.to_path_buf()) {
                    queue.push_back(dependent.to_path_buf());
                }
            }
        }

        tracing::debug!(
            changed = impact.changed.len(),
            affected = impact.affected.len(),
            "module impact computed"
        );
        impact
    }

    /// Names of affected modules, sorted by module id.
    pub fn affected_names<'g>(&self, graph: &'g ModuleGraph) -> Vec<&'g str> {
        self.affected
            .iter()
            .filter_map(|id| graph.module(id))
            .map(|module| module.name.as_str())
            .collect()
    }
}
