//! Cross-module validation passes. All of them need the full graph.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use crate::classes::{ClassLocator, class_inject_sites};
use crate::error::{GraphError, Result};
use crate::graph::ModuleGraph;
use crate::symbols::{GraphWarning, SymbolResolver};
use crate::types::{ClassTarget, Dependency, DependencyKind, ModuleNode, Scope};

/// Something in a module that needs a token.
pub(crate) struct Consumer<'g> {
    /// Provider token, controller name or file of a loose `inject()`.
    pub label: String,
    pub scope: Scope,
    pub class: Option<&'g ClassTarget>,
    pub dependencies: Vec<Dependency>,
}

/// Every consumer in `module`: providers, then controllers, then loose
/// `inject()` calls, each in sorted order.
pub(crate) fn consumers(module: &ModuleNode) -> Vec<Consumer<'_>> {
    let mut out = Vec::new();
    for (token, provider) in &module.providers {
        let classes = provider.classes();
        out.push(Consumer {
            label: token.clone(),
            scope: provider.scope,
            class: classes.first().copied(),
            dependencies: provider.dependencies(),
        });
        for extra in classes.iter().skip(1) {
            out.push(Consumer {
                label: token.clone(),
                scope: provider.scope,
                class: Some(*extra),
                dependencies: Vec::new(),
            });
        }
    }
    for (name, class) in &module.controllers {
        out.push(Consumer {
            label: name.clone(),
            scope: Scope::Singleton,
            class: Some(class),
            dependencies: class.dependencies(),
        });
    }

    let mut loose: BTreeMap<String, BTreeSet<Dependency>> = BTreeMap::new();
    for raw in &module.raw_dependencies {
        loose
            .entry(raw.file.display().to_string())
            .or_default()
            .insert(Dependency {
                token: raw.token.clone(),
                kind: DependencyKind::InjectSite,
                optional: false,
            });
    }
    for (file, deps) in loose {
        out.push(Consumer {
            label: file,
            scope: Scope::Transient,
            class: None,
            dependencies: deps.into_iter().collect(),
        });
    }
    out
}

/// Module-level dependency relation: A -> B when something in A resolves a
/// token to a provider owned by B.
pub(crate) fn module_edges(graph: &ModuleGraph) -> BTreeMap<PathBuf, BTreeSet<PathBuf>> {
    let mut edges: BTreeMap<PathBuf, BTreeSet<PathBuf>> = BTreeMap::new();
    for module in graph.modules() {
        let targets = edges.entry(module.id.clone()).or_default();
        for consumer in consumers(module) {
            for dep in &consumer.dependencies {
                if let Some(resolved) = graph.resolve_token(&module.id, &dep.token) {
                    if resolved.module.id != module.id {
                        targets.insert(resolved.module.id.clone());
                    }
                }
            }
        }
    }
    edges
}

pub(crate) fn visibility(graph: &ModuleGraph) -> Result<()> {
    for module in graph.modules() {
        for consumer in consumers(module) {
            for dep in &consumer.dependencies {
                let Some(resolved) = graph.resolve_token(&module.id, &dep.token) else {
                    continue;
                };
                let provider = resolved.provider;
                if !provider.visibility.allows(&resolved.module.name, &module.name) {
                    return Err(GraphError::VisibilityViolation {
                        token: dep.token.clone(),
                        owner: resolved.module.name.clone(),
                        consumer: module.name.clone(),
                        visibility: provider.visibility.to_string(),
                    });
                }
            }
        }
    }
    Ok(())
}

/// Singletons must not capture request-scoped providers, directly or
/// through a base class. The inheritance pass is best-effort: ancestors
/// that cannot be located are skipped.
pub(crate) fn scopes(graph: &ModuleGraph, locator: &ClassLocator<'_>) -> Result<()> {
    let request_scoped = |module: &ModuleNode, token: &str| {
        graph
            .resolve_token(&module.id, token)
            .is_some_and(|r| r.provider.scope == Scope::Request)
    };

    for module in graph.modules() {
        for consumer in consumers(module) {
            if consumer.scope != Scope::Singleton {
                continue;
            }
            for dep in &consumer.dependencies {
                if request_scoped(module, &dep.token) {
                    return Err(GraphError::ScopeViolation {
                        module: module.name.clone(),
                        consumer: consumer.label.clone(),
                        target: dep.token.clone(),
                        via: None,
                    });
                }
            }

            let Some(class) = consumer.class else {
                continue;
            };
            let Some(file) = class.file.as_deref() else {
                continue;
            };
            let Some((file, metadata)) = locator.find(file, &class.name) else {
                continue;
            };
            for (ancestor_file, ancestor) in locator.ancestors(file, metadata) {
                if request_scoped(module, &ancestor.name) {
                    return Err(GraphError::ScopeViolation {
                        module: module.name.clone(),
                        consumer: consumer.label.clone(),
                        target: ancestor.name.clone(),
                        via: Some(ancestor.name.clone()),
                    });
                }
                let Some(analysis) = locator.index().file(ancestor_file) else {
                    continue;
                };
                for site in class_inject_sites(analysis, &ancestor.name) {
                    let Some(token) = site.token else {
                        continue;
                    };
                    if request_scoped(module, &token) {
                        return Err(GraphError::ScopeViolation {
                            module: module.name.clone(),
                            consumer: consumer.label.clone(),
                            target: token,
                            via: Some(ancestor.name.clone()),
                        });
                    }
                }
            }
        }
    }
    Ok(())
}

/// Non-fatal findings, sorted and deduplicated.
pub(crate) fn advisories(graph: &ModuleGraph, symbols: &dyn SymbolResolver) -> Vec<GraphWarning> {
    let mut warnings = BTreeSet::new();
    for module in graph.modules() {
        for token in module.providers.keys() {
            if symbols.is_interface(token) && symbols.implementors(token).is_empty() {
                warnings.insert(GraphWarning::UnimplementedInterface {
                    module: module.name.clone(),
                    token: token.clone(),
                    interface: token.clone(),
                });
            }
        }

        for consumer in consumers(module) {
            let Some(class) = consumer.class else {
                continue;
            };
            for param in &class.params {
                let Some(token) = &param.token else {
                    continue;
                };
                if param.optional || param.kind != DependencyKind::ParamType {
                    continue;
                }
                if graph.resolve_token(&module.id, token).is_some() {
                    continue;
                }
                if symbols.is_interface(token) {
                    if symbols.implementors(token).is_empty() {
                        warnings.insert(GraphWarning::UnimplementedInterface {
                            module: module.name.clone(),
                            token: consumer.label.clone(),
                            interface: token.clone(),
                        });
                    }
                } else {
                    warnings.insert(GraphWarning::UnresolvedDependency {
                        module: module.name.clone(),
                        consumer: consumer.label.clone(),
                        token: token.clone(),
                        file: class.file.clone().unwrap_or_else(|| module.id.clone()),
                    });
                }
            }
        }
    }
    warnings.into_iter().collect()
}
