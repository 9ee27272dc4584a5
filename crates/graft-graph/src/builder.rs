//! Module graph construction.
//!
//! The builder walks every collection through sorted keys, so the graph it
//! produces depends only on analysis content, never on insertion order.

use graft_analyzer::{
    AnalysisMap, AnalyzerValue, ClassMetadata, ModuleDefinitionSite, ProgramIndex, SymbolRef,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::classes::ClassLocator;
use crate::discovery::Discovery;
use crate::error::{GraphError, Result};
use crate::graph::ModuleGraph;
use crate::symbols::SymbolResolver;
use crate::types::{
    FactoryProvider, ModuleNode, ProviderRef, ProviderStrategy, RawDependency, Scope, Visibility,
};
use crate::{cycles, validate};

/// Default module marker file name.
pub const DEFAULT_MARKER_FILE: &str = "module.ts";

#[derive(Debug, Clone)]
pub struct GraphOptions {
    /// File name designating a module root.
    pub marker_file: String,
    /// Decorators that mark a class as a controller.
    pub controller_decorators: Vec<String>,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            marker_file: DEFAULT_MARKER_FILE.to_string(),
            controller_decorators: vec!["Controller".to_string()],
        }
    }
}

/// Builds and validates a [`ModuleGraph`] from a finished analysis set.
pub struct GraphBuilder<'a> {
    files: &'a AnalysisMap,
    options: GraphOptions,
    symbols: Option<&'a dyn SymbolResolver>,
}

/// Marker file, definition and resolved name of one module.
struct ModuleHead<'a> {
    name: String,
    site: &'a ModuleDefinitionSite,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(files: &'a AnalysisMap) -> Self {
        Self {
            files,
            options: GraphOptions::default(),
            symbols: None,
        }
    }

    pub fn with_options(mut self, options: GraphOptions) -> Self {
        self.options = options;
        self
    }

    /// Enable advisory warnings backed by `symbols`.
    pub fn with_symbols(mut self, symbols: &'a dyn SymbolResolver) -> Self {
        self.symbols = Some(symbols);
        self
    }

    /// Build the graph and run every validation pass.
    pub fn build(&self) -> Result<ModuleGraph> {
        let discovery = Discovery::run(self.files.keys().map(PathBuf::as_path), &self.options.marker_file)?;
        let heads = self.module_heads(&discovery)?;
        let locator = ClassLocator::new(ProgramIndex::new(self.files));

        let mut modules = BTreeMap::new();
        for (marker, owned) in &discovery.modules {
            let Some(head) = heads.get(marker) else {
                continue;
            };
            let assembler = ModuleAssembler {
                files: self.files,
                locator,
                heads: &heads,
                options: &self.options,
                marker,
                name: &head.name,
            };
            let node = assembler.assemble(owned, head.site)?;
            tracing::debug!(
                module = %node.name,
                providers = node.providers.len(),
                controllers = node.controllers.len(),
                "module assembled"
            );
            modules.insert(marker.clone(), node);
        }

        let mut graph = ModuleGraph {
            modules,
            file_owners: discovery.owners,
            edges: BTreeMap::new(),
            warnings: Vec::new(),
        };
        graph.edges = validate::module_edges(&graph);

        validate::visibility(&graph)?;
        validate::scopes(&graph, &locator)?;
        cycles::check(&graph)?;

        if let Some(symbols) = self.symbols {
            graph.warnings = validate::advisories(&graph, symbols);
            for warning in &graph.warnings {
                tracing::warn!("{warning}");
            }
        }

        tracing::info!(modules = graph.len(), "module graph built");
        Ok(graph)
    }

    /// Check each marker's definition and assign module names.
    fn module_heads(&self, discovery: &Discovery) -> Result<BTreeMap<PathBuf, ModuleHead<'a>>> {
        let mut heads = BTreeMap::new();
        let mut by_name: BTreeMap<String, PathBuf> = BTreeMap::new();

        for marker in discovery.modules.keys() {
            let sites = self
                .files
                .get(marker)
                .map(|analysis| analysis.module_definitions.as_slice())
                .unwrap_or_default();

            let site = match sites {
                [] => {
                    return Err(GraphError::MissingDefinition {
                        marker: marker.clone(),
                    });
                }
                [site] => site,
                _ => {
                    return Err(GraphError::MultipleDefinitions {
                        marker: marker.clone(),
                        count: sites.len(),
                    });
                }
            };
            if !site.is_exported() {
                return Err(GraphError::UnexportedDefinition {
                    marker: marker.clone(),
                });
            }

            let name = site
                .definition
                .name
                .clone()
                .unwrap_or_else(|| derived_name(marker));

            if let Some(first) = by_name.get(&name) {
                return Err(GraphError::DuplicateModuleName {
                    name,
                    first: first.clone(),
                    second: marker.clone(),
                });
            }
            by_name.insert(name.clone(), marker.clone());
            heads.insert(marker.clone(), ModuleHead { name, site });
        }
        Ok(heads)
    }
}

/// Name of the directory holding the marker file.
fn derived_name(marker: &Path) -> String {
    marker
        .parent()
        .and_then(Path::file_name)
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "root".to_string())
}

/// Provider fields an explicit `providers[]` entry declares.
struct ProviderDraft {
    token: String,
    strategy: Option<ProviderStrategy>,
    scope: Option<Scope>,
    visibility: Option<Visibility>,
    file: PathBuf,
    record: Option<AnalyzerValue>,
}

struct ModuleAssembler<'b, 'a> {
    files: &'a AnalysisMap,
    locator: ClassLocator<'a>,
    heads: &'b BTreeMap<PathBuf, ModuleHead<'a>>,
    options: &'b GraphOptions,
    marker: &'b Path,
    name: &'b str,
}

impl<'b, 'a> ModuleAssembler<'b, 'a> {
    fn assemble(&self, owned: &[PathBuf], site: &ModuleDefinitionSite) -> Result<ModuleNode> {
        let mut node = ModuleNode {
            id: self.marker.to_path_buf(),
            name: self.name.to_string(),
            root_dir: self.marker.parent().map(Path::to_path_buf).unwrap_or_default(),
            files: owned.to_vec(),
            providers: BTreeMap::new(),
            controllers: BTreeMap::new(),
            dynamic_providers: Vec::new(),
            raw_dependencies: Vec::new(),
            definition: site.definition.clone(),
        };

        for file in owned {
            let Some(analysis) = self.files.get(file) else {
                continue;
            };
            for class in &analysis.classes {
                self.register_class(&mut node, file, class)?;
            }
            for inject in &analysis.inject_sites {
                match (&inject.token, inject.is_valid()) {
                    (Some(token), true) => node.raw_dependencies.push(RawDependency {
                        file: file.clone(),
                        token: token.clone(),
                        enclosing_class: inject.enclosing_class.clone(),
                    }),
                    _ => {
                        return Err(GraphError::IndeterminableToken {
                            module: self.name.to_string(),
                            file: file.clone(),
                            offset: inject.span.start,
                        });
                    }
                }
            }
        }

        let mut explicit = BTreeSet::new();
        for entry in &site.definition.providers {
            self.merge_entry(&mut node, &mut explicit, self.marker, entry)?;
        }
        Ok(node)
    }

    fn register_class(&self, node: &mut ModuleNode, file: &Path, class: &ClassMetadata) -> Result<()> {
        if class.has_decorator("Injectable") {
            if node.providers.contains_key(&class.name) {
                return Err(self.ambiguous(&class.name));
            }
            let options = class
                .decorator("Injectable")
                .and_then(|d| d.args.first())
                .cloned()
                .unwrap_or(AnalyzerValue::Undefined);
            let provider = ProviderRef {
                token: class.name.clone(),
                strategy: ProviderStrategy::Constructor {
                    class: self.locator.declared(file, class),
                },
                visibility: self
                    .visibility(file, &class.name, options.get("visibleTo"))?
                    .unwrap_or(Visibility::Module),
                scope: self.scope(&class.name, options.get("scope"))?.unwrap_or(Scope::Singleton),
                file: file.to_path_buf(),
                explicit: false,
                record: None,
            };
            node.providers.insert(class.name.clone(), provider);
        }

        let is_controller = self
            .options
            .controller_decorators
            .iter()
            .any(|name| class.has_decorator(name));
        if is_controller {
            node.controllers
                .insert(class.name.clone(), self.locator.declared(file, class));
        }
        Ok(())
    }

    /// Fold one `providers[]` entry into the module.
    fn merge_entry(
        &self,
        node: &mut ModuleNode,
        explicit: &mut BTreeSet<String>,
        file: &Path,
        entry: &AnalyzerValue,
    ) -> Result<()> {
        let draft = match entry {
            AnalyzerValue::Spread(inner) => {
                node.dynamic_providers.push((**inner).clone());
                return Ok(());
            }
            AnalyzerValue::Record(_) => self.record_draft(file, entry)?,
            AnalyzerValue::ForwardRef(name) => self.class_draft(file, &SymbolRef::local(name.clone()))?,
            AnalyzerValue::SymbolicRef(symbol) => match self.dereference(file, symbol) {
                Some((origin, value @ AnalyzerValue::Record(_))) => self.record_draft(&origin, value)?,
                Some((origin, AnalyzerValue::Array(items))) => {
                    for item in items {
                        self.merge_entry(node, explicit, &origin, item)?;
                    }
                    return Ok(());
                }
                _ => self.class_draft(file, symbol)?,
            },
            other => {
                return Err(GraphError::InvalidProvider {
                    module: self.name.to_string(),
                    reason: format!("unsupported provider entry {}", describe(other)),
                });
            }
        };

        if !explicit.insert(draft.token.clone()) {
            return Err(self.ambiguous(&draft.token));
        }

        let provider = match node.providers.remove(&draft.token) {
            Some(implicit) => ProviderRef {
                file: if draft.strategy.is_some() { draft.file } else { implicit.file },
                strategy: draft.strategy.unwrap_or(implicit.strategy),
                scope: draft.scope.unwrap_or(implicit.scope),
                visibility: draft.visibility.unwrap_or(implicit.visibility),
                token: draft.token,
                explicit: true,
                record: draft.record,
            },
            None => {
                let Some(strategy) = draft.strategy else {
                    return Err(GraphError::InvalidProvider {
                        module: self.name.to_string(),
                        reason: format!(
                            "'{}' declares none of useValue, useClass, useExisting or useFactory",
                            draft.token
                        ),
                    });
                };
                ProviderRef {
                    token: draft.token,
                    strategy,
                    scope: draft.scope.unwrap_or(Scope::Singleton),
                    visibility: draft.visibility.unwrap_or(Visibility::Module),
                    file: draft.file,
                    explicit: true,
                    record: draft.record,
                }
            }
        };
        node.providers.insert(provider.token.clone(), provider);
        Ok(())
    }

    /// A top-level constant a provider entry refers to, with its file.
    fn dereference(&self, file: &Path, symbol: &SymbolRef) -> Option<(PathBuf, &'a AnalyzerValue)> {
        if symbol.name.contains('.') {
            return None;
        }
        let target = self.locator.index().resolve_binding(file, &symbol.name)?;
        let analysis = self.files.get(&target.file)?;
        if analysis.class(&target.local).is_some() {
            return None;
        }
        analysis
            .locals
            .get(&target.local)
            .map(|value| (target.file.clone(), value))
    }

    /// A bare class reference: `providers: [UserService]`.
    fn class_draft(&self, file: &Path, symbol: &SymbolRef) -> Result<ProviderDraft> {
        let class = self.locator.reference(file, symbol);
        let (scope, visibility) = match self.locator.find(file, &symbol.name) {
            Some((class_file, metadata)) => {
                let options = metadata
                    .decorator("Injectable")
                    .and_then(|d| d.args.first())
                    .cloned()
                    .unwrap_or(AnalyzerValue::Undefined);
                (
                    self.scope(&class.name, options.get("scope"))?,
                    self.visibility(class_file, &class.name, options.get("visibleTo"))?,
                )
            }
            None => (None, None),
        };
        Ok(ProviderDraft {
            token: class.name.clone(),
            file: class.file.clone().unwrap_or_else(|| file.to_path_buf()),
            strategy: Some(ProviderStrategy::Constructor { class }),
            scope,
            visibility,
            record: None,
        })
    }

    /// `{ provide, useValue | useClass | useExisting | useFactory, ... }`
    fn record_draft(&self, file: &Path, record: &AnalyzerValue) -> Result<ProviderDraft> {
        let provide = record.get("provide").ok_or_else(|| GraphError::InvalidProvider {
            module: self.name.to_string(),
            reason: "provider record has no 'provide' token".to_string(),
        })?;
        let token = provide
            .token_name()
            .map(String::from)
            .ok_or_else(|| GraphError::InvalidProvider {
                module: self.name.to_string(),
                reason: format!("'provide' must be an identifier or string, found {}", describe(provide)),
            })?;

        let strategy = if let Some(value) = record.get("useValue") {
            Some(ProviderStrategy::Value {
                value: value.clone(),
                file: file.to_path_buf(),
            })
        } else if let Some(value) = record.get("useClass") {
            let refs: Vec<&AnalyzerValue> = match value {
                AnalyzerValue::Array(items) => items.iter().collect(),
                single => vec![single],
            };
            let classes = refs
                .into_iter()
                .map(|item| match item {
                    AnalyzerValue::SymbolicRef(symbol) => Ok(self.locator.reference(file, symbol)),
                    AnalyzerValue::ForwardRef(name) => {
                        Ok(self.locator.reference(file, &SymbolRef::local(name.clone())))
                    }
                    other => Err(GraphError::InvalidProvider {
                        module: self.name.to_string(),
                        reason: format!("useClass of '{token}' must reference a class, found {}", describe(other)),
                    }),
                })
                .collect::<Result<Vec<_>>>()?;
            Some(ProviderStrategy::UseClass { classes })
        } else if let Some(value) = record.get("useExisting") {
            let target = value.token_name().ok_or_else(|| GraphError::InvalidProvider {
                module: self.name.to_string(),
                reason: format!("useExisting of '{token}' must be a token, found {}", describe(value)),
            })?;
            Some(ProviderStrategy::Existing {
                token: target.to_string(),
            })
        } else if let Some(value) = record.get("useFactory") {
            let inject = match record.get("inject") {
                None => Vec::new(),
                Some(AnalyzerValue::Array(items)) => items
                    .iter()
                    .map(|item| {
                        item.token_name().map(String::from).ok_or_else(|| GraphError::InvalidProvider {
                            module: self.name.to_string(),
                            reason: format!(
                                "inject list of '{token}' must contain tokens, found {}",
                                describe(item)
                            ),
                        })
                    })
                    .collect::<Result<Vec<_>>>()?,
                Some(other) => {
                    return Err(GraphError::InvalidProvider {
                        module: self.name.to_string(),
                        reason: format!("inject of '{token}' must be an array, found {}", describe(other)),
                    });
                }
            };
            Some(ProviderStrategy::Factory(FactoryProvider {
                factory: value.clone(),
                inject,
                file: file.to_path_buf(),
            }))
        } else if let Some(symbol) = provide.as_symbol() {
            self.locator
                .find(file, &symbol.name)
                .map(|_| ProviderStrategy::Constructor {
                    class: self.locator.reference(file, symbol),
                })
        } else {
            None
        };

        let origin = match &strategy {
            Some(ProviderStrategy::Constructor { class }) => class.file.clone(),
            _ => None,
        };
        Ok(ProviderDraft {
            scope: self.scope(&token, record.get("scope"))?,
            visibility: self.visibility(file, &token, record.get("visibleTo"))?,
            token,
            strategy,
            file: origin.unwrap_or_else(|| file.to_path_buf()),
            record: Some(record.clone()),
        })
    }

    fn scope(&self, token: &str, value: Option<&AnalyzerValue>) -> Result<Option<Scope>> {
        let Some(value) = value else {
            return Ok(None);
        };
        match value.as_str().and_then(Scope::parse) {
            Some(scope) => Ok(Some(scope)),
            None => Err(GraphError::InvalidScope {
                module: self.name.to_string(),
                token: token.to_string(),
                scope: value.as_str().map(String::from).unwrap_or_else(|| describe(value)),
            }),
        }
    }

    fn visibility(&self, file: &Path, token: &str, value: Option<&AnalyzerValue>) -> Result<Option<Visibility>> {
        let invalid = |reason: String| GraphError::InvalidVisibility {
            module: self.name.to_string(),
            token: token.to_string(),
            reason,
        };
        match value {
            None => Ok(None),
            Some(AnalyzerValue::Str(s)) if s == "all" => Ok(Some(Visibility::All)),
            Some(AnalyzerValue::Str(s)) if s == "module" => Ok(Some(Visibility::Module)),
            Some(AnalyzerValue::Str(s)) => Err(invalid(format!("unknown visibility '{s}'"))),
            Some(AnalyzerValue::Array(items)) => {
                let mut names = items
                    .iter()
                    .map(|item| {
                        self.module_name_of(file, item).ok_or_else(|| {
                            invalid(format!("{} does not resolve to a module definition", describe(item)))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?;
                names.sort();
                names.dedup();
                Ok(Some(Visibility::Allowlist(names)))
            }
            Some(other) => Err(invalid(format!("expected a string or an array, found {}", describe(other)))),
        }
    }

    /// Name of the module whose definition `value` references.
    fn module_name_of(&self, file: &Path, value: &AnalyzerValue) -> Option<String> {
        let symbol = value.as_symbol()?;
        if symbol.name.contains('.') {
            return None;
        }
        let target = self.locator.index().resolve_binding(file, &symbol.name)?;
        let head = self.heads.get(&target.file)?;
        let site = head.site;
        let matches = site.local.as_deref() == Some(target.local.as_str())
            || site.exported_as.iter().any(|alias| *alias == target.local)
            || (site.local.is_none() && target.local == "default");
        matches.then(|| head.name.clone())
    }

    fn ambiguous(&self, token: &str) -> GraphError {
        GraphError::AmbiguousProvider {
            module: self.name.to_string(),
            token: token.to_string(),
        }
    }
}

/// Short human description of a value for error messages.
fn describe(value: &AnalyzerValue) -> String {
    match value {
        AnalyzerValue::Null => "null".to_string(),
        AnalyzerValue::Undefined => "undefined".to_string(),
        AnalyzerValue::Bool(b) => b.to_string(),
        AnalyzerValue::Num(n) => n.to_string(),
        AnalyzerValue::Str(s) => format!("'{s}'"),
        AnalyzerValue::Array(_) => "an array".to_string(),
        AnalyzerValue::Record(_) => "an object".to_string(),
        AnalyzerValue::Spread(_) => "a spread".to_string(),
        AnalyzerValue::SymbolicRef(symbol) => format!("'{}'", symbol.name),
        AnalyzerValue::ForwardRef(name) => format!("forwardRef to '{name}'"),
        AnalyzerValue::CallExpr(call) => format!("a call to '{}'", call.callee),
        AnalyzerValue::NewExpr(new) => format!("new {}", new.class_name),
        AnalyzerValue::FactoryCapture(_) => "a function".to_string(),
        AnalyzerValue::Opaque(text) => format!("`{text}`"),
    }
}
