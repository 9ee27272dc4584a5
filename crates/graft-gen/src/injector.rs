//! Container factory generation.
//!
//! Every provider (and every controller that is not also a provider)
//! becomes one registry entry keyed by its node id. Entries are emitted in
//! id order; each carries its scope and a factory receiving the lookup
//! function, or an alias for `useExisting`.

use graft_analyzer::{AnalyzerValue, InjectSite, ProgramIndex};
use graft_graph::{ClassTarget, ModuleGraph, ModuleNode, ProviderRef, ProviderStrategy, Scope};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{GenError, Result};
use crate::imports::{ImportTable, quote};
use crate::render::Renderer;
use crate::runtime::{CONTAINER, HEADER, INJECTION_CONTEXT, LOOKUP};
use crate::stable_key::StableKey;
use crate::writer::CodeWriter;
use crate::{GenInput, GenOptions};

/// Export of the core package that runs a constructor with `inject()`
/// available.
pub const RUN_IN_INJECTION_CONTEXT: &str = "runInInjectionContext";

enum Entry {
    Factory { scope: Scope, factory: String },
    Alias(String),
}

struct Injector<'g, 'a> {
    graph: &'g ModuleGraph,
    imports: ImportTable<'a>,
    core_package: &'g str,
    uses_context: bool,
}

/// Render the container module.
pub fn generate_injector(input: &GenInput<'_>, options: &GenOptions) -> Result<String> {
    let mut injector = Injector {
        graph: input.graph,
        imports: ImportTable::new(ProgramIndex::new(input.program), &options.out_dir),
        core_package: &options.core_package,
        uses_context: false,
    };

    let mut entries: BTreeMap<String, Entry> = BTreeMap::new();
    let mut dynamic: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for module in input.graph.modules() {
        for provider in module.providers.values() {
            let entry = injector.provider(module, provider)?;
            entries.insert(module.node_id(&provider.token), entry);
        }
        for (name, class) in &module.controllers {
            if module.providers.contains_key(name) {
                continue;
            }
            let factory = injector.construct(module, name, class)?;
            entries.insert(
                module.node_id(name),
                Entry::Factory {
                    scope: Scope::Singleton,
                    factory: format!("({LOOKUP}) => {factory}"),
                },
            );
        }
        if !module.dynamic_providers.is_empty() {
            dynamic.insert(&module.name, injector.dynamic(input, module)?);
        }
    }
    tracing::debug!(entries = entries.len(), "rendered injector registry");

    let mut w = CodeWriter::new();
    w.line(HEADER);
    injector.imports.write(&mut w);
    w.blank();

    w.open("const registry = {");
    for (id, entry) in &entries {
        match entry {
            Entry::Factory { scope, factory } => {
                w.open(format!("{}: {{", quote(id)));
                w.line(format!("scope: {},", quote(scope.as_str())));
                w.line(format!("factory: {factory},"));
                w.close("},");
            }
            Entry::Alias(target) => {
                w.line(format!("{}: {{ alias: {} }},", quote(id), quote(target)));
            }
        }
    }
    w.close("};");
    w.blank();

    if injector.uses_context {
        w.raw(INJECTION_CONTEXT);
        w.blank();
    }

    w.raw(CONTAINER);
    w.blank();

    w.open("export const providerIds = Object.freeze([");
    for id in entries.keys() {
        w.line(format!("{},", quote(id)));
    }
    w.close("]);");
    w.blank();

    w.open("export const dynamicProviders = Object.freeze({");
    for (module, values) in &dynamic {
        w.line(format!("{}: Object.freeze([{}]),", quote(module), values.join(", ")));
    }
    w.close("});");

    Ok(w.finish())
}

impl Injector<'_, '_> {
    fn provider(&mut self, module: &ModuleNode, provider: &ProviderRef) -> Result<Entry> {
        let consumer = provider.token.as_str();
        let factory = match &provider.strategy {
            ProviderStrategy::Value { value, file } => {
                let graph = self.graph;
                let inject = |site: &InjectSite| site_lookup(graph, module, consumer, site);
                let value = Renderer::new(&mut self.imports).value(file, value, &inject)?;
                format!("({LOOKUP}) => ({value})")
            }
            ProviderStrategy::UseClass { classes } => {
                let mut built = Vec::with_capacity(classes.len());
                for class in classes {
                    built.push(self.construct(module, consumer, class)?);
                }
                match built.as_slice() {
                    [single] => format!("({LOOKUP}) => {single}"),
                    _ => format!("({LOOKUP}) => [{}]", built.join(", ")),
                }
            }
            ProviderStrategy::Existing { token } => {
                let target = resolve_id(self.graph, module, consumer, token)?;
                return Ok(Entry::Alias(target));
            }
            ProviderStrategy::Factory(factory) => {
                let args = factory
                    .inject
                    .iter()
                    .map(|token| lookup(self.graph, module, consumer, token, false))
                    .collect::<Result<Vec<_>>>()?;
                let graph = self.graph;
                let inject = |site: &InjectSite| site_lookup(graph, module, consumer, site);
                let callee = match &factory.factory {
                    AnalyzerValue::FactoryCapture(capture) => {
                        let code = Renderer::new(&mut self.imports).capture(&factory.file, capture, &inject)?;
                        format!("({code})")
                    }
                    AnalyzerValue::SymbolicRef(symbol) => self.imports.symbol(&factory.file, symbol)?,
                    AnalyzerValue::ForwardRef(name) => self.imports.binding(&factory.file, name)?,
                    _ => {
                        return Err(GenError::unrenderable(
                            format!("useFactory of '{consumer}' in module '{}'", module.name),
                            "expected a function expression or a reference to one",
                        ));
                    }
                };
                format!("({LOOKUP}) => {callee}({})", args.join(", "))
            }
            ProviderStrategy::Constructor { class } => {
                format!("({LOOKUP}) => {}", self.construct(module, consumer, class)?)
            }
        };
        Ok(Entry::Factory {
            scope: provider.scope,
            factory,
        })
    }

    /// `new Class(...)`, wrapped in an injection context when the class
    /// body calls `inject()`.
    fn construct(&mut self, module: &ModuleNode, consumer: &str, class: &ClassTarget) -> Result<String> {
        let alias = self.imports.class(class)?;
        let mut args = Vec::with_capacity(class.params.len());
        for param in &class.params {
            args.push(match &param.token {
                Some(token) => lookup(self.graph, module, consumer, token, param.optional)?,
                None => "undefined".to_string(),
            });
        }
        let expr = format!("new {alias}({})", args.join(", "));
        if class.inject_sites.is_empty() {
            return Ok(expr);
        }

        let Some(file) = &class.file else {
            return Err(GenError::unrenderable(
                format!("class '{}'", class.name),
                "inject() sites without a declaring file",
            ));
        };
        let mut tokens = BTreeSet::new();
        for site in &class.inject_sites {
            match site.token.as_deref() {
                Some(token) if site.is_valid() => {
                    tokens.insert(token);
                }
                _ => {
                    return Err(GenError::IndeterminableInject {
                        module: module.name.clone(),
                        consumer: consumer.to_string(),
                    });
                }
            }
        }
        let mut pairs = Vec::with_capacity(tokens.len());
        for token in tokens {
            let value = self.imports.binding(file, token)?;
            let id = resolve_id(self.graph, module, consumer, token)?;
            pairs.push(format!("[{value}, {}]", quote(&id)));
        }

        self.uses_context = true;
        let run = self
            .imports
            .import(self.core_package, Some(RUN_IN_INJECTION_CONTEXT), RUN_IN_INJECTION_CONTEXT);
        Ok(format!(
            "{run}(injectionContext({LOOKUP}, [{}]), () => {expr})",
            pairs.join(", ")
        ))
    }

    /// Spread bundles, deduplicated and ordered by stable key.
    fn dynamic(&mut self, input: &GenInput<'_>, module: &ModuleNode) -> Result<Vec<String>> {
        let keys = StableKey::expanding(ProgramIndex::new(input.program));
        let mut ordered = BTreeMap::new();
        for value in &module.dynamic_providers {
            ordered
                .entry(keys.key(&module.id, value))
                .or_insert(value);
        }

        let reject = |_: &InjectSite| -> Result<String> {
            Err(GenError::unrenderable(
                format!("dynamic providers of module '{}'", module.name),
                "inject() outside a provider factory",
            ))
        };
        let mut renderer = Renderer::new(&mut self.imports);
        ordered
            .values()
            .map(|value| Ok(format!("...{}", renderer.value(&module.id, value, &reject)?)))
            .collect()
    }
}

fn resolve_id(graph: &ModuleGraph, module: &ModuleNode, consumer: &str, token: &str) -> Result<String> {
    match graph.resolve_token(&module.id, token) {
        Some(resolved) => Ok(resolved.module.node_id(&resolved.provider.token)),
        None => Err(GenError::UnresolvedToken {
            module: module.name.clone(),
            consumer: consumer.to_string(),
            token: token.to_string(),
        }),
    }
}

fn lookup(graph: &ModuleGraph, module: &ModuleNode, consumer: &str, token: &str, optional: bool) -> Result<String> {
    match resolve_id(graph, module, consumer, token) {
        Ok(id) => Ok(format!("{LOOKUP}({})", quote(&id))),
        Err(_) if optional => Ok("undefined".to_string()),
        Err(err) => Err(err),
    }
}

fn site_lookup(graph: &ModuleGraph, module: &ModuleNode, consumer: &str, site: &InjectSite) -> Result<String> {
    match site.token.as_deref() {
        Some(token) if site.is_valid() => lookup(graph, module, consumer, token, false),
        _ => Err(GenError::IndeterminableInject {
            module: module.name.clone(),
            consumer: consumer.to_string(),
        }),
    }
}
