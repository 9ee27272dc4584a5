//! Controller, handler and middleware wiring checks; handler index.

use graft_analyzer::{AnalysisMap, AnalyzerValue, ClassMetadata, DecoratorMetadata, RecordEntry, RecordKey};
use graft_graph::ModuleGraph;
use std::path::Path;

use crate::error::{AdapterError, Result};
use crate::static_spec::{AdapterSpecs, AdapterStaticSpec, HandlerIndexEntry};

/// Decorator declaring middleware usage on a class or method.
pub const MIDDLEWARES_DECORATOR: &str = "Middlewares";

/// Validate adapter wiring across the program and build the globally
/// sorted handler index. Handler file paths are made relative to `root`.
pub fn build_handler_index(
    specs: &AdapterSpecs,
    program: &AnalysisMap,
    graph: &ModuleGraph,
    root: &Path,
) -> Result<Vec<HandlerIndexEntry>> {
    validate_module_config(specs, graph)?;

    let mut index = Vec::new();
    for (path, analysis) in program {
        let relative = relative_path(path, root);
        for class in &analysis.classes {
            index.extend(class_handlers(specs, class, &relative)?);
        }
    }
    index.sort();
    index.dedup();
    tracing::debug!(handlers = index.len(), "handler index built");
    Ok(index)
}

fn class_handlers(specs: &AdapterSpecs, class: &ClassMetadata, relative: &str) -> Result<Vec<HandlerIndexEntry>> {
    let owners: Vec<&AdapterStaticSpec> = specs
        .iter()
        .filter(|spec| class.has_decorator(&spec.entry_decorators.controller))
        .collect();
    if owners.len() > 1 {
        return Err(AdapterError::MultipleAdapterOwners {
            class: class.name.clone(),
            adapters: owners.iter().map(|s| s.adapter_id.clone()).collect(),
        });
    }
    let owner = owners.first().copied();

    if let Some(decorator) = class.decorator(MIDDLEWARES_DECORATOR) {
        let location = format!("class '{}'", class.name);
        let Some(owner) = owner else {
            return Err(AdapterError::MiddlewaresOutsideController { location });
        };
        check_phases(owner, &middleware_phases(decorator, &location)?, &location)?;
    }

    let mut entries = Vec::new();
    for method in &class.methods {
        let location = format!("'{}.{}'", class.name, method.name);

        for spec in specs.iter() {
            let is_handler = method.decorators.iter().any(|d| spec.is_handler_decorator(&d.name));
            if !is_handler {
                continue;
            }
            if owner.map(|o| o.adapter_id.as_str()) != Some(spec.adapter_id.as_str()) {
                return Err(AdapterError::HandlerOutsideController {
                    class: class.name.clone(),
                    method: method.name.clone(),
                    adapter: spec.adapter_id.clone(),
                });
            }
            entries.push(HandlerIndexEntry::new(&spec.adapter_id, relative, &class.name, &method.name));
        }

        if let Some(decorator) = method.decorator(MIDDLEWARES_DECORATOR) {
            let Some(owner) = owner else {
                return Err(AdapterError::MiddlewaresOutsideController { location });
            };
            check_phases(owner, &middleware_phases(decorator, &location)?, &location)?;
        }
    }
    Ok(entries)
}

/// Phase ids named by `@Middlewares(phase, refs)` or
/// `@Middlewares({ phase: refs }, ...)`.
fn middleware_phases(decorator: &DecoratorMetadata, location: &str) -> Result<Vec<String>> {
    let invalid = |reason: &str| AdapterError::InvalidMiddlewares {
        location: location.to_string(),
        reason: reason.to_string(),
    };
    match decorator.args.as_slice() {
        [AnalyzerValue::Str(phase), AnalyzerValue::Array(_)] => Ok(vec![phase.clone()]),
        [] => Err(invalid("expected (phaseId, refs) or ({ phaseId: refs })")),
        args => {
            let mut phases = Vec::new();
            for arg in args {
                phases.extend(record_keys(arg).map_err(|reason| invalid(&reason))?);
            }
            Ok(phases)
        }
    }
}

/// Static keys of a record literal.
fn record_keys(value: &AnalyzerValue) -> std::result::Result<Vec<String>, String> {
    let entries = value
        .as_record()
        .ok_or_else(|| "expected (phaseId, refs) or ({ phaseId: refs })".to_string())?;
    entries
        .iter()
        .map(|entry| match entry {
            RecordEntry::Property {
                key: RecordKey::Static(key),
                ..
            } => Ok(key.clone()),
            RecordEntry::Property {
                key: RecordKey::Computed(key),
                ..
            } => Err(format!("computed phase id [{key}] is not statically known")),
            RecordEntry::Spread { .. } => Err("spread is not allowed".to_string()),
        })
        .collect()
}

fn check_phases(spec: &AdapterStaticSpec, phases: &[String], location: &str) -> Result<()> {
    match phases.iter().find(|phase| !spec.supports_phase(phase)) {
        Some(phase) => Err(AdapterError::UnsupportedMiddlewarePhase {
            adapter: spec.adapter_id.clone(),
            phase: phase.clone(),
            location: location.to_string(),
        }),
        None => Ok(()),
    }
}

/// `adapters: { <adapterId>: { middlewares: { <phase>: [...] } } }`
fn validate_module_config(specs: &AdapterSpecs, graph: &ModuleGraph) -> Result<()> {
    for module in graph.modules() {
        let Some(adapters) = &module.definition.adapters else {
            continue;
        };
        let location = format!("module '{}'", module.name);
        let adapter_ids = record_keys(adapters).map_err(|reason| AdapterError::InvalidMiddlewares {
            location: location.clone(),
            reason,
        })?;
        for adapter_id in adapter_ids {
            let Some(spec) = specs.get(&adapter_id) else {
                return Err(AdapterError::UnknownAdapter {
                    module: module.name.clone(),
                    adapter: adapter_id,
                });
            };
            let Some(middlewares) = adapters.get(&adapter_id).and_then(|config| config.get("middlewares")) else {
                continue;
            };
            let phases = record_keys(middlewares).map_err(|reason| AdapterError::InvalidMiddlewares {
                location: location.clone(),
                reason,
            })?;
            check_phases(spec, &phases, &location)?;
        }
    }
    Ok(())
}

/// `path` relative to `root` with forward slashes.
pub fn relative_path(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/app/src/users/users.controller.ts"), Path::new("/app")),
            "src/users/users.controller.ts"
        );
    }

    #[test]
    fn test_middleware_phase_forms() {
        let decorator = |args| DecoratorMetadata {
            name: MIDDLEWARES_DECORATOR.to_string(),
            import_source: None,
            is_call: true,
            args,
        };
        let pair = decorator(vec![AnalyzerValue::Str("route".into()), AnalyzerValue::Array(vec![])]);
        assert_eq!(middleware_phases(&pair, "x").unwrap(), vec!["route"]);

        let record = decorator(vec![AnalyzerValue::Record(vec![RecordEntry::Property {
            key: RecordKey::Static("global".into()),
            value: AnalyzerValue::Array(vec![]),
        }])]);
        assert_eq!(middleware_phases(&record, "x").unwrap(), vec!["global"]);

        let bad = decorator(vec![AnalyzerValue::Num(1.0)]);
        assert!(middleware_phases(&bad, "x").is_err());
    }
}
