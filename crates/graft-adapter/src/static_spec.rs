//! Static adapter shape, read from the adapter class's static fields.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{AdapterError, Result};

/// Everything the compiler knows about one protocol adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterStaticSpec {
    pub adapter_id: String,
    pub class_name: String,
    /// Package specifier the adapter was found through.
    pub package: String,
    /// File declaring the adapter class.
    #[serde(skip)]
    pub file: PathBuf,
    pub pipeline: PipelineSpec,
    /// Phase ids in execution order, deduplicated.
    pub middleware_phase_order: Vec<String>,
    /// Phase id -> `true`; key set equals `middleware_phase_order`.
    pub supported_middleware_phases: BTreeMap<String, bool>,
    pub entry_decorators: EntryDecorators,
    pub runtime: RuntimeHooks,
}

impl AdapterStaticSpec {
    pub fn supports_phase(&self, phase: &str) -> bool {
        self.supported_middleware_phases.contains_key(phase)
    }

    pub fn is_handler_decorator(&self, name: &str) -> bool {
        self.entry_decorators.handler.iter().any(|h| h == name)
    }
}

/// Request pipeline stages. Entries are references as written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSpec {
    pub middlewares: Vec<String>,
    pub guards: Vec<String>,
    pub pipes: Vec<String>,
    pub handler: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDecorators {
    pub controller: String,
    pub handler: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeHooks {
    pub start: String,
    pub stop: String,
}

/// One dispatchable handler method.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandlerIndexEntry {
    /// `<adapterId>:<relativePath>#<Class>.<method>`
    pub id: String,
    pub adapter_id: String,
    pub file: String,
    pub class_name: String,
    pub method: String,
}

impl HandlerIndexEntry {
    pub fn new(adapter_id: &str, file: &str, class_name: &str, method: &str) -> Self {
        Self {
            id: format!("{adapter_id}:{file}#{class_name}.{method}"),
            adapter_id: adapter_id.to_string(),
            file: file.to_string(),
            class_name: class_name.to_string(),
            method: method.to_string(),
        }
    }
}

/// Adapter specs keyed (and iterated) by adapter id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AdapterSpecs {
    specs: BTreeMap<String, AdapterStaticSpec>,
}

impl AdapterSpecs {
    pub fn get(&self, adapter_id: &str) -> Option<&AdapterStaticSpec> {
        self.specs.get(adapter_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdapterStaticSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Controller decorator names of every adapter, sorted and deduplicated.
    pub fn controller_decorators(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .specs
            .values()
            .map(|spec| spec.entry_decorators.controller.clone())
            .collect();
        names.sort();
        names.dedup();
        names
    }

    /// Collect specs, failing on the first repeated adapter id.
    pub fn try_from_specs(specs: impl IntoIterator<Item = AdapterStaticSpec>) -> Result<Self> {
        let mut collected = Self::default();
        for spec in specs {
            collected.insert(spec)?;
        }
        Ok(collected)
    }

    pub(crate) fn insert(&mut self, spec: AdapterStaticSpec) -> Result<()> {
        if let Some(existing) = self.specs.get(&spec.adapter_id) {
            return Err(AdapterError::DuplicateAdapterId {
                id: spec.adapter_id.clone(),
                first: existing.class_name.clone(),
                second: spec.class_name.clone(),
            });
        }
        self.specs.insert(spec.adapter_id.clone(), spec);
        Ok(())
    }
}
