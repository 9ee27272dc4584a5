//! Adapter spec resolution over a whole program.

use graft_analyzer::{AnalysisMap, SourceAnalyzer};

use crate::error::{AdapterError, Result};
use crate::locate::{ADAPTER_SPEC_EXPORT, FileLoader, adapter_class, package_entries};
use crate::reader::read_adapter_class;
use crate::static_spec::AdapterSpecs;

/// Locates and reads every adapter reachable from the program's package
/// imports.
pub struct AdapterResolver<'p> {
    analyzer: &'p SourceAnalyzer,
}

impl<'p> AdapterResolver<'p> {
    pub fn new(analyzer: &'p SourceAnalyzer) -> Self {
        Self { analyzer }
    }

    /// Resolve all adapter specs. Fails with
    /// [`AdapterError::NoAdapterSpec`] when no package entry exports one.
    pub async fn resolve(&self, program: &AnalysisMap) -> Result<AdapterSpecs> {
        let mut loader = FileLoader::new(self.analyzer, program);
        let mut specs = AdapterSpecs::default();
        let mut seen_classes = Vec::new();

        for (entry, package) in package_entries(program) {
            let Some((file, local)) = loader.find_export(&entry, ADAPTER_SPEC_EXPORT).await else {
                continue;
            };
            let class = adapter_class(&mut loader, &file, &local).await?;
            if seen_classes.contains(&class) {
                continue;
            }

            let Some(loaded) = loader.load(&class.file).await else {
                return Err(AdapterError::UnresolvedAdapterClass {
                    class: class.class_name.clone(),
                    file: class.file.clone(),
                });
            };
            let spec = read_adapter_class(&class.file, &loaded.source, &class.class_name, &package)?;
            tracing::debug!(
                adapter = %spec.adapter_id,
                class = %spec.class_name,
                package = %package,
                "resolved adapter spec"
            );

            specs.insert(spec)?;
            seen_classes.push(class);
        }

        if specs.is_empty() {
            return Err(AdapterError::NoAdapterSpec);
        }
        tracing::info!(adapters = specs.len(), "adapter specs resolved");
        Ok(specs)
    }
}
