//! End-to-end compilation pipeline.
//!
//! ```text
//!  list files ─▶ analyze (cached) ─▶ adapters? ─▶ GraphBuilder ─▶ handler index ─▶ generate ─▶ write
//! ```
//!
//! Only file reads and writes go through the async [`Runtime`]; every stage
//! after analysis is synchronous over in-memory data.

use graft_adapter::{AdapterResolver, AdapterSpecs, HandlerIndexEntry, build_handler_index};
use graft_analyzer::{AnalysisCache, AnalysisMap, AnalyzerOptions, Runtime, SourceAnalyzer};
use graft_config::GraftConfig;
use graft_gen::{Artifacts, GenInput, GenOptions};
use graft_graph::{
    GraphBuilder, GraphOptions, GraphWarning, ModuleGraph, ModuleImpact, ProgramSymbols,
};
use path_clean::PathClean;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::files::SourceFilter;

/// Everything one successful compilation produced.
#[derive(Debug)]
pub struct Compilation {
    pub program: AnalysisMap,
    pub graph: ModuleGraph,
    pub adapters: AdapterSpecs,
    pub handler_index: Vec<HandlerIndexEntry>,
    pub artifacts: Artifacts,
}

impl Compilation {
    pub fn warnings(&self) -> &[GraphWarning] {
        self.graph.warnings()
    }
}

#[derive(Debug)]
pub struct BuildOutput {
    pub compilation: Compilation,
    /// Artifact paths in write order.
    pub written: Vec<PathBuf>,
}

/// Modules touched by a change set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImpactReport {
    /// Names of modules owning a changed file, sorted by module id.
    pub changed_modules: Vec<String>,
    /// Names of changed modules and all their transitive dependents.
    pub affected_modules: Vec<String>,
    /// Cache entries dropped because they were changed or import a changed file.
    pub invalidated_files: Vec<PathBuf>,
}

/// Reusable compiler bound to one project root.
///
/// The analysis cache survives between calls, so repeated compilations
/// re-analyze only files whose content changed.
///
/// ```no_run
/// use graft::{Compiler, GraftConfig};
///
/// # #[tokio::main]
/// # async fn main() -> graft::Result<()> {
/// let mut compiler = Compiler::new("/path/to/app", GraftConfig::default());
/// let output = compiler.build().await?;
/// for path in &output.written {
///     println!("wrote {}", path.display());
/// }
/// # Ok(())
/// # }
/// ```
pub struct Compiler {
    runtime: Arc<dyn Runtime>,
    analyzer: SourceAnalyzer,
    root: PathBuf,
    config: GraftConfig,
    cache: AnalysisCache,
}

impl Compiler {
    /// Compiler over the native filesystem.
    #[cfg(not(target_family = "wasm"))]
    pub fn new(root: impl Into<PathBuf>, config: GraftConfig) -> Self {
        let root = root.into().clean();
        let runtime: Arc<dyn Runtime> = Arc::new(graft_analyzer::NativeRuntime::new(root.clone()));
        Self::with_runtime(runtime, root, config)
    }

    pub fn with_runtime(runtime: Arc<dyn Runtime>, root: impl Into<PathBuf>, config: GraftConfig) -> Self {
        let options = AnalyzerOptions {
            core_package: config.core_package.clone(),
            extensions: config.extensions.clone(),
        };
        Self {
            analyzer: SourceAnalyzer::with_options(Arc::clone(&runtime), options),
            runtime,
            root: root.into().clean(),
            config,
            cache: AnalysisCache::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &GraftConfig {
        &self.config
    }

    pub fn cache(&self) -> &AnalysisCache {
        &self.cache
    }

    /// Sorted source files taking part in compilation.
    pub async fn source_files(&self) -> Result<Vec<PathBuf>> {
        let filter = SourceFilter::new(&self.config, &self.root);
        let listed = self.runtime.list_files(filter.source_dir()).await?;
        Ok(filter.select(listed))
    }

    /// Analyze every source file, reusing cached results for unchanged
    /// content. All file-level failures are reported together.
    pub async fn analyze(&mut self) -> Result<AnalysisMap> {
        let files = self.source_files().await?;
        let listed: BTreeSet<PathBuf> = files.iter().cloned().collect();
        let stale = self.cache.reconcile(&listed);
        if !stale.is_empty() {
            tracing::debug!(dropped = stale.len(), "source listing changed, dropped cached analyses");
        }
        let mut program = AnalysisMap::new();
        let mut diagnostics = Vec::new();
        let mut reused = 0usize;

        for path in files {
            let source = self.runtime.read_to_string(&path).await?;
            if let Some(cached) = self.cache.get(&path, &source) {
                reused += 1;
                program.insert(path, (*cached).clone());
                continue;
            }
            match self.analyzer.analyze(&path, &source) {
                Ok(analysis) => {
                    let analysis = self.cache.insert(path.clone(), &source, analysis);
                    program.insert(path, (*analysis).clone());
                }
                Err(diagnostic) => diagnostics.push(diagnostic),
            }
        }

        if !diagnostics.is_empty() {
            return Err(Error::Analysis { diagnostics });
        }
        tracing::info!(files = program.len(), reused, "analysis complete");
        Ok(program)
    }

    /// Run the whole pipeline without writing anything.
    pub async fn compile(&mut self) -> Result<Compilation> {
        let program = self.analyze().await?;
        let adapters = self.resolve_adapters(&program).await?;
        let graph = self.build_graph(&program, &adapters)?;
        let handler_index = build_handler_index(&adapters, &program, &graph, &self.root)?;

        let artifacts = graft_gen::generate(
            &GenInput {
                graph: &graph,
                program: &program,
                adapters: &adapters,
                handler_index: &handler_index,
            },
            &self.gen_options(),
        )?;

        Ok(Compilation {
            program,
            graph,
            adapters,
            handler_index,
            artifacts,
        })
    }

    /// Compile and write all artifacts to the output directory.
    pub async fn build(&mut self) -> Result<BuildOutput> {
        let compilation = self.compile().await?;
        let written = self.write(&compilation.artifacts).await?;
        tracing::info!(
            out_dir = %self.config.out_dir(&self.root).display(),
            files = written.len(),
            "artifacts written"
        );
        Ok(BuildOutput {
            compilation,
            written,
        })
    }

    pub async fn write(&self, artifacts: &Artifacts) -> Result<Vec<PathBuf>> {
        let outputs = [
            (self.config.injector_path(&self.root), &artifacts.injector),
            (self.config.metadata_path(&self.root), &artifacts.metadata),
            (self.config.module_config_path(&self.root), &artifacts.module_config),
            (self.config.manifest_path(&self.root), &artifacts.manifest),
        ];

        let mut written = Vec::with_capacity(outputs.len());
        for (path, text) in outputs {
            self.runtime.write_file(&path, text.as_bytes()).await?;
            tracing::debug!(path = %path.display(), bytes = text.len(), "wrote artifact");
            written.push(path);
        }
        Ok(written)
    }

    /// Drop cached analyses for `changed` and their transitive importers.
    pub fn invalidate(&mut self, changed: &[PathBuf]) -> BTreeSet<PathBuf> {
        let changed: Vec<PathBuf> = changed.iter().map(|p| self.absolute(p)).collect();
        self.cache.invalidate(&changed)
    }

    /// Re-validate the project after `changed` files and report which
    /// modules are affected. Relative paths are taken from the root.
    pub async fn impact(&mut self, changed: &[PathBuf]) -> Result<ImpactReport> {
        let changed: Vec<PathBuf> = changed.iter().map(|p| self.absolute(p)).collect();
        let invalidated = self.cache.invalidate(&changed);

        let program = self.analyze().await?;
        let adapters = self.resolve_adapters(&program).await?;
        let graph = self.build_graph(&program, &adapters)?;
        let impact = ModuleImpact::compute(&graph, &program, &changed);

        Ok(ImpactReport {
            changed_modules: impact
                .changed
                .iter()
                .filter_map(|id| graph.module(id))
                .map(|module| module.name.clone())
                .collect(),
            affected_modules: impact
                .affected_names(&graph)
                .into_iter()
                .map(str::to_string)
                .collect(),
            invalidated_files: invalidated.into_iter().collect(),
        })
    }

    /// Adapter packages are only resolved when some module configures one.
    async fn resolve_adapters(&self, program: &AnalysisMap) -> Result<AdapterSpecs> {
        let configured = program
            .values()
            .flat_map(|analysis| &analysis.module_definitions)
            .any(|site| site.definition.adapters.is_some());
        if !configured {
            return Ok(AdapterSpecs::default());
        }

        let specs = AdapterResolver::new(&self.analyzer).resolve(program).await?;
        tracing::info!(adapters = specs.len(), "adapter specs resolved");
        Ok(specs)
    }

    fn build_graph(&self, program: &AnalysisMap, adapters: &AdapterSpecs) -> Result<ModuleGraph> {
        let mut controller_decorators = GraphOptions::default().controller_decorators;
        for decorator in adapters.controller_decorators() {
            if !controller_decorators.contains(&decorator) {
                controller_decorators.push(decorator);
            }
        }
        let options = GraphOptions {
            marker_file: self.config.marker_file.clone(),
            controller_decorators,
        };

        let symbols = ProgramSymbols::new(program);
        let graph = GraphBuilder::new(program)
            .with_options(options)
            .with_symbols(&symbols)
            .build()?;
        tracing::info!(
            modules = graph.len(),
            warnings = graph.warnings().len(),
            "module graph validated"
        );
        Ok(graph)
    }

    fn gen_options(&self) -> GenOptions {
        let mut options = GenOptions::new(&self.root, self.config.out_dir(&self.root));
        options.core_package = self.config.core_package.clone();
        options.source_path = self.config.source_path.clone();
        options.source_format = self.config.source_format.clone();
        options.module_config_file = self.config.module_config_file.clone();
        options
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf().clean()
        } else {
            self.root.join(path).clean()
        }
    }
}
