//! Finding `adapterSpec` exports behind package imports.

use graft_analyzer::{AnalysisMap, AnalyzerValue, FileAnalysis, ReExportKind, SourceAnalyzer};
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{AdapterError, Result};

/// Export name every adapter package provides.
pub const ADAPTER_SPEC_EXPORT: &str = "adapterSpec";

/// Call that wraps the adapter class.
pub const DEFINE_ADAPTER: &str = "defineAdapter";

/// Source text plus analysis of a file loaded on demand.
#[derive(Debug)]
pub struct LoadedFile {
    pub source: String,
    pub analysis: FileAnalysis,
}

/// Memoizing file loader. Files outside the program (package sources) are
/// read through the analyzer's runtime and analyzed once.
pub struct FileLoader<'p> {
    analyzer: &'p SourceAnalyzer,
    program: &'p AnalysisMap,
    cache: HashMap<PathBuf, Option<Arc<LoadedFile>>>,
}

impl<'p> FileLoader<'p> {
    pub fn new(analyzer: &'p SourceAnalyzer, program: &'p AnalysisMap) -> Self {
        Self {
            analyzer,
            program,
            cache: HashMap::default(),
        }
    }

    /// Load `path`; unreadable or unparsable files yield `None`.
    pub async fn load(&mut self, path: &Path) -> Option<Arc<LoadedFile>> {
        if let Some(cached) = self.cache.get(path) {
            return cached.clone();
        }
        let loaded = self.read(path).await;
        self.cache.insert(path.to_path_buf(), loaded.clone());
        loaded
    }

    async fn read(&self, path: &Path) -> Option<Arc<LoadedFile>> {
        let source = match self.analyzer.runtime().read_to_string(path).await {
            Ok(source) => source,
            Err(error) => {
                tracing::debug!(path = %path.display(), %error, "skipping unreadable file");
                return None;
            }
        };
        let analysis = match self.program.get(path) {
            Some(analysis) => analysis.clone(),
            None => match self.analyzer.analyze(path, &source) {
                Ok(analysis) => analysis,
                Err(error) => {
                    tracing::debug!(path = %path.display(), %error, "skipping unanalyzable file");
                    return None;
                }
            },
        };
        Some(Arc::new(LoadedFile { source, analysis }))
    }

    /// Follow `name` exported by `file` through local imports, named
    /// re-exports and wildcard re-exports to its declaring file and local
    /// binding. Cycle-safe.
    pub async fn find_export(&mut self, file: &Path, name: &str) -> Option<(PathBuf, String)> {
        let mut stack = vec![(file.to_path_buf(), name.to_string())];
        let mut visited: HashSet<(PathBuf, String)> = HashSet::default();

        while let Some((file, name)) = stack.pop() {
            if !visited.insert((file.clone(), name.clone())) {
                continue;
            }
            let Some(loaded) = self.load(&file).await else {
                continue;
            };
            let analysis = &loaded.analysis;

            if let Some(local) = analysis.local_for_export(&name) {
                if let Some((edge, binding)) = analysis.import_of(local) {
                    if let Some(imported) = binding.imported.export_name() {
                        stack.push((PathBuf::from(&edge.resolved), imported.to_string()));
                        continue;
                    }
                }
                return Some((file, local.to_string()));
            }

            // Named re-exports take precedence over wildcards; the stack is
            // LIFO so push wildcards first.
            if name != "default" {
                for re_export in analysis.re_exports.iter().rev() {
                    if re_export.kind == ReExportKind::Wildcard {
                        stack.push((PathBuf::from(&re_export.resolved), name.clone()));
                    }
                }
            }
            for re_export in analysis.re_exports.iter().rev() {
                if let ReExportKind::Named { imported, exported } = &re_export.kind {
                    if *exported == name {
                        stack.push((PathBuf::from(&re_export.resolved), imported.clone()));
                    }
                }
            }
        }
        None
    }
}

/// Package entry files imported anywhere in the program, keyed by resolved
/// path with the first specifier (in path order) that reached them.
pub fn package_entries(program: &AnalysisMap) -> BTreeMap<PathBuf, String> {
    let mut entries = BTreeMap::new();
    for analysis in program.values() {
        let edges = analysis
            .imports
            .iter()
            .map(|i| (i.is_relative, &i.source, &i.resolved))
            .chain(
                analysis
                    .re_exports
                    .iter()
                    .map(|r| (r.is_relative, &r.source, &r.resolved)),
            );
        for (is_relative, source, resolved) in edges {
            // Unresolved package specifiers fall back to the raw specifier.
            if is_relative || resolved == source {
                continue;
            }
            entries
                .entry(PathBuf::from(resolved))
                .or_insert_with(|| source.clone());
        }
    }
    entries
}

/// Adapter class behind an `adapterSpec` binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterClassRef {
    /// File declaring the class.
    pub file: PathBuf,
    pub class_name: String,
}

/// Check `local` in `file` is `defineAdapter(Class)` and locate `Class`.
pub async fn adapter_class(
    loader: &mut FileLoader<'_>,
    file: &Path,
    local: &str,
) -> Result<AdapterClassRef> {
    let invalid = || AdapterError::InvalidDefineAdapter {
        file: file.to_path_buf(),
    };
    let loaded = loader.load(file).await.ok_or_else(invalid)?;
    let call = match loaded.analysis.locals.get(local) {
        Some(AnalyzerValue::CallExpr(call))
            if call.callee == DEFINE_ADAPTER || call.callee.ends_with(".defineAdapter") =>
        {
            call
        }
        _ => return Err(invalid()),
    };
    let symbol = match call.args.as_slice() {
        [AnalyzerValue::SymbolicRef(symbol)] => symbol,
        _ => return Err(invalid()),
    };

    if loaded.analysis.class(&symbol.name).is_some() {
        return Ok(AdapterClassRef {
            file: file.to_path_buf(),
            class_name: symbol.name.clone(),
        });
    }

    let unresolved = || AdapterError::UnresolvedAdapterClass {
        class: symbol.name.clone(),
        file: file.to_path_buf(),
    };
    let source = symbol.import_source.as_deref().ok_or_else(unresolved)?;
    let (class_file, class_name) = loader
        .find_export(Path::new(source), symbol.export_name())
        .await
        .ok_or_else(unresolved)?;
    Ok(AdapterClassRef {
        file: class_file,
        class_name,
    })
}
