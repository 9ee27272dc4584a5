//! Cross-file lookups over a finished analysis set.

use rustc_hash::FxHashSet as HashSet;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::types::{ClassMetadata, FileAnalysis, ReExportKind};

/// All analyses of one compilation, keyed and iterated in path order.
pub type AnalysisMap = BTreeMap<PathBuf, FileAnalysis>;

/// Where an exported name is ultimately declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTarget {
    pub file: PathBuf,
    pub local: String,
}

/// Read-only index for following exports, re-exports and imports across
/// the analysis map.
#[derive(Debug, Clone, Copy)]
pub struct ProgramIndex<'a> {
    files: &'a AnalysisMap,
}

impl<'a> ProgramIndex<'a> {
    pub fn new(files: &'a AnalysisMap) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &'a AnalysisMap {
        self.files
    }

    pub fn file(&self, path: &Path) -> Option<&'a FileAnalysis> {
        self.files.get(path)
    }

    /// Resolve `name` as exported by `file`, following local re-exports of
    /// imported bindings and `export ... from` chains. Cycle-safe.
    pub fn resolve_export(&self, file: &Path, name: &str) -> Option<ExportTarget> {
        let mut visited = HashSet::default();
        self.resolve_export_inner(file, name, &mut visited)
    }

    fn resolve_export_inner(
        &self,
        file: &Path,
        name: &str,
        visited: &mut HashSet<(PathBuf, String)>,
    ) -> Option<ExportTarget> {
        if !visited.insert((file.to_path_buf(), name.to_string())) {
            return None;
        }
        let analysis = self.files.get(file)?;

        if let Some(local) = analysis.local_for_export(name) {
            return Some(self.follow_local(analysis, local, visited));
        }

        for re_export in &analysis.re_exports {
            if let ReExportKind::Named { imported, exported } = &re_export.kind {
                if exported == name {
                    if let Some(target) =
                        self.resolve_export_inner(Path::new(&re_export.resolved), imported, visited)
                    {
                        return Some(target);
                    }
                }
            }
        }

        if name == "default" {
            return None;
        }
        analysis
            .re_exports
            .iter()
            .filter(|r| r.kind == ReExportKind::Wildcard)
            .find_map(|r| self.resolve_export_inner(Path::new(&r.resolved), name, visited))
    }

    /// A local binding may itself be an import; chase it to its definition.
    fn follow_local(
        &self,
        analysis: &FileAnalysis,
        local: &str,
        visited: &mut HashSet<(PathBuf, String)>,
    ) -> ExportTarget {
        if let Some((edge, binding)) = analysis.import_of(local) {
            if let Some(imported) = binding.imported.export_name() {
                if let Some(target) =
                    self.resolve_export_inner(Path::new(&edge.resolved), imported, visited)
                {
                    return target;
                }
            }
        }
        ExportTarget {
            file: analysis.path.clone(),
            local: local.to_string(),
        }
    }

    /// Resolve a binding visible in `file` to its declaring file and local
    /// name: declared locally, or imported from an analyzed file.
    pub fn resolve_binding(&self, file: &Path, local: &str) -> Option<ExportTarget> {
        let analysis = self.files.get(file)?;
        let mut visited = HashSet::default();
        Some(self.follow_local(analysis, local, &mut visited))
    }

    /// Class declaration a name in `file` refers to.
    pub fn class(&self, file: &Path, local: &str) -> Option<(&'a Path, &'a ClassMetadata)> {
        let target = self.resolve_binding(file, local)?;
        let (path, analysis) = self.files.get_key_value(&target.file)?;
        analysis
            .class(&target.local)
            .map(|class| (path.as_path(), class))
    }

    /// Every class in the program, in path then declaration order.
    pub fn classes(&self) -> impl Iterator<Item = (&'a Path, &'a ClassMetadata)> + 'a {
        self.files
            .iter()
            .flat_map(|(path, analysis)| analysis.classes.iter().map(move |c| (path.as_path(), c)))
    }
}
