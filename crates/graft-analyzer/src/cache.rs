//! Incremental analysis cache.
//!
//! Memoizes [`FileAnalysis`] results by absolute path. Each entry stores the
//! BLAKE3 hash of the source it was computed from, so a lookup with changed
//! content misses. Explicit invalidation drops the changed files together
//! with every file that transitively imports them, because an importer's
//! analysis embeds resolved paths of what it imports. For the same reason a
//! change in the set of files on disk can shift relative resolutions of
//! unchanged sources; [`AnalysisCache::reconcile`] handles that.

use path_clean::PathClean;
use rustc_hash::{FxHashMap as HashMap, FxHashSet as HashSet};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::types::FileAnalysis;

#[derive(Debug, Clone)]
struct CacheEntry {
    content_hash: [u8; 32],
    analysis: Arc<FileAnalysis>,
}

/// Analysis cache keyed by absolute path.
#[derive(Debug, Clone, Default)]
pub struct AnalysisCache {
    entries: HashMap<PathBuf, CacheEntry>,
}

/// Hash of a source text.
pub fn content_hash(source: &str) -> [u8; 32] {
    *blake3::hash(source.as_bytes()).as_bytes()
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Cached analysis of `path`, if it was computed from exactly `source`.
    pub fn get(&self, path: &Path, source: &str) -> Option<Arc<FileAnalysis>> {
        let entry = self.entries.get(path)?;
        (entry.content_hash == content_hash(source)).then(|| Arc::clone(&entry.analysis))
    }

    pub fn insert(&mut self, path: PathBuf, source: &str, analysis: FileAnalysis) -> Arc<FileAnalysis> {
        let analysis = Arc::new(analysis);
        self.entries.insert(
            path,
            CacheEntry {
                content_hash: content_hash(source),
                analysis: Arc::clone(&analysis),
            },
        );
        analysis
    }

    /// Drop `changed` and all cached files that transitively import any of
    /// them. Returns the dropped paths, sorted.
    pub fn invalidate<I, P>(&mut self, changed: I) -> BTreeSet<PathBuf>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let importers = self.reverse_dependencies();

        let mut dropped = BTreeSet::new();
        let mut queue: Vec<PathBuf> = changed.into_iter().map(|p| p.as_ref().to_path_buf()).collect();
        while let Some(path) = queue.pop() {
            if !dropped.insert(path.clone()) {
                continue;
            }
            if let Some(parents) = importers.get(path.as_path()) {
                queue.extend(parents.iter().cloned());
            }
        }

        dropped.retain(|path| self.entries.remove(path).is_some());
        tracing::debug!(dropped = dropped.len(), "invalidated analysis cache");
        dropped
    }

    /// Bring the cache in line with the files currently on disk.
    ///
    /// Files that disappeared are invalidated. Cached files with a relative
    /// import that a newly listed file could now satisfy (`./foo` gaining
    /// `foo.ts` next to `foo/index.ts`) are invalidated too. Returns the
    /// dropped paths, sorted.
    pub fn reconcile(&mut self, listed: &BTreeSet<PathBuf>) -> BTreeSet<PathBuf> {
        if self.entries.is_empty() {
            return BTreeSet::new();
        }
        let added: Vec<&PathBuf> = listed.iter().filter(|p| !self.entries.contains_key(*p)).collect();
        let mut stale: Vec<PathBuf> = self
            .entries
            .keys()
            .filter(|path| !listed.contains(*path))
            .cloned()
            .collect();

        if !added.is_empty() {
            for (path, entry) in &self.entries {
                let analysis = &entry.analysis;
                let specifiers = analysis
                    .imports
                    .iter()
                    .map(|i| (i.is_relative, i.source.as_str()))
                    .chain(analysis.re_exports.iter().map(|r| (r.is_relative, r.source.as_str())));
                let dir = path.parent().unwrap_or(path);
                let shadowed = specifiers
                    .filter(|(is_relative, _)| *is_relative)
                    .any(|(_, source)| {
                        let base = dir.join(source).clean();
                        added.iter().any(|file| may_resolve_to(&base, file))
                    });
                if shadowed {
                    stale.push(path.clone());
                }
            }
        }

        if stale.is_empty() {
            return BTreeSet::new();
        }
        self.invalidate(stale)
    }

    /// Imported path -> importing files.
    fn reverse_dependencies(&self) -> HashMap<PathBuf, HashSet<PathBuf>> {
        let mut importers: HashMap<PathBuf, HashSet<PathBuf>> = HashMap::default();
        for (path, entry) in &self.entries {
            for dep in entry.analysis.local_dependencies() {
                importers
                    .entry(PathBuf::from(dep))
                    .or_default()
                    .insert(path.clone());
            }
        }
        importers
    }
}

/// Whether extension or index probing from `base` could land on `file`.
fn may_resolve_to(base: &Path, file: &Path) -> bool {
    let stem = file.with_extension("");
    if file == base || stem == base || stem == base.with_extension("") {
        return true;
    }
    file.parent() == Some(base) && file.file_stem().is_some_and(|name| name == "index")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImportEdge;

    fn analysis_importing(path: &str, deps: &[&str]) -> FileAnalysis {
        let mut analysis = FileAnalysis::new(path);
        analysis.imports = deps
            .iter()
            .map(|dep| ImportEdge {
                source: format!("./{dep}"),
                resolved: dep.to_string(),
                is_relative: true,
                bindings: Vec::new(),
            })
            .collect();
        analysis
    }

    #[test]
    fn test_content_change_misses() {
        let mut cache = AnalysisCache::new();
        cache.insert("/a.ts".into(), "one", FileAnalysis::new("/a.ts"));

        assert!(cache.get(Path::new("/a.ts"), "one").is_some());
        assert!(cache.get(Path::new("/a.ts"), "two").is_none());
    }

    #[test]
    fn test_invalidate_propagates_to_importers() {
        let mut cache = AnalysisCache::new();
        cache.insert("/c.ts".into(), "", analysis_importing("/c.ts", &[]));
        cache.insert("/b.ts".into(), "", analysis_importing("/b.ts", &["/c.ts"]));
        cache.insert("/a.ts".into(), "", analysis_importing("/a.ts", &["/b.ts"]));
        cache.insert("/z.ts".into(), "", analysis_importing("/z.ts", &[]));

        let dropped = cache.invalidate(["/c.ts"]);

        assert_eq!(
            dropped.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("/a.ts"), PathBuf::from("/b.ts"), PathBuf::from("/c.ts")]
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_reconcile_drops_importers_of_shadowing_file() {
        let mut cache = AnalysisCache::new();
        cache.insert("/src/util/index.ts".into(), "", analysis_importing("/src/util/index.ts", &[]));
        cache.insert("/src/main.ts".into(), "", analysis_importing("/src/main.ts", &["util"]));
        cache.insert("/src/other.ts".into(), "", analysis_importing("/src/other.ts", &[]));

        let listed: BTreeSet<PathBuf> = ["/src/util/index.ts", "/src/util.ts", "/src/main.ts", "/src/other.ts"]
            .into_iter()
            .map(PathBuf::from)
            .collect();
        let dropped = cache.reconcile(&listed);

        assert_eq!(dropped.into_iter().collect::<Vec<_>>(), vec![PathBuf::from("/src/main.ts")]);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_reconcile_drops_removed_files_and_importers() {
        let mut cache = AnalysisCache::new();
        cache.insert("/src/b.ts".into(), "", analysis_importing("/src/b.ts", &[]));
        cache.insert("/src/a.ts".into(), "", analysis_importing("/src/a.ts", &["/src/b.ts"]));
        cache.insert("/src/z.ts".into(), "", analysis_importing("/src/z.ts", &[]));

        let listed: BTreeSet<PathBuf> = ["/src/a.ts", "/src/z.ts"].into_iter().map(PathBuf::from).collect();
        let dropped = cache.reconcile(&listed);

        assert_eq!(
            dropped.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("/src/a.ts"), PathBuf::from("/src/b.ts")]
        );
    }

    #[test]
    fn test_reconcile_with_unchanged_listing_keeps_everything() {
        let mut cache = AnalysisCache::new();
        cache.insert("/src/a.ts".into(), "", analysis_importing("/src/a.ts", &["/src/b.ts"]));
        cache.insert("/src/b.ts".into(), "", analysis_importing("/src/b.ts", &[]));

        let listed: BTreeSet<PathBuf> = ["/src/a.ts", "/src/b.ts"].into_iter().map(PathBuf::from).collect();
        assert!(cache.reconcile(&listed).is_empty());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_invalidate_handles_import_cycles() {
        let mut cache = AnalysisCache::new();
        cache.insert("/a.ts".into(), "", analysis_importing("/a.ts", &["/b.ts"]));
        cache.insert("/b.ts".into(), "", analysis_importing("/b.ts", &["/a.ts"]));

        assert_eq!(cache.invalidate(["/a.ts"]).len(), 2);
        assert!(cache.is_empty());
    }
}
