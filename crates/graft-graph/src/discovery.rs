//! Module discovery: partition files by nearest-ancestor marker file.

use rustc_hash::FxHashSet as HashSet;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{GraphError, Result};

/// Ownership partition of a file set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Marker file -> owned files (marker included), sorted.
    pub modules: BTreeMap<PathBuf, Vec<PathBuf>>,
    /// File -> owning marker file.
    pub owners: BTreeMap<PathBuf, PathBuf>,
}

impl Discovery {
    /// Partition `files` by the nearest ancestor directory containing a file
    /// named `marker_file`.
    ///
    /// Every file without such an ancestor is collected into a single sorted
    /// [`GraphError::OrphanFiles`] batch.
    pub fn run<'p>(files: impl IntoIterator<Item = &'p Path>, marker_file: &str) -> Result<Self> {
        let mut files: Vec<&Path> = files.into_iter().collect();
        files.sort();
        files.dedup();

        let marker_dirs: HashSet<&Path> = files
            .iter()
            .filter(|path| path.file_name().is_some_and(|name| name == marker_file))
            .filter_map(|path| path.parent())
            .collect();

        let mut discovery = Self::default();
        let mut orphans = Vec::new();

        for file in files {
            let owner = file
                .ancestors()
                .skip(1)
                .find(|dir| marker_dirs.contains(dir))
                .map(|dir| dir.join(marker_file));

            match owner {
                Some(marker) => {
                    discovery
                        .modules
                        .entry(marker.clone())
                        .or_default()
                        .push(file.to_path_buf());
                    discovery.owners.insert(file.to_path_buf(), marker);
                }
                None => orphans.push(file.to_path_buf()),
            }
        }

        if !orphans.is_empty() {
            return Err(GraphError::OrphanFiles { files: orphans });
        }

        tracing::debug!(modules = discovery.modules.len(), "module discovery complete");
        Ok(discovery)
    }

    pub fn owner_of(&self, file: &Path) -> Option<&Path> {
        self.owners.get(file).map(PathBuf::as_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[&str]) -> Vec<PathBuf> {
        items.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_nearest_marker_wins() {
        let files = paths(&[
            "/app/src/module.ts",
            "/app/src/app.ts",
            "/app/src/users/module.ts",
            "/app/src/users/service.ts",
            "/app/src/users/deep/repo.ts",
        ]);
        let discovery = Discovery::run(files.iter().map(PathBuf::as_path), "module.ts").unwrap();

        assert_eq!(discovery.modules.len(), 2);
        assert_eq!(
            discovery.owner_of(Path::new("/app/src/users/deep/repo.ts")),
            Some(Path::new("/app/src/users/module.ts"))
        );
        assert_eq!(
            discovery.owner_of(Path::new("/app/src/app.ts")),
            Some(Path::new("/app/src/module.ts"))
        );
        assert_eq!(
            discovery.modules[Path::new("/app/src/users/module.ts")],
            paths(&[
                "/app/src/users/deep/repo.ts",
                "/app/src/users/module.ts",
                "/app/src/users/service.ts",
            ])
        );
    }

    #[test]
    fn test_orphans_are_batched_and_sorted() {
        let files = paths(&[
            "/app/src/zeta.ts",
            "/app/src/users/module.ts",
            "/app/src/alpha.ts",
        ]);
        let err = Discovery::run(files.iter().map(PathBuf::as_path), "module.ts").unwrap_err();
        match err {
            GraphError::OrphanFiles { files } => {
                assert_eq!(files, paths(&["/app/src/alpha.ts", "/app/src/zeta.ts"]));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
