//! Source file selection under the configured source directory.

use graft_config::GraftConfig;
use std::path::{Path, PathBuf};

/// Decides which listed files take part in a compilation.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    source_dir: PathBuf,
    out_dir: PathBuf,
    extensions: Vec<String>,
    exclude: Vec<PathBuf>,
}

impl SourceFilter {
    pub fn new(config: &GraftConfig, root: &Path) -> Self {
        Self {
            source_dir: config.source_dir(root),
            out_dir: config.out_dir(root),
            extensions: config
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect(),
            exclude: config.exclude.iter().map(PathBuf::from).collect(),
        }
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    /// Whether `path` (absolute) is a compilable source file.
    pub fn accepts(&self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.source_dir) else {
            return false;
        };
        if path.starts_with(&self.out_dir) {
            return false;
        }

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        // declaration files carry no DI metadata
        if name.contains(".d.") {
            return false;
        }
        let has_extension = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| allowed == ext));
        if !has_extension {
            return false;
        }

        !self.exclude.iter().any(|prefix| {
            relative.starts_with(prefix)
                || (prefix.components().count() == 1
                    && relative.components().any(|c| c.as_os_str() == prefix.as_os_str()))
        })
    }

    /// Accepted files, sorted and deduplicated.
    pub fn select(&self, listed: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = listed.into_iter().filter(|p| self.accepts(p)).collect();
        files.sort();
        files.dedup();
        files
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> SourceFilter {
        SourceFilter::new(&GraftConfig::default(), Path::new("/app"))
    }

    #[test]
    fn accepts_configured_extensions_only() {
        let filter = filter();
        assert!(filter.accepts(Path::new("/app/src/users/module.ts")));
        assert!(filter.accepts(Path::new("/app/src/users/view.tsx")));
        assert!(!filter.accepts(Path::new("/app/src/users/readme.md")));
        assert!(!filter.accepts(Path::new("/app/src/users/types.d.ts")));
    }

    #[test]
    fn skips_files_outside_source_dir() {
        assert!(!filter().accepts(Path::new("/app/scripts/seed.ts")));
    }

    #[test]
    fn bare_exclude_matches_any_component() {
        let filter = filter();
        assert!(!filter.accepts(Path::new("/app/src/node_modules/pkg/index.ts")));
        assert!(!filter.accepts(Path::new("/app/src/users/node_modules/x.ts")));
    }

    #[test]
    fn nested_exclude_is_a_prefix() {
        let config = GraftConfig {
            exclude: vec!["legacy/old".to_string()],
            ..GraftConfig::default()
        };
        let filter = SourceFilter::new(&config, Path::new("/app"));
        assert!(!filter.accepts(Path::new("/app/src/legacy/old/a.ts")));
        assert!(filter.accepts(Path::new("/app/src/legacy/new/a.ts")));
        assert!(filter.accepts(Path::new("/app/src/old/a.ts")));
    }

    #[test]
    fn output_dir_inside_sources_is_skipped() {
        let config = GraftConfig {
            out_dir: "src/.graft".to_string(),
            ..GraftConfig::default()
        };
        let filter = SourceFilter::new(&config, Path::new("/app"));
        assert!(!filter.accepts(Path::new("/app/src/.graft/container.ts")));
    }

    #[test]
    fn select_sorts_and_dedups() {
        let files = filter().select(vec![
            PathBuf::from("/app/src/b.ts"),
            PathBuf::from("/app/src/a.ts"),
            PathBuf::from("/app/src/b.ts"),
        ]);
        assert_eq!(files, vec![PathBuf::from("/app/src/a.ts"), PathBuf::from("/app/src/b.ts")]);
    }
}
