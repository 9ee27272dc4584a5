//! File-based config discovery
//!
//! Walks up from a starting directory looking for `graft.toml`. The
//! directory holding it becomes the project root; without one, the starting
//! directory is the root and only defaults and the environment apply.

use std::path::{Path, PathBuf};

use crate::config::{CONFIG_FILE_NAME, GraftConfig};
use crate::error::Result;
use crate::validation::{ConfigValidator, SchemaValidator};

/// A loaded configuration together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub root: PathBuf,
    /// The config file that was merged, if one was found.
    pub file: Option<PathBuf>,
    pub config: GraftConfig,
}

/// # Example
///
/// ```no_run
/// use graft_config::ConfigDiscovery;
///
/// let resolved = ConfigDiscovery::new(".").load().unwrap();
/// println!("root: {}", resolved.root.display());
/// ```
pub struct ConfigDiscovery {
    start: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(start: impl AsRef<Path>) -> Self {
        Self {
            start: start.as_ref().to_path_buf(),
        }
    }

    /// Nearest `graft.toml` in the starting directory or any ancestor.
    pub fn find(&self) -> Option<PathBuf> {
        self.start
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .find(|candidate| candidate.is_file())
    }

    /// Discover, load and schema-validate.
    pub fn load(&self) -> Result<ResolvedConfig> {
        match self.find() {
            Some(file) => {
                let root = file
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| self.start.clone());
                tracing::debug!(path = %file.display(), "using config file");
                Self::load_file(root, file)
            }
            None => {
                tracing::debug!(start = %self.start.display(), "no {CONFIG_FILE_NAME} found, using defaults");
                let config = GraftConfig::load(None)?;
                SchemaValidator.validate(&config)?;
                Ok(ResolvedConfig {
                    root: self.start.clone(),
                    file: None,
                    config,
                })
            }
        }
    }

    /// Load an explicit config file; its directory is the project root.
    pub fn load_from(path: impl AsRef<Path>) -> Result<ResolvedConfig> {
        let file = path.as_ref().to_path_buf();
        let root = file
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::load_file(root, file)
    }

    fn load_file(root: PathBuf, file: PathBuf) -> Result<ResolvedConfig> {
        let config = GraftConfig::load(Some(&file))?;
        SchemaValidator.validate(&config)?;
        Ok(ResolvedConfig {
            root,
            file: Some(file),
            config,
        })
    }
}

/// Discover and load config from the current directory.
pub fn discover() -> Result<ResolvedConfig> {
    let root = std::env::current_dir()?;
    ConfigDiscovery::new(root).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn find_returns_none_when_no_config() {
        let dir = TempDir::new().unwrap();
        let discovery = ConfigDiscovery::new(dir.path());
        assert!(discovery.find().is_none());
    }

    #[test]
    fn find_walks_up_to_parent() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "outDir = \"gen\"\n").unwrap();
        let nested = dir.path().join("src/users");
        fs::create_dir_all(&nested).unwrap();

        let discovery = ConfigDiscovery::new(&nested);
        assert_eq!(discovery.find().unwrap(), config_path);
    }

    #[test]
    fn load_from_missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = ConfigDiscovery::load_from(dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound { .. }));
    }
}
