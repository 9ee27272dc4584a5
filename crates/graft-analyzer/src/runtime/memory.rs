//! In-memory runtime for tests.
//!
//! Files live in a sorted map keyed by absolute path. Package specifiers are
//! registered explicitly with [`MemoryRuntime::with_package`]; anything not
//! registered fails to resolve, which exercises the raw-specifier fallback.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::{Runtime, RuntimeError, RuntimeResult};

#[derive(Debug, Default)]
pub struct MemoryRuntime {
    files: RwLock<BTreeMap<PathBuf, String>>,
    packages: BTreeMap<String, PathBuf>,
    cwd: PathBuf,
}

impl MemoryRuntime {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: cwd.into(),
            ..Self::default()
        }
    }

    /// Add a file; relative paths are placed under the runtime's cwd.
    pub fn with_file(self, path: impl AsRef<Path>, content: impl Into<String>) -> Self {
        let path = self.cwd.join(path);
        self.files.write().insert(path, content.into());
        self
    }

    /// Map a bare specifier to an entry file.
    pub fn with_package(mut self, specifier: &str, entry: impl AsRef<Path>) -> Self {
        let entry = self.cwd.join(entry);
        self.packages.insert(specifier.to_string(), entry);
        self
    }

    /// Replace (or add) a file after construction.
    pub fn set_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = self.cwd.join(path);
        self.files.write().insert(path, content.into());
    }

    /// Snapshot of a written or seeded file.
    pub fn file(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.read().get(&self.cwd.join(path)).cloned()
    }
}

#[async_trait]
impl Runtime for MemoryRuntime {
    async fn read_to_string(&self, path: &Path) -> RuntimeResult<String> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| RuntimeError::FileNotFound(path.to_path_buf()))
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        let text = String::from_utf8(content.to_vec())
            .map_err(|e| RuntimeError::Io(format!("{}: {}", path.display(), e)))?;
        self.files.write().insert(path.to_path_buf(), text);
        Ok(())
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }

    fn resolve(&self, specifier: &str, from: &Path) -> RuntimeResult<PathBuf> {
        self.packages
            .get(specifier)
            .cloned()
            .ok_or_else(|| RuntimeError::ResolutionFailed {
                specifier: specifier.to_string(),
                from: from.to_path_buf(),
                reason: "package not registered".to_string(),
            })
    }

    async fn list_files(&self, root: &Path) -> RuntimeResult<Vec<PathBuf>> {
        Ok(self
            .files
            .read()
            .keys()
            .filter(|path| path.starts_with(root))
            .cloned()
            .collect())
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}
