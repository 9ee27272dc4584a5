//! Native runtime backed by tokio's filesystem API and `oxc_resolver`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use oxc_resolver::{ResolveOptions, Resolver};

use super::{Runtime, RuntimeError, RuntimeResult};

/// Native filesystem `Runtime`.
///
/// Bare specifiers (`@graft/http`, `some-adapter/server`) go through
/// `oxc_resolver` with TypeScript-first extensions and the `types` / `import`
/// export conditions, so adapter packages shipping `.ts` entries resolve to
/// their sources.
#[derive(Debug, Clone)]
pub struct NativeRuntime {
    resolver: Arc<Resolver>,
    cwd: PathBuf,
}

impl NativeRuntime {
    pub fn new(cwd: PathBuf) -> Self {
        let options = ResolveOptions {
            condition_names: ["types", "import", "module", "default"].map(String::from).to_vec(),
            extensions: [".ts", ".tsx", ".mts", ".js", ".mjs"].map(String::from).to_vec(),
            ..ResolveOptions::default()
        };
        Self { resolver: Arc::new(Resolver::new(options)), cwd }
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }
}

#[async_trait]
impl Runtime for NativeRuntime {
    async fn read_to_string(&self, path: &Path) -> RuntimeResult<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|err| io_error("read", path, err))
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()> {
        let dir = path.parent().filter(|dir| !dir.as_os_str().is_empty());
        if let Some(dir) = dir {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|err| io_error("create", dir, err))?;
        }
        tokio::fs::write(path, content)
            .await
            .map_err(|err| io_error("write", path, err))
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn resolve(&self, specifier: &str, from: &Path) -> RuntimeResult<PathBuf> {
        let base = match from.parent() {
            Some(parent) if !from.is_dir() => parent,
            _ => from,
        };
        match self.resolver.resolve(base, specifier) {
            Ok(resolution) => Ok(resolution.into_path_buf()),
            Err(err) => Err(RuntimeError::ResolutionFailed {
                specifier: specifier.to_owned(),
                from: from.to_path_buf(),
                reason: err.to_string(),
            }),
        }
    }

    async fn list_files(&self, root: &Path) -> RuntimeResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut pending = vec![root.to_path_buf()];

        while let Some(dir) = pending.pop() {
            let mut reader = tokio::fs::read_dir(&dir)
                .await
                .map_err(|err| io_error("list", &dir, err))?;
            loop {
                let entry = match reader.next_entry().await {
                    Ok(Some(entry)) => entry,
                    Ok(None) => break,
                    Err(err) => return Err(io_error("list", &dir, err)),
                };
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|err| io_error("stat", &entry.path(), err))?;
                if file_type.is_dir() {
                    pending.push(entry.path());
                } else if file_type.is_file() {
                    files.push(entry.path());
                }
            }
        }

        files.sort();
        Ok(files)
    }

    fn get_cwd(&self) -> RuntimeResult<PathBuf> {
        Ok(self.cwd.clone())
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> RuntimeError {
    match err.kind() {
        std::io::ErrorKind::NotFound => RuntimeError::FileNotFound(path.to_path_buf()),
        _ => RuntimeError::Io(format!("cannot {action} {}: {err}", path.display())),
    }
}
