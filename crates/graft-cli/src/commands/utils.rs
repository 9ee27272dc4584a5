//! Shared project loading for all commands.

use graft::{Compiler, ConfigDiscovery, ResolvedConfig};
use graft_config::validate_fs;
use std::path::{Path, PathBuf};

use crate::cli::ProjectArgs;
use crate::error::{CliError, Result};

/// Resolve `path` against `cwd` unless it is already absolute.
pub fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Locate and validate the configuration, then build a compiler rooted at
/// the project directory.
pub fn load_project(args: &ProjectArgs) -> Result<(ResolvedConfig, Compiler)> {
    let cwd = std::env::current_dir()?;

    let resolved = match &args.config {
        Some(path) => ConfigDiscovery::load_from(resolve_path(path, &cwd))?,
        None => {
            let start = resolve_path(&args.root, &cwd);
            if !start.is_dir() {
                return Err(CliError::PathNotFound { path: start });
            }
            ConfigDiscovery::new(start).load()?
        }
    };

    let root = std::fs::canonicalize(&resolved.root)?;
    validate_fs(&resolved.config, &root)?;
    tracing::debug!(
        root = %root.display(),
        config = ?resolved.file,
        "project loaded"
    );

    let compiler = Compiler::new(&root, resolved.config.clone());
    Ok((ResolvedConfig { root, ..resolved }, compiler))
}
