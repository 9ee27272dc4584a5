//! Platform runtime abstraction for the graft compiler
//!
//! The analyzer never touches the filesystem directly. Everything that needs
//! I/O (reading sources, probing import targets, resolving package
//! specifiers, writing artifacts) goes through the `Runtime` trait so the
//! whole pipeline can be driven from a real disk or from memory in tests.

#[cfg(not(target_family = "wasm"))]
pub mod native;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Failure reported by a [`Runtime`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("no such file: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("{0}")]
    Io(String),

    /// A bare specifier could not be mapped to a file
    #[error("cannot resolve '{specifier}' from {}: {reason}", .from.display())]
    ResolutionFailed {
        specifier: String,
        from: PathBuf,
        reason: String,
    },
}

/// Host I/O seen by the analyzer and the facade.
///
/// Relative specifiers are never handed to `resolve`; the analyzer joins
/// and probes those itself (see [`crate::resolve`]). `resolve` is only asked
/// about bare package specifiers.
#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    async fn read_to_string(&self, path: &Path) -> RuntimeResult<String>;

    /// Write a file, creating parent directories as needed
    async fn write_file(&self, path: &Path, content: &[u8]) -> RuntimeResult<()>;

    /// `true` only for regular files
    fn is_file(&self, path: &Path) -> bool;

    /// Resolve a non-relative module specifier
    fn resolve(&self, specifier: &str, from: &Path) -> RuntimeResult<PathBuf>;

    /// Recursively list every file below `root`
    async fn list_files(&self, root: &Path) -> RuntimeResult<Vec<PathBuf>>;

    fn get_cwd(&self) -> RuntimeResult<PathBuf>;
}
