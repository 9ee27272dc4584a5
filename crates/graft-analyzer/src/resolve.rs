//! Import specifier resolution.
//!
//! Relative specifiers resolve by joining onto the importer's directory,
//! cleaning the result and probing the configured source extensions (plus
//! `index.<ext>`). Bare specifiers go to the runtime's resolver; when that
//! fails the raw specifier is kept so later stages can still match on it.

use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Outcome of resolving one import specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpecifier {
    /// Absolute path when resolution succeeded, otherwise the raw specifier.
    pub resolved: String,
    pub is_relative: bool,
}

/// Whether a specifier is relative to the importing file.
pub fn is_relative_specifier(specifier: &str) -> bool {
    specifier == "."
        || specifier == ".."
        || specifier.starts_with("./")
        || specifier.starts_with("../")
}

/// Resolves specifiers against a runtime and a list of source extensions.
#[derive(Debug, Clone, Copy)]
pub struct ImportResolver<'a> {
    runtime: &'a dyn Runtime,
    extensions: &'a [String],
}

impl<'a> ImportResolver<'a> {
    pub fn new(runtime: &'a dyn Runtime, extensions: &'a [String]) -> Self {
        Self {
            runtime,
            extensions,
        }
    }

    pub fn resolve(&self, specifier: &str, from: &Path) -> ResolvedSpecifier {
        if is_relative_specifier(specifier) {
            let base_dir = from.parent().unwrap_or_else(|| Path::new(""));
            let joined = path_clean::clean(base_dir.join(specifier));
            let resolved = self.probe(&joined).unwrap_or(joined);
            return ResolvedSpecifier {
                resolved: resolved.to_string_lossy().into_owned(),
                is_relative: true,
            };
        }

        let resolved = match self.runtime.resolve(specifier, from) {
            Ok(path) => path_clean::clean(path).to_string_lossy().into_owned(),
            Err(err) => {
                tracing::trace!(specifier, error = %err, "falling back to raw specifier");
                specifier.to_string()
            }
        };
        ResolvedSpecifier {
            resolved,
            is_relative: false,
        }
    }

    fn probe(&self, base: &Path) -> Option<PathBuf> {
        if self.runtime.is_file(base) {
            return Some(base.to_path_buf());
        }

        // `./service.js` written against a `service.ts` source
        let ext = base.extension().and_then(|e| e.to_str());
        if matches!(ext, Some("js" | "mjs" | "jsx")) {
            for candidate in self.extensions {
                let path = base.with_extension(candidate);
                if self.runtime.is_file(&path) {
                    return Some(path);
                }
            }
        }

        let base_str = base.to_string_lossy();
        for ext in self.extensions {
            let path = PathBuf::from(format!("{base_str}.{ext}"));
            if self.runtime.is_file(&path) {
                return Some(path);
            }
        }

        for ext in self.extensions {
            let path = base.join(format!("index.{ext}"));
            if self.runtime.is_file(&path) {
                return Some(path);
            }
        }

        None
    }
}
