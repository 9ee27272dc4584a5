//! Pluggable config validation strategies
//!
//! Schema checks need nothing but the config; filesystem checks need the
//! project root.

use std::path::{Path, PathBuf};

use crate::config::GraftConfig;
use crate::error::{ConfigError, Result};

pub trait ConfigValidator {
    fn validate(&self, config: &GraftConfig) -> Result<()>;
}

/// Schema-only validation (no filesystem checks)
///
/// ```
/// use graft_config::{ConfigValidator, GraftConfig, SchemaValidator};
///
/// SchemaValidator.validate(&GraftConfig::default()).unwrap();
/// ```
pub struct SchemaValidator;

impl ConfigValidator for SchemaValidator {
    fn validate(&self, config: &GraftConfig) -> Result<()> {
        if config.marker_file.trim().is_empty() {
            return Err(ConfigError::SchemaValidation {
                message: "markerFile cannot be empty".to_string(),
                hint: Some("Name the module marker file, e.g. \"module.ts\"".to_string()),
            });
        }

        if config.extensions.is_empty() {
            return Err(ConfigError::SchemaValidation {
                message: "extensions cannot be empty".to_string(),
                hint: Some("List at least one source extension, e.g. [\"ts\"]".to_string()),
            });
        }

        for ext in &config.extensions {
            if ext.trim().is_empty() {
                return Err(ConfigError::SchemaValidation {
                    message: "extension names cannot be empty".to_string(),
                    hint: Some("Remove empty strings from the 'extensions' array".to_string()),
                });
            }
        }

        if config.core_package.trim().is_empty() {
            return Err(ConfigError::SchemaValidation {
                message: "corePackage cannot be empty".to_string(),
                hint: None,
            });
        }

        let outputs = [
            ("injectorFile", &config.injector_file),
            ("metadataFile", &config.metadata_file),
            ("moduleConfigFile", &config.module_config_file),
            ("manifestFile", &config.manifest_file),
        ];
        for (field, name) in outputs {
            if name.trim().is_empty() {
                return Err(ConfigError::SchemaValidation {
                    message: format!("{field} cannot be empty"),
                    hint: None,
                });
            }
            if is_absolute(name) {
                return Err(ConfigError::SchemaValidation {
                    message: format!("{field} must be relative to outDir, got '{name}'"),
                    hint: Some("Set outDir to choose where artifacts are written".to_string()),
                });
            }
        }

        Ok(())
    }
}

// `Path::is_absolute` alone misses `/x` on Windows.
fn is_absolute(name: &str) -> bool {
    Path::new(name).is_absolute() || name.starts_with('/') || name.starts_with('\\')
}

/// Filesystem validator: the source directory must exist under the root.
pub struct FsValidator {
    root: PathBuf,
}

impl FsValidator {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ConfigValidator for FsValidator {
    fn validate(&self, config: &GraftConfig) -> Result<()> {
        SchemaValidator.validate(config)?;

        let source = config.source_dir(&self.root);
        if !source.is_dir() {
            return Err(ConfigError::SourceDirNotFound { path: source });
        }

        Ok(())
    }
}

pub fn validate_schema(config: &GraftConfig) -> Result<()> {
    SchemaValidator.validate(config)
}

pub fn validate_fs(config: &GraftConfig, root: impl AsRef<Path>) -> Result<()> {
    FsValidator::new(root).validate(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_validator_accepts_defaults() {
        assert!(validate_schema(&GraftConfig::default()).is_ok());
    }

    #[test]
    fn schema_validator_rejects_empty_marker() {
        let config = GraftConfig {
            marker_file: "  ".to_string(),
            ..GraftConfig::default()
        };
        let err = SchemaValidator.validate(&config).unwrap_err();
        assert!(err.to_string().contains("markerFile"));
    }

    #[test]
    fn schema_validator_rejects_empty_extensions() {
        let config = GraftConfig {
            extensions: Vec::new(),
            ..GraftConfig::default()
        };
        assert!(matches!(
            SchemaValidator.validate(&config).unwrap_err(),
            ConfigError::SchemaValidation { .. }
        ));
    }

    #[test]
    fn schema_validator_rejects_absolute_output_names() {
        let config = GraftConfig {
            manifest_file: "/tmp/manifest.json".to_string(),
            ..GraftConfig::default()
        };
        let err = SchemaValidator.validate(&config).unwrap_err();
        assert!(err.to_string().contains("manifestFile"));
    }
}
