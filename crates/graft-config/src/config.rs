//! The `GraftConfig` structure and its figment layering.

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format as _, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, Result};

/// File name searched for by [`ConfigDiscovery`](crate::ConfigDiscovery).
pub const CONFIG_FILE_NAME: &str = "graft.toml";

/// Prefix of environment overrides (`GRAFT_OUT_DIR`, `GRAFT_MARKER_FILE`, ...).
pub const ENV_PREFIX: &str = "GRAFT_";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GraftConfig {
    /// Directory scanned for modules, relative to the project root.
    pub source_path: String,
    /// Recorded in the manifest; analysis always parses TypeScript.
    pub source_format: String,
    pub marker_file: String,
    pub core_package: String,
    /// Artifact directory, relative to the project root.
    pub out_dir: String,
    pub injector_file: String,
    pub metadata_file: String,
    pub module_config_file: String,
    pub manifest_file: String,
    /// Source file extensions, without the leading dot.
    pub extensions: Vec<String>,
    /// Path prefixes (relative to the source directory, or bare directory
    /// names) skipped during file discovery.
    pub exclude: Vec<String>,
}

impl Default for GraftConfig {
    fn default() -> Self {
        Self {
            source_path: "src".to_string(),
            source_format: "ts".to_string(),
            marker_file: "module.ts".to_string(),
            core_package: "@graft/core".to_string(),
            out_dir: ".graft".to_string(),
            injector_file: "container.ts".to_string(),
            metadata_file: "metadata.ts".to_string(),
            module_config_file: "module-config.ts".to_string(),
            manifest_file: "manifest.json".to_string(),
            extensions: vec!["ts".to_string(), "tsx".to_string(), "mts".to_string()],
            exclude: vec!["node_modules".to_string()],
        }
    }
}

impl GraftConfig {
    /// Create from a JSON value, for programmatic configuration.
    ///
    /// ```
    /// use graft_config::GraftConfig;
    /// use serde_json::json;
    ///
    /// let config = GraftConfig::from_value(json!({ "outDir": "gen" })).unwrap();
    /// assert_eq!(config.out_dir, "gen");
    /// assert_eq!(config.marker_file, "module.ts");
    /// ```
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Layered sources. Priority: environment > config file > defaults.
    pub fn figment(config_file: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));

        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        figment.merge(
            Env::prefixed(ENV_PREFIX)
                .lowercase(false)
                .map(|key| env_key(key.as_str()).into()),
        )
    }

    /// Load configuration from the given file (if any) and the environment.
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_file {
            if !path.is_file() {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                });
            }
        }

        Self::figment(config_file)
            .extract()
            .map_err(|e| ConfigError::InvalidValue {
                field: e
                    .path
                    .last()
                    .cloned()
                    .unwrap_or_else(|| "configuration".to_string()),
                hint: Some(format!("{e}; check {CONFIG_FILE_NAME} syntax and field types")),
            })
    }

    pub fn source_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.source_path)
    }

    pub fn out_dir(&self, root: &Path) -> PathBuf {
        root.join(&self.out_dir)
    }

    pub fn injector_path(&self, root: &Path) -> PathBuf {
        self.out_dir(root).join(&self.injector_file)
    }

    pub fn metadata_path(&self, root: &Path) -> PathBuf {
        self.out_dir(root).join(&self.metadata_file)
    }

    pub fn module_config_path(&self, root: &Path) -> PathBuf {
        self.out_dir(root).join(&self.module_config_file)
    }

    pub fn manifest_path(&self, root: &Path) -> PathBuf {
        self.out_dir(root).join(&self.manifest_file)
    }
}

/// `OUT_DIR` -> `outDir`
fn env_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    for (i, part) in raw.split('_').filter(|p| !p.is_empty()).enumerate() {
        let lower = part.to_ascii_lowercase();
        if i == 0 {
            key.push_str(&lower);
            continue;
        }
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            key.push(first.to_ascii_uppercase());
            key.push_str(chars.as_str());
        }
    }
    key
}
