//! Compiler configuration for graft.
//!
//! Settings are layered with figment: serialized defaults, then a
//! `graft.toml` found by walking up from the project directory, then
//! `GRAFT_`-prefixed environment variables.

pub mod config;
pub mod discovery;
pub mod error;
pub mod validation;

pub use config::{CONFIG_FILE_NAME, ENV_PREFIX, GraftConfig};
pub use discovery::{ConfigDiscovery, ResolvedConfig, discover};
pub use error::{ConfigError, Result};
pub use validation::{ConfigValidator, FsValidator, SchemaValidator, validate_fs, validate_schema};
