//! Config file discovery and loading

use graft_config::{CONFIG_FILE_NAME, ConfigDiscovery, ConfigError};
use std::fs;
use tempfile::TempDir;

#[test]
fn loads_defaults_without_config_file() {
    let dir = TempDir::new().unwrap();
    let resolved = ConfigDiscovery::new(dir.path()).load().unwrap();
    assert_eq!(resolved.root, dir.path());
    assert!(resolved.file.is_none());
    assert_eq!(resolved.config.marker_file, "module.ts");
}

#[test]
fn config_file_directory_becomes_root() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(CONFIG_FILE_NAME),
        r#"
sourcePath = "app"
outDir = "generated"
extensions = ["ts"]
"#,
    )
    .unwrap();
    let nested = dir.path().join("app/users");
    fs::create_dir_all(&nested).unwrap();

    let resolved = ConfigDiscovery::new(&nested).load().unwrap();
    assert_eq!(resolved.root, dir.path());
    assert_eq!(resolved.config.source_path, "app");
    assert_eq!(resolved.config.out_dir, "generated");
    assert_eq!(resolved.config.extensions, vec!["ts"]);
    // untouched keys keep their defaults
    assert_eq!(resolved.config.injector_file, "container.ts");
}

#[test]
fn explicit_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.toml");
    fs::write(&path, "markerFile = \"index.module.ts\"\n").unwrap();

    let resolved = ConfigDiscovery::load_from(&path).unwrap();
    assert_eq!(resolved.root, dir.path());
    assert_eq!(resolved.file.as_deref(), Some(path.as_path()));
    assert_eq!(resolved.config.marker_file, "index.module.ts");
}

#[test]
fn invalid_toml_is_reported() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(CONFIG_FILE_NAME), "outDir = [\n").unwrap();

    let err = ConfigDiscovery::new(dir.path()).load().unwrap_err();
    assert!(matches!(err, ConfigError::InvalidValue { .. }));
}

#[test]
fn loaded_config_is_schema_validated() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(CONFIG_FILE_NAME), "extensions = []\n").unwrap();

    let err = ConfigDiscovery::new(dir.path()).load().unwrap_err();
    assert!(matches!(err, ConfigError::SchemaValidation { .. }));
}
