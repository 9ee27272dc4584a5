use graft_config::{ConfigError, GraftConfig, validate_fs};
use std::fs;
use tempfile::TempDir;

#[test]
fn fs_validator_requires_source_dir() {
    let dir = TempDir::new().unwrap();
    let err = validate_fs(&GraftConfig::default(), dir.path()).unwrap_err();
    match err {
        ConfigError::SourceDirNotFound { path } => assert_eq!(path, dir.path().join("src")),
        other => panic!("unexpected error: {other}"),
    }

    fs::create_dir(dir.path().join("src")).unwrap();
    assert!(validate_fs(&GraftConfig::default(), dir.path()).is_ok());
}

#[test]
fn fs_validator_runs_schema_checks_first() {
    let dir = TempDir::new().unwrap();
    let config = GraftConfig {
        injector_file: String::new(),
        ..GraftConfig::default()
    };
    assert!(matches!(
        validate_fs(&config, dir.path()).unwrap_err(),
        ConfigError::SchemaValidation { .. }
    ));
}
