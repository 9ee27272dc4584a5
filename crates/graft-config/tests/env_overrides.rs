//! Environment layering. Every test runs inside a figment jail, which
//! serializes them and restores the environment afterwards.

use figment::Jail;
use graft_config::{ConfigDiscovery, GraftConfig};

#[test]
fn env_overrides_config_file() {
    Jail::expect_with(|jail| {
        jail.create_file("graft.toml", "outDir = \"from-file\"\nsourcePath = \"app\"\n")?;
        jail.set_env("GRAFT_OUT_DIR", "from-env");

        let resolved = ConfigDiscovery::new(jail.directory())
            .load()
            .map_err(|e| e.to_string())?;
        assert_eq!(resolved.config.out_dir, "from-env");
        assert_eq!(resolved.config.source_path, "app");
        Ok(())
    });
}

#[test]
fn env_overrides_defaults() {
    Jail::expect_with(|jail| {
        jail.set_env("GRAFT_MODULE_CONFIG_FILE", "adapters.ts");
        jail.set_env("GRAFT_CORE_PACKAGE", "@acme/di");

        let config = GraftConfig::load(None).map_err(|e| e.to_string())?;
        assert_eq!(config.module_config_file, "adapters.ts");
        assert_eq!(config.core_package, "@acme/di");
        assert_eq!(config.marker_file, "module.ts");
        Ok(())
    });
}
