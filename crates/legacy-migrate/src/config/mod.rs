//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::{MigrateError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variables that override file settings.
pub const ENV_DB_HOST: &str = "DB_HOST";
pub const ENV_DB_PORT: &str = "DB_PORT";
pub const ENV_DB_USER: &str = "DB_USER";
pub const ENV_DB_PASSWORD: &str = "DB_PASSWORD";
pub const ENV_DB_NAME: &str = "DB_NAME";
pub const ENV_DUMP_PATH: &str = "LEGACY_DUMP_PATH";

impl Config {
    /// Load configuration from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string, applying environment overrides.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        let config = config.with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Build configuration from environment variables only.
    pub fn from_env() -> Result<Self> {
        let config = Config {
            target: TargetConfig::default(),
            dump: DumpConfig::default(),
            migration: MigrationConfig::default(),
        }
        .with_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` when it exists, otherwise from the environment.
    pub fn resolve<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            debug!("Loading configuration from {:?}", path);
            Self::load(path)
        } else {
            debug!("{:?} not found, reading configuration from environment", path);
            Self::from_env()
        }
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = non_empty(ENV_DB_HOST) {
            self.target.host = host;
        }
        if let Some(port) = non_empty(ENV_DB_PORT) {
            self.target.port = port.parse().map_err(|_| {
                MigrateError::Config(format!("{} must be a port number, got '{}'", ENV_DB_PORT, port))
            })?;
        }
        if let Some(user) = non_empty(ENV_DB_USER) {
            self.target.user = user;
        }
        if let Some(password) = non_empty(ENV_DB_PASSWORD) {
            self.target.password = password;
        }
        if let Some(database) = non_empty(ENV_DB_NAME) {
            self.target.database = database;
        }
        if let Some(path) = non_empty(ENV_DUMP_PATH) {
            self.dump.path = PathBuf::from(path);
        }

        Ok(self)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn bare() -> Config {
        serde_yaml::from_str("{}").unwrap()
    }

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config = bare();
        assert_eq!(config.target.port, 3306);
        assert_eq!(config.dump.path, PathBuf::from("legacy-dump.sql"));
        assert_eq!(config.migration.max_attempts, 5);
        assert_eq!(config.migration.retry_delay_ms, 1000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides_fill_connection() {
        let env: HashMap<&str, &str> = [
            (ENV_DB_HOST, "db.internal"),
            (ENV_DB_PORT, "3307"),
            (ENV_DB_USER, "migrator"),
            (ENV_DB_PASSWORD, "pw"),
            (ENV_DB_NAME, "platform"),
            (ENV_DUMP_PATH, "/srv/backup/old.sql.gz"),
        ]
        .into_iter()
        .collect();

        let config = bare()
            .with_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.target.host, "db.internal");
        assert_eq!(config.target.port, 3307);
        assert_eq!(config.target.database, "platform");
        assert_eq!(config.dump.path, PathBuf::from("/srv/backup/old.sql.gz"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_override_bad_port() {
        let result = bare().with_env_overrides(|k| {
            (k == ENV_DB_PORT).then(|| "not-a-port".to_string())
        });
        assert!(matches!(result, Err(MigrateError::Config(_))));
    }

    #[test]
    fn test_yaml_overrides_keep_file_values() {
        let yaml = r#"
target:
  host: localhost
  database: platform
  user: root
  password: secret
migration:
  max_attempts: 2
  retry_delay_ms: 10
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        let config = config.with_env_overrides(|_| None).unwrap();
        assert_eq!(config.target.host, "localhost");
        assert_eq!(config.migration.max_attempts, 2);
        assert!(config.validate().is_ok());
    }
}
