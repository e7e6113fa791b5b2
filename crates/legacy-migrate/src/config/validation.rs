//! Configuration validation.

use super::Config;
use crate::error::{MigrateError, Result};

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    if config.target.host.is_empty() {
        return Err(MigrateError::Config("target.host is required".into()));
    }
    if config.target.user.is_empty() {
        return Err(MigrateError::Config("target.user is required".into()));
    }
    if config.target.password.is_empty() {
        return Err(MigrateError::Config("target.password is required".into()));
    }
    if config.target.database.is_empty() {
        return Err(MigrateError::Config("target.database is required".into()));
    }
    if config.target.port == 0 {
        return Err(MigrateError::Config("target.port must be non-zero".into()));
    }

    if config.dump.path.as_os_str().is_empty() {
        return Err(MigrateError::Config("dump.path is required".into()));
    }

    if config.migration.max_attempts == 0 {
        return Err(MigrateError::Config(
            "migration.max_attempts must be at least 1".into(),
        ));
    }
    if config.migration.progress_channel_size == 0 {
        return Err(MigrateError::Config(
            "migration.progress_channel_size must be at least 1".into(),
        ));
    }

    Ok(())
}
