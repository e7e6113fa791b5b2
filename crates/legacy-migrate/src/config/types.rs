//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target database configuration (MySQL).
    #[serde(default)]
    pub target: TargetConfig,

    /// Legacy dump location.
    #[serde(default)]
    pub dump: DumpConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Target database (MySQL/MariaDB) configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host.
    #[serde(default)]
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_mysql_port")]
    pub port: u16,

    /// Database name.
    #[serde(default)]
    pub database: String,

    /// Username.
    #[serde(default)]
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// SSL mode (default: "disable").
    #[serde(default = "default_disable")]
    pub ssl_mode: String,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: default_mysql_port(),
            database: String::new(),
            user: String::new(),
            password: String::new(),
            ssl_mode: default_disable(),
        }
    }
}

impl fmt::Debug for TargetConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Legacy dump location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpConfig {
    /// Path to the SQL dump, plain or gzip-compressed.
    /// When the path does not exist, `<path>.gz` is tried.
    #[serde(default = "default_dump_path")]
    pub path: PathBuf,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            path: default_dump_path(),
        }
    }
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationConfig {
    /// Whole-run attempts before lock contention becomes terminal (default: 5).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay before a whole-run retry, in milliseconds (default: 1000).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Buffer size of the progress event channel (default: 256).
    #[serde(default = "default_progress_channel_size")]
    pub progress_channel_size: usize,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            progress_channel_size: default_progress_channel_size(),
        }
    }
}

// Default value functions for serde
fn default_mysql_port() -> u16 {
    3306
}

fn default_disable() -> String {
    "disable".to_string()
}

fn default_dump_path() -> PathBuf {
    PathBuf::from("legacy-dump.sql")
}

fn default_max_attempts() -> u32 {
    5
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_progress_channel_size() -> usize {
    256
}
