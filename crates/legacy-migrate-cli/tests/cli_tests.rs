//! CLI integration tests for legacy-migrate.
//!
//! These tests verify command-line argument parsing, help output, the
//! offline commands and exit codes for configuration errors. The `run`
//! tests use `--dry-run` so no database is needed.

use assert_cmd::Command;
use flate2::write::GzEncoder;
use flate2::Compression;
use predicates::prelude::*;
use std::io::Write;
use std::path::Path;

/// Get a command for the legacy-migrate binary with no DB_* leakage from
/// the environment.
fn cmd() -> Command {
    let mut cmd = Command::cargo_bin("legacy-migrate").unwrap();
    for var in [
        "DB_HOST",
        "DB_PORT",
        "DB_USER",
        "DB_PASSWORD",
        "DB_NAME",
        "LEGACY_DUMP_PATH",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

const DUMP: &str = "\
-- MySQL dump 10.13
/*!40101 SET NAMES utf8mb4 */;
CREATE TABLE `user` (
  `id` int NOT NULL AUTO_INCREMENT,
  `uuid` varchar(36) DEFAULT NULL,
  `email` varchar(255) NOT NULL,
  PRIMARY KEY (`id`)
);
INSERT INTO `user` VALUES (7,'abc-123','a@b.com');
INSERT INTO `wallet` (`id`,`user_id`,`currency`) VALUES (1,8,'USD');
INSERT INTO `migrations` VALUES (1,'noise');
";

fn write_config(dir: &Path, dump: &Path) -> std::path::PathBuf {
    let path = dir.join("config.yaml");
    let mut file = std::fs::File::create(&path).unwrap();
    write!(
        file,
        r#"
target:
  host: localhost
  database: platform
  user: root
  password: secret
dump:
  path: {}
migration:
  retry_delay_ms: 0
"#,
        dump.display()
    )
    .unwrap();
    path
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("inspect"))
        .stdout(predicate::str::contains("tables"))
        .stdout(predicate::str::contains("health-check"));
}

#[test]
fn test_run_subcommand_help() {
    cmd()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("legacy-migrate"));
}

// =============================================================================
// Global Flags Tests
// =============================================================================

#[test]
fn test_global_flag_defaults() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("[default: config.yaml]"))
        .stdout(predicate::str::contains("--log-format"))
        .stdout(predicate::str::contains("[default: text]"))
        .stdout(predicate::str::contains("--progress"))
        .stdout(predicate::str::contains("--output-json"));
}

#[test]
fn test_unknown_log_format_is_config_error() {
    cmd()
        .args(["--log-format", "xml", "tables"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("unknown log format"));
}

// =============================================================================
// Offline Commands
// =============================================================================

#[test]
fn test_tables_lists_registry_order() {
    cmd()
        .arg("tables")
        .assert()
        .success()
        .stdout(predicate::str::contains(" 1. user -> user [stable id]"))
        .stdout(predicate::str::contains("wallet -> wallet [stable id] (depends on: user)"))
        .stdout(predicate::str::contains("32. investment -> investment"));
}

#[test]
fn test_tables_json() {
    let output = cmd().args(["--output-json", "tables"]).output().unwrap();
    assert!(output.status.success());
    let tables: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(tables.as_array().unwrap().len(), 32);
    assert_eq!(tables[0]["old_table"], "user");
}

#[test]
fn test_inspect_counts_rows_of_known_tables() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("dump.sql");
    std::fs::write(&dump, DUMP).unwrap();

    cmd()
        .args(["inspect", "--dump"])
        .arg(&dump)
        .assert()
        .success()
        .stdout(predicate::str::contains("Rows per table:"))
        .stdout(predicate::str::is_match(r"user\s+1").unwrap())
        .stdout(predicate::str::is_match(r"wallet\s+1").unwrap())
        .stdout(predicate::str::contains("migrations").not());
}

#[test]
fn test_inspect_reads_gzip_dump_via_suffix_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(DUMP.as_bytes()).unwrap();
    std::fs::write(dir.path().join("dump.sql.gz"), enc.finish().unwrap()).unwrap();

    cmd()
        .args(["inspect", "--dump"])
        .arg(dir.path().join("dump.sql"))
        .assert()
        .success()
        .stdout(predicate::str::contains("(gzip)"));
}

#[test]
fn test_inspect_missing_dump_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .args(["inspect", "--dump"])
        .arg(dir.path().join("absent.sql"))
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("dump file not found"));
}

// =============================================================================
// Run Tests
// =============================================================================

#[test]
fn test_dry_run_prints_summary_lines() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("dump.sql");
    std::fs::write(&dump, DUMP).unwrap();
    let config = write_config(dir.path(), &dump);

    cmd()
        .args(["--config"])
        .arg(&config)
        .args(["run", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Dry run completed!"))
        .stdout(predicate::str::contains(
            "user: Total: 1, Inserted: 1, Failed: 0, Blacklisted: 0",
        ))
        .stdout(predicate::str::contains(
            "wallet: Total: 1, Inserted: 0, Failed: 1, Blacklisted: 0",
        ));
}

#[test]
fn test_dry_run_streams_progress_json() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("dump.sql");
    std::fs::write(&dump, DUMP).unwrap();
    let config = write_config(dir.path(), &dump);

    cmd()
        .args(["--verbosity", "error", "--progress", "--config"])
        .arg(&config)
        .args(["run", "--dry-run"])
        .assert()
        .success()
        .stderr(predicate::str::contains(
            r#"{"status":true,"message":"[1/1, 100%] Processing table: user"}"#,
        ))
        .stderr(predicate::str::contains(r#""status":false"#));
}

#[test]
fn test_dry_run_json_result() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("dump.sql");
    std::fs::write(&dump, DUMP).unwrap();
    let config = write_config(dir.path(), &dump);

    let output = cmd()
        .arg("--output-json")
        .arg("--config")
        .arg(&config)
        .args(["run", "--dry-run"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["status"], "completed");
    assert_eq!(result["attempts"], 1);
    assert_eq!(result["rows_inserted"], 1);
    assert_eq!(result["rows_failed"], 1);
}

#[test]
fn test_run_without_config_or_env_fails() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .arg("--config")
        .arg(dir.path().join("missing.yaml"))
        .args(["run", "--dry-run"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Configuration error"));
}

#[test]
fn test_run_from_environment_only() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("dump.sql");
    std::fs::write(&dump, DUMP).unwrap();

    cmd()
        .arg("--config")
        .arg(dir.path().join("missing.yaml"))
        .env("DB_HOST", "localhost")
        .env("DB_USER", "root")
        .env("DB_PASSWORD", "secret")
        .env("DB_NAME", "platform")
        .env("LEGACY_DUMP_PATH", &dump)
        .args(["run", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "user: Total: 1, Inserted: 1, Failed: 0, Blacklisted: 0",
        ));
}

#[test]
fn test_invalid_yaml_exit_code() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("config.yaml");
    std::fs::write(&config, "target: [unclosed").unwrap();

    cmd()
        .arg("--config")
        .arg(&config)
        .args(["run", "--dry-run"])
        .assert()
        .failure()
        .code(2);
}
