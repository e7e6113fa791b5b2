//! Executor behavior against a scripted target.
//!
//! The scripted target accepts rows like the in-memory one, but can be told
//! to fail specific inserts with a given storage error kind.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use legacy_migrate::dump::parse_dump;
use legacy_migrate::{
    Config, DumpConfig, MemoryTarget, MigrateError, MigrationConfig, MigrationExecutor,
    MigrationTarget, NewRecord, ParsedDump, ProgressEvent, RunPhase, SqlValue, StorageError,
    TargetConfig, TargetTransaction, TransformRegistry,
};
use tokio::sync::mpsc;

// =============================================================================
// Fixtures
// =============================================================================

fn config(max_attempts: u32) -> Config {
    Config {
        target: TargetConfig {
            host: "localhost".into(),
            user: "root".into(),
            password: "secret".into(),
            database: "platform".into(),
            ..Default::default()
        },
        dump: DumpConfig {
            path: PathBuf::from("unused.sql"),
        },
        migration: MigrationConfig {
            max_attempts,
            retry_delay_ms: 0,
            ..Default::default()
        },
    }
}

fn parse(sql: &str) -> ParsedDump {
    let registry = TransformRegistry::builtin();
    parse_dump(sql, Some(&registry.required_tables()))
}

const USERS_AND_WALLETS: &str = "
INSERT INTO `user` (`id`,`uuid`,`email`,`first_name`,`last_name`,`email_verified`) VALUES
  (7,'abc-123','a@b.com','Jo','Do','1'),
  (8,'def-456','c@d.com','Al','Bo','0'),
  (9,'ghi-789','',NULL,NULL,'0');
INSERT INTO `wallet` (`id`,`uuid`,`user_id`,`currency`,`balance`) VALUES
  (1,'w-1',7,'USD','10.00'),
  (2,'w-2',8,'EUR','0'),
  (3,'w-3',9,'BTC','0.5');
";

/// What the scripted target does with the n-th insert (1-based, counted
/// across the target's lifetime).
#[derive(Clone)]
enum Fault {
    Nth(usize, StorageError),
    Every(StorageError),
    Table(&'static str, StorageError),
}

#[derive(Default)]
struct Script {
    faults: Vec<Fault>,
    inserts: usize,
    begins: usize,
    rollbacks: usize,
    commits: usize,
    committed: Vec<(String, NewRecord)>,
}

#[derive(Clone, Default)]
struct ScriptedTarget {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTarget {
    fn with_faults(faults: Vec<Fault>) -> Self {
        let target = Self::default();
        target.script.lock().unwrap().faults = faults;
        target
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }
}

#[async_trait]
impl MigrationTarget for ScriptedTarget {
    async fn begin(&self) -> Result<Box<dyn TargetTransaction>, StorageError> {
        self.script().begins += 1;
        Ok(Box::new(ScriptedTransaction {
            script: self.script.clone(),
            pending: Vec::new(),
            ids: HashSet::new(),
        }))
    }

    async fn test_connection(&self) -> legacy_migrate::Result<()> {
        Ok(())
    }

    fn db_type(&self) -> &str {
        "scripted"
    }

    async fn close(&self) {}
}

struct ScriptedTransaction {
    script: Arc<Mutex<Script>>,
    pending: Vec<(String, NewRecord)>,
    ids: HashSet<(String, String)>,
}

#[async_trait]
impl TargetTransaction for ScriptedTransaction {
    async fn insert(&mut self, table: &str, record: &NewRecord) -> Result<(), StorageError> {
        let mut script = self.script.lock().unwrap();
        script.inserts += 1;
        let n = script.inserts;
        for fault in &script.faults {
            match fault {
                Fault::Nth(at, err) if *at == n => return Err(err.clone()),
                Fault::Every(err) => return Err(err.clone()),
                Fault::Table(t, err) if *t == table => return Err(err.clone()),
                _ => {}
            }
        }
        let id = record.id().unwrap_or_default().to_string();
        let committed_dup = script
            .committed
            .iter()
            .any(|(t, r)| t == table && r.id() == Some(id.as_str()));
        if committed_dup || !self.ids.insert((table.to_string(), id.clone())) {
            return Err(StorageError::unique(
                "PRIMARY",
                format!("Duplicate entry '{}' for key 'PRIMARY'", id),
            ));
        }
        self.pending.push((table.to_string(), record.clone()));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StorageError> {
        let ScriptedTransaction {
            script, pending, ..
        } = *self;
        let mut script = script.lock().unwrap();
        script.commits += 1;
        script.committed.extend(pending);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StorageError> {
        self.script.lock().unwrap().rollbacks += 1;
        Ok(())
    }
}

// =============================================================================
// Row outcomes
// =============================================================================

#[tokio::test]
async fn test_transform_fidelity_and_identifier_remap() {
    let target = ScriptedTarget::default();
    let executor = MigrationExecutor::new(config(5), Arc::new(target.clone()));

    let result = executor.run_parsed(&parse(USERS_AND_WALLETS)).await.unwrap();

    let script = target.script();
    let (_, user) = script
        .committed
        .iter()
        .find(|(t, r)| t == "user" && r.id() == Some("abc-123"))
        .unwrap();
    assert_eq!(user.get("email"), Some(&SqlValue::from("a@b.com")));
    assert_eq!(user.get("firstName"), Some(&SqlValue::from("Jo")));
    assert_eq!(user.get("emailVerified"), Some(&SqlValue::Bool(true)));
    assert_eq!(user.get("roleId"), Some(&SqlValue::I64(4)));
    assert_eq!(user.get("status"), Some(&SqlValue::Bool(true)));
    assert_eq!(user.get("failedLoginAttempts"), Some(&SqlValue::I64(0)));

    // The wallet of user 7 points at the reused stable id.
    let (_, wallet) = script
        .committed
        .iter()
        .find(|(t, r)| t == "wallet" && r.id() == Some("w-1"))
        .unwrap();
    assert_eq!(wallet.get("userId"), Some(&SqlValue::from("abc-123")));

    assert_eq!(result.attempts, 1);
    assert_eq!(executor.phase(), RunPhase::Completed);
}

#[tokio::test]
async fn test_broken_reference_counts_failed_once() {
    let target = ScriptedTarget::default();
    let executor = MigrationExecutor::new(config(5), Arc::new(target.clone()));

    let result = executor.run_parsed(&parse(USERS_AND_WALLETS)).await.unwrap();

    // User 9 has no email, so wallet 3 cannot resolve user_9.
    let users = result.table("user").unwrap();
    assert_eq!(users.summary_line(), "user: Total: 3, Inserted: 2, Failed: 1, Blacklisted: 0");
    let wallets = result.table("wallet").unwrap();
    assert_eq!(wallets.summary_line(), "wallet: Total: 3, Inserted: 2, Failed: 1, Blacklisted: 0");
    assert!(!target
        .script()
        .committed
        .iter()
        .any(|(t, r)| t == "wallet" && r.id() == Some("w-3")));
}

#[tokio::test]
async fn test_accounting_identity_holds_for_every_table() {
    let sql = format!(
        "{}
INSERT INTO `wallet` (`id`,`uuid`,`user_id`,`currency`) VALUES (4,'w-1',7,'GBP');
INSERT INTO `transaction` (`id`,`uuid`,`user_id`,`wallet_id`,`type`,`amount`) VALUES
  (1,'t-1',7,1,'DEPOSIT','5'),(2,'t-2',7,99,'DEPOSIT','5'),(3,'t-3',8,2,NULL,'1');
",
        USERS_AND_WALLETS
    );
    let target = ScriptedTarget::with_faults(vec![Fault::Table(
        "transaction",
        StorageError::foreign_key("Cannot add or update a child row"),
    )]);
    let executor = MigrationExecutor::new(config(5), Arc::new(target));

    let result = executor.run_parsed(&parse(&sql)).await.unwrap();

    for stats in &result.tables {
        assert_eq!(
            stats.inserted + stats.failed + stats.blacklisted,
            stats.total,
            "{}",
            stats.summary_line()
        );
    }
    assert_eq!(
        result.rows_inserted + result.rows_failed + result.rows_blacklisted,
        result.rows_total
    );
    // t-1 reaches the target and is rejected there; t-2 and t-3 never do.
    assert_eq!(
        result.table("transaction").unwrap().summary_line(),
        "transaction: Total: 3, Inserted: 0, Failed: 3, Blacklisted: 0"
    );
    // w-1 is reused by wallet 4, so the second insert is a duplicate.
    assert_eq!(result.table("wallet").unwrap().blacklisted, 1);
}

#[tokio::test]
async fn test_duplicate_constraint_is_blacklisted_and_reported_once() {
    let dup = StorageError::unique(
        "user.email",
        "Duplicate entry 'a@b.com' for key 'user.email'",
    );
    let target = ScriptedTarget::with_faults(vec![Fault::Nth(1, dup.clone()), Fault::Nth(2, dup)]);
    let (tx, mut rx) = mpsc::channel(1024);
    let executor = MigrationExecutor::new(config(5), Arc::new(target)).with_progress(tx);

    let result = executor.run_parsed(&parse(USERS_AND_WALLETS)).await.unwrap();
    drop(executor);

    let users = result.table("user").unwrap();
    assert_eq!(users.blacklisted, 2);
    assert_eq!(users.inserted, 0);
    assert_eq!(result.blacklisted_constraints, vec!["user.email".to_string()]);

    let mut events: Vec<ProgressEvent> = Vec::new();
    while let Some(e) = rx.recv().await {
        events.push(e);
    }
    let notices = events
        .iter()
        .filter(|e| !e.status && e.message.contains("'user.email' blacklisted"))
        .count();
    assert_eq!(notices, 1);
    assert!(events
        .iter()
        .any(|e| e.status && e.message == "[1/3, 33%] Processing table: user"));
    assert!(events
        .iter()
        .any(|e| e.message == "user: Total: 3, Inserted: 0, Failed: 1, Blacklisted: 2"));
}

// =============================================================================
// Transaction-level failures
// =============================================================================

#[tokio::test]
async fn test_deadlock_restarts_whole_run_with_fresh_state() {
    let target = ScriptedTarget::with_faults(vec![Fault::Nth(
        3,
        StorageError::transient("Deadlock found when trying to get lock"),
    )]);
    let (tx, mut rx) = mpsc::channel(1024);
    let executor = MigrationExecutor::new(config(5), Arc::new(target.clone())).with_progress(tx);

    let result = executor.run_parsed(&parse(USERS_AND_WALLETS)).await.unwrap();
    drop(executor);

    assert_eq!(result.attempts, 2);
    {
        let script = target.script();
        assert_eq!(script.begins, 2);
        assert_eq!(script.rollbacks, 1);
        assert_eq!(script.commits, 1);
        // Nothing from the rolled back attempt leaked into the commit.
        assert_eq!(script.committed.len(), 4);
    }
    // Counters reflect only the successful attempt.
    assert_eq!(result.table("user").unwrap().inserted, 2);
    assert_eq!(result.table("wallet").unwrap().inserted, 2);

    let mut retry_notices = 0;
    while let Some(e) = rx.recv().await {
        if !e.status && e.message.contains("Deadlock detected on attempt 1/5") {
            retry_notices += 1;
        }
    }
    assert_eq!(retry_notices, 1);
}

#[tokio::test]
async fn test_deadlock_every_attempt_exhausts_retries() {
    let target = ScriptedTarget::with_faults(vec![Fault::Every(StorageError::transient(
        "Lock wait timeout exceeded; try restarting transaction",
    ))]);
    let executor = MigrationExecutor::new(config(3), Arc::new(target.clone()));

    let err = executor
        .run_parsed(&parse(USERS_AND_WALLETS))
        .await
        .unwrap_err();

    assert!(matches!(err, MigrateError::RetriesExhausted { attempts: 3, .. }));
    assert!(err.to_string().contains("after 3 attempts"));
    assert_eq!(executor.phase(), RunPhase::Failed);
    let script = target.script();
    assert_eq!(script.begins, 3);
    assert_eq!(script.rollbacks, 3);
    assert_eq!(script.commits, 0);
}

#[tokio::test]
async fn test_fatal_error_rolls_back_without_retry() {
    let target = ScriptedTarget::with_faults(vec![Fault::Nth(
        2,
        StorageError::fatal("Table 'platform.user' doesn't exist"),
    )]);
    let executor = MigrationExecutor::new(config(5), Arc::new(target.clone()));

    let err = executor
        .run_parsed(&parse(USERS_AND_WALLETS))
        .await
        .unwrap_err();

    assert!(matches!(err, MigrateError::Storage(_)));
    let script = target.script();
    assert_eq!(script.begins, 1);
    assert_eq!(script.rollbacks, 1);
    assert!(script.committed.is_empty());
}

// =============================================================================
// Re-runs and ordering
// =============================================================================

#[tokio::test]
async fn test_rerun_against_populated_target_blacklists_existing_rows() {
    let target = MemoryTarget::new();
    let parsed = parse(USERS_AND_WALLETS);

    let first = MigrationExecutor::new(config(5), Arc::new(target.clone()))
        .run_parsed(&parsed)
        .await
        .unwrap();
    assert_eq!(first.rows_inserted, 4);

    let second = MigrationExecutor::new(config(5), Arc::new(target.clone()))
        .run_parsed(&parsed)
        .await
        .unwrap();

    // Stable ids collide with the committed rows; nothing is duplicated.
    assert_eq!(second.rows_inserted, 0);
    assert_eq!(second.rows_blacklisted, 4);
    assert_eq!(second.blacklisted_constraints, vec!["PRIMARY".to_string()]);
    assert_eq!(target.row_count("user"), 2);
    assert_eq!(target.row_count("wallet"), 2);
}

#[tokio::test]
async fn test_rerun_after_partial_failure_completes() {
    // First run dies on a fatal error after some inserts: nothing committed.
    let target = ScriptedTarget::with_faults(vec![Fault::Nth(3, StorageError::fatal("gone away"))]);
    let parsed = parse(USERS_AND_WALLETS);
    assert!(MigrationExecutor::new(config(5), Arc::new(target.clone()))
        .run_parsed(&parsed)
        .await
        .is_err());
    assert!(target.script().committed.is_empty());

    // Clearing the fault and re-running migrates everything once.
    target.script().faults.clear();
    let result = MigrationExecutor::new(config(5), Arc::new(target.clone()))
        .run_parsed(&parsed)
        .await
        .unwrap();
    assert_eq!(result.rows_inserted, 4);
    assert_eq!(target.script().committed.len(), 4);
}

#[tokio::test]
async fn test_rows_of_later_tables_never_precede_dependencies() {
    // Wallets appear before users in the dump; registry order still wins.
    let sql = "
INSERT INTO `wallet` (`id`,`uuid`,`user_id`,`currency`) VALUES (1,'w-1',7,'USD');
INSERT INTO `user` (`id`,`uuid`,`email`) VALUES (7,'abc-123','a@b.com');
";
    let target = ScriptedTarget::default();
    let result = MigrationExecutor::new(config(5), Arc::new(target.clone()))
        .run_parsed(&parse(sql))
        .await
        .unwrap();

    assert_eq!(result.rows_inserted, 2);
    let order: Vec<String> = target
        .script()
        .committed
        .iter()
        .map(|(t, _)| t.clone())
        .collect();
    assert_eq!(order, vec!["user", "wallet"]);
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_begin() {
    let mut cfg = config(5);
    cfg.target.host.clear();
    let target = ScriptedTarget::default();
    let err = MigrationExecutor::new(cfg, Arc::new(target.clone()))
        .run_parsed(&parse(USERS_AND_WALLETS))
        .await
        .unwrap_err();

    assert!(matches!(err, MigrateError::Config(_)));
    assert_eq!(target.script().begins, 0);
}
