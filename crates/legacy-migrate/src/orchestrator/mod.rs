//! Migration executor - runs the legacy dump through the registry into the
//! target inside one transaction, retrying the whole run on lock contention.

mod progress;
mod stats;

pub use progress::{ProgressEvent, ProgressReporter};
pub use stats::TableStats;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::blacklist::DuplicateBlacklist;
use crate::config::Config;
use crate::dump::{load_dump, parse_dump, ParsedDump};
use crate::error::{MigrateError, Result};
use crate::remap::IdentifierMap;
use crate::target::{MigrationTarget, StorageErrorKind, StorageResult};
use crate::transform::{TableTransform, TransformRegistry};

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Initiated,
    LoadingDump,
    Parsing,
    Transforming,
    Inserting,
    Committing,
    Retrying,
    Completed,
    Failed,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::Initiated => "initiated",
            RunPhase::LoadingDump => "loading_dump",
            RunPhase::Parsing => "parsing",
            RunPhase::Transforming => "transforming",
            RunPhase::Inserting => "inserting",
            RunPhase::Committing => "committing",
            RunPhase::Retrying => "retrying",
            RunPhase::Completed => "completed",
            RunPhase::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationResult {
    /// Unique run identifier.
    pub run_id: String,

    /// Final status.
    pub status: String,

    /// Attempts used, including the successful one.
    pub attempts: u32,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// When the migration started.
    pub started_at: DateTime<Utc>,

    /// When the migration completed.
    pub completed_at: DateTime<Utc>,

    /// SHA-256 of the dump file, when the run loaded it.
    pub dump_sha256: Option<String>,

    /// Per-table counters in registry order.
    pub tables: Vec<TableStats>,

    pub rows_total: usize,
    pub rows_inserted: usize,
    pub rows_failed: usize,
    pub rows_blacklisted: usize,

    /// Unique constraints that rejected at least one row.
    pub blacklisted_constraints: Vec<String>,
}

impl MigrationResult {
    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Stats for one legacy table.
    pub fn table(&self, name: &str) -> Option<&TableStats> {
        self.tables.iter().find(|t| t.table == name)
    }
}

/// State owned by one attempt; discarded on retry.
#[derive(Default)]
struct RunContext {
    ids: IdentifierMap,
    blacklist: DuplicateBlacklist,
    stats: Vec<TableStats>,
}

/// Migration executor.
pub struct MigrationExecutor {
    config: Config,
    target: Arc<dyn MigrationTarget>,
    registry: TransformRegistry,
    progress_tx: Option<mpsc::Sender<ProgressEvent>>,
    phase: Mutex<RunPhase>,
}

impl MigrationExecutor {
    /// Create an executor with the built-in registry.
    pub fn new(config: Config, target: Arc<dyn MigrationTarget>) -> Self {
        Self {
            config,
            target,
            registry: TransformRegistry::builtin(),
            progress_tx: None,
            phase: Mutex::new(RunPhase::Initiated),
        }
    }

    /// Replace the transform registry.
    pub fn with_registry(mut self, registry: TransformRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the progress channel.
    pub fn with_progress(mut self, tx: mpsc::Sender<ProgressEvent>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    /// Current phase of the run.
    pub fn phase(&self) -> RunPhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: RunPhase) {
        let mut current = self.phase.lock().unwrap_or_else(|e| e.into_inner());
        if *current != phase {
            debug!("Run phase: {} -> {}", *current, phase);
            *current = phase;
        }
    }

    /// Run the full migration: validate, load and parse the dump, then
    /// transform and insert every table in one transaction.
    pub async fn run(&self) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let mut progress = ProgressReporter::new(self.progress_tx.clone());
        self.set_phase(RunPhase::Initiated);

        let outcome = self.load_and_execute(started_at, &mut progress).await;
        self.finish(outcome, &mut progress).await
    }

    /// Run against an already parsed dump, starting at the transaction.
    pub async fn run_parsed(&self, parsed: &ParsedDump) -> Result<MigrationResult> {
        let started_at = Utc::now();
        let mut progress = ProgressReporter::new(self.progress_tx.clone());
        self.set_phase(RunPhase::Initiated);

        let outcome = match self.config.validate() {
            Ok(()) => {
                progress.step("Migration started").await;
                self.execute(parsed, None, started_at, &mut progress).await
            }
            Err(e) => Err(e),
        };
        self.finish(outcome, &mut progress).await
    }

    async fn load_and_execute(
        &self,
        started_at: DateTime<Utc>,
        progress: &mut ProgressReporter,
    ) -> Result<MigrationResult> {
        self.config.validate()?;
        progress.step("Migration started").await;

        self.set_phase(RunPhase::LoadingDump);
        let dump = load_dump(&self.config.dump.path)?;
        progress
            .step(format!(
                "Dump loaded: {} ({} bytes{})",
                dump.path.display(),
                dump.file_bytes,
                if dump.compressed { ", gzip" } else { "" }
            ))
            .await;

        self.set_phase(RunPhase::Parsing);
        let required = self.registry.required_tables();
        let parsed = parse_dump(&dump.text, Some(&required));
        drop(dump.text);
        for skipped in &parsed.skipped {
            progress
                .failure(format!(
                    "Skipped malformed statement{}: {}",
                    skipped
                        .table
                        .as_deref()
                        .map(|t| format!(" for {}", t))
                        .unwrap_or_default(),
                    skipped.reason
                ))
                .await;
        }
        progress
            .step(format!(
                "Dump parsed: {} rows in {} tables ({} statements skipped)",
                parsed.row_count(),
                parsed.tables.len(),
                parsed.skipped.len()
            ))
            .await;

        self.execute(&parsed, Some(dump.sha256), started_at, progress)
            .await
    }

    async fn finish(
        &self,
        outcome: Result<MigrationResult>,
        progress: &mut ProgressReporter,
    ) -> Result<MigrationResult> {
        match outcome {
            Ok(result) => {
                self.set_phase(RunPhase::Completed);
                Ok(result)
            }
            Err(e) => {
                self.set_phase(RunPhase::Failed);
                error!("Migration failed: {}", e);
                progress.failure(format!("Migration failed: {}", e)).await;
                Err(e)
            }
        }
    }

    /// Attempt loop: whole-run retry on transient contention.
    async fn execute(
        &self,
        parsed: &ParsedDump,
        dump_sha256: Option<String>,
        started_at: DateTime<Utc>,
        progress: &mut ProgressReporter,
    ) -> Result<MigrationResult> {
        let max_attempts = self.config.migration.max_attempts;
        let delay = Duration::from_millis(self.config.migration.retry_delay_ms);
        let mut attempt: u32 = 1;

        loop {
            match self.attempt(parsed, progress).await {
                Ok(ctx) => {
                    return Ok(self
                        .complete(ctx, attempt, dump_sha256, started_at, progress)
                        .await)
                }
                Err(e) if e.is_transient() => {
                    if attempt >= max_attempts {
                        return Err(MigrateError::RetriesExhausted {
                            attempts: attempt,
                            message: e.detail,
                        });
                    }
                    self.set_phase(RunPhase::Retrying);
                    warn!(
                        "Deadlock detected, retry {}/{} in {}ms",
                        attempt,
                        max_attempts - 1,
                        delay.as_millis()
                    );
                    progress
                        .failure(format!(
                            "Deadlock detected on attempt {}/{}, rolled back; retrying in {}ms: {}",
                            attempt,
                            max_attempts,
                            delay.as_millis(),
                            e.detail
                        ))
                        .await;
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(MigrateError::Storage(e)),
            }
        }
    }

    /// One pass over every table inside a single transaction.
    async fn attempt(
        &self,
        parsed: &ParsedDump,
        progress: &mut ProgressReporter,
    ) -> StorageResult<RunContext> {
        let mut ctx = RunContext::default();
        let mut tx = self.target.begin().await?;

        for transform in self.registry.iter() {
            let old_table = transform.old_table();
            let Some(table) = parsed.table(old_table) else {
                debug!("{}: no rows in dump", old_table);
                continue;
            };

            self.set_phase(RunPhase::Transforming);
            let total = table.len();
            let mut stats = TableStats::new(old_table, total);

            for (i, record) in table.records(old_table).enumerate() {
                let n = i + 1;
                progress
                    .row(format!(
                        "[{}/{}, {}%] Processing table: {}",
                        n,
                        total,
                        n * 100 / total,
                        old_table
                    ))
                    .await;

                let Some(new_record) = transform.transform(&record, &mut ctx.ids) else {
                    stats.failed += 1;
                    progress
                        .failure(format!(
                            "{}: skipped row {} (unresolved reference or missing required field)",
                            old_table,
                            record.old_id().unwrap_or("<no id>")
                        ))
                        .await;
                    continue;
                };

                self.set_phase(RunPhase::Inserting);
                let Err(e) = tx.insert(transform.new_table(), &new_record).await else {
                    stats.inserted += 1;
                    continue;
                };

                match &e.kind {
                    StorageErrorKind::ForeignKeyViolation => {
                        stats.failed += 1;
                        progress
                            .failure(format!(
                                "{}: row {} rejected by a foreign key: {}",
                                old_table,
                                record.old_id().unwrap_or("<no id>"),
                                e.detail
                            ))
                            .await;
                    }
                    StorageErrorKind::UniqueViolation { constraint } => {
                        stats.blacklisted += 1;
                        if ctx.blacklist.insert(constraint) {
                            progress
                                .failure(format!(
                                    "{}: duplicate key '{}' blacklisted: {}",
                                    old_table, constraint, e.detail
                                ))
                                .await;
                        }
                    }
                    StorageErrorKind::Transient | StorageErrorKind::Fatal => {
                        if let Err(rb) = tx.rollback().await {
                            warn!("Rollback failed: {}", rb);
                        }
                        return Err(e);
                    }
                }
            }

            ctx.stats.push(stats);
        }

        self.set_phase(RunPhase::Committing);
        tx.commit().await?;
        Ok(ctx)
    }

    async fn complete(
        &self,
        ctx: RunContext,
        attempts: u32,
        dump_sha256: Option<String>,
        started_at: DateTime<Utc>,
        progress: &mut ProgressReporter,
    ) -> MigrationResult {
        for stats in &ctx.stats {
            progress.step(stats.summary_line()).await;
        }

        let completed_at = Utc::now();
        let result = MigrationResult {
            run_id: uuid::Uuid::new_v4().to_string(),
            status: "completed".to_string(),
            attempts,
            duration_seconds: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
            started_at,
            completed_at,
            dump_sha256,
            rows_total: ctx.stats.iter().map(|s| s.total).sum(),
            rows_inserted: ctx.stats.iter().map(|s| s.inserted).sum(),
            rows_failed: ctx.stats.iter().map(|s| s.failed).sum(),
            rows_blacklisted: ctx.stats.iter().map(|s| s.blacklisted).sum(),
            blacklisted_constraints: ctx.blacklist.sorted(),
            tables: ctx.stats,
        };

        info!(
            "Migration {}: {} rows, {} inserted, {} failed, {} blacklisted in {:.1}s ({} attempt(s))",
            result.status,
            result.rows_total,
            result.rows_inserted,
            result.rows_failed,
            result.rows_blacklisted,
            result.duration_seconds,
            result.attempts
        );
        progress.step("Migration completed").await;

        result
    }
}
