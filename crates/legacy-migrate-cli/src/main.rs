//! legacy-migrate CLI - migrate a legacy platform dump into the new schema.

use clap::{Parser, Subcommand};
use legacy_migrate::{
    load_dump, parse_dump, Config, MemoryTarget, MigrateError, MigrationExecutor, MigrationTarget,
    MysqlTarget, ProgressEvent, TableTransform, TransformRegistry,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "legacy-migrate")]
#[command(about = "Migrate a legacy platform SQL dump into the new schema")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file (environment variables are used when absent)
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    /// Print progress events as JSON lines to stderr
    #[arg(long)]
    progress: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the migration
    Run {
        /// Migrate into an in-memory target instead of the database
        #[arg(long)]
        dry_run: bool,
    },

    /// Parse the dump and show per-table row counts
    Inspect {
        /// Dump file to inspect [default: dump.path from the configuration]
        #[arg(long)]
        dump: Option<PathBuf>,
    },

    /// List the table mappings in execution order
    Tables,

    /// Test the target database connection
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(|e| MigrateError::Config(e.to_string()))?;

    match cli.command {
        Commands::Run { dry_run } => {
            let config = Config::resolve(&cli.config)?;
            info!("Loaded configuration ({:?})", config.target);

            let target: Arc<dyn MigrationTarget> = if dry_run {
                info!("Dry run: rows are kept in memory and discarded");
                Arc::new(MemoryTarget::new())
            } else {
                Arc::new(MysqlTarget::new(&config.target).await?)
            };

            let mut executor = MigrationExecutor::new(config.clone(), target.clone());
            let printer = if cli.progress {
                let (tx, rx) = mpsc::channel(config.migration.progress_channel_size);
                executor = executor.with_progress(tx);
                Some(tokio::spawn(print_progress(rx)))
            } else {
                None
            };

            let outcome = executor.run().await;
            drop(executor);
            if let Some(printer) = printer {
                let _ = printer.await;
            }
            target.close().await;
            let result = outcome?;

            if cli.output_json {
                println!("{}", result.to_json()?);
            } else {
                let status_msg = if dry_run {
                    "Dry run completed!"
                } else {
                    "Migration completed!"
                };
                println!("\n{}", status_msg);
                println!("  Run ID: {}", result.run_id);
                println!("  Duration: {:.2}s", result.duration_seconds);
                println!("  Attempts: {}", result.attempts);
                println!(
                    "  Rows: {} total, {} inserted, {} failed, {} blacklisted",
                    result.rows_total,
                    result.rows_inserted,
                    result.rows_failed,
                    result.rows_blacklisted
                );
                if !result.blacklisted_constraints.is_empty() {
                    println!(
                        "  Blacklisted constraints: {}",
                        result.blacklisted_constraints.join(", ")
                    );
                }
                println!();
                for table in &result.tables {
                    println!("  {}", table.summary_line());
                }
            }
        }

        Commands::Inspect { dump } => {
            let path = match dump {
                Some(path) => path,
                None => Config::resolve(&cli.config)?.dump.path,
            };
            let registry = TransformRegistry::builtin();
            let loaded = load_dump(&path)?;
            let parsed = parse_dump(&loaded.text, Some(&registry.required_tables()));
            let counts = parsed.table_counts();

            if cli.output_json {
                let report = serde_json::json!({
                    "path": loaded.path,
                    "compressed": loaded.compressed,
                    "file_bytes": loaded.file_bytes,
                    "sha256": loaded.sha256,
                    "statements": parsed.statements_seen,
                    "inserts": parsed.inserts_parsed,
                    "skipped": parsed.skipped.len(),
                    "tables": counts,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Dump: {}", loaded.path.display());
                println!(
                    "  Size: {} bytes{}",
                    loaded.file_bytes,
                    if loaded.compressed { " (gzip)" } else { "" }
                );
                println!("  SHA-256: {}", loaded.sha256);
                println!(
                    "  Statements: {} ({} inserts parsed, {} skipped)",
                    parsed.statements_seen,
                    parsed.inserts_parsed,
                    parsed.skipped.len()
                );
                println!("\nRows per table:");
                for transform in registry.iter() {
                    let table = transform.old_table();
                    let rows = counts.get(table).copied().unwrap_or(0);
                    println!("  {:<28} {}", table, rows);
                }
            }
        }

        Commands::Tables => {
            let registry = TransformRegistry::builtin();
            if cli.output_json {
                let tables: Vec<_> = registry
                    .iter()
                    .map(|t| {
                        serde_json::json!({
                            "old_table": t.old_table(),
                            "new_table": t.new_table(),
                            "stable_id": t.has_stable_id(),
                            "depends_on": t.depends_on(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&tables)?);
            } else {
                for (i, t) in registry.iter().enumerate() {
                    let deps = if t.depends_on().is_empty() {
                        String::new()
                    } else {
                        format!(" (depends on: {})", t.depends_on().join(", "))
                    };
                    println!(
                        "{:>2}. {} -> {}{}{}",
                        i + 1,
                        t.old_table(),
                        t.new_table(),
                        if t.has_stable_id() { " [stable id]" } else { "" },
                        deps
                    );
                }
            }
        }

        Commands::HealthCheck => {
            let config = Config::resolve(&cli.config)?;
            let start = Instant::now();
            let target = MysqlTarget::new(&config.target).await?;
            let latency_ms = start.elapsed().as_millis();
            target.close().await;

            if cli.output_json {
                let report = serde_json::json!({
                    "target_connected": true,
                    "target_latency_ms": latency_ms,
                    "healthy": true,
                });
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("Health Check Results:");
                println!("  Target (MySQL): OK ({}ms)", latency_ms);
                println!("\n  Overall: HEALTHY");
            }
        }
    }

    Ok(())
}

/// Print progress events as JSON lines on stderr until the sender is dropped.
async fn print_progress(mut rx: mpsc::Receiver<ProgressEvent>) {
    while let Some(event) = rx.recv().await {
        if let Ok(line) = serde_json::to_string(&event) {
            eprintln!("{}", line);
        }
    }
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        "json" => subscriber.json().init(),
        "text" => subscriber.init(),
        other => return Err(format!("unknown log format '{}' (expected text or json)", other)),
    }

    Ok(())
}
