//! MySQL/MariaDB migration target.
//!
//! Uses mysql_async for connection pooling; every migration attempt runs in
//! one SERIALIZABLE transaction and rows are inserted one at a time.

use async_trait::async_trait;
use chrono::{Datelike, Timelike};
use mysql_async::prelude::*;
use mysql_async::{
    IsolationLevel, Opts, OptsBuilder, Pool, PoolConstraints, PoolOpts, SslOpts, Transaction,
    TxOpts, Value,
};
use tracing::{debug, info, warn};

use super::{classify, MigrationTarget, StorageError, StorageResult, TargetTransaction};
use crate::config::TargetConfig;
use crate::core::{NewRecord, SqlValue};
use crate::error::{MigrateError, Result};

/// One connection carries the migration transaction, one spare serves
/// health checks.
const MAX_CONNECTIONS: usize = 2;

/// MySQL target backed by a mysql_async pool.
pub struct MysqlTarget {
    pool: Pool,
}

impl MysqlTarget {
    /// Create a pool from configuration and verify it with `SELECT 1`.
    pub async fn new(config: &TargetConfig) -> Result<Self> {
        let ssl_opts = match config.ssl_mode.to_lowercase().as_str() {
            "disable" => {
                warn!("MySQL TLS is disabled. Credentials will be transmitted in plaintext.");
                None
            }
            "prefer" | "require" => Some(SslOpts::default().with_danger_accept_invalid_certs(true)),
            "verify-ca" | "verify_ca" | "verify-full" | "verify_identity" => Some(SslOpts::default()),
            _ => {
                warn!(
                    "Unknown ssl_mode '{}', defaulting to Preferred",
                    config.ssl_mode
                );
                Some(SslOpts::default().with_danger_accept_invalid_certs(true))
            }
        };

        let mut builder = OptsBuilder::default()
            .ip_or_hostname(&config.host)
            .tcp_port(config.port)
            .db_name(Some(&config.database))
            .user(Some(&config.user))
            .pass(Some(&config.password))
            .init(vec!["SET NAMES utf8mb4"]);

        if let Some(ssl) = ssl_opts {
            builder = builder.ssl_opts(ssl);
        }

        let constraints = PoolConstraints::new(1, MAX_CONNECTIONS).unwrap_or_default();
        let opts: Opts = builder
            .pool_opts(PoolOpts::new().with_constraints(constraints))
            .into();
        let target = Self {
            pool: Pool::new(opts),
        };

        target.test_connection().await?;
        info!(
            "Connected to MySQL target: {}:{}/{}",
            config.host, config.port, config.database
        );

        Ok(target)
    }

    /// Quote a MySQL identifier.
    fn quote_ident(name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn insert_sql(table: &str, record: &NewRecord) -> String {
        let cols: Vec<String> = record.columns().map(Self::quote_ident).collect();
        let placeholders = vec!["?"; cols.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            Self::quote_ident(table),
            cols.join(", "),
            placeholders
        )
    }
}

#[async_trait]
impl MigrationTarget for MysqlTarget {
    async fn begin(&self) -> StorageResult<Box<dyn TargetTransaction>> {
        let mut opts = TxOpts::default();
        opts.with_isolation_level(IsolationLevel::Serializable);
        let tx = self
            .pool
            .start_transaction(opts)
            .await
            .map_err(|e| classify_mysql(&e))?;
        debug!("Opened SERIALIZABLE migration transaction");
        Ok(Box::new(MysqlTransaction { tx }))
    }

    async fn test_connection(&self) -> Result<()> {
        let mut conn = self
            .pool
            .get_conn()
            .await
            .map_err(|e| MigrateError::pool(e, "testing MySQL connection"))?;
        conn.query_drop("SELECT 1")
            .await
            .map_err(|e| MigrateError::pool(e, "testing MySQL connection"))?;
        Ok(())
    }

    fn db_type(&self) -> &str {
        "mysql"
    }

    async fn close(&self) {
        self.pool.clone().disconnect().await.ok();
    }
}

/// The open migration transaction.
pub struct MysqlTransaction {
    tx: Transaction<'static>,
}

#[async_trait]
impl TargetTransaction for MysqlTransaction {
    async fn insert(&mut self, table: &str, record: &NewRecord) -> StorageResult<()> {
        let sql = MysqlTarget::insert_sql(table, record);
        let params: Vec<Value> = record.values().map(sql_value_to_mysql).collect();
        self.tx
            .exec_drop(sql, params)
            .await
            .map_err(|e| classify_mysql(&e))
    }

    async fn commit(self: Box<Self>) -> StorageResult<()> {
        self.tx.commit().await.map_err(|e| classify_mysql(&e))
    }

    async fn rollback(self: Box<Self>) -> StorageResult<()> {
        self.tx.rollback().await.map_err(|e| classify_mysql(&e))
    }
}

/// Classify a mysql_async error by server code, falling back to its text.
pub fn classify_mysql(err: &mysql_async::Error) -> StorageError {
    match err {
        mysql_async::Error::Server(server) => classify(Some(server.code), &server.message),
        other => classify(None, &other.to_string()),
    }
}

/// Convert SqlValue to mysql_async::Value.
fn sql_value_to_mysql(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Bool(b) => Value::from(*b),
        SqlValue::I64(i) => Value::from(*i),
        SqlValue::F64(f) => Value::from(*f),
        SqlValue::Decimal(d) => Value::from(d.to_string()),
        SqlValue::Text(s) => Value::from(s.as_str()),
        SqlValue::Json(j) => Value::from(j.to_string()),
        SqlValue::DateTime(dt) => Value::Date(
            dt.year() as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.and_utc().timestamp_subsec_micros(),
        ),
        SqlValue::Date(d) => Value::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0),
    }
}
