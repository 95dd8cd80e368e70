//! Database client used by the gate.
//!
//! [`DbClient`] is the only path to data-mutating statements. [`PgClient`]
//! implements it for PostgreSQL; tests use the recording fake.

use async_trait::async_trait;
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::descriptor::ConnectionDescriptor;
use crate::error::DbError;

/// Result of the best-effort sequence reset for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum SequenceReset {
    Reset { sequence: String },
    Skipped(String),
    Failed(String),
}

/// Operations the guard issues against a connected database.
#[async_trait]
pub trait DbClient: Send + Sync {
    /// Name the server reports for the current connection.
    async fn current_database(&self) -> Result<String, DbError>;

    /// Delete every row of `table`; returns the number of rows removed.
    async fn delete_all(&self, table: &str) -> Result<u64, DbError>;

    /// Restart the table's serial sequence. Never fails the caller.
    async fn reset_sequence(&self, table: &str) -> SequenceReset;

    /// Drop and recreate `schema`.
    async fn reset_schema(&self, schema: &str) -> Result<(), DbError>;

    async fn disconnect(&self);
}

/// Opens client connections for a validated descriptor.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        connection: &ConnectionDescriptor,
    ) -> Result<Arc<dyn DbClient>, DbError>;
}

/// Whether `name` is a plain SQL identifier (no quoting tricks, no schema).
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Double-quote a validated identifier.
pub fn quote_identifier(name: &str) -> Result<String, DbError> {
    if !is_valid_identifier(name) {
        return Err(DbError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{}\"", name))
}

/// PostgreSQL client over a sqlx pool.
#[derive(Debug, Clone)]
pub struct PgClient {
    pool: PgPool,
}

impl PgClient {
    pub async fn connect(connection: &ConnectionDescriptor) -> Result<Self, DbError> {
        info!(database = %connection, "Connecting to database");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(10))
            .connect(connection.as_str())
            .await?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn find_sequence(&self, table: &str) -> Result<Option<String>, DbError> {
        let quoted = quote_identifier(table)?;
        let sequence = sqlx::query_scalar::<_, String>(
            r#"
            SELECT seq FROM (
                SELECT pg_get_serial_sequence($1, column_name::text) AS seq
                FROM information_schema.columns
                WHERE table_schema = current_schema() AND table_name = $2
            ) serials
            WHERE seq IS NOT NULL
            LIMIT 1
            "#,
        )
        .bind(&quoted)
        .bind(table)
        .fetch_optional(&self.pool)
        .await?;
        Ok(sequence)
    }
}

#[async_trait]
impl DbClient for PgClient {
    async fn current_database(&self) -> Result<String, DbError> {
        let name = sqlx::query_scalar::<_, String>("SELECT current_database()::text")
            .fetch_one(&self.pool)
            .await?;
        Ok(name)
    }

    async fn delete_all(&self, table: &str) -> Result<u64, DbError> {
        let quoted = quote_identifier(table)?;
        let result = sqlx::query(&format!("DELETE FROM {}", quoted))
            .execute(&self.pool)
            .await?;
        debug!(table, rows = result.rows_affected(), "Deleted rows");
        Ok(result.rows_affected())
    }

    async fn reset_sequence(&self, table: &str) -> SequenceReset {
        let sequence = match self.find_sequence(table).await {
            Ok(Some(sequence)) => sequence,
            Ok(None) => return SequenceReset::Skipped("no serial sequence".to_string()),
            Err(err) => return SequenceReset::Failed(err.to_string()),
        };

        match sqlx::query("SELECT setval($1::regclass, 1, false)")
            .bind(&sequence)
            .execute(&self.pool)
            .await
        {
            Ok(_) => SequenceReset::Reset { sequence },
            Err(err) => SequenceReset::Failed(err.to_string()),
        }
    }

    async fn reset_schema(&self, schema: &str) -> Result<(), DbError> {
        let quoted = quote_identifier(schema)?;
        let mut tx = self.pool.begin().await?;
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", quoted))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("CREATE SCHEMA {}", quoted))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn disconnect(&self) {
        self.pool.close().await;
    }
}

/// Connects with [`PgClient`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

#[async_trait]
impl Connector for PgConnector {
    async fn connect(
        &self,
        connection: &ConnectionDescriptor,
    ) -> Result<Arc<dyn DbClient>, DbError> {
        let client: Arc<dyn DbClient> = Arc::new(PgClient::connect(connection).await?);
        Ok(client)
    }
}
