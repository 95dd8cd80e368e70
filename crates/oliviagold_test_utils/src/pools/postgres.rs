//! PostgreSQL test pool factory.

use crate::config::TestDbConfig;
use crate::containers::lifecycle::ensure_container_running;
use crate::schema::install_shop_schema;
use anyhow::{bail, Result};
use oliviagold_guard::client::quote_identifier;
use oliviagold_guard::{ConnectionDescriptor, PgClient};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{info, warn};

async fn connect(conn_str: &str) -> Result<PgPool> {
    Ok(PgPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(conn_str)
        .await?)
}

/// A freshly created `shop_test_<uuid>` database with the storefront schema.
///
/// Call [`TestPgPool::drop_database`] when done; the database is not
/// removed automatically.
#[derive(Debug, Clone)]
pub struct TestPgPool {
    /// The underlying sqlx pool
    pub pool: PgPool,
    pub config: TestDbConfig,
}

impl TestPgPool {
    /// Ensure the Docker container is running, create an isolated database
    /// and install the storefront tables in it.
    pub async fn new() -> Result<Self> {
        ensure_container_running().await?;

        let config = TestDbConfig::isolated();
        let admin = connect(&config.admin_connection_string()).await?;
        info!("Creating test database {} on port {}", config.database, config.port);
        sqlx::query(&format!("CREATE DATABASE {}", quote_identifier(&config.database)?))
            .execute(&admin)
            .await?;
        admin.close().await;

        let pool = connect(&config.connection_string()).await?;
        install_shop_schema(&pool).await?;
        Ok(Self { pool, config })
    }

    /// Descriptor the guard sees for this database.
    pub fn descriptor(&self) -> Result<ConnectionDescriptor> {
        match ConnectionDescriptor::new(self.config.connection_string()) {
            Some(conn) => Ok(conn),
            None => bail!("empty test connection string"),
        }
    }

    /// A guard client sharing this pool.
    pub fn client(&self) -> PgClient {
        PgClient::from_pool(self.pool.clone())
    }

    pub async fn count(&self, table: &str) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_identifier(table)?);
        Ok(sqlx::query_scalar::<_, i64>(&sql).fetch_one(&self.pool).await?)
    }

    /// Close the pool and drop the isolated database.
    pub async fn drop_database(self) -> Result<()> {
        self.pool.close().await;
        let admin = connect(&self.config.admin_connection_string()).await?;
        let sql = format!(
            "DROP DATABASE IF EXISTS {} WITH (FORCE)",
            quote_identifier(&self.config.database)?
        );
        if let Err(e) = sqlx::query(&sql).execute(&admin).await {
            warn!("Failed to drop test database {}: {}", self.config.database, e);
        }
        admin.close().await;
        Ok(())
    }
}
