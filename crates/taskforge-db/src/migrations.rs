//! Embedded schema migrations for the directory and tenant databases.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use taskforge_core::{redact_connection_string, Error, MigrationRunner, Result};

use crate::pool::{create_pool_with_config, PoolConfig};

/// Bring the central directory database to the current schema.
pub async fn migrate_master(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations/master")
        .run(pool)
        .await
        .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
    Ok(())
}

/// Bring one tenant database to the current board schema.
pub async fn migrate_tenant(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations/tenant")
        .run(pool)
        .await
        .map_err(|e| Error::Migration(e.to_string()))?;
    Ok(())
}

/// Runs the embedded tenant migrations over a short-lived connection.
#[derive(Debug, Clone)]
pub struct EmbeddedMigrationRunner {
    config: PoolConfig,
}

impl EmbeddedMigrationRunner {
    pub fn new() -> Self {
        Self {
            config: PoolConfig::tenant().max_connections(1),
        }
    }
}

impl Default for EmbeddedMigrationRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MigrationRunner for EmbeddedMigrationRunner {
    async fn migrate(&self, database_url: &str) -> Result<()> {
        let start = Instant::now();
        let pool = create_pool_with_config(database_url, self.config.clone())
            .await
            .map_err(|e| Error::Migration(format!("cannot connect: {}", e)))?;

        let result = migrate_tenant(&pool).await;
        pool.close().await;
        result?;

        info!(
            subsystem = "db",
            component = "migrations",
            op = "tenant",
            url = %redact_connection_string(database_url),
            duration_ms = start.elapsed().as_millis() as u64,
            "Tenant schema migrated"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "embedded"
    }
}
