//! # taskforge-db
//!
//! PostgreSQL layer for taskforge.
//!
//! This crate provides:
//! - The central tenant directory (`tenant_registry`)
//! - A process-wide cache of per-tenant connection pools
//! - Group and task repositories for tenant databases
//! - Embedded schema migrations for both database kinds
//! - In-memory implementations of all of the above (`mock` feature)
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use taskforge_db::{ConnectionCache, Database, PoolConfig, TenantResolver};
//!
//! let db = Database::connect("postgres://localhost/taskforge").await?;
//! db.migrate().await?;
//!
//! let resolver = TenantResolver::new(
//!     Arc::new(db.tenants.clone()),
//!     Arc::new(ConnectionCache::postgres(PoolConfig::tenant())),
//! );
//! let handle = resolver.resolve(42).await?;
//! let groups = handle.groups().list().await?;
//! ```

pub mod connection_cache;
pub mod directory;
pub mod groups;
#[cfg(any(test, feature = "mock"))]
pub mod memory;
pub mod migrations;
pub mod pool;
pub mod resolver;
pub mod store;
pub mod tasks;

// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use taskforge_core::*;

pub use connection_cache::{ConnectionCache, Connector, PgConnector};
pub use directory::PgTenantDirectory;
pub use groups::PgGroupRepository;
#[cfg(any(test, feature = "mock"))]
pub use memory::{MemoryConnector, MemoryTenantDirectory, MemoryTenantStore};
pub use migrations::{migrate_master, migrate_tenant, EmbeddedMigrationRunner};
pub use pool::{create_pool, create_pool_with_config, PoolConfig};
pub use resolver::{ResolvedTenant, TenantResolver};
pub use store::PgTenantStore;
pub use tasks::PgTaskRepository;

/// Connection to the central directory database.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    /// Tenant directory.
    pub tenants: PgTenantDirectory,
}

impl Database {
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            tenants: PgTenantDirectory::new(pool.clone()),
            pool,
        }
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending directory migrations.
    pub async fn migrate(&self) -> Result<()> {
        migrate_master(&self.pool).await
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
