//! PostgreSQL-backed tenant handle.

use sqlx::PgPool;

use taskforge_core::{GroupRepository, TaskRepository, TenantStore};

use crate::groups::PgGroupRepository;
use crate::tasks::PgTaskRepository;

/// Live handle to one tenant database: its pool plus the board repositories.
pub struct PgTenantStore {
    pool: PgPool,
    groups: PgGroupRepository,
    tasks: PgTaskRepository,
}

impl PgTenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            groups: PgGroupRepository::new(pool.clone()),
            tasks: PgTaskRepository::new(pool.clone()),
            pool,
        }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl TenantStore for PgTenantStore {
    fn groups(&self) -> &dyn GroupRepository {
        &self.groups
    }

    fn tasks(&self) -> &dyn TaskRepository {
        &self.tasks
    }
}
