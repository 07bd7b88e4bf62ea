//! Group repository for a tenant database.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Postgres};
use uuid::Uuid;

use taskforge_core::{new_v7, Error, Group, GroupRepository, Result};

/// PostgreSQL implementation of GroupRepository.
#[derive(Clone)]
pub struct PgGroupRepository {
    pool: Pool<Postgres>,
}

impl PgGroupRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GroupRepository for PgGroupRepository {
    async fn list(&self) -> Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            "SELECT id, name, created_at, updated_at FROM task_group ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(groups)
    }

    async fn insert(&self, name: &str) -> Result<Group> {
        let now = Utc::now();
        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO task_group (id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $3)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(new_v7())
        .bind(name)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(group)
    }

    async fn rename(&self, id: Uuid, name: &str) -> Result<Group> {
        sqlx::query_as::<_, Group>(
            r#"
            UPDATE task_group SET name = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Group {} not found", id)))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        // Tasks go with the group (ON DELETE CASCADE).
        let result = sqlx::query("DELETE FROM task_group WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Group {} not found", id)));
        }
        Ok(())
    }
}
