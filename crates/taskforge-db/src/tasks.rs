//! Task repository for a tenant database.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use uuid::Uuid;

use taskforge_core::{new_v7, Error, NewTask, Result, Task, TaskRepository, TaskUpdate};

/// SQLSTATE for foreign key violations.
const FOREIGN_KEY_VIOLATION: &str = "23503";

const TASK_COLUMNS: &str =
    "id, title, description, status, priority, group_id, position, created_at, updated_at";

/// PostgreSQL implementation of TaskRepository.
#[derive(Clone)]
pub struct PgTaskRepository {
    pool: Pool<Postgres>,
}

impl PgTaskRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Parse a task row into a Task struct.
    fn parse_task_row(row: PgRow) -> Result<Task> {
        let status: String = row.get("status");
        let priority: String = row.get("priority");
        Ok(Task {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            status: status.parse()?,
            priority: priority.parse()?,
            group_id: row.get("group_id"),
            position: row.get("position"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn list_by_group(&self, group_id: Uuid) -> Result<Vec<Task>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM task WHERE group_id = $1 ORDER BY position ASC, created_at ASC",
            TASK_COLUMNS
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.into_iter().map(Self::parse_task_row).collect()
    }

    async fn insert(&self, task: NewTask) -> Result<Task> {
        let now = Utc::now();

        // Append to the end of the (group, status) partition in one statement.
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO task (
                id, title, description, status, priority, group_id, position,
                created_at, updated_at
            )
            SELECT $1, $2, $3, $4, $5, $6, COALESCE(MAX(position) + 1, 0), $7, $7
            FROM task
            WHERE group_id = $6 AND status = $4
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(new_v7())
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.group_id)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.code().as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
                Error::NotFound(format!("Group {} not found", task.group_id))
            }
            _ => Error::Database(e),
        })?;

        Self::parse_task_row(row)
    }

    async fn update(&self, id: Uuid, update: TaskUpdate) -> Result<Task> {
        let description_set = update.description.is_some();
        let description = update.description.flatten();

        let row = sqlx::query(&format!(
            r#"
            UPDATE task SET
                title = COALESCE($2::text, title),
                description = CASE WHEN $3::boolean THEN $4::text ELSE description END,
                status = COALESCE($5::text, status),
                priority = COALESCE($6::text, priority),
                position = COALESCE($7::int4, position),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TASK_COLUMNS
        ))
        .bind(id)
        .bind(update.title.as_deref())
        .bind(description_set)
        .bind(description.as_deref())
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.priority.map(|p| p.as_str()))
        .bind(update.position)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Task {} not found", id)))?;

        Self::parse_task_row(row)
    }

    async fn delete(&self, id: Uuid) -> Result<Task> {
        let row = sqlx::query(&format!(
            "DELETE FROM task WHERE id = $1 RETURNING {}",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::NotFound(format!("Task {} not found", id)))?;

        Self::parse_task_row(row)
    }
}
