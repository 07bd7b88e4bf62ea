//! Tenant-scoped group and task operations.
//!
//! Every operation goes through the [`TenantResolver`]. Task writes commit to
//! the tenant database first and then queue a shadow sync whose outcome the
//! caller never sees.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use taskforge_core::{
    require_non_empty, Error, Group, NewTask, Result, Task, TaskStatus, TaskUpdate,
};
use taskforge_db::{ResolvedTenant, TenantResolver};

use crate::services::ShadowIndexer;

pub struct BoardService {
    resolver: TenantResolver,
    shadow: Arc<ShadowIndexer>,
}

impl BoardService {
    pub fn new(resolver: TenantResolver, shadow: Arc<ShadowIndexer>) -> Self {
        Self { resolver, shadow }
    }

    pub fn shadow(&self) -> &Arc<ShadowIndexer> {
        &self.shadow
    }

    async fn resolve(&self, tenant_id: i64) -> Result<ResolvedTenant> {
        self.resolver.resolve_tenant(tenant_id).await
    }

    /// Like `resolve`, but an unknown tenant reads as an empty board.
    async fn resolve_for_listing(&self, tenant_id: i64) -> Result<Option<ResolvedTenant>> {
        match self.resolve(tenant_id).await {
            Ok(resolved) => Ok(Some(resolved)),
            Err(Error::TenantNotFound(_)) => {
                debug!(
                    subsystem = "api",
                    component = "board",
                    tenant_id,
                    "Unknown tenant, returning empty list"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    // =========================================================================
    // GROUPS
    // =========================================================================

    pub async fn list_groups(&self, tenant_id: i64) -> Result<Vec<Group>> {
        match self.resolve_for_listing(tenant_id).await? {
            Some(resolved) => resolved.handle.groups().list().await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn create_group(&self, tenant_id: i64, name: &str) -> Result<Group> {
        let name = require_non_empty("name", name)?;
        let resolved = self.resolve(tenant_id).await?;
        let group = resolved.handle.groups().insert(&name).await?;
        info!(
            subsystem = "api",
            component = "board",
            op = "create_group",
            tenant_id,
            group_id = %group.id,
            "Group created"
        );
        Ok(group)
    }

    pub async fn rename_group(&self, tenant_id: i64, group_id: Uuid, name: &str) -> Result<Group> {
        let name = require_non_empty("name", name)?;
        let resolved = self.resolve(tenant_id).await?;
        resolved.handle.groups().rename(group_id, &name).await
    }

    /// Delete a group and, through the foreign key, its tasks.
    ///
    /// Shadow records of the cascaded tasks are left in the index.
    pub async fn delete_group(&self, tenant_id: i64, group_id: Uuid) -> Result<()> {
        let resolved = self.resolve(tenant_id).await?;
        resolved.handle.groups().delete(group_id).await?;
        info!(
            subsystem = "api",
            component = "board",
            op = "delete_group",
            tenant_id,
            group_id = %group_id,
            "Group deleted"
        );
        Ok(())
    }

    // =========================================================================
    // TASKS
    // =========================================================================

    /// Tasks of one group ordered by position.
    pub async fn list_tasks(&self, tenant_id: i64, group_id: Uuid) -> Result<Vec<Task>> {
        match self.resolve_for_listing(tenant_id).await? {
            Some(resolved) => resolved.handle.tasks().list_by_group(group_id).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn create_task(&self, tenant_id: i64, task: NewTask) -> Result<Task> {
        let task = task.validated()?;
        let resolved = self.resolve(tenant_id).await?;
        let created = resolved.handle.tasks().insert(task).await?;

        info!(
            subsystem = "api",
            component = "board",
            op = "create_task",
            tenant_id,
            group_id = %created.group_id,
            task_id = %created.id,
            position = created.position,
            "Task created"
        );
        self.shadow.schedule_upsert(&resolved.tenant, created.clone());
        Ok(created)
    }

    pub async fn update_task(
        &self,
        tenant_id: i64,
        task_id: Uuid,
        update: TaskUpdate,
    ) -> Result<Task> {
        let update = update.validated()?;
        if update.is_empty() {
            return Err(Error::InvalidInput("no fields to update".to_string()));
        }
        let resolved = self.resolve(tenant_id).await?;
        let updated = resolved.handle.tasks().update(task_id, update).await?;

        debug!(
            subsystem = "api",
            component = "board",
            op = "update_task",
            tenant_id,
            task_id = %task_id,
            status = %updated.status,
            position = updated.position,
            "Task updated"
        );
        self.shadow.schedule_upsert(&resolved.tenant, updated.clone());
        Ok(updated)
    }

    /// Drag-and-drop move. Refreshes the shadow record like any other update.
    pub async fn update_task_status(
        &self,
        tenant_id: i64,
        task_id: Uuid,
        status: TaskStatus,
        position: Option<i32>,
    ) -> Result<Task> {
        self.update_task(tenant_id, task_id, TaskUpdate::status_move(status, position))
            .await
    }

    pub async fn delete_task(&self, tenant_id: i64, task_id: Uuid) -> Result<Task> {
        let resolved = self.resolve(tenant_id).await?;
        let deleted = resolved.handle.tasks().delete(task_id).await?;

        info!(
            subsystem = "api",
            component = "board",
            op = "delete_task",
            tenant_id,
            task_id = %task_id,
            "Task deleted"
        );
        self.shadow
            .schedule_delete(&resolved.tenant, deleted.group_id, deleted.id);
        Ok(deleted)
    }
}
