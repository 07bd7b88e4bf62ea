//! In-memory directory and tenant databases.
//!
//! Used by tests across the workspace and by local development without a
//! PostgreSQL server. Behaviour mirrors the PostgreSQL repositories: same
//! ordering, same partition-append positions, same not-found errors.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use taskforge_core::{
    new_v7, Error, Group, GroupRepository, MigrationRunner, NewTask, NewTenant, Result, Task,
    TaskRepository, TaskUpdate, Tenant, TenantDirectory, TenantHandle, TenantStore, TenantUpdate,
};

use crate::connection_cache::Connector;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// =============================================================================
// DIRECTORY
// =============================================================================

/// In-memory [`TenantDirectory`].
#[derive(Default)]
pub struct MemoryTenantDirectory {
    tenants: Mutex<BTreeMap<i64, Tenant>>,
    next_id: AtomicI64,
    fail_writes: AtomicBool,
}

impl MemoryTenantDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent create, update and delete fail.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        lock(&self.tenants).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Internal("directory unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TenantDirectory for MemoryTenantDirectory {
    async fn list(&self) -> Result<Vec<Tenant>> {
        Ok(lock(&self.tenants).values().rev().cloned().collect())
    }

    async fn find(&self, id: i64) -> Result<Option<Tenant>> {
        Ok(lock(&self.tenants).get(&id).cloned())
    }

    async fn create(&self, tenant: NewTenant) -> Result<Tenant> {
        self.check_writable()?;
        let mut tenants = lock(&self.tenants);
        if let Some(ref index) = tenant.search_index_name {
            if tenants
                .values()
                .any(|t| t.search_index_name.as_ref() == Some(index))
            {
                return Err(Error::InvalidInput(format!(
                    "search index {} already recorded",
                    index
                )));
            }
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let now = Utc::now();
        let record = Tenant {
            id,
            name: tenant.name,
            database_url: tenant.database_url,
            external_database_id: tenant.external_database_id,
            search_index_name: tenant.search_index_name,
            provisioning_state: tenant.provisioning_state,
            created_at: now,
            updated_at: now,
        };
        tenants.insert(id, record.clone());
        Ok(record)
    }

    async fn update(&self, id: i64, update: TenantUpdate) -> Result<Tenant> {
        self.check_writable()?;
        let mut tenants = lock(&self.tenants);
        let tenant = tenants.get_mut(&id).ok_or(Error::TenantNotFound(id))?;
        if let Some(name) = update.name {
            tenant.name = name;
        }
        if let Some(state) = update.provisioning_state {
            tenant.provisioning_state = state;
        }
        tenant.updated_at = Utc::now();
        Ok(tenant.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        self.check_writable()?;
        lock(&self.tenants)
            .remove(&id)
            .map(|_| ())
            .ok_or(Error::TenantNotFound(id))
    }
}

// =============================================================================
// TENANT DATABASE
// =============================================================================

#[derive(Default)]
struct Board {
    groups: BTreeMap<Uuid, Group>,
    tasks: BTreeMap<Uuid, Task>,
}

/// Contents of one in-memory tenant database.
#[derive(Default)]
struct BoardState {
    board: Mutex<Board>,
    migrated: AtomicBool,
}

/// Shared access to a [`BoardState`], failing like an unmigrated database
/// when the schema is required but absent.
#[derive(Clone)]
struct BoardAccess {
    state: Arc<BoardState>,
    require_migrated: bool,
}

impl BoardAccess {
    fn board(&self) -> Result<MutexGuard<'_, Board>> {
        if self.require_migrated && !self.state.migrated.load(Ordering::SeqCst) {
            return Err(Error::Database(sqlx::Error::Protocol(
                "relation \"task_group\" does not exist".to_string(),
            )));
        }
        Ok(lock(&self.state.board))
    }
}

pub struct MemoryGroupRepository {
    access: BoardAccess,
}

#[async_trait]
impl GroupRepository for MemoryGroupRepository {
    async fn list(&self) -> Result<Vec<Group>> {
        let board = self.access.board()?;
        let mut groups: Vec<Group> = board.groups.values().cloned().collect();
        groups.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(groups)
    }

    async fn insert(&self, name: &str) -> Result<Group> {
        let mut board = self.access.board()?;
        let now = Utc::now();
        let group = Group {
            id: new_v7(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        board.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn rename(&self, id: Uuid, name: &str) -> Result<Group> {
        let mut board = self.access.board()?;
        let group = board
            .groups
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Group {} not found", id)))?;
        group.name = name.to_string();
        group.updated_at = Utc::now();
        Ok(group.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut board = self.access.board()?;
        if board.groups.remove(&id).is_none() {
            return Err(Error::NotFound(format!("Group {} not found", id)));
        }
        board.tasks.retain(|_, task| task.group_id != id);
        Ok(())
    }
}

pub struct MemoryTaskRepository {
    access: BoardAccess,
}

#[async_trait]
impl TaskRepository for MemoryTaskRepository {
    async fn list_by_group(&self, group_id: Uuid) -> Result<Vec<Task>> {
        let board = self.access.board()?;
        let mut tasks: Vec<Task> = board
            .tasks
            .values()
            .filter(|t| t.group_id == group_id)
            .cloned()
            .collect();
        tasks.sort_by(|a, b| {
            a.position
                .cmp(&b.position)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        Ok(tasks)
    }

    async fn insert(&self, task: NewTask) -> Result<Task> {
        let mut board = self.access.board()?;
        if !board.groups.contains_key(&task.group_id) {
            return Err(Error::NotFound(format!("Group {} not found", task.group_id)));
        }

        let position = board
            .tasks
            .values()
            .filter(|t| t.group_id == task.group_id && t.status == task.status)
            .map(|t| t.position + 1)
            .max()
            .unwrap_or(0);

        let now = Utc::now();
        let created = Task {
            id: new_v7(),
            title: task.title,
            description: task.description,
            status: task.status,
            priority: task.priority,
            group_id: task.group_id,
            position,
            created_at: now,
            updated_at: now,
        };
        board.tasks.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: Uuid, update: TaskUpdate) -> Result<Task> {
        let mut board = self.access.board()?;
        let task = board
            .tasks
            .get_mut(&id)
            .ok_or_else(|| Error::NotFound(format!("Task {} not found", id)))?;
        update.apply_to(task);
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<Task> {
        self.access
            .board()?
            .tasks
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("Task {} not found", id)))
    }
}

/// In-memory [`TenantStore`].
pub struct MemoryTenantStore {
    groups: MemoryGroupRepository,
    tasks: MemoryTaskRepository,
}

impl MemoryTenantStore {
    /// A standalone, already migrated tenant database.
    pub fn new() -> Self {
        Self::attach(Arc::new(BoardState::default()), false)
    }

    fn attach(state: Arc<BoardState>, require_migrated: bool) -> Self {
        let access = BoardAccess {
            state,
            require_migrated,
        };
        Self {
            groups: MemoryGroupRepository {
                access: access.clone(),
            },
            tasks: MemoryTaskRepository { access },
        }
    }
}

impl Default for MemoryTenantStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TenantStore for MemoryTenantStore {
    fn groups(&self) -> &dyn GroupRepository {
        &self.groups
    }

    fn tasks(&self) -> &dyn TaskRepository {
        &self.tasks
    }
}

// =============================================================================
// DATABASE SERVER
// =============================================================================

/// In-memory database server.
///
/// Acts as both the [`Connector`] for the connection cache and the
/// [`MigrationRunner`] for provisioning. Data is keyed by connection string
/// and survives across handles, so two handles for the same URL see the
/// same board.
#[derive(Default)]
pub struct MemoryConnector {
    databases: Mutex<HashMap<String, Arc<BoardState>>>,
    refused: Mutex<HashSet<String>>,
    connects: AtomicUsize,
    migrations: AtomicUsize,
    fail_migrations: AtomicBool,
    require_migrated: bool,
    connect_delay: Option<Duration>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject board operations on databases that were never migrated.
    pub fn requiring_migrations(mut self) -> Self {
        self.require_migrated = true;
        self
    }

    /// Sleep before each connection attempt.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    /// Refuse connections to `url` until [`accept`](Self::accept) is called.
    pub fn refuse(&self, url: &str) {
        lock(&self.refused).insert(url.to_string());
    }

    pub fn accept(&self, url: &str) {
        lock(&self.refused).remove(url);
    }

    /// Make every subsequent migration fail.
    pub fn fail_migrations(&self, fail: bool) {
        self.fail_migrations.store(fail, Ordering::SeqCst);
    }

    /// Number of connection attempts, failed ones included.
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn migration_count(&self) -> usize {
        self.migrations.load(Ordering::SeqCst)
    }

    pub fn is_migrated(&self, url: &str) -> bool {
        lock(&self.databases)
            .get(url)
            .map(|db| db.migrated.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    fn database(&self, url: &str) -> Arc<BoardState> {
        lock(&self.databases)
            .entry(url.to_string())
            .or_default()
            .clone()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, connection_string: &str) -> Result<TenantHandle> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if lock(&self.refused).contains(connection_string) {
            return Err(Error::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(Arc::new(MemoryTenantStore::attach(
            self.database(connection_string),
            self.require_migrated,
        )))
    }
}

#[async_trait]
impl MigrationRunner for MemoryConnector {
    async fn migrate(&self, database_url: &str) -> Result<()> {
        self.migrations.fetch_add(1, Ordering::SeqCst);
        if self.fail_migrations.load(Ordering::SeqCst) {
            return Err(Error::Migration(
                "relation \"task_group\" already exists".to_string(),
            ));
        }
        self.database(database_url)
            .migrated
            .store(true, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskforge_core::{Priority, ProvisioningState, TaskStatus};

    fn new_tenant(name: &str, index: Option<&str>) -> NewTenant {
        NewTenant {
            name: name.to_string(),
            database_url: format!("postgres://{}", name),
            external_database_id: None,
            search_index_name: index.map(String::from),
            provisioning_state: ProvisioningState::SchemaReady,
        }
    }

    fn new_task(group_id: Uuid, title: &str, status: TaskStatus) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: None,
            status,
            priority: Priority::Medium,
            group_id,
        }
    }

    #[tokio::test]
    async fn test_directory_lists_newest_first() {
        let dir = MemoryTenantDirectory::new();
        let a = dir.create(new_tenant("a", None)).await.unwrap();
        let b = dir.create(new_tenant("b", None)).await.unwrap();

        let ids: Vec<i64> = dir.list().await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![b.id, a.id]);
    }

    #[tokio::test]
    async fn test_directory_unknown_id() {
        let dir = MemoryTenantDirectory::new();
        assert!(dir.find(7).await.unwrap().is_none());
        assert!(matches!(
            dir.update(7, TenantUpdate::rename("x")).await,
            Err(Error::TenantNotFound(7))
        ));
        assert!(matches!(dir.delete(7).await, Err(Error::TenantNotFound(7))));
    }

    #[tokio::test]
    async fn test_directory_rejects_duplicate_index_name() {
        let dir = MemoryTenantDirectory::new();
        dir.create(new_tenant("a", Some("project-1"))).await.unwrap();
        assert!(dir.create(new_tenant("b", Some("project-1"))).await.is_err());
    }

    #[tokio::test]
    async fn test_task_positions_append_per_partition() {
        let store = MemoryTenantStore::new();
        let group = store.groups().insert("Sprint").await.unwrap();

        let t1 = store
            .tasks()
            .insert(new_task(group.id, "one", TaskStatus::Todo))
            .await
            .unwrap();
        let t2 = store
            .tasks()
            .insert(new_task(group.id, "two", TaskStatus::Todo))
            .await
            .unwrap();
        let d1 = store
            .tasks()
            .insert(new_task(group.id, "done", TaskStatus::Done))
            .await
            .unwrap();

        assert_eq!(t1.position, 0);
        assert_eq!(t2.position, 1);
        assert_eq!(d1.position, 0);
    }

    #[tokio::test]
    async fn test_task_insert_into_missing_group() {
        let store = MemoryTenantStore::new();
        let result = store
            .tasks()
            .insert(new_task(Uuid::now_v7(), "orphan", TaskStatus::Todo))
            .await;
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_group_delete_cascades_tasks() {
        let store = MemoryTenantStore::new();
        let group = store.groups().insert("Sprint").await.unwrap();
        let task = store
            .tasks()
            .insert(new_task(group.id, "one", TaskStatus::Todo))
            .await
            .unwrap();

        store.groups().delete(group.id).await.unwrap();
        assert!(store.tasks().list_by_group(group.id).await.unwrap().is_empty());
        assert!(matches!(
            store.tasks().delete(task.id).await.unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(store.groups().delete(group.id).await.is_err());
    }

    #[tokio::test]
    async fn test_unmigrated_database_rejects_board_ops() {
        let server = MemoryConnector::new().requiring_migrations();
        let handle = server.connect("postgres://fresh").await.unwrap();
        assert!(handle.groups().list().await.is_err());

        server.migrate("postgres://fresh").await.unwrap();
        assert!(handle.groups().list().await.unwrap().is_empty());
        assert!(server.is_migrated("postgres://fresh"));
    }

    #[tokio::test]
    async fn test_handles_for_same_url_share_data() {
        let server = MemoryConnector::new();
        let a = server.connect("postgres://t").await.unwrap();
        let b = server.connect("postgres://t").await.unwrap();

        a.groups().insert("Shared").await.unwrap();
        assert_eq!(b.groups().list().await.unwrap().len(), 1);
    }
}
