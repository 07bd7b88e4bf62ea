//! Core traits for taskforge abstractions.
//!
//! These traits define the interfaces that concrete implementations
//! must satisfy, enabling pluggable backends and testability.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::*;

// =============================================================================
// TENANT DIRECTORY
// =============================================================================

/// Central catalog of tenants and their provisioned resources.
///
/// Every operation touches a single row. `find` on an unknown id yields
/// `Ok(None)`, never an error.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    /// List all tenants, newest first.
    async fn list(&self) -> Result<Vec<Tenant>>;

    async fn find(&self, id: i64) -> Result<Option<Tenant>>;

    /// Record a freshly provisioned tenant.
    async fn create(&self, tenant: NewTenant) -> Result<Tenant>;

    /// Update mutable fields. Fails with `TenantNotFound` for an unknown id.
    async fn update(&self, id: i64, update: TenantUpdate) -> Result<Tenant>;

    /// Remove the record. Fails with `TenantNotFound` for an unknown id.
    async fn delete(&self, id: i64) -> Result<()>;
}

// =============================================================================
// TENANT DATABASE REPOSITORIES
// =============================================================================

/// Group CRUD against one tenant's database.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// List groups, newest first.
    async fn list(&self) -> Result<Vec<Group>>;

    async fn insert(&self, name: &str) -> Result<Group>;

    /// Fails with `NotFound` for an unknown id.
    async fn rename(&self, id: Uuid, name: &str) -> Result<Group>;

    /// Fails with `NotFound` for an unknown id.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Task CRUD against one tenant's database.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Tasks of one group ordered by position.
    async fn list_by_group(&self, group_id: Uuid) -> Result<Vec<Task>>;

    /// Insert at the end of the task's `(group_id, status)` partition.
    async fn insert(&self, task: NewTask) -> Result<Task>;

    /// Fails with `NotFound` for an unknown id.
    async fn update(&self, id: Uuid, update: TaskUpdate) -> Result<Task>;

    /// Delete and return the removed row. Fails with `NotFound` for an unknown id.
    async fn delete(&self, id: Uuid) -> Result<Task>;
}

/// A live, reusable connection to one tenant's database.
pub trait TenantStore: Send + Sync {
    fn groups(&self) -> &dyn GroupRepository;

    fn tasks(&self) -> &dyn TaskRepository;
}

/// Shared handle returned by the connection cache.
pub type TenantHandle = Arc<dyn TenantStore>;

// =============================================================================
// EXTERNAL PROVISIONERS
// =============================================================================

/// Allocates and tears down per-tenant databases.
#[async_trait]
pub trait DatabaseProvisioner: Send + Sync {
    async fn allocate(&self, name: &str) -> Result<AllocatedDatabase>;

    async fn rename(&self, external_id: &str, name: &str) -> Result<()>;

    async fn deallocate(&self, external_id: &str) -> Result<()>;

    /// Fallback for legacy records lacking a stored external id.
    fn derive_id_from_connection_string(&self, connection_string: &str) -> Result<String>;
}

/// Control plane of the search-index service.
#[async_trait]
pub trait SearchIndexProvisioner: Send + Sync {
    async fn create_index(&self, name: &str, spec: IndexSpec) -> Result<()>;

    async fn delete_index(&self, name: &str) -> Result<()>;
}

/// Data plane of the search-index service, scoped by namespace.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn upsert(&self, index: &str, namespace: &str, records: Vec<ShadowRecord>)
        -> Result<()>;

    async fn delete_many(&self, index: &str, namespace: &str, ids: &[String]) -> Result<()>;
}

// =============================================================================
// INFERENCE
// =============================================================================

/// Backend for generating text embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Generate embeddings for the given texts, one vector per input.
    async fn embed_texts(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the expected dimension of embedding vectors.
    fn dimension(&self) -> usize;

    /// Get the model name being used.
    fn model_name(&self) -> &str;

    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_texts(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| Error::Embedding("backend returned no embedding".to_string()))
    }
}

// =============================================================================
// SCHEMA MIGRATION
// =============================================================================

/// Brings a freshly allocated tenant database to the current schema.
#[async_trait]
pub trait MigrationRunner: Send + Sync {
    async fn migrate(&self, database_url: &str) -> Result<()>;

    /// Short label for logs.
    fn name(&self) -> &str;
}
