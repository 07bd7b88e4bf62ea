//! End-to-end tenant lifecycle over the in-memory database server.
//!
//! Tests verify:
//! - A migration failure leaves a recorded but degraded tenant
//! - Index deletion failures do not block tenant deletion
//! - A rejected external rename leaves the directory untouched
//! - A deleted tenant stops resolving even though its handle stays cached

use std::sync::Arc;
use std::time::Duration;

use taskforge_api::{BoardService, IndexSettings, ProvisioningService, RetryPolicy, ShadowIndexer};
use taskforge_core::{Error, ProvisioningState};
use taskforge_db::{ConnectionCache, MemoryConnector, MemoryTenantDirectory, TenantResolver};
use taskforge_provision::mock::{MockDatabaseProvisioner, MockEmbeddingBackend, MockSearchIndex};

struct Harness {
    directory: Arc<MemoryTenantDirectory>,
    server: Arc<MemoryConnector>,
    databases: Arc<MockDatabaseProvisioner>,
    index: Arc<MockSearchIndex>,
    cache: Arc<ConnectionCache>,
    provisioning: ProvisioningService,
    board: BoardService,
}

fn harness() -> Harness {
    let directory = Arc::new(MemoryTenantDirectory::new());
    let server = Arc::new(MemoryConnector::new().requiring_migrations());
    let databases = Arc::new(MockDatabaseProvisioner::new());
    let index = Arc::new(MockSearchIndex::new());
    let cache = Arc::new(ConnectionCache::new(server.clone()));

    let provisioning = ProvisioningService::new(
        directory.clone(),
        databases.clone(),
        index.clone(),
        server.clone(),
        IndexSettings::default(),
    );
    let shadow = Arc::new(ShadowIndexer::new(
        Arc::new(MockEmbeddingBackend::new()),
        index.clone(),
        RetryPolicy::new(1, Duration::ZERO),
    ));
    let board = BoardService::new(TenantResolver::new(directory.clone(), cache.clone()), shadow);

    Harness {
        directory,
        server,
        databases,
        index,
        cache,
        provisioning,
        board,
    }
}

#[tokio::test]
async fn test_acme_migration_failure_is_degraded_not_rolled_back() {
    let h = harness();
    h.server.fail_migrations(true);

    let created = h.provisioning.create("Acme").await.unwrap();

    assert!(created.warning.is_some());
    let stored = h.provisioning.get(created.tenant.id).await.unwrap();
    assert_eq!(stored.name, "Acme");
    assert!(!stored.database_url.is_empty());
    assert!(stored.search_index_name.is_some());
    assert_eq!(stored.provisioning_state, ProvisioningState::SchemaFailed);
    assert!(stored.provisioning_state.is_degraded());
    assert!(!h.server.is_migrated(&stored.database_url));

    // Board operations fail until the schema is remediated.
    let err = h.board.create_group(stored.id, "Backlog").await.unwrap_err();
    assert!(matches!(err, Error::Database(_)));
    assert!(h.board.list_groups(stored.id).await.is_err());
}

#[tokio::test]
async fn test_successful_provisioning_migrates_the_tenant_database() {
    let h = harness();

    let tenant = h.provisioning.create("Acme").await.unwrap().tenant;

    assert_eq!(tenant.provisioning_state, ProvisioningState::SchemaReady);
    assert!(h.server.is_migrated(&tenant.database_url));
    assert_eq!(h.server.migration_count(), 1);
    let group = h.board.create_group(tenant.id, "Backlog").await.unwrap();
    assert_eq!(h.board.list_groups(tenant.id).await.unwrap(), vec![group]);
}

#[tokio::test]
async fn test_tenants_are_isolated() {
    let h = harness();
    let acme = h.provisioning.create("Acme").await.unwrap().tenant;
    let globex = h.provisioning.create("Globex").await.unwrap().tenant;

    h.board.create_group(acme.id, "Acme only").await.unwrap();

    assert_eq!(h.board.list_groups(acme.id).await.unwrap().len(), 1);
    assert!(h.board.list_groups(globex.id).await.unwrap().is_empty());
    assert_ne!(acme.search_index_name, globex.search_index_name);
}

#[tokio::test]
async fn test_index_delete_failure_still_removes_record() {
    let h = harness();
    let tenant = h.provisioning.create("Acme").await.unwrap().tenant;
    h.index.fail_on("delete_index");

    let report = h.provisioning.delete(tenant.id).await.unwrap();

    assert!(!report.index_deleted);
    assert!(!h.databases.exists(&report.external_database_id));
    assert!(h.directory.is_empty());
    assert!(matches!(
        h.provisioning.get(tenant.id).await.unwrap_err(),
        Error::TenantNotFound(_)
    ));
}

#[tokio::test]
async fn test_failed_external_rename_leaves_name_unchanged() {
    let h = harness();
    let tenant = h.provisioning.create("Acme").await.unwrap().tenant;
    h.databases.fail_on("rename");

    let err = h.provisioning.rename(tenant.id, "Acme Corp").await.unwrap_err();

    assert!(matches!(err, Error::ExternalService { .. }));
    assert_eq!(h.provisioning.get(tenant.id).await.unwrap().name, "Acme");
}

#[tokio::test]
async fn test_deleted_tenant_stops_resolving() {
    let h = harness();
    let tenant = h.provisioning.create("Acme").await.unwrap().tenant;
    h.board.create_group(tenant.id, "Backlog").await.unwrap();
    assert!(h.cache.contains(&tenant.database_url));

    h.provisioning.delete(tenant.id).await.unwrap();

    assert!(h.cache.contains(&tenant.database_url));
    assert!(h.board.list_groups(tenant.id).await.unwrap().is_empty());
    let err = h.board.create_group(tenant.id, "Late").await.unwrap_err();
    assert!(matches!(err, Error::TenantNotFound(_)));
}

#[tokio::test]
async fn test_list_is_newest_first() {
    let h = harness();
    let first = h.provisioning.create("First").await.unwrap().tenant;
    let second = h.provisioning.create("Second").await.unwrap().tenant;

    let ids: Vec<i64> = h.provisioning.list().await.unwrap().iter().map(|t| t.id).collect();

    assert_eq!(ids, vec![second.id, first.id]);
}
