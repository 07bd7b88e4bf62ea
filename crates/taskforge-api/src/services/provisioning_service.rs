//! Tenant lifecycle: create, rename and delete across the directory, the
//! database provisioner and the search index service.
//!
//! Creation walks `PENDING → DB_ALLOCATED → INDEX_ALLOCATED →
//! DIRECTORY_RECORDED → SCHEMA_READY | SCHEMA_FAILED`. Nothing is rolled back;
//! resources left behind by a failed step are logged at ERROR so an operator
//! can reclaim them.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use taskforge_core::{
    redact_connection_string, require_non_empty, DatabaseProvisioner, DeletionReport, Error,
    MigrationRunner, NewTenant, ProvisionedTenant, ProvisioningState, Result,
    SearchIndexProvisioner, Tenant, TenantDirectory, TenantUpdate,
};
use taskforge_provision::generate_index_name;

use crate::config::IndexSettings;

/// Coordinates the external provisioners with the tenant directory.
pub struct ProvisioningService {
    directory: Arc<dyn TenantDirectory>,
    databases: Arc<dyn DatabaseProvisioner>,
    indexes: Arc<dyn SearchIndexProvisioner>,
    migrations: Arc<dyn MigrationRunner>,
    settings: IndexSettings,
}

fn log_state(name: &str, state: ProvisioningState) {
    info!(
        subsystem = "provision",
        component = "orchestrator",
        op = "create_tenant",
        tenant_name = %name,
        state = %state,
        "Provisioning step complete"
    );
}

impl ProvisioningService {
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        databases: Arc<dyn DatabaseProvisioner>,
        indexes: Arc<dyn SearchIndexProvisioner>,
        migrations: Arc<dyn MigrationRunner>,
        settings: IndexSettings,
    ) -> Self {
        Self {
            directory,
            databases,
            indexes,
            migrations,
            settings,
        }
    }

    /// All tenants, newest first.
    pub async fn list(&self) -> Result<Vec<Tenant>> {
        self.directory.list().await
    }

    pub async fn get(&self, id: i64) -> Result<Tenant> {
        self.directory
            .find(id)
            .await?
            .ok_or(Error::TenantNotFound(id))
    }

    /// Provision a new tenant.
    ///
    /// A failed migration is not an error: the tenant is recorded as
    /// `SCHEMA_FAILED` and the returned value carries a warning.
    pub async fn create(&self, name: &str) -> Result<ProvisionedTenant> {
        let name = require_non_empty("name", name)?;
        let start = Instant::now();
        log_state(&name, ProvisioningState::Pending);

        let database = self.databases.allocate(&name).await?;
        log_state(&name, ProvisioningState::DbAllocated);

        let index_name = generate_index_name(&self.settings.prefix);
        if let Err(e) = self.indexes.create_index(&index_name, self.settings.spec).await {
            error!(
                subsystem = "provision",
                component = "orchestrator",
                op = "create_tenant",
                tenant_name = %name,
                external_database_id = %database.external_id,
                error = %e,
                "Index allocation failed, database left allocated"
            );
            return Err(e);
        }
        log_state(&name, ProvisioningState::IndexAllocated);

        let record = NewTenant {
            name: name.clone(),
            database_url: database.connection_string.clone(),
            external_database_id: Some(database.external_id.clone()),
            search_index_name: Some(index_name.clone()),
            provisioning_state: ProvisioningState::DirectoryRecorded,
        };
        let mut tenant = match self.directory.create(record).await {
            Ok(tenant) => tenant,
            Err(e) => {
                error!(
                    subsystem = "provision",
                    component = "orchestrator",
                    op = "create_tenant",
                    tenant_name = %name,
                    external_database_id = %database.external_id,
                    index_name = %index_name,
                    error = %e,
                    "Directory write failed, database and index left allocated"
                );
                return Err(e);
            }
        };
        log_state(&name, ProvisioningState::DirectoryRecorded);

        let (state, failure) = match self.migrations.migrate(&tenant.database_url).await {
            Ok(()) => (ProvisioningState::SchemaReady, None),
            Err(e) => {
                error!(
                    subsystem = "provision",
                    component = "orchestrator",
                    op = "create_tenant",
                    tenant_id = tenant.id,
                    runner = self.migrations.name(),
                    url = %redact_connection_string(&tenant.database_url),
                    error = %e,
                    "Tenant schema migration failed, tenant is degraded"
                );
                (ProvisioningState::SchemaFailed, Some(e.to_string()))
            }
        };

        match self
            .directory
            .update(tenant.id, TenantUpdate::state(state))
            .await
        {
            Ok(updated) => tenant = updated,
            Err(e) => error!(
                subsystem = "provision",
                component = "orchestrator",
                op = "create_tenant",
                tenant_id = tenant.id,
                state = %state,
                error = %e,
                "Failed to record provisioning state"
            ),
        }

        let warning = state.is_degraded().then(|| {
            format!(
                "Project created but database schema setup failed: {}",
                failure.unwrap_or_default()
            )
        });

        info!(
            subsystem = "provision",
            component = "orchestrator",
            op = "create_tenant",
            tenant_id = tenant.id,
            state = %tenant.provisioning_state,
            duration_ms = start.elapsed().as_millis() as u64,
            "Tenant provisioned"
        );
        Ok(ProvisionedTenant { tenant, warning })
    }

    /// Stored external id, or one derived from the connection string for
    /// records written before the id was kept.
    fn external_id(&self, tenant: &Tenant) -> Result<String> {
        match &tenant.external_database_id {
            Some(id) => Ok(id.clone()),
            None => {
                debug!(
                    subsystem = "provision",
                    component = "orchestrator",
                    tenant_id = tenant.id,
                    "No stored external id, deriving from connection string"
                );
                self.databases
                    .derive_id_from_connection_string(&tenant.database_url)
            }
        }
    }

    /// Rename the external database, then the directory record.
    pub async fn rename(&self, id: i64, name: &str) -> Result<Tenant> {
        let name = require_non_empty("name", name)?;
        let tenant = self.get(id).await?;
        let external_id = self.external_id(&tenant)?;

        self.databases.rename(&external_id, &name).await?;
        let renamed = self
            .directory
            .update(id, TenantUpdate::rename(name))
            .await?;

        info!(
            subsystem = "provision",
            component = "orchestrator",
            op = "rename_tenant",
            tenant_id = id,
            "Tenant renamed"
        );
        Ok(renamed)
    }

    /// Tear down a tenant.
    ///
    /// Database deletion is fatal and keeps the directory record. Index
    /// deletion is best-effort and reported through `index_deleted`.
    pub async fn delete(&self, id: i64) -> Result<DeletionReport> {
        let tenant = self.get(id).await?;
        let external_id = self.external_id(&tenant)?;

        self.databases.deallocate(&external_id).await?;
        info!(
            subsystem = "provision",
            component = "orchestrator",
            op = "delete_tenant",
            tenant_id = id,
            external_database_id = %external_id,
            "Tenant database deleted"
        );

        let index_deleted = match &tenant.search_index_name {
            Some(index) => match self.indexes.delete_index(index).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(
                        subsystem = "provision",
                        component = "orchestrator",
                        op = "delete_tenant",
                        tenant_id = id,
                        index_name = %index,
                        error = %e,
                        "Index deletion failed, continuing"
                    );
                    false
                }
            },
            None => true,
        };

        self.directory.delete(id).await?;
        info!(
            subsystem = "provision",
            component = "orchestrator",
            op = "delete_tenant",
            tenant_id = id,
            index_deleted,
            "Tenant deleted"
        );

        Ok(DeletionReport {
            external_database_id: external_id,
            index_deleted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskforge_db::MemoryTenantDirectory;
    use taskforge_provision::mock::{
        MockDatabaseProvisioner, MockMigrationRunner, MockSearchIndex,
    };

    struct Harness {
        directory: Arc<MemoryTenantDirectory>,
        databases: Arc<MockDatabaseProvisioner>,
        indexes: Arc<MockSearchIndex>,
        migrations: Arc<MockMigrationRunner>,
        service: ProvisioningService,
    }

    fn harness() -> Harness {
        let directory = Arc::new(MemoryTenantDirectory::new());
        let databases = Arc::new(MockDatabaseProvisioner::new());
        let indexes = Arc::new(MockSearchIndex::new());
        let migrations = Arc::new(MockMigrationRunner::new());
        let service = ProvisioningService::new(
            directory.clone(),
            databases.clone(),
            indexes.clone(),
            migrations.clone(),
            IndexSettings::default(),
        );
        Harness {
            directory,
            databases,
            indexes,
            migrations,
            service,
        }
    }

    #[tokio::test]
    async fn test_create_reaches_schema_ready() {
        let h = harness();
        let created = h.service.create("  Acme  ").await.unwrap();

        assert!(created.warning.is_none());
        let tenant = created.tenant;
        assert_eq!(tenant.name, "Acme");
        assert_eq!(tenant.provisioning_state, ProvisioningState::SchemaReady);
        assert_eq!(tenant.external_database_id.as_deref(), Some("proj-mock-1"));

        let index = tenant.search_index_name.unwrap();
        assert!(index.starts_with("project-"));
        assert!(h.indexes.has_index(&index));
        assert_eq!(h.indexes.index_spec(&index).unwrap().dimension, 768);
        assert!(h.migrations.migrated(&tenant.database_url));
    }

    #[tokio::test]
    async fn test_blank_name_rejected_before_any_external_call() {
        let h = harness();
        let err = h.service.create("   ").await.unwrap_err();

        assert!(matches!(err, Error::InvalidInput(_)));
        assert!(h.databases.calls().is_empty());
        assert!(h.indexes.calls().is_empty());
        assert!(h.directory.is_empty());
    }

    #[tokio::test]
    async fn test_index_failure_aborts_without_directory_record() {
        let h = harness();
        h.indexes.fail_on("create_index");

        let err = h.service.create("Acme").await.unwrap_err();

        assert!(matches!(err, Error::ExternalService { .. }));
        assert_eq!(h.databases.allocated_count(), 1);
        assert!(h.directory.is_empty());
        assert_eq!(h.migrations.call_count("migrate"), 0);
    }

    #[tokio::test]
    async fn test_directory_failure_is_reported() {
        let h = harness();
        h.directory.fail_writes(true);

        assert!(h.service.create("Acme").await.is_err());
        assert_eq!(h.migrations.call_count("migrate"), 0);
    }

    #[tokio::test]
    async fn test_migration_failure_leaves_degraded_tenant() {
        let h = harness();
        h.migrations.fail_on("migrate");

        let created = h.service.create("Acme").await.unwrap();

        assert!(created.warning.unwrap().contains("schema setup failed"));
        let stored = h.service.get(created.tenant.id).await.unwrap();
        assert_eq!(stored.provisioning_state, ProvisioningState::SchemaFailed);
    }

    #[tokio::test]
    async fn test_rename_updates_provisioner_then_directory() {
        let h = harness();
        let tenant = h.service.create("Acme").await.unwrap().tenant;

        let renamed = h.service.rename(tenant.id, "Acme Corp").await.unwrap();

        assert_eq!(renamed.name, "Acme Corp");
        assert_eq!(
            h.databases.name_of("proj-mock-1").as_deref(),
            Some("Acme Corp")
        );
    }

    #[tokio::test]
    async fn test_rename_unknown_tenant() {
        let h = harness();
        let err = h.service.rename(404, "x").await.unwrap_err();
        assert!(matches!(err, Error::TenantNotFound(404)));
        assert_eq!(h.databases.call_count("rename"), 0);
    }

    #[tokio::test]
    async fn test_delete_removes_everything() {
        let h = harness();
        let tenant = h.service.create("Acme").await.unwrap().tenant;
        let index = tenant.search_index_name.clone().unwrap();

        let report = h.service.delete(tenant.id).await.unwrap();

        assert_eq!(report.external_database_id, "proj-mock-1");
        assert!(report.index_deleted);
        assert!(!h.databases.exists("proj-mock-1"));
        assert!(!h.indexes.has_index(&index));
        assert!(h.directory.is_empty());
    }

    #[tokio::test]
    async fn test_delete_keeps_record_when_database_delete_fails() {
        let h = harness();
        let tenant = h.service.create("Acme").await.unwrap().tenant;
        h.databases.fail_on("deallocate");

        assert!(h.service.delete(tenant.id).await.is_err());
        assert!(h.service.get(tenant.id).await.is_ok());
        assert_eq!(h.indexes.call_count("delete_index"), 0);
    }

    #[tokio::test]
    async fn test_delete_derives_legacy_external_id() {
        let h = harness();
        h.databases.adopt("ep-legacy-1", "Legacy");
        let tenant = h
            .directory
            .create(NewTenant {
                name: "Legacy".into(),
                database_url: "postgresql://o:p@ep-legacy-1.eu-central-1.aws.neon.tech/neondb"
                    .into(),
                external_database_id: None,
                search_index_name: None,
                provisioning_state: ProvisioningState::SchemaReady,
            })
            .await
            .unwrap();

        let report = h.service.delete(tenant.id).await.unwrap();

        assert_eq!(report.external_database_id, "ep-legacy-1");
        assert!(report.index_deleted);
        assert!(h.directory.is_empty());
    }

    #[tokio::test]
    async fn test_underivable_legacy_id_is_external_error() {
        let h = harness();
        let tenant = h
            .directory
            .create(NewTenant {
                name: "Local".into(),
                database_url: "postgres://u:p@localhost/db".into(),
                external_database_id: None,
                search_index_name: None,
                provisioning_state: ProvisioningState::SchemaReady,
            })
            .await
            .unwrap();

        let err = h.service.delete(tenant.id).await.unwrap_err();

        assert!(matches!(err, Error::ExternalService { .. }));
        assert_eq!(h.directory.len(), 1);
        assert_eq!(h.databases.call_count("deallocate"), 0);
    }
}
