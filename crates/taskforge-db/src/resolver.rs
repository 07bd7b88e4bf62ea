//! Maps a tenant id to a live handle on that tenant's database.

use std::sync::Arc;

use tracing::debug;

use taskforge_core::{Error, Result, Tenant, TenantDirectory, TenantHandle};

use crate::connection_cache::ConnectionCache;

/// A directory record paired with its live database handle.
#[derive(Clone)]
pub struct ResolvedTenant {
    pub tenant: Tenant,
    pub handle: TenantHandle,
}

/// Directory lookup followed by a connection cache lookup.
///
/// The directory is consulted on every call, so a deleted tenant stops
/// resolving immediately even though its cached handle is never evicted.
#[derive(Clone)]
pub struct TenantResolver {
    directory: Arc<dyn TenantDirectory>,
    cache: Arc<ConnectionCache>,
}

impl TenantResolver {
    pub fn new(directory: Arc<dyn TenantDirectory>, cache: Arc<ConnectionCache>) -> Self {
        Self { directory, cache }
    }

    /// Live handle for `tenant_id`, or `TenantNotFound` without touching the cache.
    pub async fn resolve(&self, tenant_id: i64) -> Result<TenantHandle> {
        Ok(self.resolve_tenant(tenant_id).await?.handle)
    }

    pub async fn resolve_tenant(&self, tenant_id: i64) -> Result<ResolvedTenant> {
        let tenant = self
            .directory
            .find(tenant_id)
            .await?
            .ok_or(Error::TenantNotFound(tenant_id))?;

        let handle = self.cache.resolve(&tenant.database_url).await?;
        debug!(
            subsystem = "db",
            component = "resolver",
            op = "resolve",
            tenant_id,
            "Resolved tenant handle"
        );
        Ok(ResolvedTenant { tenant, handle })
    }

    pub fn directory(&self) -> &Arc<dyn TenantDirectory> {
        &self.directory
    }

    pub fn cache(&self) -> &Arc<ConnectionCache> {
        &self.cache
    }
}
