//! Process-wide registry of live tenant database handles.
//!
//! Keyed by connection string. A handle is constructed on first use and
//! reused for the life of the process; entries are never evicted.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use taskforge_core::{redact_connection_string, Error, Result, TenantHandle};

use crate::pool::{create_pool_with_config, PoolConfig};
use crate::store::PgTenantStore;

/// Builds a live handle for a connection string.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, connection_string: &str) -> Result<TenantHandle>;
}

/// Connector producing pooled PostgreSQL handles.
#[derive(Debug, Clone)]
pub struct PgConnector {
    config: PoolConfig,
}

impl PgConnector {
    pub fn new(config: PoolConfig) -> Self {
        Self { config }
    }
}

impl Default for PgConnector {
    fn default() -> Self {
        Self::new(PoolConfig::tenant())
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self, connection_string: &str) -> Result<TenantHandle> {
        let pool = create_pool_with_config(connection_string, self.config.clone()).await?;
        Ok(Arc::new(PgTenantStore::new(pool)))
    }
}

/// Get-or-create cache of tenant handles.
///
/// Concurrent first resolution of the same key constructs at most one handle:
/// each key owns a [`OnceCell`] whose initializer runs once while other
/// callers wait. A failed construction leaves the cell empty so the next call
/// retries.
pub struct ConnectionCache {
    connector: Arc<dyn Connector>,
    handles: DashMap<String, Arc<OnceCell<TenantHandle>>>,
}

impl ConnectionCache {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            handles: DashMap::new(),
        }
    }

    /// Cache backed by pooled PostgreSQL connections.
    pub fn postgres(config: PoolConfig) -> Self {
        Self::new(Arc::new(PgConnector::new(config)))
    }

    /// Return the handle for `connection_string`, constructing it on first use.
    pub async fn resolve(&self, connection_string: &str) -> Result<TenantHandle> {
        // Clone the cell out so no map shard lock is held across the await.
        let cell = self
            .handles
            .entry(connection_string.to_string())
            .or_default()
            .clone();

        if let Some(handle) = cell.get() {
            debug!(
                subsystem = "db",
                component = "connection_cache",
                op = "resolve",
                hit = true,
                "Reusing cached tenant handle"
            );
            return Ok(handle.clone());
        }

        let handle = cell
            .get_or_try_init(|| async {
                let start = Instant::now();
                match self.connector.connect(connection_string).await {
                    Ok(handle) => {
                        info!(
                            subsystem = "db",
                            component = "connection_cache",
                            op = "construct",
                            url = %redact_connection_string(connection_string),
                            duration_ms = start.elapsed().as_millis() as u64,
                            "Constructed tenant handle"
                        );
                        Ok(handle)
                    }
                    Err(e) => {
                        warn!(
                            subsystem = "db",
                            component = "connection_cache",
                            op = "construct",
                            url = %redact_connection_string(connection_string),
                            error = %e,
                            "Failed to construct tenant handle"
                        );
                        Err::<TenantHandle, Error>(e)
                    }
                }
            })
            .await?;

        Ok(handle.clone())
    }

    /// Whether a live handle exists for `connection_string`.
    pub fn contains(&self, connection_string: &str) -> bool {
        self.handles
            .get(connection_string)
            .map(|cell| cell.initialized())
            .unwrap_or(false)
    }

    /// Number of live handles.
    pub fn len(&self) -> usize {
        self.handles
            .iter()
            .filter(|entry| entry.value().initialized())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryConnector;

    #[tokio::test]
    async fn test_resolve_reuses_handle() {
        let connector = Arc::new(MemoryConnector::new());
        let cache = ConnectionCache::new(connector.clone());

        let first = cache.resolve("postgres://a").await.unwrap();
        let second = cache.resolve("postgres://a").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connector.connect_count(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("postgres://a"));
    }

    #[tokio::test]
    async fn test_distinct_keys_get_distinct_handles() {
        let connector = Arc::new(MemoryConnector::new());
        let cache = ConnectionCache::new(connector.clone());

        let a = cache.resolve("postgres://a").await.unwrap();
        let b = cache.resolve("postgres://b").await.unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(connector.connect_count(), 2);
    }

    #[tokio::test]
    async fn test_failed_construction_is_not_stored() {
        let connector = Arc::new(MemoryConnector::new());
        connector.refuse("postgres://down");
        let cache = ConnectionCache::new(connector.clone());

        assert!(cache.resolve("postgres://down").await.is_err());
        assert!(!cache.contains("postgres://down"));
        assert!(cache.is_empty());

        connector.accept("postgres://down");
        assert!(cache.resolve("postgres://down").await.is_ok());
        assert_eq!(connector.connect_count(), 2);
        assert_eq!(cache.len(), 1);
    }
}
