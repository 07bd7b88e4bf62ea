//! Server configuration loaded from the environment.

use std::time::Duration;

use taskforge_core::{defaults, IndexMetric, IndexSpec, Result};
use taskforge_provision::{env_or, parse_env_or, MigrationMode};

use crate::services::RetryPolicy;

/// Search index naming and shape for new tenants.
#[derive(Debug, Clone)]
pub struct IndexSettings {
    pub prefix: String,
    pub spec: IndexSpec,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            prefix: defaults::INDEX_NAME_PREFIX.to_string(),
            spec: IndexSpec::default(),
        }
    }
}

impl IndexSettings {
    /// Load from `SEARCH_INDEX_PREFIX`, `SEARCH_INDEX_METRIC` and `EMBED_DIMENSION`.
    pub fn from_env() -> Result<Self> {
        let metric: IndexMetric =
            env_or("SEARCH_INDEX_METRIC", IndexMetric::Cosine.as_str()).parse()?;
        Ok(Self {
            prefix: env_or("SEARCH_INDEX_PREFIX", defaults::INDEX_NAME_PREFIX),
            spec: IndexSpec {
                dimension: parse_env_or("EMBED_DIMENSION", defaults::EMBED_DIMENSION)?,
                metric,
            },
        })
    }
}

/// Everything the server needs besides the provider credentials, which each
/// client reads for itself.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub tenant_pool_max_connections: u32,
    pub index: IndexSettings,
    pub migration_mode: MigrationMode,
    pub shadow_retry: RetryPolicy,
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let max_attempts: u32 =
            parse_env_or("SHADOW_SYNC_MAX_ATTEMPTS", defaults::SHADOW_SYNC_MAX_ATTEMPTS)?;
        let backoff_ms: u64 =
            parse_env_or("SHADOW_SYNC_BACKOFF_MS", defaults::SHADOW_SYNC_BACKOFF_MS)?;

        Ok(Self {
            database_url: env_or("DATABASE_URL", "postgres://localhost/taskforge"),
            host: env_or("HOST", "0.0.0.0"),
            port: parse_env_or("PORT", 3000)?,
            tenant_pool_max_connections: parse_env_or(
                "TENANT_POOL_MAX_CONNECTIONS",
                defaults::TENANT_POOL_MAX_CONNECTIONS,
            )?,
            index: IndexSettings::from_env()?,
            migration_mode: env_or("MIGRATION_MODE", "embedded").parse()?,
            shadow_retry: RetryPolicy::new(max_attempts, Duration::from_millis(backoff_ms)),
            allowed_origins: env_or("ALLOWED_ORIGINS", "")
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_settings_default_shape() {
        let settings = IndexSettings::default();
        assert_eq!(settings.prefix, "project");
        assert_eq!(settings.spec.dimension, 768);
        assert_eq!(settings.spec.metric, IndexMetric::Cosine);
    }
}
