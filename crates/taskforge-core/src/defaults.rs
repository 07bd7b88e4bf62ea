//! Centralized default constants for taskforge.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic numbers.

// =============================================================================
// EMBEDDING / SEARCH INDEX
// =============================================================================

/// Default embedding model name.
pub const EMBED_MODEL: &str = "text-embedding-004";

/// Embedding vector dimension produced by `text-embedding-004`.
pub const EMBED_DIMENSION: usize = 768;

/// Timeout for embedding requests (seconds).
pub const EMBED_TIMEOUT_SECS: u64 = 30;

/// Prefix of generated search index names.
pub const INDEX_NAME_PREFIX: &str = "project";

/// Maximum length the index service accepts for an index name.
pub const INDEX_NAME_MAX_LEN: usize = 45;

/// Serverless cloud for new indexes.
pub const INDEX_CLOUD: &str = "aws";

/// Serverless region for new indexes.
pub const INDEX_REGION: &str = "us-east-1";

// =============================================================================
// SHADOW SYNC
// =============================================================================

/// Attempts per shadow-record write before it is dropped.
pub const SHADOW_SYNC_MAX_ATTEMPTS: u32 = 3;

/// Linear backoff unit between shadow-record attempts (milliseconds).
pub const SHADOW_SYNC_BACKOFF_MS: u64 = 1000;

// =============================================================================
// DATABASE
// =============================================================================

/// Maximum connections for each tenant pool held by the connection cache.
pub const TENANT_POOL_MAX_CONNECTIONS: u32 = 5;

/// Maximum connections for the master directory pool.
pub const MASTER_POOL_MAX_CONNECTIONS: u32 = 10;

// =============================================================================
// EXTERNAL SERVICES
// =============================================================================

/// Neon management API base URL.
pub const NEON_API_BASE: &str = "https://console.neon.tech/api/v2";

/// Pinecone control-plane base URL.
pub const PINECONE_API_BASE: &str = "https://api.pinecone.io";

/// Pinecone API version header value.
pub const PINECONE_API_VERSION: &str = "2024-07";

/// Gemini API base URL.
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Timeout for provisioning API requests (seconds).
pub const PROVISION_TIMEOUT_SECS: u64 = 60;

/// External migration command used when `MIGRATION_MODE=command`.
pub const MIGRATION_COMMAND: &str =
    "prisma migrate deploy --schema=prisma-project/projectSchema.prisma";

/// Environment variable carrying the tenant URL to the migration command.
pub const MIGRATION_URL_ENV: &str = "PROJECT_DATABASE_URL";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_index_prefix_leaves_room_for_suffix() {
        // prefix + '-' + 13-digit millis + '-' + 6 hex
        assert!(INDEX_NAME_PREFIX.len() + 22 <= INDEX_NAME_MAX_LEN);
    }

    #[test]
    fn test_shadow_retry_defaults() {
        assert!(SHADOW_SYNC_MAX_ATTEMPTS >= 1);
        assert_eq!(SHADOW_SYNC_BACKOFF_MS, 1000);
    }
}
