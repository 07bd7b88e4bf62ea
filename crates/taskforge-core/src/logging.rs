//! Structured logging schema and field name constants for taskforge.
//!
//! All crates use these constants for consistent structured logging fields.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded tenant or lost shadow write, requires operator attention |
//! | WARN  | Recoverable issue, best-effort step swallowed |
//! | INFO  | Lifecycle events (provisioning steps, pool creation, startup) |
//! | DEBUG | Decision points, cache hits, skipped steps |
//! | TRACE | Per-item iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Correlation ID propagated from the HTTP request.
pub const REQUEST_ID: &str = "request_id";

/// Subsystem originating the log event.
/// Values: "api", "db", "provision", "search", "inference"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "connection_cache", "resolver", "orchestrator", "shadow", "neon"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "resolve", "create_tenant", "upsert", "migrate"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Directory id of the tenant being operated on.
pub const TENANT_ID: &str = "tenant_id";

/// Group UUID.
pub const GROUP_ID: &str = "group_id";

/// Task UUID.
pub const TASK_ID: &str = "task_id";

/// Search index name.
pub const INDEX_NAME: &str = "index_name";

/// External database id at the provisioner.
pub const EXTERNAL_DB_ID: &str = "external_database_id";

/// Provisioning state reached.
pub const STATE: &str = "state";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Retry attempt number (1-based).
pub const ATTEMPT: &str = "attempt";

/// Number of cached tenant handles.
pub const CACHE_SIZE: &str = "cache_size";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
