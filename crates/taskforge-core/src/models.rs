//! Domain models for taskforge.
//!
//! Tenants ("projects") live in the central directory; groups and tasks live
//! inside each tenant's own database and never reference the directory.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map as JsonMap, Value as JsonValue};
use uuid::Uuid;

use crate::connection_string::redact_connection_string;
use crate::error::{Error, Result};

// =============================================================================
// VALIDATION
// =============================================================================

/// Trim `value` and reject it when nothing is left.
///
/// Returns the trimmed string so callers store exactly what was validated.
pub fn require_non_empty(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

/// Distinguish an absent JSON field from an explicit `null`.
fn deserialize_some<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

// =============================================================================
// TENANT TYPES
// =============================================================================

/// Step reached by the tenant provisioning workflow.
///
/// Only the last three states are ever persisted; the earlier ones exist
/// before the directory row is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProvisioningState {
    Pending,
    DbAllocated,
    IndexAllocated,
    DirectoryRecorded,
    SchemaReady,
    /// Migration failed after the directory row was written. Degraded, not rolled back.
    SchemaFailed,
}

impl ProvisioningState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisioningState::Pending => "PENDING",
            ProvisioningState::DbAllocated => "DB_ALLOCATED",
            ProvisioningState::IndexAllocated => "INDEX_ALLOCATED",
            ProvisioningState::DirectoryRecorded => "DIRECTORY_RECORDED",
            ProvisioningState::SchemaReady => "SCHEMA_READY",
            ProvisioningState::SchemaFailed => "SCHEMA_FAILED",
        }
    }

    /// Whether the tenant needs manual remediation before it is usable.
    pub fn is_degraded(&self) -> bool {
        !matches!(self, ProvisioningState::SchemaReady)
    }
}

impl fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProvisioningState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PENDING" => Ok(ProvisioningState::Pending),
            "DB_ALLOCATED" => Ok(ProvisioningState::DbAllocated),
            "INDEX_ALLOCATED" => Ok(ProvisioningState::IndexAllocated),
            "DIRECTORY_RECORDED" => Ok(ProvisioningState::DirectoryRecorded),
            "SCHEMA_READY" => Ok(ProvisioningState::SchemaReady),
            "SCHEMA_FAILED" => Ok(ProvisioningState::SchemaFailed),
            other => Err(Error::InvalidInput(format!(
                "unknown provisioning state: {}",
                other
            ))),
        }
    }
}

/// Directory record for one tenant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Tenant {
    pub id: i64,
    pub name: String,
    /// Set once at provisioning, never changed afterwards. Serialized with
    /// the password masked.
    #[serde(serialize_with = "serialize_redacted")]
    pub database_url: String,
    /// Absent on rows written before the field existed; derivable from `database_url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_database_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_index_name: Option<String>,
    pub provisioning_state: ProvisioningState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn serialize_redacted<S>(url: &str, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&redact_connection_string(url))
}

/// Fields captured when the directory row is first written.
#[derive(Debug, Clone)]
pub struct NewTenant {
    pub name: String,
    pub database_url: String,
    pub external_database_id: Option<String>,
    pub search_index_name: Option<String>,
    pub provisioning_state: ProvisioningState,
}

/// Mutable directory fields. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct TenantUpdate {
    pub name: Option<String>,
    pub provisioning_state: Option<ProvisioningState>,
}

impl TenantUpdate {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn state(state: ProvisioningState) -> Self {
        Self {
            provisioning_state: Some(state),
            ..Default::default()
        }
    }
}

/// Outcome of tenant creation.
///
/// `warning` is set when provisioning ended in a degraded state.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedTenant {
    pub tenant: Tenant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Result of a tenant deletion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub external_database_id: String,
    /// False when an index was recorded but could not be deleted.
    pub index_deleted: bool,
}

// =============================================================================
// EXTERNAL RESOURCE TYPES
// =============================================================================

/// Database handed back by the external provisioner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedDatabase {
    pub external_id: String,
    pub connection_string: String,
}

/// Distance metric for a vector index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexMetric {
    #[default]
    Cosine,
    Euclidean,
    Dotproduct,
}

impl IndexMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexMetric::Cosine => "cosine",
            IndexMetric::Euclidean => "euclidean",
            IndexMetric::Dotproduct => "dotproduct",
        }
    }
}

impl FromStr for IndexMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(IndexMetric::Cosine),
            "euclidean" => Ok(IndexMetric::Euclidean),
            "dotproduct" => Ok(IndexMetric::Dotproduct),
            other => Err(Error::Config(format!("unknown index metric: {}", other))),
        }
    }
}

/// Shape of a tenant's search index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSpec {
    pub dimension: usize,
    pub metric: IndexMetric,
}

impl Default for IndexSpec {
    fn default() -> Self {
        Self {
            dimension: crate::defaults::EMBED_DIMENSION,
            metric: IndexMetric::Cosine,
        }
    }
}

// =============================================================================
// BOARD TYPES
// =============================================================================

/// Kanban column a task sits in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Error,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Error => "ERROR",
            TaskStatus::Done => "DONE",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "TODO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "ERROR" => Ok(TaskStatus::Error),
            "DONE" => Ok(TaskStatus::Done),
            other => Err(Error::InvalidInput(format!("unknown task status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "LOW" => Ok(Priority::Low),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            other => Err(Error::InvalidInput(format!("unknown priority: {}", other))),
        }
    }
}

/// A column group on the board. Lives in the tenant database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub priority: Priority,
    pub group_id: Uuid,
    /// Manual ordering within the `(group_id, status)` partition.
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Text fed to the embedding model for the task's shadow record.
    pub fn embedding_text(&self) -> String {
        format!(
            "{} {}",
            self.title,
            self.description.as_deref().unwrap_or("")
        )
    }
}

/// Request for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    pub group_id: Uuid,
}

impl NewTask {
    /// Trim the title and reject an empty one.
    pub fn validated(mut self) -> Result<Self> {
        self.title = require_non_empty("title", &self.title)?;
        Ok(self)
    }
}

/// Partial task update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskUpdate {
    #[serde(default)]
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub position: Option<i32>,
}

impl TaskUpdate {
    /// Update produced by a drag-and-drop move.
    pub fn status_move(status: TaskStatus, position: Option<i32>) -> Self {
        Self {
            status: Some(status),
            position,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.position.is_none()
    }

    pub fn validated(mut self) -> Result<Self> {
        if let Some(title) = self.title.take() {
            self.title = Some(require_non_empty("title", &title)?);
        }
        if let Some(position) = self.position {
            if position < 0 {
                return Err(Error::InvalidInput(
                    "position must not be negative".to_string(),
                ));
            }
        }
        Ok(self)
    }

    /// Apply the update to an in-memory task.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(ref title) = self.title {
            task.title = title.clone();
        }
        if let Some(ref description) = self.description {
            task.description = description.clone();
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(priority) = self.priority {
            task.priority = priority;
        }
        if let Some(position) = self.position {
            task.position = position;
        }
    }
}

// =============================================================================
// SEARCH INDEX TYPES
// =============================================================================

/// Vector plus denormalized metadata mirroring a task in the search index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShadowRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: JsonMap<String, JsonValue>,
}

impl ShadowRecord {
    pub fn for_task(task: &Task, values: Vec<f32>) -> Self {
        let mut metadata = JsonMap::new();
        metadata.insert("title".into(), JsonValue::String(task.title.clone()));
        metadata.insert(
            "description".into(),
            JsonValue::String(task.description.clone().unwrap_or_default()),
        );
        metadata.insert("status".into(), JsonValue::String(task.status.to_string()));
        metadata.insert(
            "priority".into(),
            JsonValue::String(task.priority.to_string()),
        );
        Self {
            id: task.id.to_string(),
            values,
            metadata,
        }
    }
}
