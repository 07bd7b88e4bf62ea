//! Error types for taskforge.

use thiserror::Error;

/// Result type alias using taskforge's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for taskforge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found (group, task)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Tenant id has no directory record
    #[error("Project not found: {0}")]
    TenantNotFound(i64),

    /// Invalid input, rejected before any external call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// External provider (database provisioner, search index) failed
    #[error("{service} error: {message}")]
    ExternalService { service: String, message: String },

    /// Embedding generation failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Schema migration against a tenant database failed
    #[error("Migration error: {0}")]
    Migration(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an [`Error::ExternalService`] for the named provider.
    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Error::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Whether this error means "the addressed thing does not exist".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::TenantNotFound(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("group 42".to_string());
        assert_eq!(err.to_string(), "Not found: group 42");
    }

    #[test]
    fn test_error_display_tenant_not_found() {
        let err = Error::TenantNotFound(7);
        assert_eq!(err.to_string(), "Project not found: 7");
    }

    #[test]
    fn test_error_display_external_service() {
        let err = Error::external("neon", "500 - upstream unavailable");
        assert_eq!(err.to_string(), "neon error: 500 - upstream unavailable");
    }

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("name is required".to_string());
        assert_eq!(err.to_string(), "Invalid input: name is required");
    }

    #[test]
    fn test_error_display_migration() {
        let err = Error::Migration("exit status 1".to_string());
        assert_eq!(err.to_string(), "Migration error: exit status 1");
    }

    #[test]
    fn test_is_not_found() {
        assert!(Error::NotFound("task".into()).is_not_found());
        assert!(Error::TenantNotFound(1).is_not_found());
        assert!(!Error::Internal("boom".into()).is_not_found());
        assert!(!Error::external("pinecone", "timeout").is_not_found());
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number");
        assert!(json_err.is_err());

        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
