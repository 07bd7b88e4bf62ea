//! `{success, error?}` envelope returned by every mutating operation.

use serde::Serialize;

use crate::error::Result;

/// Discriminated success/failure result handed to the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Set when the operation succeeded in a degraded state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl<T> ActionResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            warning: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            warning: None,
        }
    }

    pub fn with_warning(mut self, warning: Option<String>) -> Self {
        self.warning = warning;
        self
    }
}

impl<T> From<Result<T>> for ActionResult<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(data) => ActionResult::ok(data),
            Err(e) => ActionResult::failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_ok_serializes_without_error() {
        let json = serde_json::to_value(ActionResult::ok(5)).unwrap();
        assert_eq!(json, serde_json::json!({"success": true, "data": 5}));
    }

    #[test]
    fn test_failure_from_result() {
        let result: Result<()> = Err(Error::TenantNotFound(3));
        let action: ActionResult<()> = result.into();
        assert!(!action.success);
        assert_eq!(action.error.as_deref(), Some("Project not found: 3"));
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"success": false, "error": "Project not found: 3"})
        );
    }

    #[test]
    fn test_warning_is_carried() {
        let action = ActionResult::ok("acme").with_warning(Some("migration failed".into()));
        assert!(action.success);
        assert_eq!(action.warning.as_deref(), Some("migration failed"));
    }
}
