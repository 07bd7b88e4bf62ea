//! HTTP error mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use taskforge_core::{ActionResult, Error, Result};

/// Status code for a failed operation.
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::NotFound(_) | Error::TenantNotFound(_) => StatusCode::NOT_FOUND,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        Error::ExternalService { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Error returned by read endpoints.
#[derive(Debug)]
pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(subsystem = "api", error = %self.0, "Request failed");
        }
        (status, Json(ActionResult::<()>::failed(self.0.to_string()))).into_response()
    }
}

/// `ActionResult` envelope for a mutating operation.
///
/// Success answers `success_status`; failure answers the mapped status with
/// the error text, so the envelope shape is the same either way.
pub fn action<T: Serialize>(success_status: StatusCode, result: Result<T>) -> Response {
    match result {
        Ok(data) => (success_status, Json(ActionResult::ok(data))).into_response(),
        Err(e) => ApiError(e).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::TenantNotFound(1)), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&Error::InvalidInput("name is required".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Error::external("Neon", "503")),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&Error::Migration("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
