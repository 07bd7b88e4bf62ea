//! Path and JSON extractors whose rejections answer with the `ActionResult`
//! envelope instead of axum's plain-text body.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;
use tracing::debug;

use taskforge_core::Error;

use crate::error::ApiError;

fn rejected(source: &'static str, reason: String) -> ApiError {
    debug!(subsystem = "api", source, reason = %reason, "Request rejected");
    ApiError(Error::InvalidInput(reason))
}

/// `Path<T>` with an [`ApiError`] rejection.
#[derive(Debug)]
pub struct ApiPath<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(ApiPath(value)),
            Err(rejection) => Err(rejected("path", rejection.body_text())),
        }
    }
}

/// `Json<T>` with an [`ApiError`] rejection.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

#[axum::async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(rejected("body", rejection.body_text())),
        }
    }
}
