//! HTTP handlers.
//!
//! Mutations answer with an `ActionResult` envelope; list endpoints answer
//! with a bare JSON array.

pub mod groups;
pub mod projects;
pub mod tasks;

use axum::{response::IntoResponse, Json};
use serde::Deserialize;

/// Body of every create-or-rename request that only carries a name.
///
/// A missing name reads as empty so it fails validation like a blank one.
#[derive(Debug, Deserialize)]
pub struct NameRequest {
    #[serde(default)]
    pub name: String,
}

pub async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
