//! # taskforge-api
//!
//! Tenant provisioning, the tenant-scoped board, background shadow sync and
//! the axum HTTP surface over all three.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod services;
pub mod state;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post, put},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};

pub use config::{AppConfig, IndexSettings};
pub use error::ApiError;
pub use services::{BoardService, ProvisioningService, RetryPolicy, ShadowIndexer};
pub use state::AppState;

use handlers::{groups, projects, tasks};

/// Time-ordered UUIDv7 request correlation ids.
#[derive(Clone, Default)]
struct MakeRequestUuidV7;

impl MakeRequestId for MakeRequestUuidV7 {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = taskforge_core::new_v7().to_string().parse().ok()?;
        Some(RequestId::new(id))
    }
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .max_age(std::time::Duration::from_secs(3600));

    if allowed_origins.is_empty() {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::warn!("Invalid CORS origin '{}': {}", origin, e);
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

/// Build the HTTP router.
pub fn router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Projects
        .route(
            "/api/v1/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/api/v1/projects/:id",
            get(projects::get_project)
                .patch(projects::rename_project)
                .delete(projects::delete_project),
        )
        // Groups
        .route(
            "/api/v1/projects/:id/groups",
            get(groups::list_groups).post(groups::create_group),
        )
        .route(
            "/api/v1/projects/:id/groups/:group_id",
            patch(groups::rename_group).delete(groups::delete_group),
        )
        // Tasks
        .route(
            "/api/v1/projects/:id/groups/:group_id/tasks",
            get(tasks::list_tasks),
        )
        .route("/api/v1/projects/:id/tasks", post(tasks::create_task))
        .route(
            "/api/v1/projects/:id/tasks/:task_id",
            patch(tasks::update_task).delete(tasks::delete_task),
        )
        .route(
            "/api/v1/projects/:id/tasks/:task_id/status",
            put(tasks::update_task_status),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV7))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}
