//! Service layer for business logic.

pub mod board_service;
pub mod provisioning_service;
pub mod shadow_sync;

pub use board_service::BoardService;
pub use provisioning_service::ProvisioningService;
pub use shadow_sync::{RetryPolicy, ShadowIndexer};
