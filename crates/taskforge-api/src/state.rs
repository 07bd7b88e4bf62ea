use std::sync::Arc;

use crate::services::{BoardService, ProvisioningService};

/// Shared application state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub provisioning: Arc<ProvisioningService>,
    pub board: Arc<BoardService>,
}

impl AppState {
    pub fn new(provisioning: ProvisioningService, board: BoardService) -> Self {
        Self {
            provisioning: Arc::new(provisioning),
            board: Arc::new(board),
        }
    }
}
