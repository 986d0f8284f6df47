//! Shared application state for all routes.

use crate::service::EntityService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EntityService>,
}

impl AppState {
    pub fn new(service: EntityService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}
