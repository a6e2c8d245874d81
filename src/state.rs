//! Shared application state for all routes.

use crate::store::Storage;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
}

impl AppState {
    pub fn new<S: Storage + 'static>(storage: S) -> Self {
        AppState {
            storage: Arc::new(storage),
        }
    }
}
