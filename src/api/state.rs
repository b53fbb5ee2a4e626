//! Shared state handed to every handler

use std::sync::Arc;

use crate::config::Config;
use crate::storage::JsonStore;

/// Application state for the axum router. Cheap to clone; the config and
/// store are built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<JsonStore>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let store = JsonStore::new(config.data_dir.clone(), config.mirror_dir.clone());
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
        }
    }
}
