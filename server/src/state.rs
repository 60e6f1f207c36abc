//! Application state shared by every handler

use std::sync::Arc;

use bookman_core::{BookManager, Config, Result};

#[derive(Clone)]
pub struct AppState {
    manager: Arc<BookManager>,
}

impl AppState {
    pub fn new(manager: BookManager) -> Self {
        Self {
            manager: Arc::new(manager),
        }
    }

    /// Open the configured database and wrap it for the router.
    pub fn from_config(config: Config) -> Result<Self> {
        Ok(Self::new(BookManager::new(config)?))
    }

    pub fn manager(&self) -> &BookManager {
        &self.manager
    }
}
