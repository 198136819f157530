use std::sync::Arc;

use anisync_core::Daemon;

/// Shared application state
pub struct AppState {
    daemon: Arc<Daemon>,
}

impl AppState {
    pub fn new(daemon: Arc<Daemon>) -> Self {
        Self { daemon }
    }

    pub fn daemon(&self) -> &Daemon {
        self.daemon.as_ref()
    }
}
