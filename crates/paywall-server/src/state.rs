//! Application State

use std::path::PathBuf;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Directory the bundle is served from
    pub dist_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(dist_dir: impl Into<PathBuf>) -> Self {
        Self {
            dist_dir: Arc::new(dist_dir.into()),
        }
    }
}
