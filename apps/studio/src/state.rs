use std::sync::Arc;

use tokio::sync::Mutex;

use crate::errors::AppError;
use crate::logbridge::ChannelDisplay;
use crate::session::{page::PageRenderer, Controller};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The one session. The mutex serialises requests so at most one event runs at a time.
    pub controller: Arc<Mutex<Controller>>,
    /// Log Bridge display followed by `/logs/stream`.
    pub logs: Arc<ChannelDisplay>,
    pub pages: Arc<PageRenderer>,
}

impl AppState {
    pub fn new(controller: Controller, logs: Arc<ChannelDisplay>) -> Result<Self, AppError> {
        Ok(Self {
            controller: Arc::new(Mutex::new(controller)),
            logs,
            pages: Arc::new(PageRenderer::new()?),
        })
    }
}
