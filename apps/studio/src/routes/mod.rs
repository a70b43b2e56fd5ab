pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Page
        .route("/", get(handlers::handle_index))
        .route("/analyze", post(handlers::handle_analyze))
        .route("/document", post(handlers::handle_edit_document))
        .route("/save", post(handlers::handle_save_final))
        .route("/start-over", post(handlers::handle_start_over))
        .route("/folders/clear", post(handlers::handle_clear_folder))
        .route("/folders/clear-all", post(handlers::handle_clear_data_root))
        // JSON mirror
        .route("/api/v1/view", get(handlers::handle_get_view))
        .route("/api/v1/events", post(handlers::handle_event))
        // Artifacts and logs
        .route("/download/preview", get(handlers::handle_download_preview))
        .route("/download/final", get(handlers::handle_download_final))
        .route("/logs/stream", get(handlers::handle_log_stream))
        .with_state(state)
}
