//! Axum route handlers for the studio page and its JSON mirror.
//!
//! Every handler runs one step of the event loop: lock the controller, dispatch
//! the request's event (if any), render the resulting view.

use std::path::PathBuf;

use axum::{
    extract::State,
    response::{
        sse::{Event as SseEvent, KeepAlive, Sse},
        Html,
    },
    Form, Json,
};
use serde::Deserialize;
use tokio_stream::{Stream, StreamExt};

use crate::errors::AppError;
use crate::render::DownloadAction;
use crate::session::{Event, Notices, View};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Form payloads
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AnalyzeForm {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct DocumentForm {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveForm {
    #[serde(default)]
    pub output_dir: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ClearFolderForm {
    pub path: PathBuf,
}

// ────────────────────────────────────────────────────────────────────────────
// Event loop step
// ────────────────────────────────────────────────────────────────────────────

// Browsers submit textarea line breaks as CRLF.
fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}

async fn step(state: &AppState, event: Option<Event>) -> View {
    let mut controller = state.controller.lock().await;
    let notices = match event {
        Some(event) => controller.dispatch(event).await,
        None => Notices::default(),
    };
    controller.render(notices).await
}

async fn page(state: &AppState, event: Option<Event>) -> Result<Html<String>, AppError> {
    let view = step(state, event).await;
    Ok(Html(state.pages.render(&view)?))
}

// ────────────────────────────────────────────────────────────────────────────
// HTML handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /
pub async fn handle_index(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    page(&state, None).await
}

/// POST /analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Form(form): Form<AnalyzeForm>,
) -> Result<Html<String>, AppError> {
    page(&state, Some(Event::AnalyzeJob { url: form.url })).await
}

/// POST /document
pub async fn handle_edit_document(
    State(state): State<AppState>,
    Form(form): Form<DocumentForm>,
) -> Result<Html<String>, AppError> {
    let text = normalize_newlines(&form.text);
    page(&state, Some(Event::EditDocument { text })).await
}

/// POST /save
pub async fn handle_save_final(
    State(state): State<AppState>,
    Form(form): Form<SaveForm>,
) -> Result<Html<String>, AppError> {
    page(
        &state,
        Some(Event::SaveFinal {
            output_dir: form.output_dir,
            text: form.text.as_deref().map(normalize_newlines),
        }),
    )
    .await
}

/// POST /start-over
pub async fn handle_start_over(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    page(&state, Some(Event::StartOver)).await
}

/// POST /folders/clear
pub async fn handle_clear_folder(
    State(state): State<AppState>,
    Form(form): Form<ClearFolderForm>,
) -> Result<Html<String>, AppError> {
    page(&state, Some(Event::ClearFolder { path: form.path })).await
}

/// POST /folders/clear-all
pub async fn handle_clear_data_root(
    State(state): State<AppState>,
) -> Result<Html<String>, AppError> {
    page(&state, Some(Event::ClearDataRoot)).await
}

// ────────────────────────────────────────────────────────────────────────────
// JSON, downloads, log stream
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/view
pub async fn handle_get_view(State(state): State<AppState>) -> Json<View> {
    Json(step(&state, None).await)
}

/// POST /api/v1/events
pub async fn handle_event(State(state): State<AppState>, Json(event): Json<Event>) -> Json<View> {
    Json(step(&state, Some(event)).await)
}

/// GET /download/preview
pub async fn handle_download_preview(
    State(state): State<AppState>,
) -> Result<DownloadAction, AppError> {
    state.controller.lock().await.preview_download().await
}

/// GET /download/final
pub async fn handle_download_final(
    State(state): State<AppState>,
) -> Result<DownloadAction, AppError> {
    state.controller.lock().await.final_download().await
}

/// GET /logs/stream
///
/// Follows the Log Bridge display. Does not take the controller lock, so it keeps
/// streaming while an analysis holds it.
pub async fn handle_log_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<SseEvent, axum::Error>>> {
    let updates = state.logs.changes().map(|update| {
        SseEvent::default()
            .id(update.key.to_string())
            .json_data(&update)
    });
    Sse::new(updates).keep_alive(KeepAlive::default())
}
