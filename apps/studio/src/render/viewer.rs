//! Inline PDF viewing and download actions.

use std::path::Path;

use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Serialize;

use crate::errors::AppError;

pub const PDF_MIME: &str = "application/pdf";
pub const DOWNLOAD_FILE_NAME: &str = "resume.pdf";

/// A labelled download offering a file's bytes.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadAction {
    pub label: String,
    pub file_name: String,
    pub mime: String,
    /// Route that serves the bytes.
    pub href: String,
    pub size: usize,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl IntoResponse for DownloadAction {
    fn into_response(self) -> Response {
        (
            [
                (header::CONTENT_TYPE, self.mime),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", self.file_name),
                ),
            ],
            self.bytes,
        )
            .into_response()
    }
}

/// An embedded viewer for a rendered PDF.
#[derive(Debug, Clone, Serialize)]
pub struct PdfView {
    /// `data:application/pdf;base64,...`
    pub data_uri: String,
    pub download: DownloadAction,
}

/// Reads `path` into a download action.
pub async fn download_action(
    path: &Path,
    label: &str,
    href: &str,
) -> Result<DownloadAction, AppError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(DownloadAction {
        label: label.to_string(),
        file_name: DOWNLOAD_FILE_NAME.to_string(),
        mime: PDF_MIME.to_string(),
        href: href.to_string(),
        size: bytes.len(),
        bytes,
    })
}

/// Builds an inline viewer plus a download action for the PDF at `path`.
pub async fn display_pdf(path: &Path, href: &str) -> Result<PdfView, AppError> {
    let download = download_action(path, "📥 Download PDF", href).await?;
    let data_uri = format!("data:{PDF_MIME};base64,{}", STANDARD.encode(&download.bytes));
    Ok(PdfView { data_uri, download })
}
