// PDF materialization and viewing.
// All typesetting happens in the engine; this module only prepares its input
// (an `editing: false` sidecar) and presents its output.

pub mod document;
pub mod materializer;
pub mod viewer;

pub use materializer::{generate_final_pdf, generate_preview_pdf};
pub use viewer::{display_pdf, download_action, DownloadAction, PdfView};
