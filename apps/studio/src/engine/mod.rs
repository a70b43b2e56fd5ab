//! Resume engine seam — the external collaborator that drafts and typesets resumes.
//!
//! The studio never tailors content itself. It constructs an engine handle from a
//! job URL, asks it for a draft, and later points the handle at edited sidecars
//! and asks it to render them. `HttpEngine` is the shipped backend; tests use
//! `mock::MockEngine`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

pub mod http;
#[cfg(test)]
pub mod mock;

pub use http::HttpEngineFactory;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid job URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Render failed: {0}")]
    Render(String),
}

/// Flags forwarded to draft creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DraftOptions {
    pub auto_open: bool,
    pub manual_review: bool,
    pub skip_pdf_create: bool,
}

impl DraftOptions {
    /// Draft only: no viewer, no interactive review, no PDF. The studio does
    /// its own review and previewing.
    pub const STUDIO: DraftOptions = DraftOptions {
        auto_open: false,
        manual_review: false,
        skip_pdf_create: true,
    };
}

/// A live engine handle for one job posting.
///
/// `yaml_loc` is where the engine reads (and drafts) the resume document;
/// `pdf_loc` is where `create_pdf` writes. Callers retarget both before every
/// render and must not render concurrently on one handle.
#[async_trait]
pub trait ResumeEngine: Send + Sync {
    fn yaml_loc(&self) -> &Path;

    fn pdf_loc(&self) -> &Path;

    fn set_yaml_loc(&mut self, path: PathBuf);

    fn set_pdf_loc(&mut self, path: PathBuf);

    /// Drafts a tailored resume and writes it to `yaml_loc`.
    async fn create_draft_tailored_resume(&mut self, options: DraftOptions)
        -> Result<(), EngineError>;

    /// Renders `yaml_loc` into `pdf_loc` and returns the PDF path.
    async fn create_pdf(&mut self, auto_open: bool) -> Result<PathBuf, EngineError>;
}

/// Constructs engine handles from job-posting URLs.
#[async_trait]
pub trait EngineFactory: Send + Sync {
    async fn create(&self, job_url: &str) -> Result<Box<dyn ResumeEngine>, EngineError>;
}
