//! Writes an edited document as a sidecar and has the engine render it.
//!
//! Preview and final save share one protocol and differ only in where the
//! sidecar and PDF land. Both retarget the engine handle's `yaml_loc` and
//! `pdf_loc` before rendering.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::engine::ResumeEngine;
use crate::errors::AppError;
use crate::render::document::finalize_sidecar;

/// Where a render writes its sidecar and PDF.
#[derive(Debug, Clone, Copy)]
pub enum RenderTarget<'a> {
    /// Fixed scratch directory, overwritten on every edit.
    Preview(&'a Path),
    /// User-chosen output directory, kept.
    Final(&'a Path),
}

impl RenderTarget<'_> {
    fn dir(&self) -> &Path {
        match self {
            RenderTarget::Preview(dir) | RenderTarget::Final(dir) => dir,
        }
    }

    pub fn yaml_path(&self) -> PathBuf {
        match self {
            RenderTarget::Preview(dir) => dir.join("temp_resume.yaml"),
            RenderTarget::Final(dir) => dir.join("final_resume.yaml"),
        }
    }

    pub fn pdf_path(&self) -> PathBuf {
        match self {
            RenderTarget::Preview(dir) => dir.join("preview_resume.pdf"),
            RenderTarget::Final(dir) => dir.join("final_resume.pdf"),
        }
    }
}

/// Runs the sidecar-and-render protocol against `target`. Returns the PDF path
/// reported by the engine.
pub async fn materialize(
    text: &str,
    engine: &mut dyn ResumeEngine,
    target: RenderTarget<'_>,
) -> Result<PathBuf, AppError> {
    tokio::fs::create_dir_all(target.dir()).await?;

    let sidecar = finalize_sidecar(text)?;
    let yaml_path = target.yaml_path();
    tokio::fs::write(&yaml_path, sidecar).await?;

    engine.set_yaml_loc(yaml_path);
    engine.set_pdf_loc(target.pdf_path());

    let pdf = engine.create_pdf(false).await?;
    info!("Rendered {}", pdf.display());
    Ok(pdf)
}

pub async fn generate_preview_pdf(
    text: &str,
    engine: &mut dyn ResumeEngine,
    preview_dir: &Path,
) -> Result<PathBuf, AppError> {
    materialize(text, engine, RenderTarget::Preview(preview_dir)).await
}

pub async fn generate_final_pdf(
    text: &str,
    engine: &mut dyn ResumeEngine,
    output_dir: &Path,
) -> Result<PathBuf, AppError> {
    materialize(text, engine, RenderTarget::Final(output_dir)).await
}
