//! HTTP client for a remote resume-tailoring engine.
//!
//! Wire contract:
//! - `POST {base}/v1/drafts` with `{job_url, manual_review, skip_pdf_create}` → `{yaml}`
//! - `POST {base}/v1/render` with the YAML document as body → PDF bytes
//!
//! Single attempt per call. Failures surface to the user, who re-triggers the action.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use super::{DraftOptions, EngineError, EngineFactory, ResumeEngine};

const DRAFT_FILE: &str = "resume.yaml";
const PDF_FILE: &str = "resume.pdf";

#[derive(Debug, Serialize)]
struct DraftRequest<'a> {
    job_url: &'a str,
    manual_review: bool,
    skip_pdf_create: bool,
}

#[derive(Debug, Deserialize)]
struct DraftResponse {
    yaml: String,
}

#[derive(Debug, Deserialize)]
struct EngineErrorBody {
    error: EngineErrorMessage,
}

#[derive(Debug, Deserialize)]
struct EngineErrorMessage {
    message: String,
}

/// Builds `HttpEngine` handles that share one connection pool.
#[derive(Clone)]
pub struct HttpEngineFactory {
    client: Client,
    base_url: String,
    data_root: PathBuf,
}

impl HttpEngineFactory {
    pub fn new(
        base_url: impl Into<String>,
        data_root: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Result<Self, EngineError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            data_root: data_root.into(),
        })
    }
}

#[async_trait]
impl EngineFactory for HttpEngineFactory {
    async fn create(&self, job_url: &str) -> Result<Box<dyn ResumeEngine>, EngineError> {
        let parsed = parse_job_url(job_url)?;
        let workdir = self.data_root.join(job_slug(&parsed));

        info!("Engine handle created for {parsed} (workdir {})", workdir.display());

        Ok(Box::new(HttpEngine {
            client: self.client.clone(),
            base_url: self.base_url.clone(),
            job_url: parsed.to_string(),
            yaml_loc: workdir.join(DRAFT_FILE),
            pdf_loc: workdir.join(PDF_FILE),
        }))
    }
}

pub struct HttpEngine {
    client: Client,
    base_url: String,
    job_url: String,
    yaml_loc: PathBuf,
    pdf_loc: PathBuf,
}

impl HttpEngine {
    async fn check(response: reqwest::Response) -> Result<reqwest::Response, EngineError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<EngineErrorBody>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        warn!("Engine returned {status}: {message}");

        Err(EngineError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ResumeEngine for HttpEngine {
    fn yaml_loc(&self) -> &Path {
        &self.yaml_loc
    }

    fn pdf_loc(&self) -> &Path {
        &self.pdf_loc
    }

    fn set_yaml_loc(&mut self, path: PathBuf) {
        self.yaml_loc = path;
    }

    fn set_pdf_loc(&mut self, path: PathBuf) {
        self.pdf_loc = path;
    }

    async fn create_draft_tailored_resume(
        &mut self,
        options: DraftOptions,
    ) -> Result<(), EngineError> {
        info!("Requesting tailored draft for {}", self.job_url);

        let response = self
            .client
            .post(format!("{}/v1/drafts", self.base_url))
            .json(&DraftRequest {
                job_url: &self.job_url,
                manual_review: options.manual_review,
                skip_pdf_create: options.skip_pdf_create,
            })
            .send()
            .await?;
        let draft: DraftResponse = Self::check(response).await?.json().await?;

        write_file(&self.yaml_loc, draft.yaml.as_bytes()).await?;
        info!("Draft written to {}", self.yaml_loc.display());

        if !options.skip_pdf_create {
            self.create_pdf(options.auto_open).await?;
        }
        Ok(())
    }

    async fn create_pdf(&mut self, auto_open: bool) -> Result<PathBuf, EngineError> {
        if auto_open {
            warn!("auto_open is not supported by the remote engine; ignoring");
        }

        let document = tokio::fs::read(&self.yaml_loc)
            .await
            .map_err(|source| EngineError::Io {
                path: self.yaml_loc.clone(),
                source,
            })?;

        let response = self
            .client
            .post(format!("{}/v1/render", self.base_url))
            .header("content-type", "application/yaml")
            .body(document)
            .send()
            .await?;
        let pdf = Self::check(response).await?.bytes().await?;
        if pdf.is_empty() {
            return Err(EngineError::Render("engine returned an empty PDF".to_string()));
        }

        write_file(&self.pdf_loc, &pdf).await?;
        debug!("Rendered {} bytes to {}", pdf.len(), self.pdf_loc.display());

        Ok(self.pdf_loc.clone())
    }
}

async fn write_file(path: &Path, contents: &[u8]) -> Result<(), EngineError> {
    let io_err = |source| EngineError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    tokio::fs::write(path, contents).await.map_err(io_err)
}

fn parse_job_url(raw: &str) -> Result<Url, EngineError> {
    let invalid = |reason: &str| EngineError::InvalidUrl {
        url: raw.to_string(),
        reason: reason.to_string(),
    };

    let url = Url::parse(raw.trim()).map_err(|e| invalid(&e.to_string()))?;
    match url.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(&format!("unsupported scheme '{other}'"))),
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host"));
    }
    Ok(url)
}

/// Folder name for a job posting: host plus path, non-alphanumerics as `_`.
fn job_slug(url: &Url) -> String {
    let raw = format!(
        "{}{}",
        url.host_str().unwrap_or_default(),
        url.path().trim_end_matches('/')
    );
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
