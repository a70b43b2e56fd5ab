//! In-memory engine used by tests. Records every render and the sidecar it saw.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{DraftOptions, EngineError, EngineFactory, ResumeEngine};

pub const MOCK_PDF: &[u8] = b"%PDF-1.4\n% mock resume\n%%EOF\n";

/// What the mock engine observed, shared between the factory, its handles and the test.
#[derive(Debug, Default)]
pub struct MockLog {
    pub created_for: Vec<String>,
    pub draft_options: Vec<DraftOptions>,
    /// Sidecar contents read at each `create_pdf` call.
    pub rendered_sidecars: Vec<String>,
    pub rendered_pdfs: Vec<PathBuf>,
}

#[derive(Clone)]
pub struct MockEngineFactory {
    pub workdir: PathBuf,
    pub draft_yaml: String,
    pub fail_create: bool,
    pub fail_draft: bool,
    pub fail_render: bool,
    pub log: Arc<Mutex<MockLog>>,
}

impl MockEngineFactory {
    pub fn new(workdir: impl Into<PathBuf>, draft_yaml: &str) -> Self {
        Self {
            workdir: workdir.into(),
            draft_yaml: draft_yaml.to_string(),
            fail_create: false,
            fail_draft: false,
            fail_render: false,
            log: Arc::new(Mutex::new(MockLog::default())),
        }
    }

    pub fn render_count(&self) -> usize {
        self.log.lock().unwrap().rendered_pdfs.len()
    }

    pub fn last_sidecar(&self) -> Option<String> {
        self.log.lock().unwrap().rendered_sidecars.last().cloned()
    }

    /// A handle that is not tied to any job URL, for direct materializer tests.
    pub fn engine(&self) -> MockEngine {
        MockEngine {
            yaml_loc: self.workdir.join("draft.yaml"),
            pdf_loc: self.workdir.join("draft.pdf"),
            draft_yaml: self.draft_yaml.clone(),
            fail_draft: self.fail_draft,
            fail_render: self.fail_render,
            log: Arc::clone(&self.log),
        }
    }
}

#[async_trait]
impl EngineFactory for MockEngineFactory {
    async fn create(&self, job_url: &str) -> Result<Box<dyn ResumeEngine>, EngineError> {
        if self.fail_create {
            return Err(EngineError::InvalidUrl {
                url: job_url.to_string(),
                reason: "mock refused".to_string(),
            });
        }
        tracing::info!("Mock engine created for {job_url}");
        self.log.lock().unwrap().created_for.push(job_url.to_string());
        Ok(Box::new(self.engine()))
    }
}

pub struct MockEngine {
    yaml_loc: PathBuf,
    pdf_loc: PathBuf,
    draft_yaml: String,
    fail_draft: bool,
    fail_render: bool,
    log: Arc<Mutex<MockLog>>,
}

#[async_trait]
impl ResumeEngine for MockEngine {
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
        self.log.lock().unwrap().draft_options.push(options);
        tracing::info!("Mock engine parsing job posting");
        if self.fail_draft {
            tracing::error!("Mock engine failed to draft");
            return Err(EngineError::Api {
                status: 502,
                message: "mock draft failure".to_string(),
            });
        }
        tracing::info!("Mock engine drafting resume");
        tokio::fs::write(&self.yaml_loc, &self.draft_yaml)
            .await
            .map_err(|source| EngineError::Io {
                path: self.yaml_loc.clone(),
                source,
            })?;
        Ok(())
    }

    async fn create_pdf(&mut self, _auto_open: bool) -> Result<PathBuf, EngineError> {
        if self.fail_render {
            return Err(EngineError::Render("mock render failure".to_string()));
        }
        let sidecar = tokio::fs::read_to_string(&self.yaml_loc)
            .await
            .map_err(|source| EngineError::Io {
                path: self.yaml_loc.clone(),
                source,
            })?;
        tokio::fs::write(&self.pdf_loc, MOCK_PDF)
            .await
            .map_err(|source| EngineError::Io {
                path: self.pdf_loc.clone(),
                source,
            })?;

        let mut log = self.log.lock().unwrap();
        log.rendered_sidecars.push(sidecar);
        log.rendered_pdfs.push(self.pdf_loc.clone());
        Ok(self.pdf_loc.clone())
    }
}
