//! Event handling and view rendering for the single session.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::engine::{DraftOptions, EngineFactory, ResumeEngine};
use crate::errors::AppError;
use crate::folders::{self, FolderEntry};
use crate::logbridge::{LogBridge, LogDisplay, LogUpdate, SnapshotDisplay};
use crate::render::{
    display_pdf, download_action, generate_final_pdf, generate_preview_pdf, DownloadAction,
    PdfView,
};
use crate::session::{Event, Notice, Notices, Session, Stage};

pub const PREVIEW_HREF: &str = "/download/preview";
pub const FINAL_HREF: &str = "/download/final";

/// Everything the page shows, derived from session state after an event.
#[derive(Debug, Serialize)]
pub struct View {
    pub stage: Stage,
    pub data_root: String,
    pub folders: Vec<FolderEntry>,
    pub notices: Vec<Notice>,
    pub url: String,
    pub progress: Option<u8>,
    pub logs: Option<LogUpdate>,
    pub document_text: Option<String>,
    pub output_dir: String,
    pub preview: Option<PdfView>,
    pub final_download: Option<DownloadAction>,
}

pub struct Controller {
    session: Session,
    factory: Arc<dyn EngineFactory>,
    bridge: LogBridge,
    display: Arc<dyn LogDisplay>,
    data_root: PathBuf,
    preview_dir: PathBuf,
}

impl Controller {
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        bridge: LogBridge,
        display: Arc<dyn LogDisplay>,
        data_root: PathBuf,
        preview_dir: PathBuf,
    ) -> Self {
        Self {
            session: Session::default(),
            factory,
            bridge,
            display,
            data_root,
            preview_dir,
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Applies one event to the session. Failures become notices; nothing escapes.
    pub async fn dispatch(&mut self, event: Event) -> Notices {
        let mut notices = Notices::default();
        match event {
            Event::AnalyzeJob { url } => self.analyze(&url, &mut notices).await,
            Event::EditDocument { text } => self.edit(text, &mut notices).await,
            Event::SaveFinal { output_dir, text } => {
                self.save_final(&output_dir, text, &mut notices).await
            }
            Event::StartOver => self.start_over(),
            Event::ClearFolder { path } => self.clear_folder(&path, &mut notices),
            Event::ClearDataRoot => self.clear_data_root(&mut notices),
        }
        notices
    }

    async fn analyze(&mut self, url: &str, notices: &mut Notices) {
        if self.session.stage != Stage::Input {
            notices.warning("Start over to analyze a different job");
            return;
        }
        let url = url.trim();
        if url.is_empty() {
            notices.warning("Please enter a job URL");
            return;
        }

        self.session.url = url.to_string();
        self.session.progress = Some(0);
        self.session.logs = None;

        let snapshot = Arc::new(SnapshotDisplay::new(Arc::clone(&self.display)));
        let drafted = {
            let _bridge = self.bridge.attach(snapshot.clone());
            info!("Analyzing job posting {url}");
            self.draft(url).await
        };
        self.session.logs = snapshot.latest();

        let Some((engine, text)) = notices.report("Error", drafted) else {
            return;
        };

        self.session.engine = Some(engine);
        self.session.document_text = Some(text.clone());
        self.session.last_seen_text = None;
        self.session.progress = Some(100);
        self.session.stage = Stage::Review;
        notices.info("Draft ready for review");

        self.observe_edit(text, notices).await;
    }

    async fn draft(&mut self, url: &str) -> Result<(Box<dyn ResumeEngine>, String), AppError> {
        let mut engine = self.factory.create(url).await?;
        self.session.progress = Some(25);

        engine
            .create_draft_tailored_resume(DraftOptions::STUDIO)
            .await?;
        let text = tokio::fs::read_to_string(engine.yaml_loc()).await?;
        info!("Draft loaded from {}", engine.yaml_loc().display());
        Ok((engine, text))
    }

    async fn edit(&mut self, text: String, notices: &mut Notices) {
        if self.session.stage != Stage::Review {
            notices.warning("There is no resume under review");
            return;
        }
        self.session.document_text = Some(text.clone());
        self.observe_edit(text, notices).await;
    }

    /// Re-renders the preview when `text` differs from the last text seen.
    async fn observe_edit(&mut self, text: String, notices: &mut Notices) {
        if self.session.last_seen_text.as_deref() == Some(text.as_str()) {
            return;
        }
        self.session.last_seen_text = Some(text.clone());

        let Some(engine) = self.session.engine.as_deref_mut() else {
            notices.error("Preview generation error: no engine handle for this session");
            return;
        };
        let rendered = generate_preview_pdf(&text, engine, &self.preview_dir).await;
        if let Some(path) = notices.report("Preview generation error", rendered) {
            self.session.preview_path = Some(path);
            self.session.show_preview = true;
        }
    }

    async fn save_final(
        &mut self,
        output_dir: &str,
        text: Option<String>,
        notices: &mut Notices,
    ) {
        if self.session.stage != Stage::Review {
            notices.warning("There is no resume under review");
            return;
        }
        // The editor content counts as an edit even when only Save was pressed.
        if let Some(text) = text {
            self.session.document_text = Some(text.clone());
            self.observe_edit(text, notices).await;
        }
        let output_dir = output_dir.trim();
        if output_dir.is_empty() {
            notices.warning("Please specify an output directory");
            return;
        }
        self.session.output_dir = output_dir.to_string();

        let text = self.session.document_text.clone().unwrap_or_default();
        let Some(engine) = self.session.engine.as_deref_mut() else {
            notices.error("Final PDF generation error: no engine handle for this session");
            return;
        };
        let rendered = generate_final_pdf(&text, engine, Path::new(output_dir)).await;
        let Some(path) = notices.report("Final PDF generation error", rendered) else {
            return;
        };

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            notices.success(format!("PDF saved to: {}", path.display()));
            self.session.final_pdf = Some(path);
        } else {
            warn!("Engine reported {} but no file exists", path.display());
            notices.warning(format!("The renderer did not produce {}", path.display()));
        }
    }

    fn start_over(&mut self) {
        info!("Starting over");
        self.session = Session::default();
    }

    fn clear_folder(&mut self, path: &Path, notices: &mut Notices) {
        let context = format!("Error clearing folder {}", path.display());
        let cleared = folders::resolve_within(&self.data_root, path)
            .and_then(|resolved| folders::clear_folder(&resolved).map(|_| resolved));
        if let Some(resolved) = notices.report(context, cleared) {
            let root = self.data_root.canonicalize().unwrap_or_default();
            let relative = resolved.strip_prefix(&root).unwrap_or(&resolved);
            notices.success(format!("Cleared {}", relative.display()));
        }
    }

    fn clear_data_root(&mut self, notices: &mut Notices) {
        let cleared = folders::clear_root_data(&self.data_root);
        if notices.report("Error clearing data folder", cleared).is_some() {
            notices.success("Data folder cleared!");
        }
    }

    /// Reflects the session into a `View`. Render-time failures are added to `notices`.
    pub async fn render(&self, mut notices: Notices) -> View {
        let folders = notices
            .report(
                "Error preparing data folder",
                folders::ensure_root(&self.data_root),
            )
            .map(|_| folders::sidebar_entries(&self.data_root))
            .unwrap_or_default();

        let mut preview = None;
        let mut final_download = None;
        if self.session.stage == Stage::Review {
            if let Some(path) = self.session.preview_path.as_deref() {
                if self.session.show_preview {
                    match display_pdf(path, PREVIEW_HREF).await {
                        Ok(view) => preview = Some(view),
                        Err(e) => {
                            notices.error(format!("PDF display error: {e}"));
                            notices.error("Please try downloading the PDF to view it.");
                        }
                    }
                }
            }
            if let Some(path) = self.session.final_pdf.as_deref() {
                final_download = notices.report(
                    "Final PDF download error",
                    download_action(path, "Download PDF", FINAL_HREF).await,
                );
            }
        }

        View {
            stage: self.session.stage,
            data_root: self.data_root.display().to_string(),
            folders,
            notices: notices.into_vec(),
            url: self.session.url.clone(),
            progress: self.session.progress,
            logs: self.session.logs.clone(),
            document_text: self.session.document_text.clone(),
            output_dir: self.session.output_dir.clone(),
            preview,
            final_download,
        }
    }

    pub async fn preview_download(&self) -> Result<DownloadAction, AppError> {
        let path = self
            .session
            .preview_path
            .as_deref()
            .ok_or_else(|| AppError::NotFound("No preview has been rendered".to_string()))?;
        download_action(path, "📥 Download PDF", PREVIEW_HREF).await
    }

    pub async fn final_download(&self) -> Result<DownloadAction, AppError> {
        let path = self
            .session
            .final_pdf
            .as_deref()
            .ok_or_else(|| AppError::NotFound("No final PDF has been saved".to_string()))?;
        download_action(path, "Download PDF", FINAL_HREF).await
    }
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::engine::mock::MockEngineFactory;
    use crate::logbridge::testing::RecordingDisplay;
    use crate::render::document::Document;
    use crate::session::NoticeLevel;

    const JOB_URL: &str = "https://example.com/job/123";
    const DRAFT: &str = "name: Jane Doe\nediting: true\n";

    struct Harness {
        _dir: tempfile::TempDir,
        root: PathBuf,
        factory: MockEngineFactory,
        display: Arc<RecordingDisplay>,
        bridge: LogBridge,
        controller: Controller,
    }

    fn harness_with(configure: impl FnOnce(&mut MockEngineFactory)) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let mut factory = MockEngineFactory::new(&root, DRAFT);
        configure(&mut factory);
        let display = Arc::new(RecordingDisplay::default());
        let bridge = LogBridge::default();
        let controller = Controller::new(
            Arc::new(factory.clone()),
            bridge.clone(),
            display.clone(),
            root.join("data"),
            root.join("resume_preview"),
        );
        Harness {
            _dir: dir,
            root,
            factory,
            display,
            bridge,
            controller,
        }
    }

    fn harness() -> Harness {
        harness_with(|_| {})
    }

    fn levels(notices: &Notices) -> Vec<NoticeLevel> {
        notices.iter().map(|n| n.level).collect()
    }

    async fn analyze(h: &mut Harness) -> Notices {
        h.controller
            .dispatch(Event::AnalyzeJob {
                url: JOB_URL.to_string(),
            })
            .await
    }

    #[tokio::test]
    async fn test_empty_url_warns_and_keeps_input_stage() {
        let mut h = harness();

        for url in ["", "   "] {
            let notices = h
                .controller
                .dispatch(Event::AnalyzeJob {
                    url: url.to_string(),
                })
                .await;

            assert_eq!(levels(&notices), vec![NoticeLevel::Warning]);
            assert_eq!(h.controller.session().stage, Stage::Input);
        }
        assert!(h.factory.log.lock().unwrap().created_for.is_empty());
    }

    #[tokio::test]
    async fn test_analyze_enters_review_and_renders_preview() {
        let mut h = harness();

        let notices = analyze(&mut h).await;

        assert!(!levels(&notices).contains(&NoticeLevel::Error));
        let session = h.controller.session();
        assert_eq!(session.stage, Stage::Review);
        assert_eq!(session.document_text.as_deref(), Some(DRAFT));
        assert_eq!(session.last_seen_text.as_deref(), Some(DRAFT));
        assert_eq!(session.progress, Some(100));
        assert!(session.show_preview);

        {
            let log = h.factory.log.lock().unwrap();
            assert_eq!(log.created_for, vec![JOB_URL.to_string()]);
            assert_eq!(log.draft_options, vec![DraftOptions::STUDIO]);
        }
        assert_eq!(h.factory.render_count(), 1);
        let sidecar = Document::parse(&h.factory.last_sidecar().unwrap()).unwrap();
        assert_eq!(sidecar.editing(), Some(false));
        assert_eq!(
            sidecar.get("name").and_then(|v| v.as_str()),
            Some("Jane Doe")
        );

        let view = h.controller.render(Notices::default()).await;
        assert_eq!(view.stage, Stage::Review);
        assert_eq!(view.document_text.as_deref(), Some(DRAFT));
        let preview = view.preview.expect("preview is displayed");
        assert!(preview.data_uri.starts_with("data:application/pdf;base64,"));
        assert_eq!(preview.download.file_name, "resume.pdf");
    }

    #[tokio::test]
    async fn test_identical_text_does_not_rerender() {
        let mut h = harness();
        analyze(&mut h).await;
        assert_eq!(h.factory.render_count(), 1);

        h.controller
            .dispatch(Event::EditDocument {
                text: DRAFT.to_string(),
            })
            .await;
        assert_eq!(h.factory.render_count(), 1);

        let edited = "name: Jane Q. Doe\nediting: true\n".to_string();
        h.controller
            .dispatch(Event::EditDocument {
                text: edited.clone(),
            })
            .await;
        assert_eq!(h.factory.render_count(), 2);
        assert!(h.factory.last_sidecar().unwrap().contains("Jane Q. Doe"));

        h.controller
            .dispatch(Event::EditDocument { text: edited })
            .await;
        assert_eq!(h.factory.render_count(), 2);
    }

    #[tokio::test]
    async fn test_broken_edit_reports_error_and_keeps_last_preview() {
        let mut h = harness();
        analyze(&mut h).await;
        let preview = h.controller.session().preview_path.clone();

        let notices = h
            .controller
            .dispatch(Event::EditDocument {
                text: "name: [broken".to_string(),
            })
            .await;

        let messages: Vec<_> = notices.iter().map(|n| n.message.clone()).collect();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("Preview generation error: "));
        assert_eq!(h.controller.session().preview_path, preview);
        assert_eq!(
            h.controller.session().document_text.as_deref(),
            Some("name: [broken")
        );
    }

    #[tokio::test]
    async fn test_save_final_writes_pdf_and_offers_download() {
        let mut h = harness();
        analyze(&mut h).await;
        let output = h.root.join("output");

        let notices = h
            .controller
            .dispatch(Event::SaveFinal {
                output_dir: output.display().to_string(),
                text: None,
            })
            .await;

        let final_pdf = output.join("final_resume.pdf");
        assert!(final_pdf.exists());
        let success: Vec<_> = notices
            .iter()
            .filter(|n| n.level == NoticeLevel::Success)
            .collect();
        assert_eq!(success.len(), 1);
        assert_eq!(
            success[0].message,
            format!("PDF saved to: {}", final_pdf.display())
        );
        let sidecar = std::fs::read_to_string(output.join("final_resume.yaml")).unwrap();
        assert_eq!(Document::parse(&sidecar).unwrap().editing(), Some(false));

        let view = h.controller.render(Notices::default()).await;
        let download = view.final_download.expect("download offered");
        assert_eq!(download.label, "Download PDF");
        assert_eq!(download.file_name, "resume.pdf");
        assert!(view.preview.is_some());

        let served = h.controller.final_download().await.unwrap();
        assert_eq!(served.bytes, crate::engine::mock::MOCK_PDF);
    }

    #[tokio::test]
    async fn test_save_final_uses_editor_text() {
        let mut h = harness();
        analyze(&mut h).await;
        let output = h.root.join("output");
        let edited = "name: Edited On Screen\nediting: true\n";

        let notices = h
            .controller
            .dispatch(Event::SaveFinal {
                output_dir: output.display().to_string(),
                text: Some(edited.to_string()),
            })
            .await;

        assert!(!levels(&notices).contains(&NoticeLevel::Error));
        let sidecar =
            Document::parse(&std::fs::read_to_string(output.join("final_resume.yaml")).unwrap())
                .unwrap();
        assert_eq!(
            sidecar.get("name").and_then(|v| v.as_str()),
            Some("Edited On Screen")
        );
        assert_eq!(sidecar.editing(), Some(false));

        let session = h.controller.session();
        assert_eq!(session.document_text.as_deref(), Some(edited));
        assert_eq!(session.last_seen_text.as_deref(), Some(edited));
        // Initial preview, preview of the edit, final render.
        assert_eq!(h.factory.render_count(), 3);

        let view = h.controller.render(Notices::default()).await;
        assert_eq!(view.document_text.as_deref(), Some(edited));
    }

    #[tokio::test]
    async fn test_save_final_with_unchanged_text_skips_preview() {
        let mut h = harness();
        analyze(&mut h).await;

        h.controller
            .dispatch(Event::SaveFinal {
                output_dir: h.root.join("output").display().to_string(),
                text: Some(DRAFT.to_string()),
            })
            .await;

        assert_eq!(h.factory.render_count(), 2);
        assert!(h.controller.session().final_pdf.is_some());
    }

    #[tokio::test]
    async fn test_save_without_directory_still_keeps_editor_text() {
        let mut h = harness();
        analyze(&mut h).await;
        let edited = "name: Jane Q. Doe\nediting: true\n";

        let notices = h
            .controller
            .dispatch(Event::SaveFinal {
                output_dir: String::new(),
                text: Some(edited.to_string()),
            })
            .await;

        assert_eq!(levels(&notices), vec![NoticeLevel::Warning]);
        assert_eq!(h.controller.session().document_text.as_deref(), Some(edited));
        assert!(h.controller.session().final_pdf.is_none());
    }

    #[tokio::test]
    async fn test_engine_construction_failure_keeps_progress_at_zero() {
        let mut h = harness_with(|f| f.fail_create = true);

        let notices = analyze(&mut h).await;

        let all: Vec<_> = notices.iter().collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].level, NoticeLevel::Error);
        assert!(all[0].message.starts_with("Error: "));
        let session = h.controller.session();
        assert_eq!(session.stage, Stage::Input);
        assert_eq!(session.progress, Some(0));
        assert!(session.engine.is_none());
        assert!(!h.bridge.is_attached());
        assert_eq!(h.factory.render_count(), 0);
    }

    #[tokio::test]
    async fn test_save_without_directory_warns() {
        let mut h = harness();
        analyze(&mut h).await;

        let notices = h
            .controller
            .dispatch(Event::SaveFinal {
                output_dir: "  ".to_string(),
                text: None,
            })
            .await;

        assert_eq!(levels(&notices), vec![NoticeLevel::Warning]);
        assert!(h.controller.session().final_pdf.is_none());
    }

    #[tokio::test]
    async fn test_review_actions_are_ignored_in_input_stage() {
        let mut h = harness();

        let edit = h
            .controller
            .dispatch(Event::EditDocument {
                text: DRAFT.to_string(),
            })
            .await;
        let save = h
            .controller
            .dispatch(Event::SaveFinal {
                output_dir: h.root.display().to_string(),
                text: None,
            })
            .await;

        assert_eq!(levels(&edit), vec![NoticeLevel::Warning]);
        assert_eq!(levels(&save), vec![NoticeLevel::Warning]);
        assert_eq!(h.factory.render_count(), 0);
    }

    #[tokio::test]
    async fn test_start_over_discards_document_state() {
        let mut h = harness();
        analyze(&mut h).await;

        h.controller.dispatch(Event::StartOver).await;

        let session = h.controller.session();
        assert_eq!(session.stage, Stage::Input);
        assert!(session.engine.is_none());
        assert!(session.document_text.is_none());
        assert!(session.last_seen_text.is_none());
        assert!(session.preview_path.is_none());

        let view = h.controller.render(Notices::default()).await;
        assert!(view.preview.is_none());
        assert!(view.document_text.is_none());
        assert!(h.controller.preview_download().await.is_err());
    }

    #[tokio::test]
    async fn test_engine_failure_is_reported_and_bridge_detached() {
        let mut h = harness_with(|f| f.fail_draft = true);

        let notices = analyze(&mut h).await;

        let all: Vec<_> = notices.iter().collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].level, NoticeLevel::Error);
        assert!(all[0].message.starts_with("Error: "));
        assert_eq!(h.controller.session().stage, Stage::Input);
        assert_eq!(h.controller.session().progress, Some(25));
        assert!(!h.bridge.is_attached());
    }

    #[tokio::test]
    async fn test_analysis_logs_stream_to_display_until_detached() {
        let mut h = harness();
        let subscriber = tracing_subscriber::registry().with(h.bridge.layer());
        let _default = tracing::subscriber::set_default(subscriber);

        analyze(&mut h).await;
        info!("unrelated record after analysis");

        let updates = h.display.updates();
        assert!(updates.len() >= 3);
        for (i, update) in updates.iter().enumerate() {
            assert_eq!(update.key, i as u64 + 1);
            assert_eq!(update.text.lines().count(), i + 1);
        }
        let last = &updates.last().unwrap().text;
        assert!(last.contains("Mock engine drafting resume"));
        assert!(!last.contains("Rendered"));
        assert!(!last.contains("unrelated record"));
        assert!(!h.bridge.is_attached());
        assert_eq!(h.controller.session().logs.as_ref(), updates.last());
    }

    #[tokio::test]
    async fn test_clear_folder_inside_root() {
        let mut h = harness();
        let job = h.root.join("data/example_com_job_123");
        std::fs::create_dir_all(&job).unwrap();
        std::fs::write(job.join("resume.yaml"), DRAFT).unwrap();

        let notices = h
            .controller
            .dispatch(Event::ClearFolder { path: job.clone() })
            .await;

        assert_eq!(levels(&notices), vec![NoticeLevel::Success]);
        assert!(job.is_dir());
        assert_eq!(std::fs::read_dir(&job).unwrap().count(), 0);

        let view = h.controller.render(Notices::default()).await;
        assert_eq!(view.folders.len(), 1);
        assert_eq!(view.folders[0].relative, "example_com_job_123");
    }

    #[tokio::test]
    async fn test_clear_folder_outside_root_is_refused() {
        let mut h = harness();
        std::fs::create_dir_all(h.root.join("data")).unwrap();
        let outside = h.root.join("resume_preview");
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join("keep.pdf"), b"%PDF").unwrap();

        let notices = h
            .controller
            .dispatch(Event::ClearFolder {
                path: outside.clone(),
            })
            .await;

        assert_eq!(levels(&notices), vec![NoticeLevel::Error]);
        assert!(outside.join("keep.pdf").exists());
    }

    #[tokio::test]
    async fn test_clear_data_root_recreates_it() {
        let mut h = harness();
        std::fs::create_dir_all(h.root.join("data/a/b")).unwrap();

        let notices = h.controller.dispatch(Event::ClearDataRoot).await;

        assert_eq!(levels(&notices), vec![NoticeLevel::Success]);
        assert!(h.root.join("data").is_dir());
        assert!(h.controller.render(Notices::default()).await.folders.is_empty());
    }

    #[tokio::test]
    async fn test_missing_preview_file_reports_display_error() {
        let mut h = harness();
        analyze(&mut h).await;
        std::fs::remove_file(h.controller.session().preview_path.clone().unwrap()).unwrap();

        let view = h.controller.render(Notices::default()).await;

        assert!(view.preview.is_none());
        let messages: Vec<_> = view.notices.iter().map(|n| n.message.as_str()).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("PDF display error: "));
        assert_eq!(messages[1], "Please try downloading the PDF to view it.");
    }
}
