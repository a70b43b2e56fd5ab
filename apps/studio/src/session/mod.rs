// Session controller: a two-stage flow (input → review) driven by explicit events.
// Each request dispatches at most one `Event` against the single `Session`, then
// renders a `View` from the resulting state.

pub mod controller;
pub mod handlers;
pub mod page;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::engine::ResumeEngine;
use crate::errors::AppError;
use crate::logbridge::LogUpdate;

pub use controller::{Controller, View};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Input,
    Review,
}

/// A single user action.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    AnalyzeJob { url: String },
    EditDocument { text: String },
    /// `text` is the editor content at the time of saving, when the client sends it.
    SaveFinal {
        output_dir: String,
        #[serde(default)]
        text: Option<String>,
    },
    StartOver,
    ClearFolder { path: PathBuf },
    ClearDataRoot,
}

/// In-memory state for the one active session. Nothing here survives a restart.
#[derive(Default)]
pub struct Session {
    pub stage: Stage,
    pub url: String,
    pub progress: Option<u8>,
    pub logs: Option<LogUpdate>,
    pub document_text: Option<String>,
    /// Last text a preview was rendered for; gates redundant renders.
    pub last_seen_text: Option<String>,
    pub engine: Option<Box<dyn ResumeEngine>>,
    pub preview_path: Option<PathBuf>,
    pub show_preview: bool,
    pub output_dir: String,
    pub final_pdf: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// User-visible messages collected while handling one event and rendering.
#[derive(Debug, Default)]
pub struct Notices(Vec<Notice>);

impl Notices {
    fn push(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.0.push(Notice {
            level,
            message: message.into(),
        });
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Info, message);
    }

    pub fn warning(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(NoticeLevel::Error, message);
    }

    /// Unwraps `result`, or logs it and records `"<context>: <error>"` as an error notice.
    pub fn report<T>(&mut self, context: impl fmt::Display, result: Result<T, AppError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                error!("{context}: {e}");
                self.error(format!("{context}: {e}"));
                None
            }
        }
    }

    #[cfg(test)]
    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<Notice> {
        self.0
    }
}
