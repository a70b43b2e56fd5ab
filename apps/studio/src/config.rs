use std::path::PathBuf;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Startup fails if `ENGINE_URL` is missing or a numeric value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote resume-tailoring engine.
    pub engine_url: String,
    pub engine_timeout_secs: u64,
    /// Root of the folders shown (and cleared) in the sidebar.
    pub data_path: PathBuf,
    /// Fixed location for preview sidecars and PDFs, shared machine-wide.
    pub preview_dir: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let engine_url = lookup("ENGINE_URL")
            .filter(|v| !v.trim().is_empty())
            .context("Required environment variable 'ENGINE_URL' is not set")?;

        Ok(Config {
            engine_url: engine_url.trim_end_matches('/').to_string(),
            engine_timeout_secs: lookup("ENGINE_TIMEOUT_SECS")
                .unwrap_or_else(|| "300".to_string())
                .parse::<u64>()
                .context("ENGINE_TIMEOUT_SECS must be a whole number of seconds")?,
            data_path: lookup("DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            preview_dir: lookup("PREVIEW_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join("resume_preview")),
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}
