//! Folder management for the data root shown in the sidebar.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::info;
use walkdir::WalkDir;

use crate::errors::AppError;

/// One sidebar row.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FolderEntry {
    pub path: PathBuf,
    /// Path relative to the data root, `/`-separated.
    pub relative: String,
    /// Nesting below the root; top-level folders are 0.
    pub depth: usize,
}

/// Every directory below `root`, recursively, sorted. Empty if `root` is absent.
pub fn list_subfolders(root: &Path) -> Vec<PathBuf> {
    let mut folders: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_dir())
        .map(|entry| entry.into_path())
        .collect();
    folders.sort();
    folders
}

pub fn sidebar_entries(root: &Path) -> Vec<FolderEntry> {
    list_subfolders(root)
        .into_iter()
        .filter_map(|path| {
            let relative = path.strip_prefix(root).ok()?;
            let parts: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            Some(FolderEntry {
                depth: parts.len().saturating_sub(1),
                relative: parts.join("/"),
                path,
            })
        })
        .collect()
}

pub fn ensure_root(root: &Path) -> Result<(), AppError> {
    fs::create_dir_all(root)?;
    Ok(())
}

/// Resolves `path` and checks it lies strictly inside `root`.
pub fn resolve_within(root: &Path, path: &Path) -> Result<PathBuf, AppError> {
    let root = root.canonicalize()?;
    let resolved = path
        .canonicalize()
        .map_err(|_| AppError::NotFound(format!("folder {} does not exist", path.display())))?;
    if resolved == root || !resolved.starts_with(&root) {
        return Err(AppError::Validation(format!(
            "{} is not inside the data folder",
            path.display()
        )));
    }
    Ok(resolved)
}

/// Deletes everything inside `path`, leaving `path` itself in place.
pub fn clear_folder(path: &Path) -> Result<(), AppError> {
    if !path.is_dir() {
        return Err(AppError::NotFound(format!(
            "folder {} does not exist",
            path.display()
        )));
    }
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            fs::remove_dir_all(entry.path())?;
        } else {
            fs::remove_file(entry.path())?;
        }
    }
    info!("Cleared folder {}", path.display());
    Ok(())
}

/// Removes the whole data root and recreates it empty.
pub fn clear_root_data(root: &Path) -> Result<(), AppError> {
    if root.exists() {
        fs::remove_dir_all(root)?;
    }
    fs::create_dir_all(root)?;
    info!("Cleared data root {}", root.display());
    Ok(())
}
