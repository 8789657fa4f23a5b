//! Contract between the BigDrive service and the providers that back drives.
//!
//! Every operation is addressed by the drive id and a backslash-separated
//! path rooted at `\`.

use crate::error::ConfigurationResult;
use crate::manager::ProviderManager;
use crate::model::ProviderConfiguration;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const ROOT_PATH: &str = "\\";

pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ProviderError {
    #[error("File or folder not found: {0}")]
    NotFound(String),
    #[error("Directory not found: {0}")]
    DirectoryNotFound(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Already exists: {0}")]
    AlreadyExists(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("Provider is unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for ProviderError {
    fn from(error: std::io::Error) -> Self {
        ProviderError::Io(error.to_string())
    }
}

pub trait DriveProvider: Send + Sync {
    fn enumerate_folders(&self, drive: Uuid, path: &str) -> ProviderResult<Vec<String>>;

    fn enumerate_files(&self, drive: Uuid, path: &str) -> ProviderResult<Vec<String>>;

    /// `DateTime::<Utc>::MIN_UTC` when `path` is not a file.
    fn last_modified_time(&self, drive: Uuid, path: &str) -> ProviderResult<DateTime<Utc>>;

    /// 0 when `path` is not a file.
    fn file_size(&self, drive: Uuid, path: &str) -> ProviderResult<u64>;

    fn file_data(&self, drive: Uuid, path: &str) -> ProviderResult<Vec<u8>>;

    fn copy_file_to_drive(&self, drive: Uuid, local: &Path, target: &str) -> ProviderResult<()>;

    fn copy_file_from_drive(&self, drive: Uuid, source: &str, local: &Path) -> ProviderResult<()>;

    fn delete_file(&self, drive: Uuid, path: &str) -> ProviderResult<()>;

    fn create_directory(&self, drive: Uuid, path: &str) -> ProviderResult<()>;

    fn move_file(&self, drive: Uuid, source: &str, destination: &str) -> ProviderResult<()>;

    /// Materializes the file locally and returns where it was put.
    fn open_file(&self, drive: Uuid, path: &str) -> ProviderResult<PathBuf>;
}

pub trait ProviderRegistration {
    fn configuration(&self) -> ProviderConfiguration;

    fn register(&self, providers: &ProviderManager) -> ConfigurationResult<()> {
        providers.write(&self.configuration())
    }

    /// Intentionally left without effect; registered providers stay listed.
    fn unregister(&self, _providers: &ProviderManager) -> ConfigurationResult<()> {
        Ok(())
    }
}

/// Splits `\a\b\c` into (`\a\b`, `c`). The parent of a top-level entry is `\`.
pub fn split_parent(path: &str) -> (String, String) {
    let trimmed = path.trim_end_matches('\\');
    match trimmed.rfind('\\') {
        Some(0) | None => (ROOT_PATH.to_string(), trimmed.trim_start_matches('\\').to_string()),
        Some(index) => (trimmed[..index].to_string(), trimmed[index + 1..].to_string()),
    }
}
