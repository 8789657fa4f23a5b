use std::io;
use std::path::Path;
use uuid::Uuid;

pub type HiveResult<T> = std::result::Result<T, HiveError>;
pub type ConfigurationResult<T> = std::result::Result<T, ConfigurationError>;

/// Failures of the key/value hive itself, independent of what is stored in it.
#[derive(Debug, thiserror::Error)]
pub enum HiveError {
    #[error("Registry path '{0}' does not exist.")]
    KeyNotFound(String),
    #[error("Invalid registry path '{0}'")]
    InvalidPath(String),
    #[error("Access to '{path}' was denied: {source}")]
    Unauthorized { path: String, source: io::Error },
    #[error("I/O error at '{path}': {source}")]
    Io { path: String, source: io::Error },
    #[error("Values of '{path}' could not be parsed: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("The hive lock was poisoned")]
    Poisoned,
}

impl HiveError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        let path = path.display().to_string();
        match source.kind() {
            io::ErrorKind::PermissionDenied => HiveError::Unauthorized { path, source },
            _ => HiveError::Io { path, source },
        }
    }
}

/// Errors surfaced by the configuration managers and the provisioning flow.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Registry path '{0}' does not exist.")]
    NotFound(String),
    #[error("Registry key '{path}' is corrupt: {reason}")]
    Corrupt { path: String, reason: String },
    #[error("Drive with GUID {0} already exists.")]
    AlreadyExists(Uuid),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error(transparent)]
    Hive(HiveError),
}

impl From<HiveError> for ConfigurationError {
    fn from(error: HiveError) -> Self {
        match error {
            HiveError::KeyNotFound(path) => ConfigurationError::NotFound(path),
            HiveError::Unauthorized { path, source } => {
                ConfigurationError::Unauthorized(format!("{path}: {source}"))
            }
            other => ConfigurationError::Hive(other),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EventLogError {
    #[error("Event Source '{0}' does not exist.")]
    SourceNotFound(String),
    #[error("I/O error on event log '{path}': {source}")]
    Io { path: String, source: io::Error },
    #[error("Event log '{path}' holds a malformed entry: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
}

impl EventLogError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        EventLogError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}
