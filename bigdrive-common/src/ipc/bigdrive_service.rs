use crate::model::{DriveConfiguration, ProviderConfiguration};
use crate::prelude::*;
use crate::provider::ProviderError;
use chrono::{DateTime, Utc};
use errors::*;
use std::path::PathBuf;
use uuid::Uuid;

#[tarpc::service]
pub trait BigDriveService {
    /// The drive's configuration as single-line JSON.
    async fn get_configuration(id: Uuid) -> StdResult<String, ConfigurationServiceError>;
    async fn list_drives() -> StdResult<Vec<DriveConfiguration>, ConfigurationServiceError>;
    async fn list_providers() -> StdResult<Vec<ProviderConfiguration>, ConfigurationServiceError>;
    /// Registers the shell folder of an already configured drive.
    async fn create(id: Uuid) -> StdResult<(), ConfigurationServiceError>;
    async fn create_from_configuration(json: String) -> StdResult<(), ConfigurationServiceError>;
    /// Checks that the service runs as the installer account and records
    /// `activity_id` in the service event log.
    async fn validate(activity_id: Uuid) -> StdResult<(), ValidateError>;

    async fn enumerate_folders(drive: Uuid, path: String) -> StdResult<Vec<String>, ProviderCallError>;
    async fn enumerate_files(drive: Uuid, path: String) -> StdResult<Vec<String>, ProviderCallError>;
    async fn last_modified_time(drive: Uuid, path: String) -> StdResult<DateTime<Utc>, ProviderCallError>;
    async fn file_size(drive: Uuid, path: String) -> StdResult<u64, ProviderCallError>;
    async fn file_data(drive: Uuid, path: String) -> StdResult<Vec<u8>, ProviderCallError>;
    async fn copy_file_to_drive(drive: Uuid, local: PathBuf, target: String) -> StdResult<(), ProviderCallError>;
    async fn copy_file_from_drive(drive: Uuid, source: String, local: PathBuf) -> StdResult<(), ProviderCallError>;
    async fn delete_file(drive: Uuid, path: String) -> StdResult<(), ProviderCallError>;
    async fn create_directory(drive: Uuid, path: String) -> StdResult<(), ProviderCallError>;
    async fn move_file(drive: Uuid, source: String, destination: String) -> StdResult<(), ProviderCallError>;
    async fn open_file(drive: Uuid, path: String) -> StdResult<PathBuf, ProviderCallError>;
}

pub mod errors {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
    pub enum ConfigurationServiceError {
        #[error("Not found: {0}")]
        NotFound(String),
        #[error("Corrupt configuration: {0}")]
        Corrupt(String),
        #[error("Drive with GUID {0} already exists.")]
        AlreadyExists(Uuid),
        #[error("Invalid argument: {0}")]
        InvalidArgument(String),
        #[error("Unauthorized: {0}")]
        Unauthorized(String),
        #[error("Other: {0}")]
        Other(String),
    }

    impl From<ConfigurationError> for ConfigurationServiceError {
        fn from(error: ConfigurationError) -> Self {
            match error {
                ConfigurationError::NotFound(path) => ConfigurationServiceError::NotFound(path),
                ConfigurationError::AlreadyExists(id) => ConfigurationServiceError::AlreadyExists(id),
                ConfigurationError::InvalidArgument(m) => ConfigurationServiceError::InvalidArgument(m),
                ConfigurationError::Unauthorized(m) => ConfigurationServiceError::Unauthorized(m),
                e @ ConfigurationError::Corrupt { .. } => {
                    ConfigurationServiceError::Corrupt(e.to_string())
                }
                e @ ConfigurationError::Hive(_) => ConfigurationServiceError::Other(e.to_string()),
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
    pub enum ValidateError {
        #[error("Service runs as '{actual}', expected '{expected}'")]
        Unauthorized { actual: String, expected: String },
        #[error("Could not write the event log: {0}")]
        EventLog(String),
    }

    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
    pub enum ProviderCallError {
        #[error("No provider is hosted for CLSID {0}")]
        NoProvider(Uuid),
        #[error("Drive configuration unavailable: {0}")]
        Configuration(#[from] ConfigurationServiceError),
        #[error("Provider failed: {0}")]
        Provider(#[from] ProviderError),
    }

    impl From<ConfigurationError> for ProviderCallError {
        fn from(error: ConfigurationError) -> Self {
            ProviderCallError::Configuration(error.into())
        }
    }
}
