//! Append-only event logs, one file per event source.
//!
//! An [`EventLog`] is an explicit handle that components receive at
//! construction; every entry is also forwarded to `tracing`.

use crate::error::EventLogError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{error, info};

pub const LOG_NAME: &str = "BigDrive";

/// Applications that get their own event source, `BigDrive.<application>`.
pub const EVENT_LOG_SERVICE: &str = "Service";
pub const EVENT_LOG_SHELL_FOLDER: &str = "ShellFolder";
pub const EVENT_LOG_CLIENT: &str = "Client";
pub const EVENT_LOG_PROVIDER_SAMPLE: &str = "Provider.Sample";

pub const APPLICATIONS: [&str; 4] = [
    EVENT_LOG_SERVICE,
    EVENT_LOG_SHELL_FOLDER,
    EVENT_LOG_CLIENT,
    EVENT_LOG_PROVIDER_SAMPLE,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventLevel {
    Information,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEntry {
    pub time: DateTime<Utc>,
    pub level: EventLevel,
    pub source: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct EventLog {
    source: String,
    file: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl EventLog {
    pub fn new(log_dir: &Path, log_name: &str, source: &str) -> Self {
        Self {
            source: source.to_string(),
            file: log_dir.join(log_name).join(format!("{source}.log")),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Handle for the `BigDrive.<application>` source of the BigDrive log.
    pub fn for_application(log_dir: &Path, application: &str) -> Self {
        Self::new(log_dir, LOG_NAME, &format!("BigDrive.{application}"))
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn exists(&self) -> bool {
        self.file.is_file()
    }

    pub fn create(&self) -> Result<(), EventLogError> {
        if let Some(parent) = self.file.parent() {
            fs::create_dir_all(parent).map_err(|e| EventLogError::io(parent, e))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)
            .map_err(|e| EventLogError::io(&self.file, e))?;
        Ok(())
    }

    pub fn delete(&self) -> Result<(), EventLogError> {
        match fs::remove_file(&self.file) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(EventLogError::io(&self.file, e)),
            _ => Ok(()),
        }
    }

    pub fn write(&self, level: EventLevel, message: impl Into<String>) -> Result<(), EventLogError> {
        let entry = EventEntry {
            time: Utc::now(),
            level,
            source: self.source.clone(),
            message: message.into(),
        };
        match level {
            EventLevel::Information => info!(source = %self.source, "{}", entry.message),
            EventLevel::Error => error!(source = %self.source, "{}", entry.message),
        }
        let mut line = serde_json::to_string(&entry).map_err(|source| EventLogError::Json {
            path: self.file.display().to_string(),
            source,
        })?;
        line.push('\n');

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if !self.exists() {
            return Err(EventLogError::SourceNotFound(self.source.clone()));
        }
        let mut file = OpenOptions::new()
            .append(true)
            .open(&self.file)
            .map_err(|e| EventLogError::io(&self.file, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| EventLogError::io(&self.file, e))
    }

    pub fn information(&self, message: impl Into<String>) -> Result<(), EventLogError> {
        self.write(EventLevel::Information, message)
    }

    pub fn error(&self, message: impl Into<String>) -> Result<(), EventLogError> {
        self.write(EventLevel::Error, message)
    }

    pub fn entries(&self) -> Result<Vec<EventEntry>, EventLogError> {
        let text = match fs::read_to_string(&self.file) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(EventLogError::SourceNotFound(self.source.clone()))
            }
            Err(e) => return Err(EventLogError::io(&self.file, e)),
        };
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str(line).map_err(|source| EventLogError::Json {
                    path: self.file.display().to_string(),
                    source,
                })
            })
            .collect()
    }

    pub fn clear(&self) -> Result<(), EventLogError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if !self.exists() {
            return Err(EventLogError::SourceNotFound(self.source.clone()));
        }
        fs::write(&self.file, b"").map_err(|e| EventLogError::io(&self.file, e))
    }

    /// Whether any entry mentions `needle`.
    pub fn contains(&self, needle: &str) -> Result<bool, EventLogError> {
        Ok(self.entries()?.iter().any(|e| e.message.contains(needle)))
    }
}
