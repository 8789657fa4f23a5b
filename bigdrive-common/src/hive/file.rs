use super::{same_name, RegistryPath, RegistryStore, RegistryValue};
use crate::error::{HiveError, HiveResult};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{instrument, trace};

const VALUES_FILE: &str = ".values.json";

/// Hive persisted on disk: every key is a directory, its values live in a
/// JSON document inside that directory.
#[derive(Debug)]
pub struct FileHive {
    root: PathBuf,
    lock: Mutex<()>,
}

impl FileHive {
    #[instrument]
    pub fn open(root: &Path) -> HiveResult<Self> {
        fs::create_dir_all(root).map_err(|e| HiveError::io(root, e))?;
        Ok(Self {
            root: root.to_path_buf(),
            lock: Mutex::new(()),
        })
    }

    fn find_child(dir: &Path, name: &str) -> HiveResult<Option<PathBuf>> {
        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(HiveError::io(dir, e)),
        };
        for entry in entries {
            let entry = entry.map_err(|e| HiveError::io(dir, e))?;
            let is_dir = entry
                .file_type()
                .map_err(|e| HiveError::io(&entry.path(), e))?
                .is_dir();
            if is_dir && same_name(&entry.file_name().to_string_lossy(), name) {
                return Ok(Some(entry.path()));
            }
        }
        Ok(None)
    }

    fn resolve(&self, path: &RegistryPath) -> HiveResult<Option<PathBuf>> {
        let mut current = self.root.clone();
        for segment in path.segments() {
            match Self::find_child(&current, segment)? {
                Some(child) => current = child,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    fn read_values(dir: &Path) -> HiveResult<BTreeMap<String, RegistryValue>> {
        let file = dir.join(VALUES_FILE);
        match fs::read(&file) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| HiveError::Json {
                path: file.display().to_string(),
                source,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(HiveError::io(&file, e)),
        }
    }

    fn write_values(dir: &Path, values: &BTreeMap<String, RegistryValue>) -> HiveResult<()> {
        let file = dir.join(VALUES_FILE);
        let staging = dir.join(format!("{VALUES_FILE}.tmp"));
        let bytes = serde_json::to_vec_pretty(values).map_err(|source| HiveError::Json {
            path: file.display().to_string(),
            source,
        })?;
        fs::write(&staging, bytes).map_err(|e| HiveError::io(&staging, e))?;
        fs::rename(&staging, &file).map_err(|e| HiveError::io(&file, e))
    }

    fn check_segments(path: &RegistryPath) -> HiveResult<()> {
        if path
            .segments()
            .iter()
            .any(|s| s.starts_with(VALUES_FILE) || s == "." || s == ".." || s.contains('/'))
        {
            return Err(HiveError::InvalidPath(path.to_string()));
        }
        Ok(())
    }
}

impl RegistryStore for FileHive {
    fn key_exists(&self, path: &RegistryPath) -> HiveResult<bool> {
        let _guard = self.lock.lock().map_err(|_| HiveError::Poisoned)?;
        Ok(self.resolve(path)?.is_some())
    }

    #[instrument(skip(self))]
    fn create_key(&self, path: &RegistryPath) -> HiveResult<()> {
        Self::check_segments(path)?;
        let _guard = self.lock.lock().map_err(|_| HiveError::Poisoned)?;
        let mut current = self.root.clone();
        for segment in path.segments() {
            current = match Self::find_child(&current, segment)? {
                Some(child) => child,
                None => {
                    let child = current.join(segment);
                    trace!("creating key directory {}", child.display());
                    fs::create_dir(&child).map_err(|e| HiveError::io(&child, e))?;
                    child
                }
            };
        }
        Ok(())
    }

    #[instrument(skip(self))]
    fn delete_key_tree(&self, path: &RegistryPath) -> HiveResult<()> {
        let _guard = self.lock.lock().map_err(|_| HiveError::Poisoned)?;
        if let Some(dir) = self.resolve(path)? {
            fs::remove_dir_all(&dir).map_err(|e| HiveError::io(&dir, e))?;
        }
        Ok(())
    }

    fn subkey_names(&self, path: &RegistryPath) -> HiveResult<Option<Vec<String>>> {
        let _guard = self.lock.lock().map_err(|_| HiveError::Poisoned)?;
        let Some(dir) = self.resolve(path)? else {
            return Ok(None);
        };
        let mut names = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| HiveError::io(&dir, e))? {
            let entry = entry.map_err(|e| HiveError::io(&dir, e))?;
            if entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(Some(names))
    }

    fn value_names(&self, path: &RegistryPath) -> HiveResult<Option<Vec<String>>> {
        let _guard = self.lock.lock().map_err(|_| HiveError::Poisoned)?;
        match self.resolve(path)? {
            Some(dir) => Ok(Some(Self::read_values(&dir)?.into_keys().collect())),
            None => Ok(None),
        }
    }

    fn get_value(&self, path: &RegistryPath, name: &str) -> HiveResult<Option<RegistryValue>> {
        let _guard = self.lock.lock().map_err(|_| HiveError::Poisoned)?;
        let Some(dir) = self.resolve(path)? else {
            return Ok(None);
        };
        Ok(Self::read_values(&dir)?
            .into_iter()
            .find(|(n, _)| same_name(n, name))
            .map(|(_, value)| value))
    }

    #[instrument(skip(self, value))]
    fn set_value(&self, path: &RegistryPath, name: &str, value: RegistryValue) -> HiveResult<()> {
        let _guard = self.lock.lock().map_err(|_| HiveError::Poisoned)?;
        let dir = self
            .resolve(path)?
            .ok_or_else(|| HiveError::KeyNotFound(path.to_string()))?;
        let mut values = Self::read_values(&dir)?;
        let existing = values.keys().find(|n| same_name(n, name)).cloned();
        match existing {
            Some(existing) => values.insert(existing, value),
            None => values.insert(name.to_string(), value),
        };
        Self::write_values(&dir, &values)
    }
}
