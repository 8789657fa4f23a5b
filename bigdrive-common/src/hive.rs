//! Hierarchical key/value storage shaped like the Windows registry.
//!
//! Keys form a tree addressed by backslash-separated paths; every key holds a
//! set of named values. Key and value names compare case-insensitively.

use crate::error::HiveResult;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};

mod file;
mod memory;
mod path;

pub use file::FileHive;
pub use memory::MemoryHive;
pub use path::RegistryPath;

/// Name of the unnamed ("default") value of a key.
pub const DEFAULT_VALUE: &str = "";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegistryValue {
    DWord(u32),
    String(String),
}

impl Display for RegistryValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryValue::DWord(value) => write!(f, "{value}"),
            RegistryValue::String(value) => f.write_str(value),
        }
    }
}

impl From<&str> for RegistryValue {
    fn from(value: &str) -> Self {
        RegistryValue::String(value.to_string())
    }
}
impl From<String> for RegistryValue {
    fn from(value: String) -> Self {
        RegistryValue::String(value)
    }
}
impl From<u32> for RegistryValue {
    fn from(value: u32) -> Self {
        RegistryValue::DWord(value)
    }
}

pub trait RegistryStore: Debug + Send + Sync {
    fn key_exists(&self, path: &RegistryPath) -> HiveResult<bool>;

    /// Creates the key and every missing ancestor. Existing keys are left untouched.
    fn create_key(&self, path: &RegistryPath) -> HiveResult<()>;

    /// Removes the key with all of its subkeys. A missing key is not an error.
    fn delete_key_tree(&self, path: &RegistryPath) -> HiveResult<()>;

    /// Names of the direct subkeys, or `None` when the key does not exist.
    fn subkey_names(&self, path: &RegistryPath) -> HiveResult<Option<Vec<String>>>;

    /// Names of the values of a key, or `None` when the key does not exist.
    fn value_names(&self, path: &RegistryPath) -> HiveResult<Option<Vec<String>>>;

    /// Reads a value. Returns `None` when either the key or the value is missing.
    fn get_value(&self, path: &RegistryPath, name: &str) -> HiveResult<Option<RegistryValue>>;

    /// Writes a value into an existing key.
    fn set_value(&self, path: &RegistryPath, name: &str, value: RegistryValue) -> HiveResult<()>;
}

pub(crate) fn same_name(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || a.to_lowercase() == b.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HiveError;
    use std::sync::Arc;

    fn hives() -> (tempfile::TempDir, Vec<Arc<dyn RegistryStore>>) {
        let dir = tempfile::tempdir().unwrap();
        let file: Arc<dyn RegistryStore> = Arc::new(FileHive::open(dir.path()).unwrap());
        let memory: Arc<dyn RegistryStore> = Arc::new(MemoryHive::new());
        (dir, vec![file, memory])
    }

    fn path(p: &str) -> RegistryPath {
        RegistryPath::parse(p).unwrap()
    }

    #[test]
    fn create_set_and_get_values() {
        let (_dir, hives) = hives();
        for hive in hives {
            let key = path(r"Software\BigDrive\Drives\{abc}");
            assert!(!hive.key_exists(&key).unwrap());
            hive.create_key(&key).unwrap();
            assert!(hive.key_exists(&key).unwrap());
            assert!(hive.key_exists(&path(r"Software\BigDrive")).unwrap());

            hive.set_value(&key, "name", "Drive1".into()).unwrap();
            hive.set_value(&key, "MaxSize", 1024000u32.into()).unwrap();
            assert_eq!(
                hive.get_value(&key, "name").unwrap(),
                Some(RegistryValue::String("Drive1".into()))
            );
            assert_eq!(
                hive.get_value(&key, "maxsize").unwrap(),
                Some(RegistryValue::DWord(1024000))
            );
            assert_eq!(hive.get_value(&key, "missing").unwrap(), None);
            let mut names = hive.value_names(&key).unwrap().unwrap();
            names.sort();
            assert_eq!(names, vec!["MaxSize".to_string(), "name".to_string()]);
        }
    }

    #[test]
    fn key_names_are_case_insensitive() {
        let (_dir, hives) = hives();
        for hive in hives {
            hive.create_key(&path(r"Software\BigDrive\Providers\{ABCD}"))
                .unwrap();
            assert!(hive
                .key_exists(&path(r"software\bigdrive\providers\{abcd}"))
                .unwrap());
            hive.create_key(&path(r"SOFTWARE\BIGDRIVE\PROVIDERS\{abcd}"))
                .unwrap();
            let names = hive
                .subkey_names(&path(r"Software\BigDrive\Providers"))
                .unwrap()
                .unwrap();
            assert_eq!(names, vec!["{ABCD}".to_string()]);
        }
    }

    #[test]
    fn overwriting_a_value_keeps_a_single_entry() {
        let (_dir, hives) = hives();
        for hive in hives {
            let key = path(r"Software\BigDrive");
            hive.create_key(&key).unwrap();
            hive.set_value(&key, "Name", "X".into()).unwrap();
            hive.set_value(&key, "name", "Y".into()).unwrap();
            assert_eq!(hive.value_names(&key).unwrap().unwrap().len(), 1);
            assert_eq!(
                hive.get_value(&key, "NAME").unwrap(),
                Some(RegistryValue::String("Y".into()))
            );
        }
    }

    #[test]
    fn set_value_on_missing_key_fails() {
        let (_dir, hives) = hives();
        for hive in hives {
            let result = hive.set_value(&path(r"Software\Nope"), "a", "b".into());
            assert!(matches!(result, Err(HiveError::KeyNotFound(_))));
        }
    }

    #[test]
    fn delete_tree_removes_children_and_tolerates_missing() {
        let (_dir, hives) = hives();
        for hive in hives {
            hive.create_key(&path(r"A\B\C")).unwrap();
            hive.create_key(&path(r"A\D")).unwrap();
            hive.delete_key_tree(&path(r"a\b")).unwrap();
            assert!(!hive.key_exists(&path(r"A\B\C")).unwrap());
            assert!(hive.key_exists(&path(r"A\D")).unwrap());
            hive.delete_key_tree(&path(r"A\B")).unwrap();
            assert_eq!(hive.subkey_names(&path(r"X\Y")).unwrap(), None);
        }
    }

    #[test]
    fn file_hive_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let key = path(r"Software\BigDrive\Drives\{1}");
        {
            let hive = FileHive::open(dir.path()).unwrap();
            hive.create_key(&key).unwrap();
            hive.set_value(&key, "name", "persisted".into()).unwrap();
        }
        let hive = FileHive::open(dir.path()).unwrap();
        assert_eq!(
            hive.get_value(&key, "name").unwrap(),
            Some(RegistryValue::String("persisted".into()))
        );
    }
}
