//! Persistence of configuration records: one hive key per record, named by
//! the brace-formatted id, below a per-kind collection root.

use crate::codec::{self, RegistryRecord};
use crate::error::{ConfigurationError, ConfigurationResult};
use crate::hive::{RegistryPath, RegistryStore};
use crate::model::{guid, ApplicationConfiguration, DriveConfiguration, ProviderConfiguration};
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

pub const DRIVES_ROOT: &str = r"Software\BigDrive\Drives";
pub const PROVIDERS_ROOT: &str = r"Software\BigDrive\Providers";
pub const APPLICATIONS_ROOT: &str = r"Software\BigDrive\Applications";

/// What happens to an existing record key on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Values are overwritten in place; values the new record does not write survive.
    Merge,
    /// The key is deleted and re-created, so nothing from an earlier write survives.
    Replace,
}

#[derive(Debug)]
pub struct RecordStore<R> {
    hive: Arc<dyn RegistryStore>,
    root: RegistryPath,
    policy: WritePolicy,
    _record: PhantomData<fn() -> R>,
}

impl<R> Clone for RecordStore<R> {
    fn clone(&self) -> Self {
        Self {
            hive: self.hive.clone(),
            root: self.root.clone(),
            policy: self.policy,
            _record: PhantomData,
        }
    }
}

pub type DriveManager = RecordStore<DriveConfiguration>;
pub type ProviderManager = RecordStore<ProviderConfiguration>;
pub type ApplicationManager = RecordStore<ApplicationConfiguration>;

fn collection_root(path: &str) -> RegistryPath {
    RegistryPath::parse(path).expect("collection roots are valid registry paths")
}

impl DriveManager {
    pub fn new(hive: Arc<dyn RegistryStore>) -> Self {
        Self::with_root(hive, collection_root(DRIVES_ROOT), WritePolicy::Merge)
    }
}

impl ProviderManager {
    pub fn new(hive: Arc<dyn RegistryStore>) -> Self {
        Self::with_root(hive, collection_root(PROVIDERS_ROOT), WritePolicy::Replace)
    }
}

impl ApplicationManager {
    pub fn new(hive: Arc<dyn RegistryStore>) -> Self {
        Self::with_root(hive, collection_root(APPLICATIONS_ROOT), WritePolicy::Replace)
    }
}

impl<R: RegistryRecord> RecordStore<R> {
    pub fn with_root(hive: Arc<dyn RegistryStore>, root: RegistryPath, policy: WritePolicy) -> Self {
        Self {
            hive,
            root,
            policy,
            _record: PhantomData,
        }
    }

    pub fn root(&self) -> &RegistryPath {
        &self.root
    }

    fn key_for(&self, id: Uuid) -> ConfigurationResult<RegistryPath> {
        if id.is_nil() {
            return Err(ConfigurationError::InvalidArgument(
                "Guid cannot be empty.".to_string(),
            ));
        }
        Ok(self.root.join(guid::format(id))?)
    }

    #[instrument(skip(self), fields(root = %self.root))]
    pub fn exists(&self, id: Uuid) -> ConfigurationResult<bool> {
        let key = self.key_for(id)?;
        Ok(self.hive.key_exists(&key)?)
    }

    #[instrument(skip(self), fields(root = %self.root))]
    pub fn read(&self, id: Uuid) -> ConfigurationResult<R> {
        let key = self.key_for(id)?;
        if !self.hive.key_exists(&key)? {
            return Err(ConfigurationError::NotFound(key.to_string()));
        }
        let record: R = codec::decode(self.hive.as_ref(), &key)?;
        if record.id() != id {
            warn!("Key {} holds id {}", key, record.id());
            return Err(ConfigurationError::Corrupt {
                reason: format!(
                    "Subfolder name of registry key does not match Id found in that key '{}'.",
                    guid::format(record.id())
                ),
                path: key.to_string(),
            });
        }
        Ok(record)
    }

    /// Lazily reads every record below the collection root.
    ///
    /// Fails up front when the root itself is missing. Each item is read only
    /// when the iterator reaches it; the order is whatever the hive enumerates.
    #[instrument(skip(self), fields(root = %self.root))]
    pub fn read_all(
        &self,
    ) -> ConfigurationResult<impl Iterator<Item = ConfigurationResult<R>> + '_> {
        let names = self
            .hive
            .subkey_names(&self.root)?
            .ok_or_else(|| ConfigurationError::NotFound(self.root.to_string()))?;
        debug!("Found {} records", names.len());
        Ok(names.into_iter().map(move |name| {
            let id = guid::parse(&name).map_err(|e| ConfigurationError::Corrupt {
                path: format!("{}\\{}", self.root, name),
                reason: format!("key name is not a GUID: {e}"),
            })?;
            self.read(id)
        }))
    }

    #[instrument(skip(self, record), fields(root = %self.root, id = %record.id()))]
    pub fn write(&self, record: &R) -> ConfigurationResult<()> {
        let key = self.key_for(record.id())?;
        if self.policy == WritePolicy::Replace {
            self.hive.delete_key_tree(&key)?;
        }
        self.hive.create_key(&key)?;
        codec::encode(record, self.hive.as_ref(), &key)?;
        debug!("Wrote {}", key);
        Ok(())
    }

    /// Removes the record with all of its values. Missing records are ignored.
    #[instrument(skip(self), fields(root = %self.root))]
    pub fn delete(&self, id: Uuid) -> ConfigurationResult<()> {
        let key = self.key_for(id)?;
        Ok(self.hive.delete_key_tree(&key)?)
    }
}

impl<R: RegistryRecord + DeserializeOwned> RecordStore<R> {
    /// See [`codec::from_json`]: malformed documents give `Ok(None)`.
    pub fn read_from_json(&self, text: &str) -> ConfigurationResult<Option<R>> {
        codec::from_json(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hive::{FileHive, MemoryHive};

    fn memory() -> Arc<dyn RegistryStore> {
        Arc::new(MemoryHive::new())
    }

    fn drive(name: &str) -> DriveConfiguration {
        DriveConfiguration {
            id: Uuid::new_v4(),
            name: name.to_string(),
            clsid: Uuid::new_v4(),
        }
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let hives: Vec<Arc<dyn RegistryStore>> =
            vec![memory(), Arc::new(FileHive::open(dir.path()).unwrap())];
        for hive in hives {
            let drives = DriveManager::new(hive);
            let original = drive("Drive1");
            drives.write(&original).unwrap();
            assert_eq!(drives.read(original.id).unwrap(), original);
        }
    }

    #[test]
    fn read_of_unknown_id_is_not_found() {
        let drives = DriveManager::new(memory());
        let result = drives.read(Uuid::new_v4());
        assert!(matches!(result, Err(ConfigurationError::NotFound(_))));
    }

    #[test]
    fn nil_id_is_an_invalid_argument() {
        let drives = DriveManager::new(memory());
        let providers = ProviderManager::new(memory());
        assert!(matches!(
            drives.read(Uuid::nil()),
            Err(ConfigurationError::InvalidArgument(_))
        ));
        assert!(matches!(
            drives.exists(Uuid::nil()),
            Err(ConfigurationError::InvalidArgument(_))
        ));
        assert!(matches!(
            drives.write(&DriveConfiguration::default()),
            Err(ConfigurationError::InvalidArgument(_))
        ));
        assert!(matches!(
            providers.write(&ProviderConfiguration::default()),
            Err(ConfigurationError::InvalidArgument(_))
        ));
    }

    #[test]
    fn mismatched_stored_id_is_corrupt() {
        let hive = memory();
        let drives = DriveManager::new(hive.clone());
        let requested = Uuid::new_v4();
        let key = drives.root().join(guid::format(requested)).unwrap();
        hive.create_key(&key).unwrap();
        hive.set_value(&key, "id", guid::format(Uuid::new_v4()).into())
            .unwrap();
        hive.set_value(&key, "name", "TestDrive".into()).unwrap();

        let result = drives.read(requested);
        assert!(matches!(result, Err(ConfigurationError::Corrupt { .. })));
    }

    #[test]
    fn key_lookup_ignores_guid_case() {
        let hive = memory();
        let drives = DriveManager::new(hive.clone());
        let id = Uuid::new_v4();
        let upper = guid::format(id).to_uppercase();
        let key = drives.root().join(upper).unwrap();
        hive.create_key(&key).unwrap();
        hive.set_value(&key, "id", id.to_string().to_uppercase().into())
            .unwrap();
        assert!(drives.exists(id).unwrap());
        assert_eq!(drives.read(id).unwrap().id, id);
    }

    #[test]
    fn exists_tracks_write_and_delete() {
        let providers = ProviderManager::new(memory());
        let provider = ProviderConfiguration {
            id: Uuid::new_v4(),
            name: "X".to_string(),
        };
        assert!(!providers.exists(provider.id).unwrap());
        providers.write(&provider).unwrap();
        assert!(providers.exists(provider.id).unwrap());
        providers.delete(provider.id).unwrap();
        assert!(!providers.exists(provider.id).unwrap());
        providers.delete(provider.id).unwrap();
    }

    #[test]
    fn provider_write_replaces_previous_values() {
        let hive = memory();
        let providers = ProviderManager::new(hive.clone());
        let id = Uuid::new_v4();
        providers
            .write(&ProviderConfiguration {
                id,
                name: "X".to_string(),
            })
            .unwrap();
        let key = providers.root().join(guid::format(id)).unwrap();
        hive.set_value(&key, "stale", "left over".into()).unwrap();

        providers
            .write(&ProviderConfiguration {
                id,
                name: "Y".to_string(),
            })
            .unwrap();
        assert_eq!(providers.read(id).unwrap().name, "Y");
        assert_eq!(hive.get_value(&key, "stale").unwrap(), None);
    }

    #[test]
    fn drive_write_merges_into_existing_values() {
        let hive = memory();
        let drives = DriveManager::new(hive.clone());
        let mut record = drive("first");
        drives.write(&record).unwrap();
        let key = drives.root().join(guid::format(record.id)).unwrap();
        hive.set_value(&key, "extra", "kept".into()).unwrap();

        record.name = "second".to_string();
        drives.write(&record).unwrap();
        assert_eq!(drives.read(record.id).unwrap().name, "second");
        assert!(hive.get_value(&key, "extra").unwrap().is_some());
    }

    #[test]
    fn read_all_fails_when_root_is_missing() {
        let drives = DriveManager::new(memory());
        assert!(matches!(
            drives.read_all().map(|_| ()),
            Err(ConfigurationError::NotFound(_))
        ));
    }

    #[test]
    fn read_all_yields_every_record_lazily() {
        let hive = memory();
        let drives = DriveManager::new(hive.clone());
        let first = drive("one");
        let second = drive("two");
        drives.write(&first).unwrap();
        drives.write(&second).unwrap();

        let mut all = drives.read_all().unwrap();
        let one = all.next().unwrap().unwrap();
        // a record removed mid-iteration is only noticed when it is reached
        hive.delete_key_tree(&drives.root().join(guid::format(second.id)).unwrap())
            .unwrap();
        assert_eq!(one, first);
        assert!(matches!(
            all.next(),
            Some(Err(ConfigurationError::NotFound(_)))
        ));
        assert!(all.next().is_none());
    }

    #[test]
    fn read_all_reports_non_guid_keys() {
        let hive = memory();
        let drives = DriveManager::new(hive.clone());
        hive.create_key(&drives.root().join("not-a-guid").unwrap())
            .unwrap();
        let items: Vec<_> = drives.read_all().unwrap().collect();
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(ConfigurationError::Corrupt { .. })));
    }

    #[test]
    fn read_from_json_returns_none_for_garbage() {
        let drives = DriveManager::new(memory());
        assert!(drives.read_from_json("{{{").unwrap().is_none());
        let parsed = drives
            .read_from_json(
                r#"{"id": "{11111111-2222-3333-4444-555555555555}", "name": "J", "clsid": "{f8fe2e5a-e8b8-4207-bc04-ea4bcd4c4361}"}"#,
            )
            .unwrap()
            .unwrap();
        assert_eq!(parsed.name, "J");
    }
}
