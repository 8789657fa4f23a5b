//! A provider backed by an in-memory folder tree, one tree per drive.
//!
//! Every drive starts out with the same small tree of folders and text files,
//! see [`Node::sample_tree`].

use bigdrive_common::model::ProviderConfiguration;
use bigdrive_common::provider::{
    split_parent, DriveProvider, ProviderError, ProviderRegistration, ProviderResult,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;
use tracing::{info, instrument};
use uuid::Uuid;

mod node;
pub use node::{Node, NodeKind};

pub const PROVIDER_NAME: &str = "BigDrive.Provider.Sample";
pub const CLSID: Uuid = Uuid::from_u128(0xF8FE2E5A_E8B8_4207_BC04_EA4BCD4C4361);

#[derive(Debug, Default)]
pub struct SampleProvider {
    drives: Mutex<HashMap<Uuid, Node>>,
}

impl SampleProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> ProviderResult<MutexGuard<'_, HashMap<Uuid, Node>>> {
        self.drives
            .lock()
            .map_err(|_| ProviderError::Unavailable("sample tree lock poisoned".to_string()))
    }

    fn with_tree<T>(
        &self,
        drive: Uuid,
        f: impl FnOnce(&mut Node) -> ProviderResult<T>,
    ) -> ProviderResult<T> {
        let mut drives = self.lock()?;
        let root = drives.entry(drive).or_insert_with(Node::sample_tree);
        f(root)
    }
}

fn folder_mut<'a>(root: &'a mut Node, path: &str) -> ProviderResult<&'a mut Node> {
    match root.find_mut(path) {
        Some(node) if node.is_folder() => Ok(node),
        _ => Err(ProviderError::DirectoryNotFound(path.to_string())),
    }
}

fn file<'a>(root: &'a Node, path: &str) -> ProviderResult<&'a Node> {
    match root.find(path) {
        Some(node) if node.is_file() => Ok(node),
        _ => Err(ProviderError::NotFound(path.to_string())),
    }
}

/// True when `path` is `ancestor` itself or lies below it.
fn is_within(path: &str, ancestor: &str) -> bool {
    let path = path.trim_end_matches('\\');
    let ancestor = ancestor.trim_end_matches('\\');
    path == ancestor
        || path
            .strip_prefix(ancestor)
            .is_some_and(|rest| rest.starts_with('\\'))
}

impl ProviderRegistration for SampleProvider {
    fn configuration(&self) -> ProviderConfiguration {
        ProviderConfiguration {
            id: CLSID,
            name: PROVIDER_NAME.to_string(),
        }
    }
}

impl DriveProvider for SampleProvider {
    /// Empty when `path` is not a folder.
    fn enumerate_folders(&self, drive: Uuid, path: &str) -> ProviderResult<Vec<String>> {
        self.with_tree(drive, |root| {
            Ok(root
                .find(path)
                .filter(|n| n.is_folder())
                .map(|n| n.names_of(NodeKind::Folder))
                .unwrap_or_default())
        })
    }

    fn enumerate_files(&self, drive: Uuid, path: &str) -> ProviderResult<Vec<String>> {
        self.with_tree(drive, |root| {
            Ok(root
                .find(path)
                .filter(|n| n.is_folder())
                .map(|n| n.names_of(NodeKind::File))
                .unwrap_or_default())
        })
    }

    fn last_modified_time(&self, drive: Uuid, path: &str) -> ProviderResult<DateTime<Utc>> {
        self.with_tree(drive, |root| {
            Ok(file(root, path).map_or(DateTime::<Utc>::MIN_UTC, |n| n.last_modified))
        })
    }

    fn file_size(&self, drive: Uuid, path: &str) -> ProviderResult<u64> {
        self.with_tree(drive, |root| Ok(file(root, path).map_or(0, Node::size)))
    }

    fn file_data(&self, drive: Uuid, path: &str) -> ProviderResult<Vec<u8>> {
        self.with_tree(drive, |root| Ok(file(root, path)?.data.clone()))
    }

    #[instrument(skip(self))]
    fn copy_file_to_drive(&self, drive: Uuid, local: &Path, target: &str) -> ProviderResult<()> {
        if !local.is_file() {
            return Err(ProviderError::NotFound(local.display().to_string()));
        }
        let data = fs::read(local)?;
        let modified = fs::metadata(local)?.modified()?;
        let (parent, name) = split_parent(target);
        self.with_tree(drive, |root| {
            let folder = folder_mut(root, &parent)?;
            if folder.child(&name).is_some() {
                return Err(ProviderError::AlreadyExists(target.to_string()));
            }
            let mut node = Node::file(name, data);
            node.last_modified = modified.into();
            folder.children.push(node);
            Ok(())
        })
    }

    #[instrument(skip(self))]
    fn copy_file_from_drive(&self, drive: Uuid, source: &str, local: &Path) -> ProviderResult<()> {
        let (data, modified) = self.with_tree(drive, |root| {
            let node = file(root, source)?;
            Ok((node.data.clone(), node.last_modified))
        })?;
        fs::write(local, data)?;
        fs::File::options()
            .write(true)
            .open(local)?
            .set_modified(SystemTime::from(modified))?;
        Ok(())
    }

    #[instrument(skip(self))]
    fn delete_file(&self, drive: Uuid, path: &str) -> ProviderResult<()> {
        let (parent, name) = split_parent(path);
        self.with_tree(drive, |root| {
            let folder = root
                .find_mut(&parent)
                .ok_or_else(|| ProviderError::DirectoryNotFound(parent.clone()))?;
            let index = folder
                .child_index(&name)
                .ok_or_else(|| ProviderError::NotFound(path.to_string()))?;
            folder.children.remove(index);
            Ok(())
        })
    }

    #[instrument(skip(self))]
    fn create_directory(&self, drive: Uuid, path: &str) -> ProviderResult<()> {
        let (parent, name) = split_parent(path);
        self.with_tree(drive, |root| {
            let folder = folder_mut(root, &parent)?;
            if folder.child(&name).is_some_and(Node::is_folder) {
                return Err(ProviderError::AlreadyExists(path.to_string()));
            }
            folder.children.push(Node::folder(name));
            Ok(())
        })
    }

    #[instrument(skip(self))]
    fn move_file(&self, drive: Uuid, source: &str, destination: &str) -> ProviderResult<()> {
        let (source_parent, source_name) = split_parent(source);
        let (destination_parent, destination_name) = split_parent(destination);
        if is_within(destination, source) {
            return Err(ProviderError::InvalidPath(destination.to_string()));
        }
        self.with_tree(drive, |root| {
            let index = root
                .find(&source_parent)
                .ok_or_else(|| ProviderError::DirectoryNotFound(source_parent.clone()))?
                .child_index(&source_name)
                .ok_or_else(|| ProviderError::NotFound(source.to_string()))?;
            let target = folder_mut(root, &destination_parent)?;
            if target.child(&destination_name).is_some() {
                return Err(ProviderError::AlreadyExists(destination.to_string()));
            }

            let mut node = folder_mut(root, &source_parent)?.children.remove(index);
            node.name = destination_name;
            folder_mut(root, &destination_parent)?.children.push(node);
            Ok(())
        })
    }

    fn open_file(&self, drive: Uuid, path: &str) -> ProviderResult<PathBuf> {
        let (_, name) = split_parent(path);
        let temp = tempfile::Builder::new()
            .prefix("bigdrive-")
            .suffix(&format!("-{name}"))
            .tempfile()?;
        // Dropping `temp` on failure removes the file again.
        self.copy_file_from_drive(drive, path, temp.path())?;
        let (_, local) = temp
            .keep()
            .map_err(|e| ProviderError::Io(e.to_string()))?;
        info!(path, local = %local.display(), "Opened file");
        Ok(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdrive_common::hive::MemoryHive;
    use bigdrive_common::manager::ProviderManager;
    use std::sync::Arc;

    fn drive() -> Uuid {
        Uuid::parse_str("{4a1c6d8e-97ab-4f29-b5b1-0c5e2d7e9f10}").unwrap()
    }

    #[test]
    fn clsid_matches_the_registered_class() {
        assert_eq!(
            CLSID,
            Uuid::parse_str("F8FE2E5A-E8B8-4207-BC04-EA4BCD4C4361").unwrap()
        );
    }

    #[test]
    fn enumerates_the_sample_tree() {
        let provider = SampleProvider::new();
        assert_eq!(
            provider.enumerate_folders(drive(), r"\").unwrap(),
            ["RootFolder1", "RootFolder2", "RootFolder3"]
        );
        assert_eq!(
            provider.enumerate_folders(drive(), r"\RootFolder2").unwrap(),
            ["SubFolder2"]
        );
        assert_eq!(
            provider.enumerate_files(drive(), r"\").unwrap(),
            ["A File.txt", "Root File 2.txt", "Z File.txt"]
        );
        assert!(provider.enumerate_files(drive(), r"\RootFolder3").unwrap().is_empty());
        assert!(provider.enumerate_folders(drive(), r"\Nowhere").unwrap().is_empty());
    }

    #[test]
    fn file_info_defaults_for_missing_files() {
        let provider = SampleProvider::new();
        assert_eq!(provider.file_size(drive(), r"\RootFolder1").unwrap(), 0);
        assert_eq!(
            provider.last_modified_time(drive(), r"\missing.txt").unwrap(),
            DateTime::<Utc>::MIN_UTC
        );
        assert!(provider.file_size(drive(), r"\A File.txt").unwrap() > 0);
        assert_eq!(
            provider.file_data(drive(), r"\missing.txt"),
            Err(ProviderError::NotFound(r"\missing.txt".to_string()))
        );
    }

    #[test]
    fn file_data_is_the_embedded_content() {
        let provider = SampleProvider::new();
        let data = provider.file_data(drive(), r"\Z File.txt").unwrap();
        assert_eq!(data, include_bytes!("../resources/Z File.txt"));
    }

    #[test]
    fn copies_round_trip_through_local_files() {
        let provider = SampleProvider::new();
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("upload.txt");
        fs::write(&local, b"uploaded").unwrap();

        provider
            .copy_file_to_drive(drive(), &local, r"\RootFolder1\upload.txt")
            .unwrap();
        assert_eq!(
            provider.enumerate_files(drive(), r"\RootFolder1").unwrap(),
            ["upload.txt"]
        );
        assert_eq!(
            provider.copy_file_to_drive(drive(), &local, r"\RootFolder1\upload.txt"),
            Err(ProviderError::AlreadyExists(r"\RootFolder1\upload.txt".to_string()))
        );
        assert_eq!(
            provider.copy_file_to_drive(drive(), &local, r"\Missing\upload.txt"),
            Err(ProviderError::DirectoryNotFound(r"\Missing".to_string()))
        );

        let back = dir.path().join("download.txt");
        provider
            .copy_file_from_drive(drive(), r"\RootFolder1\upload.txt", &back)
            .unwrap();
        assert_eq!(fs::read(&back).unwrap(), b"uploaded");
    }

    #[test]
    fn directories_delete_and_move() {
        let provider = SampleProvider::new();
        provider.create_directory(drive(), r"\RootFolder3\New").unwrap();
        assert!(matches!(
            provider.create_directory(drive(), r"\RootFolder3\New"),
            Err(ProviderError::AlreadyExists(_))
        ));

        provider
            .move_file(drive(), r"\A File.txt", r"\RootFolder3\New\Moved.txt")
            .unwrap();
        assert_eq!(
            provider.enumerate_files(drive(), r"\RootFolder3\New").unwrap(),
            ["Moved.txt"]
        );
        assert_eq!(
            provider.move_file(drive(), r"\Z File.txt", r"\Root File 2.txt"),
            Err(ProviderError::AlreadyExists(r"\Root File 2.txt".to_string()))
        );

        provider.delete_file(drive(), r"\RootFolder3\New\Moved.txt").unwrap();
        assert_eq!(
            provider.delete_file(drive(), r"\RootFolder3\New\Moved.txt"),
            Err(ProviderError::NotFound(r"\RootFolder3\New\Moved.txt".to_string()))
        );
    }

    #[test]
    fn moving_a_folder_into_itself_leaves_the_tree_alone() {
        let provider = SampleProvider::new();
        for destination in [r"\RootFolder1\SubFolder1\Moved", r"\RootFolder1"] {
            assert_eq!(
                provider.move_file(drive(), r"\RootFolder1", destination),
                Err(ProviderError::InvalidPath(destination.to_string()))
            );
        }
        assert_eq!(
            provider.enumerate_folders(drive(), r"\").unwrap(),
            ["RootFolder1", "RootFolder2", "RootFolder3"]
        );
        assert_eq!(
            provider.enumerate_folders(drive(), r"\RootFolder1").unwrap(),
            ["SubFolder1"]
        );

        provider
            .move_file(drive(), r"\RootFolder1", r"\RootFolder10")
            .unwrap();
        assert_eq!(
            provider.enumerate_folders(drive(), r"\").unwrap(),
            ["RootFolder2", "RootFolder3", "RootFolder10"]
        );
    }

    #[test]
    fn drives_have_separate_trees() {
        let provider = SampleProvider::new();
        provider.delete_file(drive(), r"\Z File.txt").unwrap();
        let other = Uuid::new_v4();
        assert_eq!(provider.enumerate_files(other, r"\").unwrap().len(), 3);
        assert_eq!(provider.enumerate_files(drive(), r"\").unwrap().len(), 2);
    }

    #[test]
    fn open_file_materializes_a_temp_copy() {
        let provider = SampleProvider::new();
        let local = provider.open_file(drive(), r"\A File.txt").unwrap();
        assert_eq!(fs::read(&local).unwrap(), include_bytes!("../resources/A File.txt"));
        fs::remove_file(local).unwrap();
    }

    #[test]
    fn opening_a_missing_file_leaves_no_temp_file() {
        fn leftovers() -> usize {
            fs::read_dir(std::env::temp_dir())
                .unwrap()
                .filter_map(|e| e.ok())
                .filter(|e| {
                    e.file_name()
                        .to_string_lossy()
                        .ends_with("-no-such-open-target.txt")
                })
                .count()
        }
        let provider = SampleProvider::new();
        assert_eq!(
            provider.open_file(drive(), r"\no-such-open-target.txt"),
            Err(ProviderError::NotFound(r"\no-such-open-target.txt".to_string()))
        );
        assert_eq!(leftovers(), 0);
    }

    #[test]
    fn registers_under_its_clsid() {
        let providers = ProviderManager::new(Arc::new(MemoryHive::new()));
        SampleProvider::new().register(&providers).unwrap();
        assert_eq!(providers.read(CLSID).unwrap().name, PROVIDER_NAME);
    }
}
