//! Turns drive configurations into shell folders.
//!
//! The [`Provisioner`] validates and persists drive records, then hands the
//! drive to a [`ShellIntegration`] and asks the [`ShellNotifier`] to refresh.

use crate::prelude::*;
use bigdrive_common::hive::{RegistryPath, RegistryStore, RegistryValue, DEFAULT_VALUE};
use bigdrive_common::manager::DriveManager;
use bigdrive_common::model::guid;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub const CLSID_ROOT: &str = r"Classes\CLSID";
pub const SHELL_FOLDER_CATEGORY: &str = "{00021490-0000-0000-C000-000000000046}";
pub const IMPLEMENTATIONS_ROOT: &str =
    r"Classes\Component Categories\{00021493-0000-0000-C000-000000000046}\Implementations";
pub const NAMESPACE_ROOT: &str =
    r"Software\Microsoft\Windows\CurrentVersion\Explorer\MyComputer\NameSpace";
pub const SHELL_FOLDER_MODULE: &str = "BigDrive.ShellFolder.dll";
pub const DEFAULT_ICON: &str = r"%SystemRoot%\System32\imageres.dll,-30";

/// `SFGAO_FOLDER | SFGAO_HASSUBFOLDER | SFGAO_FILESYSANCESTOR`
pub const SHELL_FOLDER_ATTRIBUTES: u32 = 0xB000_0000;

pub trait ShellIntegration: Send + Sync {
    fn register_shell_folder(&self, id: Uuid, name: &str) -> ConfigurationResult<()>;

    /// Missing registrations are ignored.
    fn unregister_shell_folder(&self, id: Uuid) -> ConfigurationResult<()>;

    /// Ids of every shell folder this integration registered.
    fn registered_shell_folders(&self) -> ConfigurationResult<Vec<Uuid>>;
}

pub trait ShellNotifier: Send + Sync {
    /// Tells the shell that "My PC" changed.
    fn refresh(&self);
}

#[derive(Debug, Default)]
pub struct TracingShellNotifier;

impl ShellNotifier for TracingShellNotifier {
    fn refresh(&self) {
        info!("Shell namespace changed; refreshing My PC");
    }
}

/// Writes shell folder registrations into a hive, laid out like the Windows registry.
#[derive(Debug)]
pub struct HiveShellIntegration {
    hive: Arc<dyn RegistryStore>,
    module_path: PathBuf,
}

impl HiveShellIntegration {
    pub fn new(hive: Arc<dyn RegistryStore>, module_path: PathBuf) -> Self {
        Self { hive, module_path }
    }

    /// Uses the shell folder module next to the running executable.
    pub fn with_default_module(hive: Arc<dyn RegistryStore>) -> Self {
        let module_path = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(SHELL_FOLDER_MODULE)))
            .unwrap_or_else(|| PathBuf::from(SHELL_FOLDER_MODULE));
        Self::new(hive, module_path)
    }

    fn module_value(&self) -> String {
        self.module_path.display().to_string()
    }

    fn clsid_key(id: Uuid) -> HiveResult<RegistryPath> {
        RegistryPath::parse(CLSID_ROOT)?.join(guid::format(id))
    }

    fn key_with_values(
        &self,
        path: &RegistryPath,
        values: &[(&str, RegistryValue)],
    ) -> HiveResult<()> {
        self.hive.create_key(path)?;
        for (name, value) in values {
            self.hive.set_value(path, name, value.clone())?;
        }
        Ok(())
    }
}

fn require_id(id: Uuid) -> ConfigurationResult<()> {
    if id.is_nil() {
        return Err(ConfigurationError::InvalidArgument(
            "Guid cannot be empty.".to_string(),
        ));
    }
    Ok(())
}

impl ShellIntegration for HiveShellIntegration {
    #[instrument(skip(self))]
    fn register_shell_folder(&self, id: Uuid, name: &str) -> ConfigurationResult<()> {
        require_id(id)?;
        let clsid = Self::clsid_key(id)?;
        self.key_with_values(&clsid, &[(DEFAULT_VALUE, name.into())])?;
        self.key_with_values(
            &clsid.join("InprocServer32")?,
            &[
                (DEFAULT_VALUE, self.module_value().into()),
                ("ThreadingModel", "Apartment".into()),
            ],
        )?;
        self.key_with_values(
            &clsid
                .join("Implemented Categories")?
                .join(SHELL_FOLDER_CATEGORY)?,
            &[],
        )?;
        self.key_with_values(
            &clsid.join("ShellFolder")?,
            &[
                ("Attributes", SHELL_FOLDER_ATTRIBUTES.into()),
                ("FolderType", "Storage".into()),
            ],
        )?;
        self.key_with_values(
            &clsid.join("DefaultIcon")?,
            &[(DEFAULT_VALUE, DEFAULT_ICON.into())],
        )?;
        self.key_with_values(
            &RegistryPath::parse(IMPLEMENTATIONS_ROOT)?.join(guid::format(id))?,
            &[],
        )?;
        self.key_with_values(
            &RegistryPath::parse(NAMESPACE_ROOT)?.join(guid::format(id))?,
            &[(DEFAULT_VALUE, name.into())],
        )?;
        info!("Named: {name} Registered As An IShellFolder");
        Ok(())
    }

    #[instrument(skip(self))]
    fn unregister_shell_folder(&self, id: Uuid) -> ConfigurationResult<()> {
        require_id(id)?;
        let name = guid::format(id);
        self.hive.delete_key_tree(&Self::clsid_key(id)?)?;
        self.hive
            .delete_key_tree(&RegistryPath::parse(NAMESPACE_ROOT)?.join(name.as_str())?)?;
        self.hive
            .delete_key_tree(&RegistryPath::parse(IMPLEMENTATIONS_ROOT)?.join(name)?)?;
        Ok(())
    }

    fn registered_shell_folders(&self) -> ConfigurationResult<Vec<Uuid>> {
        let root = RegistryPath::parse(CLSID_ROOT)?;
        let Some(names) = self.hive.subkey_names(&root)? else {
            return Ok(Vec::new());
        };
        let module = self.module_value();
        let mut ids = Vec::new();
        for name in names {
            let Ok(id) = guid::parse(&name) else {
                continue;
            };
            let server = root.join(name)?.join("InprocServer32")?;
            let value = self.hive.get_value(&server, DEFAULT_VALUE)?;
            if matches!(value, Some(RegistryValue::String(path)) if path == module) {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

pub struct Provisioner {
    drives: DriveManager,
    shell: Arc<dyn ShellIntegration>,
    notifier: Arc<dyn ShellNotifier>,
}

impl Provisioner {
    pub fn new(
        drives: DriveManager,
        shell: Arc<dyn ShellIntegration>,
        notifier: Arc<dyn ShellNotifier>,
    ) -> Self {
        Self {
            drives,
            shell,
            notifier,
        }
    }

    /// Registers the shell folder of an already configured drive.
    ///
    /// A configured id is rejected with `AlreadyExists` before its record is
    /// read, and an unconfigured one has no record to read (`NotFound`).
    #[instrument(skip(self))]
    pub fn create_drive(&self, id: Uuid) -> ConfigurationResult<()> {
        if self.drives.exists(id)? {
            return Err(ConfigurationError::AlreadyExists(id));
        }
        let drive = self.drives.read(id)?;
        self.shell.register_shell_folder(drive.id, &drive.name)?;
        self.notifier.refresh();
        Ok(())
    }

    #[instrument(skip(self, json))]
    pub fn create_drive_from_configuration(&self, json: &str) -> ConfigurationResult<()> {
        let drive = self.drives.read_from_json(json)?.ok_or_else(|| {
            ConfigurationError::InvalidArgument(
                "Failed to deserialize drive configuration.".to_string(),
            )
        })?;
        if self.drives.exists(drive.id)? {
            return Err(ConfigurationError::AlreadyExists(drive.id));
        }
        self.drives.write(&drive)?;
        self.shell.register_shell_folder(drive.id, &drive.name)?;
        self.notifier.refresh();
        info!(id = %drive.id, name = %drive.name, "Drive created");
        Ok(())
    }

    /// Registers a shell folder for every configured drive, stopping at the first failure.
    #[instrument(skip(self))]
    pub fn register_all(&self) -> ConfigurationResult<usize> {
        let drives = match self.drives.read_all() {
            Ok(drives) => drives,
            Err(ConfigurationError::NotFound(_)) => return Ok(0),
            Err(e) => return Err(e),
        };
        let mut count = 0;
        for drive in drives {
            let drive = drive?;
            self.shell.register_shell_folder(drive.id, &drive.name)?;
            count += 1;
        }
        if count > 0 {
            self.notifier.refresh();
        }
        Ok(count)
    }

    /// Removes every shell folder registration, configured or not.
    #[instrument(skip(self))]
    pub fn clean_up_shell_folders(&self) -> ConfigurationResult<usize> {
        let ids = self.shell.registered_shell_folders()?;
        for id in &ids {
            self.shell.unregister_shell_folder(*id)?;
        }
        debug!("Removed {} shell folders", ids.len());
        Ok(ids.len())
    }
}
