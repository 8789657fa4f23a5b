use super::*;
use crate::hosting::{HostedProvider, ProviderHost};
use crate::provision::{HiveShellIntegration, Provisioner, TracingShellNotifier};
use bigdrive_common::error::EventLogError;
use bigdrive_common::event_log::{EventLog, EVENT_LOG_SERVICE};
use bigdrive_common::hive::{FileHive, RegistryStore};
use bigdrive_common::ipc::bigdrive_service::{errors::*, *};
use bigdrive_common::manager::{DriveManager, ProviderManager};
use bigdrive_common::model::guid;
use bigdrive_provider_sample::SampleProvider;
use chrono::{DateTime, Utc};
use std::net::{IpAddr, Ipv6Addr};
use std::path::PathBuf;
use std::sync::Arc;
use tarpc::context::Context;
use uuid::Uuid;

#[derive(Clone)]
pub(crate) struct BigDriveServer {
    drives: DriveManager,
    providers: ProviderManager,
    provisioner: Arc<Provisioner>,
    host: ProviderHost,
    event_log: EventLog,
    /// Account the service process runs as, possibly `DOMAIN\user`.
    account: String,
    installer_user: String,
}

impl BigDriveServer {
    fn provider_for(
        &self,
        drive: Uuid,
    ) -> StdResult<Arc<dyn HostedProvider>, ProviderCallError> {
        let configuration = self.drives.read(drive)?;
        self.host
            .get(configuration.clsid)
            .ok_or(ProviderCallError::NoProvider(configuration.clsid))
    }
}

fn account_name(account: &str) -> &str {
    account.rsplit('\\').next().unwrap_or(account)
}

impl BigDriveService for BigDriveServer {
    async fn get_configuration(
        self,
        _context: Context,
        id: Uuid,
    ) -> StdResult<String, ConfigurationServiceError> {
        let drive = self.drives.read(id)?;
        drive
            .to_json()
            .map_err(|e| ConfigurationServiceError::Other(e.to_string()))
    }

    async fn list_drives(
        self,
        _context: Context,
    ) -> StdResult<Vec<DriveConfiguration>, ConfigurationServiceError> {
        match self.drives.read_all() {
            Ok(drives) => Ok(drives.collect::<ConfigurationResult<Vec<_>>>()?),
            Err(ConfigurationError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn list_providers(
        self,
        _context: Context,
    ) -> StdResult<Vec<ProviderConfiguration>, ConfigurationServiceError> {
        match self.providers.read_all() {
            Ok(providers) => Ok(providers.collect::<ConfigurationResult<Vec<_>>>()?),
            Err(ConfigurationError::NotFound(_)) => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn create(self, _context: Context, id: Uuid) -> StdResult<(), ConfigurationServiceError> {
        self.provisioner.create_drive(id).map_err(|e| {
            error!("Create({id}) failed: {e}");
            e.into()
        })
    }

    async fn create_from_configuration(
        self,
        _context: Context,
        json: String,
    ) -> StdResult<(), ConfigurationServiceError> {
        self.provisioner
            .create_drive_from_configuration(&json)
            .map_err(|e| {
                error!("CreateFromConfiguration failed: {e}");
                e.into()
            })
    }

    async fn validate(self, _context: Context, activity_id: Uuid) -> StdResult<(), ValidateError> {
        let activity = guid::format(activity_id);
        let actual = account_name(&self.account);
        let write_failed = |e: EventLogError| ValidateError::EventLog(e.to_string());
        if actual.eq_ignore_ascii_case(&self.installer_user) {
            self.event_log
                .information(format!("Validate {activity}: service runs as {actual}"))
                .map_err(write_failed)?;
            Ok(())
        } else {
            self.event_log
                .error(format!(
                    "Validate {activity}: service runs as {actual}, expected {}",
                    self.installer_user
                ))
                .map_err(write_failed)?;
            Err(ValidateError::Unauthorized {
                actual: actual.to_string(),
                expected: self.installer_user.clone(),
            })
        }
    }

    async fn enumerate_folders(
        self,
        _context: Context,
        drive: Uuid,
        path: String,
    ) -> StdResult<Vec<String>, ProviderCallError> {
        Ok(self.provider_for(drive)?.enumerate_folders(drive, &path)?)
    }

    async fn enumerate_files(
        self,
        _context: Context,
        drive: Uuid,
        path: String,
    ) -> StdResult<Vec<String>, ProviderCallError> {
        Ok(self.provider_for(drive)?.enumerate_files(drive, &path)?)
    }

    async fn last_modified_time(
        self,
        _context: Context,
        drive: Uuid,
        path: String,
    ) -> StdResult<DateTime<Utc>, ProviderCallError> {
        Ok(self.provider_for(drive)?.last_modified_time(drive, &path)?)
    }

    async fn file_size(
        self,
        _context: Context,
        drive: Uuid,
        path: String,
    ) -> StdResult<u64, ProviderCallError> {
        Ok(self.provider_for(drive)?.file_size(drive, &path)?)
    }

    async fn file_data(
        self,
        _context: Context,
        drive: Uuid,
        path: String,
    ) -> StdResult<Vec<u8>, ProviderCallError> {
        Ok(self.provider_for(drive)?.file_data(drive, &path)?)
    }

    async fn copy_file_to_drive(
        self,
        _context: Context,
        drive: Uuid,
        local: PathBuf,
        target: String,
    ) -> StdResult<(), ProviderCallError> {
        Ok(self
            .provider_for(drive)?
            .copy_file_to_drive(drive, &local, &target)?)
    }

    async fn copy_file_from_drive(
        self,
        _context: Context,
        drive: Uuid,
        source: String,
        local: PathBuf,
    ) -> StdResult<(), ProviderCallError> {
        Ok(self
            .provider_for(drive)?
            .copy_file_from_drive(drive, &source, &local)?)
    }

    async fn delete_file(
        self,
        _context: Context,
        drive: Uuid,
        path: String,
    ) -> StdResult<(), ProviderCallError> {
        Ok(self.provider_for(drive)?.delete_file(drive, &path)?)
    }

    async fn create_directory(
        self,
        _context: Context,
        drive: Uuid,
        path: String,
    ) -> StdResult<(), ProviderCallError> {
        Ok(self.provider_for(drive)?.create_directory(drive, &path)?)
    }

    async fn move_file(
        self,
        _context: Context,
        drive: Uuid,
        source: String,
        destination: String,
    ) -> StdResult<(), ProviderCallError> {
        Ok(self
            .provider_for(drive)?
            .move_file(drive, &source, &destination)?)
    }

    async fn open_file(
        self,
        _context: Context,
        drive: Uuid,
        path: String,
    ) -> StdResult<PathBuf, ProviderCallError> {
        Ok(self.provider_for(drive)?.open_file(drive, &path)?)
    }
}

fn build_server(
    config: &Configuration,
    hive: Arc<dyn RegistryStore>,
    host: ProviderHost,
) -> Result<BigDriveServer> {
    let providers = ProviderManager::new(hive.clone());
    host.register_all(&providers)?;

    let shell = match &config.module_path {
        Some(path) => HiveShellIntegration::new(hive.clone(), path.clone()),
        None => HiveShellIntegration::with_default_module(hive.clone()),
    };
    let drives = DriveManager::new(hive);
    let provisioner = Provisioner::new(
        drives.clone(),
        Arc::new(shell),
        Arc::new(TracingShellNotifier),
    );
    let removed = provisioner.clean_up_shell_folders()?;
    let registered = provisioner.register_all()?;
    info!("Shell folders: {removed} removed, {registered} registered");

    let event_log = EventLog::for_application(&config.log_dir, EVENT_LOG_SERVICE);
    if !event_log.exists() {
        warn!(
            "Event source {} is missing; run the setup tool before validating",
            event_log.source()
        );
    }

    let account = uzers::get_current_username()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!("Service runs as '{account}'");

    Ok(BigDriveServer {
        drives,
        providers,
        provisioner: Arc::new(provisioner),
        host,
        event_log,
        account,
        installer_user: config.installer_user.clone(),
    })
}

pub async fn start(config: &Configuration) -> Result<()> {
    info!("Config: {:?}", config);

    let hive: Arc<dyn RegistryStore> = Arc::new(FileHive::open(&config.hive_path)?);
    let host = ProviderHost::new().with_provider(SampleProvider::new());
    let server = build_server(config, hive, host)?;

    let server_addr = (config.ip, config.port);
    let mut listener = tarpc::serde_transport::tcp::listen(&server_addr, Json::default).await?;
    listener.config_mut().max_frame_length(usize::MAX);

    info!("Listening on {}", listener.local_addr());
    listener
        // Ignore accept errors.
        .filter_map(|r| future::ready(r.ok()))
        .map(server::BaseChannel::with_defaults)
        .max_channels_per_key(4, |t| {
            t.transport()
                .peer_addr()
                .map(|addr| addr.ip())
                .unwrap_or(IpAddr::V6(Ipv6Addr::UNSPECIFIED))
        })
        .map(|channel| {
            let server = server.clone();
            channel.execute(server.serve()).for_each(spawn)
        })
        // Max 10 channels.
        .buffer_unordered(10)
        .for_each(|_| async {})
        .await;
    Ok(())
}
