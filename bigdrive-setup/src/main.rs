use crate::prelude::*;
use bigdrive_common::config;
use bigdrive_common::hive::{FileHive, RegistryStore};
use bigdrive_common::manager::ApplicationManager;
use bigdrive_common::model::SERVICE_APPLICATION_NAME;
use std::net::IpAddr;
use std::sync::Arc;
use tarpc::{client, tokio_serde::formats::Json};

mod accounts;
mod event_sources;
mod prelude;
mod service;

#[tokio::main]
async fn main() -> Result<()> {
    bigdrive_common::tracing_setup::init_tracing();
    if !accounts::is_elevated() {
        println!("Administrative Rights Required.");
        return Ok(());
    }
    let config = config::load_config()?;
    info!("Config: {:?}", config);
    let hive: Arc<dyn RegistryStore> = Arc::new(FileHive::open(&config.hive_path)?);

    println!("Bootstrapping BigDrive Event Logs...");
    event_sources::bootstrap(&config, hive.clone()).await?;

    println!("Checking installer account {}...", config.installer_user);
    accounts::check_installer_account(&config.installer_user);

    println!("Registering {}...", SERVICE_APPLICATION_NAME);
    accounts::recreate_service_application(
        &ApplicationManager::new(hive.clone()),
        &config.installer_user,
    )?;

    service::validate(&config, hive).await?;
    println!("BigDrive setup complete.");
    Ok(())
}
