use super::*;
use crate::event_sources::{retry, EventSourceManager, RetryPolicy};
use bigdrive_common::event_log::EVENT_LOG_SERVICE;
use bigdrive_common::hive::RegistryStore;
use bigdrive_common::ipc::bigdrive_service::BigDriveServiceClient;
use std::sync::Arc;
use uuid::Uuid;

pub async fn create_client(ip: IpAddr, port: u16) -> Result<BigDriveServiceClient> {
    let server_addr = (ip, port);
    let transport = tarpc::serde_transport::tcp::connect(&server_addr, Json::default)
        .await
        .map_err(|e| {
            debug!("Could not connect to {ip}:{port}");
            e
        })?;
    let service = BigDriveServiceClient::new(client::Config::default(), transport);
    let client = service.spawn();
    Ok(client)
}

/// Connects to the service, waiting for it to come up.
pub async fn connect(config: &Configuration) -> Result<BigDriveServiceClient> {
    retry(
        RetryPolicy::from_config(config),
        "BigDrive.Service connection",
        || create_client(config.ip, config.port),
    )
    .await
}

/// Asks the running service to validate itself and checks that it logged the activity.
pub async fn validate(config: &Configuration, hive: Arc<dyn RegistryStore>) -> Result<()> {
    println!("Validating {}...", SERVICE_APPLICATION_NAME);
    let client = connect(config).await?;
    let events = EventSourceManager::for_application(hive, config, EVENT_LOG_SERVICE);
    events
        .verify_logging(Uuid::new_v4(), |activity| async move {
            client
                .validate(tarpc::context::current(), activity)
                .await??;
            Ok::<_, anyhow::Error>(())
        })
        .await
}
