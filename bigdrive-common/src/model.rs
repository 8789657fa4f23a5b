mod application;
mod drive;
pub mod guid;
mod provider;

pub use application::{
    ApplicationConfiguration, ApplicationIdentity, SERVICE_APPLICATION_ID, SERVICE_APPLICATION_NAME,
};
pub use drive::DriveConfiguration;
pub use provider::ProviderConfiguration;
