pub use crate::config::Configuration;
pub use crate::error::{ConfigurationError, ConfigurationResult, HiveError, HiveResult};
pub use crate::ipc;
pub use crate::model::{DriveConfiguration, ProviderConfiguration};
pub mod result {
    pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

    pub use std::result::Result as StdResult;
}
pub(crate) use result::*;
pub use tracing::{debug, error, info, instrument, trace, warn};
