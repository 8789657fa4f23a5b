use crate::project_dirs::PROJECT_DIRS;
use confique::{Config, Partial};
use serde::Serialize;
use std::net::{IpAddr, Ipv6Addr};
use std::path::{Path, PathBuf};

const IP_DEFAULT: IpAddr = IpAddr::V6(Ipv6Addr::LOCALHOST);

#[derive(Debug, Serialize, Config, Clone)]
pub struct Configuration {
    #[config(env = "BIGDRIVE_PORT", default = 33333)]
    pub port: u16,
    pub ip: IpAddr,
    /// Root directory of the on-disk hive.
    #[config(env = "BIGDRIVE_HIVE")]
    pub hive_path: PathBuf,
    /// One subdirectory per event log, one file per event source.
    #[config(env = "BIGDRIVE_LOG_DIR")]
    pub log_dir: PathBuf,
    /// Account the service application runs as.
    #[config(env = "BIGDRIVE_INSTALLER_USER", default = "BigDriveInstaller")]
    pub installer_user: String,
    #[config(default = 5)]
    pub event_source_retries: u32,
    #[config(default = 10)]
    pub event_source_retry_interval_secs: u64,
    /// Written to `InprocServer32` of every registered drive folder.
    pub module_path: Option<PathBuf>,
}

pub fn load_config() -> Result<Configuration, confique::Error> {
    add_default_locations(Config::builder()).load()
}

pub fn load_config_with_path(path: &Path) -> Result<Configuration, confique::Error> {
    add_default_locations(Config::builder().file(path)).load()
}

fn add_default_locations(
    builder: confique::Builder<Configuration>,
) -> confique::Builder<Configuration> {
    type P = <Configuration as Config>::Partial;
    let data_dir = PROJECT_DIRS.data_dir();
    let prebuilt = P {
        ip: Some(IP_DEFAULT),
        hive_path: Some(data_dir.join("hive")),
        log_dir: Some(data_dir.join("logs")),
        ..P::empty()
    };
    builder.env().file("config.toml").preloaded(prebuilt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "port = 4444\nhive_path = \"/tmp/bigdrive-hive\"\nmodule_path = \"/opt/bigdrive/shellfolder.so\""
        )
        .unwrap();

        let config = load_config_with_path(file.path()).unwrap();
        assert_eq!(config.port, 4444);
        assert_eq!(config.hive_path, PathBuf::from("/tmp/bigdrive-hive"));
        assert_eq!(
            config.module_path,
            Some(PathBuf::from("/opt/bigdrive/shellfolder.so"))
        );
        assert_eq!(config.ip, IP_DEFAULT);
        assert_eq!(config.installer_user, "BigDriveInstaller");
        assert_eq!(config.event_source_retries, 5);
        assert_eq!(config.log_dir, PROJECT_DIRS.data_dir().join("logs"));
    }
}
