//! Event source bootstrap: every BigDrive application gets a registered
//! source and an empty, verified log before anything else is installed.

use crate::prelude::*;
use anyhow::{anyhow, bail};
use bigdrive_common::event_log::{EventLog, APPLICATIONS, LOG_NAME};
use bigdrive_common::hive::{RegistryPath, RegistryStore};
use bigdrive_common::model::guid;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const EVENT_LOG_ROOT: &str = r"SYSTEM\CurrentControlSet\Services\EventLog";
/// Keep entries until the log is cleared.
pub const RETENTION: u32 = 0;
pub const MAX_SIZE: u32 = 1_024_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub retries: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Configuration) -> Self {
        Self {
            retries: config.event_source_retries,
            interval: Duration::from_secs(config.event_source_retry_interval_secs),
        }
    }
}

/// Runs `op` until it succeeds or `policy.retries` retries have failed.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let started = Instant::now();
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.retries => {
                attempt += 1;
                warn!(
                    "Retry {attempt} for '{what}' after {:.1} seconds. Error: {e}",
                    started.elapsed().as_secs_f64()
                );
                tokio::time::sleep(policy.interval).await;
            }
            Err(e) => return Err(e),
        }
    }
}

pub struct EventSourceManager {
    hive: Arc<dyn RegistryStore>,
    log: EventLog,
    policy: RetryPolicy,
}

impl EventSourceManager {
    pub fn new(hive: Arc<dyn RegistryStore>, log: EventLog, policy: RetryPolicy) -> Self {
        Self { hive, log, policy }
    }

    pub fn for_application(
        hive: Arc<dyn RegistryStore>,
        config: &Configuration,
        application: &str,
    ) -> Self {
        Self::new(
            hive,
            EventLog::for_application(&config.log_dir, application),
            RetryPolicy::from_config(config),
        )
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    fn source_key(&self) -> Result<RegistryPath> {
        Ok(RegistryPath::parse(EVENT_LOG_ROOT)?
            .join(LOG_NAME)?
            .join(self.log.source())?)
    }

    pub fn source_exists(&self) -> Result<bool> {
        Ok(self.hive.key_exists(&self.source_key()?)? && self.log.exists())
    }

    fn register_source(&self) -> Result<()> {
        let key = self.source_key()?;
        self.hive.create_key(&key)?;
        self.hive.set_value(&key, "Retention", RETENTION.into())?;
        self.hive.set_value(&key, "MaxSize", MAX_SIZE.into())?;
        self.log.create()?;
        Ok(())
    }

    /// Registers the source, waits for it to show up, and proves it can be written.
    ///
    /// The whole sequence is attempted twice.
    #[instrument(skip(self), fields(source = %self.log.source()))]
    pub async fn create_event_source(&self) -> Result<()> {
        println!("  Creating Event Source: {}...", self.log.source());
        let once = RetryPolicy {
            retries: 1,
            interval: self.policy.interval,
        };
        retry(once, self.log.source(), || async move {
            if !self.source_exists()? {
                self.register_source()?;
            }
            self.wait_for_event_source().await?;
            self.verify_logging(Uuid::new_v4(), |id| async move {
                self.log
                    .information(format!("Activity ID: {} - Test Message.", guid::format(id)))?;
                Ok::<_, anyhow::Error>(())
            })
            .await
        })
        .await
    }

    pub async fn wait_for_event_source(&self) -> Result<()> {
        retry(self.policy, self.log.source(), || async move {
            if self.source_exists()? {
                debug!("Event Source '{}' Exists.", self.log.source());
                Ok(())
            } else {
                Err(anyhow!("Event Source '{}' doesn't exist.", self.log.source()))
            }
        })
        .await
    }

    /// Clears the log, runs `action`, and requires an entry naming `activity_id` afterwards.
    pub async fn verify_logging<F, Fut>(&self, activity_id: Uuid, action: F) -> Result<()>
    where
        F: FnOnce(Uuid) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        if !self.source_exists()? {
            bail!("Event Source '{}' does not exist.", self.log.source());
        }
        self.log.clear()?;
        action(activity_id).await?;

        println!("  Verifying Event Source: {}...", self.log.source());
        if self.log.contains(&guid::format(activity_id))? {
            println!("  Log entry successfully written to the custom Event Log.");
            Ok(())
        } else {
            bail!(
                "Log entry not found in the custom event source {}.",
                self.log.source()
            )
        }
    }
}

pub async fn bootstrap(config: &Configuration, hive: Arc<dyn RegistryStore>) -> Result<()> {
    for application in APPLICATIONS {
        EventSourceManager::for_application(hive.clone(), config, application)
            .create_event_source()
            .await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdrive_common::event_log::EVENT_LOG_PROVIDER_SAMPLE;
    use bigdrive_common::hive::{MemoryHive, RegistryValue};
    use std::cell::Cell;
    use std::sync::atomic::{AtomicBool, Ordering};

    const IMMEDIATE: RetryPolicy = RetryPolicy {
        retries: 5,
        interval: Duration::ZERO,
    };

    fn manager(dir: &std::path::Path, hive: Arc<dyn RegistryStore>) -> EventSourceManager {
        EventSourceManager::new(
            hive,
            EventLog::for_application(dir, EVENT_LOG_PROVIDER_SAMPLE),
            IMMEDIATE,
        )
    }

    #[tokio::test]
    async fn retry_gives_up_after_the_configured_retries() {
        let calls = Cell::new(0);
        let result: Result<()> = retry(IMMEDIATE, "always failing", || {
            calls.set(calls.get() + 1);
            async { Err(anyhow!("nope")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.get(), 6);
    }

    #[tokio::test]
    async fn retry_returns_the_first_success() {
        let calls = Cell::new(0);
        let value = retry(IMMEDIATE, "third time lucky", || {
            calls.set(calls.get() + 1);
            let n = calls.get();
            async move {
                if n < 3 {
                    Err(anyhow!("not yet"))
                } else {
                    Ok(n)
                }
            }
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn creates_and_verifies_a_source() {
        let dir = tempfile::tempdir().unwrap();
        let hive: Arc<dyn RegistryStore> = Arc::new(MemoryHive::new());
        let manager = manager(dir.path(), hive.clone());

        manager.create_event_source().await.unwrap();
        assert!(manager.source_exists().unwrap());
        let key = RegistryPath::parse(
            r"SYSTEM\CurrentControlSet\Services\EventLog\BigDrive\BigDrive.Provider.Sample",
        )
        .unwrap();
        assert_eq!(
            hive.get_value(&key, "MaxSize").unwrap(),
            Some(RegistryValue::DWord(1_024_000))
        );
        assert_eq!(manager.log().entries().unwrap().len(), 1);
    }

    /// Fails the first value write, then behaves like the wrapped hive.
    #[derive(Debug, Default)]
    struct FlakyHive {
        inner: MemoryHive,
        failed: AtomicBool,
    }

    impl RegistryStore for FlakyHive {
        fn key_exists(&self, path: &RegistryPath) -> HiveResult<bool> {
            self.inner.key_exists(path)
        }

        fn create_key(&self, path: &RegistryPath) -> HiveResult<()> {
            self.inner.create_key(path)
        }

        fn delete_key_tree(&self, path: &RegistryPath) -> HiveResult<()> {
            self.inner.delete_key_tree(path)
        }

        fn subkey_names(&self, path: &RegistryPath) -> HiveResult<Option<Vec<String>>> {
            self.inner.subkey_names(path)
        }

        fn value_names(&self, path: &RegistryPath) -> HiveResult<Option<Vec<String>>> {
            self.inner.value_names(path)
        }

        fn get_value(&self, path: &RegistryPath, name: &str) -> HiveResult<Option<RegistryValue>> {
            self.inner.get_value(path, name)
        }

        fn set_value(
            &self,
            path: &RegistryPath,
            name: &str,
            value: RegistryValue,
        ) -> HiveResult<()> {
            if !self.failed.swap(true, Ordering::SeqCst) {
                return Err(HiveError::InvalidPath(path.to_string()));
            }
            self.inner.set_value(path, name, value)
        }
    }

    #[tokio::test]
    async fn creating_a_source_survives_one_failed_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let hive = Arc::new(FlakyHive::default());
        let manager = manager(dir.path(), hive.clone());

        manager.create_event_source().await.unwrap();
        assert!(hive.failed.load(Ordering::SeqCst));
        assert!(manager.source_exists().unwrap());
        assert_eq!(manager.log().entries().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn waiting_for_a_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), Arc::new(MemoryHive::new()));
        assert!(manager.wait_for_event_source().await.is_err());
    }

    #[tokio::test]
    async fn verify_logging_requires_the_activity_entry() {
        let dir = tempfile::tempdir().unwrap();
        let manager = manager(dir.path(), Arc::new(MemoryHive::new()));
        manager.create_event_source().await.unwrap();

        let result = manager
            .verify_logging(Uuid::new_v4(), |_| async {
                manager.log().information("unrelated")?;
                Ok::<_, anyhow::Error>(())
            })
            .await;
        assert!(result.is_err());
    }
}
