use crate::prelude::*;
use bigdrive_common::manager::ProviderManager;
use bigdrive_common::provider::{DriveProvider, ProviderRegistration};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// A provider the service can both register and route drive operations to.
pub trait HostedProvider: DriveProvider + ProviderRegistration {}

impl<T: DriveProvider + ProviderRegistration> HostedProvider for T {}

/// The providers running inside this service, keyed by class id.
#[derive(Default, Clone)]
pub struct ProviderHost {
    providers: HashMap<Uuid, Arc<dyn HostedProvider>>,
}

impl ProviderHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: impl HostedProvider + 'static) -> Self {
        let clsid = provider.configuration().id;
        self.providers.insert(clsid, Arc::new(provider));
        self
    }

    pub fn get(&self, clsid: Uuid) -> Option<Arc<dyn HostedProvider>> {
        self.providers.get(&clsid).cloned()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Writes the provider record of every hosted provider.
    #[instrument(skip_all)]
    pub fn register_all(&self, providers: &ProviderManager) -> ConfigurationResult<()> {
        for provider in self.providers.values() {
            let configuration = provider.configuration();
            provider.register(providers)?;
            info!(id = %configuration.id, name = %configuration.name, "Provider registered");
        }
        Ok(())
    }
}
