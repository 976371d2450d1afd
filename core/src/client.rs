//! Entry point tying one configuration to its resource clients.
//!
//! # Design
//! `PlatformClient` owns a single [`CredentialManager`] behind an `Arc`.
//! Every resource client it hands out carries a [`RequestExecutor`] pointing
//! at that same manager, so a token fetched (or renewed) by one client is
//! used by all of them. Two `PlatformClient`s never share credentials.

use std::sync::Arc;

use crate::compute::ComputeClient;
use crate::config::Configuration;
use crate::error::Result;
use crate::executor::RequestExecutor;
use crate::http::Transport;
use crate::identity::CredentialManager;
use crate::locks::LocksClient;
use crate::metadata::MetadataClient;
use crate::restrictions::RestrictionsClient;

#[derive(Debug, Clone)]
pub struct PlatformClient {
    config: Configuration,
    executor: RequestExecutor,
}

impl PlatformClient {
    pub fn new(config: Configuration, transport: Arc<dyn Transport>) -> Self {
        let credentials = Arc::new(CredentialManager::new(&config, transport.clone()));
        Self {
            config,
            executor: RequestExecutor::new(credentials, transport),
        }
    }

    /// Builds a client from `PLATFORM_*` environment variables.
    pub fn from_env(transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self::new(Configuration::from_env()?, transport))
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// The credential cache shared by every resource client of this instance.
    pub fn identity(&self) -> &Arc<CredentialManager> {
        self.executor.credentials()
    }

    pub fn locks(&self) -> LocksClient {
        LocksClient::new(self.config.metadata_url(), self.executor.clone())
    }

    pub fn metadata(&self) -> MetadataClient {
        MetadataClient::new(self.config.metadata_url(), self.executor.clone())
    }

    pub fn restrictions(&self) -> RestrictionsClient {
        RestrictionsClient::new(self.config.metadata_url(), self.executor.clone())
    }

    pub fn compute(&self) -> ComputeClient {
        ComputeClient::new(self.config.compute_url(), self.executor.clone())
    }
}
