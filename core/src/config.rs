//! Endpoint and credential configuration.
//!
//! A `Configuration` is plain data. Every resource client built from the
//! same `PlatformClient` shares one credential cache; two configurations
//! never share anything.

use std::fmt;

use crate::error::{ApiError, Result};

pub const DEFAULT_IDENTITY_URL: &str = "https://flightdeck.cplane.cloud/v1";
pub const DEFAULT_COMPUTE_URL: &str = "https://compute.cplane.cloud/v2beta";
pub const DEFAULT_METADATA_URL: &str = "https://metadata.cplane.cloud/v1";

pub const ENV_API_KEY: &str = "PLATFORM_API_KEY";
pub const ENV_IDENTITY_URL: &str = "PLATFORM_IDENTITY_URL";
pub const ENV_COMPUTE_URL: &str = "PLATFORM_COMPUTE_URL";
pub const ENV_METADATA_URL: &str = "PLATFORM_METADATA_URL";

#[derive(Clone, PartialEq, Eq)]
pub struct Configuration {
    api_key: String,
    identity_url: String,
    compute_url: String,
    metadata_url: String,
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("api_key", &"<redacted>")
            .field("identity_url", &self.identity_url)
            .field("compute_url", &self.compute_url)
            .field("metadata_url", &self.metadata_url)
            .finish()
    }
}

impl Configuration {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            identity_url: DEFAULT_IDENTITY_URL.to_string(),
            compute_url: DEFAULT_COMPUTE_URL.to_string(),
            metadata_url: DEFAULT_METADATA_URL.to_string(),
        }
    }

    /// Reads the configuration from `PLATFORM_*` environment variables.
    /// Only the API key is required.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup(ENV_API_KEY)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ApiError::Validation(format!("{ENV_API_KEY} is not set")))?;
        let mut config = Self::new(api_key);
        if let Some(url) = lookup(ENV_IDENTITY_URL) {
            config = config.with_identity_url(&url);
        }
        if let Some(url) = lookup(ENV_COMPUTE_URL) {
            config = config.with_compute_url(&url);
        }
        if let Some(url) = lookup(ENV_METADATA_URL) {
            config = config.with_metadata_url(&url);
        }
        Ok(config)
    }

    pub fn with_identity_url(mut self, url: &str) -> Self {
        self.identity_url = normalize(url);
        self
    }

    pub fn with_compute_url(mut self, url: &str) -> Self {
        self.compute_url = normalize(url);
        self
    }

    /// Base URL of the locks, metadata and restrictions services.
    pub fn with_metadata_url(mut self, url: &str) -> Self {
        self.metadata_url = normalize(url);
        self
    }

    /// Points every service at the same base URL.
    pub fn with_base_url(self, url: &str) -> Self {
        self.with_identity_url(url)
            .with_compute_url(url)
            .with_metadata_url(url)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn identity_url(&self) -> &str {
        &self.identity_url
    }

    pub fn compute_url(&self) -> &str {
        &self.compute_url
    }

    pub fn metadata_url(&self) -> &str {
        &self.metadata_url
    }
}

fn normalize(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}
