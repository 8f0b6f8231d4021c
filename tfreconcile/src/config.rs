//! Provider-wide configuration
//!
//! Everything a provider needs to build its API client. It is passed to
//! [`Provider::configure`](crate::provider::Provider::configure) explicitly
//! instead of living in a global.

use crate::error::{ReconcileError, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_CLOUD: &str = "myhuaweicloud.com";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    pub region: String,
    pub project_id: String,
    pub auth_token: String,
    /// Base domain used to derive service endpoints
    pub cloud: String,
    /// Per-service endpoint overrides, keyed by service name
    pub endpoints: BTreeMap<String, String>,
    /// Skip TLS certificate verification
    pub insecure: bool,
    pub request_timeout: Duration,
}

impl ProviderConfig {
    pub fn new(region: &str, project_id: &str, auth_token: &str) -> Self {
        Self {
            region: region.to_string(),
            project_id: project_id.to_string(),
            auth_token: auth_token.to_string(),
            cloud: DEFAULT_CLOUD.to_string(),
            endpoints: BTreeMap::new(),
            insecure: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_endpoint(mut self, service: &str, url: &str) -> Self {
        self.endpoints
            .insert(service.to_string(), url.trim_end_matches('/').to_string());
        self
    }

    pub fn with_cloud(mut self, cloud: &str) -> Self {
        self.cloud = cloud.to_string();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Region, project and token must all be present
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("region", &self.region),
            ("project_id", &self.project_id),
            ("auth_token", &self.auth_token),
        ]
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

        if !missing.is_empty() {
            return Err(ReconcileError::Config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }
        if self.request_timeout.is_zero() {
            return Err(ReconcileError::Config(
                "request_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL for a service: the override if one is set, otherwise
    /// `https://{service}.{region}.{cloud}`
    pub fn endpoint(&self, service: &str) -> String {
        match self.endpoints.get(service) {
            Some(url) => url.clone(),
            None => format!("https://{}.{}.{}", service, self.region, self.cloud),
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("region", &self.region)
            .field("project_id", &self.project_id)
            .field("auth_token", &"<redacted>")
            .field("cloud", &self.cloud)
            .field("endpoints", &self.endpoints)
            .field("insecure", &self.insecure)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
