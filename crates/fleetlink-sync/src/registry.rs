//! Integration-to-connector resolution.
//!
//! Maps a configured [`Integration`] to a connector instance implementing
//! the full twin-synchronization capability set. One match arm per
//! provider keeps provider addition non-invasive.

use std::sync::Arc;

use fleetlink_connector::{ConnectorError, Provider, TwinSync};
use fleetlink_connector_azure::{AzureConfig, AzureIotHubConnector};
use fleetlink_store::Integration;

use crate::error::{SyncError, SyncResult};

/// Provides connector instances for integrations at runtime.
pub trait ConnectorFactory: Send + Sync {
    /// Build a connector for `integration`.
    fn connector_for(&self, integration: &Integration) -> SyncResult<Arc<dyn TwinSync>>;
}

/// Default factory covering the built-in providers.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    /// Base URL override applied to hub connectors, for gateways and
    /// non-default endpoints.
    api_base: Option<String>,
    /// Per-request timeout override in seconds.
    request_timeout_secs: Option<u64>,
}

impl ProviderRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }
}

impl ConnectorFactory for ProviderRegistry {
    fn connector_for(&self, integration: &Integration) -> SyncResult<Arc<dyn TwinSync>> {
        match integration.provider {
            Provider::IotHub => {
                let connection_string = integration
                    .credentials
                    .connection_string()
                    .ok_or_else(|| {
                        SyncError::Connector(ConnectorError::invalid_configuration(format!(
                            "integration {} has no connection string",
                            integration.id
                        )))
                    })?
                    .clone();
                let mut config = AzureConfig::new(connection_string);
                if let Some(base) = &self.api_base {
                    config = config.with_api_base(base.clone());
                }
                if let Some(secs) = self.request_timeout_secs {
                    config = config.with_request_timeout(secs);
                }
                let connector = AzureIotHubConnector::new(config).map_err(SyncError::Connector)?;
                Ok(Arc::new(connector))
            }
        }
    }
}
