//! Azure connector configuration.

use fleetlink_connector::{ConnectionString, ConnectorError, ConnectorResult};

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default SAS token lifetime in seconds.
pub const DEFAULT_TOKEN_TTL_SECS: u64 = 60;

/// Configuration for [`crate::AzureIotHubConnector`].
#[derive(Debug, Clone)]
pub struct AzureConfig {
    /// Hub service connection string (hostname + shared access key).
    pub connection_string: ConnectionString,
    /// Base URL override. When unset, `https://<hostname>` from the
    /// connection string is used. Needed for gateways and private
    /// endpoints with a non-default scheme.
    pub api_base: Option<String>,
    /// Per-request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Lifetime of minted SAS tokens in seconds.
    pub token_ttl_secs: u64,
}

impl AzureConfig {
    pub fn new(connection_string: ConnectionString) -> Self {
        Self {
            connection_string,
            api_base: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }

    /// Override the base URL (scheme + host) requests are sent to.
    #[must_use]
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = Some(base.into());
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    /// Set the SAS token lifetime.
    #[must_use]
    pub fn with_token_ttl(mut self, secs: u64) -> Self {
        self.token_ttl_secs = secs;
        self
    }

    pub fn validate(&self) -> ConnectorResult<()> {
        self.connection_string.validate()?;
        if self.request_timeout_secs == 0 {
            return Err(ConnectorError::invalid_configuration(
                "request timeout must be positive",
            ));
        }
        if self.token_ttl_secs == 0 {
            return Err(ConnectorError::invalid_configuration(
                "token ttl must be positive",
            ));
        }
        Ok(())
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> String {
        match &self.api_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}", self.connection_string.effective_host()),
        }
    }
}
