//! Provider integrations.

use serde::{Deserialize, Serialize};

use fleetlink_connector::{Credentials, IntegrationId, Provider, TenantId};

/// A configured connection to one hub provider for one tenant.
///
/// Created through the management registration endpoint (out of scope
/// here); the reconciler only resolves and reads integrations, never
/// mutates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Integration {
    pub id: IntegrationId,
    pub tenant_id: TenantId,
    pub provider: Provider,
    pub credentials: Credentials,
}

impl Integration {
    pub fn new(tenant_id: impl Into<TenantId>, provider: Provider, credentials: Credentials) -> Self {
        Self {
            id: IntegrationId::new(),
            tenant_id: tenant_id.into(),
            provider,
            credentials,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetlink_connector::ConnectionString;

    #[test]
    fn test_integration_serde_roundtrip() {
        let cs: ConnectionString =
            "HostName=hub.azure-devices.net;SharedAccessKeyName=sync;SharedAccessKey=c2VjcmV0"
                .parse()
                .unwrap();
        let integration = Integration::new(
            "TestSync01",
            Provider::IotHub,
            Credentials::Sas {
                connection_string: cs,
            },
        );
        let json = serde_json::to_value(&integration).unwrap();
        assert_eq!(json["provider"], "iot-hub");
        assert_eq!(json["credentials"]["type"], "sas");
        let back: Integration = serde_json::from_value(json).unwrap();
        assert_eq!(back, integration);
    }
}
