//! Azure connection strings and shared-access-signature tokens.
//!
//! Implements the `HostName=...;SharedAccessKeyName=...;SharedAccessKey=...`
//! format and the SharedAccessSignature authorization algorithm used by the
//! IoT Hub service API. The signature is an HMAC-SHA256 over the URL-escaped
//! hostname and the token expiry timestamp.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::str::FromStr;

use crate::error::ConnectorError;

type HmacSha256 = Hmac<Sha256>;

/// Escape everything except unreserved characters.
const URI_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

const KEY_HOST_NAME: &str = "HostName";
const KEY_GATEWAY_HOST_NAME: &str = "GatewayHostName";
const KEY_SHARED_ACCESS_KEY: &str = "SharedAccessKey";
const KEY_SHARED_ACCESS_KEY_NAME: &str = "SharedAccessKeyName";
const KEY_DEVICE_ID: &str = "DeviceId";
const KEY_MODULE_ID: &str = "ModuleId";

/// Connection strings longer than this are rejected outright.
const MAX_LEN: usize = 4096;

/// A parsed Azure-style connection string.
///
/// Serialized to and from its canonical textual form, with the shared access
/// key base64-encoded.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConnectionString {
    pub host_name: String,
    pub gateway_host_name: Option<String>,
    /// SharedAccessKeyName; required unless a device id is present.
    pub key_name: Option<String>,
    pub device_id: Option<String>,
    pub module_id: Option<String>,
    /// Decoded SharedAccessKey bytes.
    pub key: Vec<u8>,
}

impl ConnectionString {
    /// Validate required fields.
    pub fn validate(&self) -> Result<(), ConnectorError> {
        if self.host_name.is_empty() {
            return Err(ConnectorError::invalid_configuration(
                "connection string: HostName is required",
            ));
        }
        if self.key.is_empty() {
            return Err(ConnectorError::invalid_configuration(
                "connection string: SharedAccessKey is required",
            ));
        }
        if self.device_id.is_none() && self.key_name.is_none() {
            return Err(ConnectorError::invalid_configuration(
                "connection string: one of DeviceId or SharedAccessKeyName must be set",
            ));
        }
        if self.to_string().len() > MAX_LEN {
            return Err(ConnectorError::invalid_configuration(format!(
                "connection string can be no longer than {MAX_LEN} characters"
            )));
        }
        Ok(())
    }

    /// Hostname to connect to: the gateway when one is configured.
    #[must_use]
    pub fn effective_host(&self) -> &str {
        self.gateway_host_name.as_deref().unwrap_or(&self.host_name)
    }

    /// Mint a `SharedAccessSignature` authorization header value valid
    /// until `expire_at`.
    #[must_use]
    pub fn authorization(&self, expire_at: DateTime<Utc>) -> String {
        let resource = utf8_percent_encode(&self.host_name, URI_ESCAPE).to_string();
        let expiry = expire_at.timestamp();
        let message = format!("{resource}\n{expiry}");

        // HMAC-SHA256 accepts keys of any length.
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("hmac accepts any key length");
        mac.update(message.as_bytes());
        let signature = BASE64.encode(mac.finalize().into_bytes());

        let mut token = format!(
            "SharedAccessSignature sr={resource}&sig={}&se={expiry}",
            utf8_percent_encode(&signature, URI_ESCAPE)
        );
        if let Some(name) = &self.key_name {
            token.push_str("&skn=");
            token.push_str(name);
        }
        token
    }
}

impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The shared access key is a credential; never expose it.
        f.debug_struct("ConnectionString")
            .field("host_name", &self.host_name)
            .field("gateway_host_name", &self.gateway_host_name)
            .field("key_name", &self.key_name)
            .field("device_id", &self.device_id)
            .field("module_id", &self.module_id)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl FromStr for ConnectionString {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() > MAX_LEN {
            return Err(ConnectorError::invalid_configuration(format!(
                "connection string can be no longer than {MAX_LEN} characters"
            )));
        }
        let mut cs = ConnectionString {
            host_name: String::new(),
            gateway_host_name: None,
            key_name: None,
            device_id: None,
            module_id: None,
            key: Vec::new(),
        };
        for pair in s.split(';') {
            let Some((key, value)) = pair.split_once('=') else {
                return Err(ConnectorError::invalid_configuration(
                    "invalid connection string format",
                ));
            };
            match key {
                KEY_HOST_NAME => cs.host_name = value.to_string(),
                KEY_GATEWAY_HOST_NAME => cs.gateway_host_name = Some(value.to_string()),
                KEY_SHARED_ACCESS_KEY_NAME => cs.key_name = Some(value.to_string()),
                KEY_DEVICE_ID => cs.device_id = Some(value.to_string()),
                KEY_MODULE_ID => cs.module_id = Some(value.to_string()),
                KEY_SHARED_ACCESS_KEY => {
                    cs.key = BASE64.decode(value).map_err(|e| {
                        ConnectorError::invalid_configuration(format!(
                            "shared access key format: {e}"
                        ))
                    })?;
                }
                other => {
                    return Err(ConnectorError::invalid_configuration(format!(
                        "invalid connection string key: {other}"
                    )))
                }
            }
        }
        cs.validate()?;
        Ok(cs)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::with_capacity(6);
        if !self.host_name.is_empty() {
            parts.push(format!("{KEY_HOST_NAME}={}", self.host_name));
        }
        if let Some(gw) = &self.gateway_host_name {
            parts.push(format!("{KEY_GATEWAY_HOST_NAME}={gw}"));
        }
        if let Some(name) = &self.key_name {
            parts.push(format!("{KEY_SHARED_ACCESS_KEY_NAME}={name}"));
        }
        if let Some(id) = &self.device_id {
            parts.push(format!("{KEY_DEVICE_ID}={id}"));
        }
        if let Some(id) = &self.module_id {
            parts.push(format!("{KEY_MODULE_ID}={id}"));
        }
        if !self.key.is_empty() {
            parts.push(format!("{KEY_SHARED_ACCESS_KEY}={}", BASE64.encode(&self.key)));
        }
        f.write_str(&parts.join(";"))
    }
}

impl TryFrom<String> for ConnectionString {
    type Error = ConnectorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ConnectionString> for String {
    fn from(cs: ConnectionString) -> Self {
        cs.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CS: &str =
        "HostName=mock.azure-devices.net;SharedAccessKeyName=TestSync;SharedAccessKey=c2VjcmV0";

    #[test]
    fn test_parse_valid() {
        let cs: ConnectionString = CS.parse().unwrap();
        assert_eq!(cs.host_name, "mock.azure-devices.net");
        assert_eq!(cs.key_name.as_deref(), Some("TestSync"));
        assert_eq!(cs.key, b"secret");
        assert!(cs.device_id.is_none());
    }

    #[test]
    fn test_parse_device_connection_string() {
        let cs: ConnectionString =
            "HostName=h.azure-devices.net;DeviceId=dev-1;SharedAccessKey=c2VjcmV0"
                .parse()
                .unwrap();
        assert_eq!(cs.device_id.as_deref(), Some("dev-1"));
        assert!(cs.key_name.is_none());
    }

    #[test]
    fn test_parse_rejects_bad_key_encoding() {
        let err = "HostName=h;SharedAccessKeyName=n;SharedAccessKey=%%%"
            .parse::<ConnectionString>()
            .unwrap_err();
        assert!(matches!(err, ConnectorError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_parse_rejects_missing_host() {
        assert!("SharedAccessKeyName=n;SharedAccessKey=c2VjcmV0"
            .parse::<ConnectionString>()
            .is_err());
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        assert!("HostName=h;Bogus=1;SharedAccessKey=c2VjcmV0"
            .parse::<ConnectionString>()
            .is_err());
    }

    #[test]
    fn test_parse_rejects_missing_identity() {
        // Neither DeviceId nor SharedAccessKeyName.
        assert!("HostName=h;SharedAccessKey=c2VjcmV0"
            .parse::<ConnectionString>()
            .is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let cs: ConnectionString = CS.parse().unwrap();
        let rendered = cs.to_string();
        let reparsed: ConnectionString = rendered.parse().unwrap();
        assert_eq!(cs, reparsed);
    }

    #[test]
    fn test_authorization_shape() {
        let cs: ConnectionString = CS.parse().unwrap();
        let expiry = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let token = cs.authorization(expiry);
        assert!(token.starts_with("SharedAccessSignature sr=mock.azure-devices.net"));
        assert!(token.contains("&se=1700000000"));
        assert!(token.contains("&sig="));
        assert!(token.ends_with("&skn=TestSync"));
    }

    #[test]
    fn test_authorization_deterministic() {
        let cs: ConnectionString = CS.parse().unwrap();
        let expiry = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(cs.authorization(expiry), cs.authorization(expiry));
        let later = Utc.timestamp_opt(1_700_000_060, 0).unwrap();
        assert_ne!(cs.authorization(expiry), cs.authorization(later));
    }

    #[test]
    fn test_authorization_no_key_name() {
        let cs: ConnectionString =
            "HostName=h.azure-devices.net;DeviceId=dev-1;SharedAccessKey=c2VjcmV0"
                .parse()
                .unwrap();
        let expiry = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert!(!cs.authorization(expiry).contains("&skn="));
    }

    #[test]
    fn test_serde_as_string() {
        let cs: ConnectionString = CS.parse().unwrap();
        let json = serde_json::to_string(&cs).unwrap();
        let back: ConnectionString = serde_json::from_str(&json).unwrap();
        assert_eq!(cs, back);
    }
}
