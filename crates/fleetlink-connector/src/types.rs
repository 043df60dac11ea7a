//! Provider, twin status, and credential types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::connection_string::ConnectionString;
use crate::error::ConnectorError;

/// Supported hub provider kinds.
///
/// Adding a provider is a compile-time-checked change: a new variant here,
/// a connector crate implementing the twin capabilities, and a match arm in
/// the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// Azure IoT Hub.
    #[serde(rename = "iot-hub")]
    IotHub,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::IotHub => write!(f, "iot-hub"),
        }
    }
}

impl FromStr for Provider {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "iot-hub" => Ok(Provider::IotHub),
            other => Err(ConnectorError::invalid_data(format!(
                "unknown provider: {other}"
            ))),
        }
    }
}

/// Enabled/disabled state of a device twin at the hub.
///
/// Absence of a twin is represented by the device missing from a status
/// map, never by a variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TwinStatus {
    Enabled,
    Disabled,
}

impl fmt::Display for TwinStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TwinStatus::Enabled => write!(f, "enabled"),
            TwinStatus::Disabled => write!(f, "disabled"),
        }
    }
}

impl FromStr for TwinStatus {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enabled" => Ok(TwinStatus::Enabled),
            "disabled" => Ok(TwinStatus::Disabled),
            other => Err(ConnectorError::invalid_data(format!(
                "unknown twin status: {other}"
            ))),
        }
    }
}

/// Provider-specific connection credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Credentials {
    /// Shared-access-signature credentials (Azure IoT Hub).
    Sas {
        connection_string: ConnectionString,
    },
}

impl Credentials {
    /// The connection string, when the credential kind carries one.
    #[must_use]
    pub fn connection_string(&self) -> Option<&ConnectionString> {
        match self {
            Credentials::Sas { connection_string } => Some(connection_string),
        }
    }
}
