//! Device acceptance status.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Acceptance status of a device at the device-authentication service.
///
/// Transient: fetched per reconciliation run, never cached across runs.
/// Any status the service reports other than accepted/rejected (pending,
/// preauthorized, noauth) deserializes as [`AuthStatus::NoAuth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum AuthStatus {
    /// The device's authentication sets are accepted.
    Accepted,
    /// The device has been rejected.
    Rejected,
    /// The device has no usable authentication sets.
    NoAuth,
}

impl From<String> for AuthStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "accepted" => AuthStatus::Accepted,
            "rejected" => AuthStatus::Rejected,
            _ => AuthStatus::NoAuth,
        }
    }
}

impl AuthStatus {
    /// Whether the device should be usable at the hub.
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, AuthStatus::Accepted)
    }
}

impl fmt::Display for AuthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthStatus::Accepted => write!(f, "accepted"),
            AuthStatus::Rejected => write!(f, "rejected"),
            AuthStatus::NoAuth => write!(f, "noauth"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_known_statuses() {
        let s: AuthStatus = serde_json::from_str("\"accepted\"").unwrap();
        assert_eq!(s, AuthStatus::Accepted);
        let s: AuthStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(s, AuthStatus::Rejected);
    }

    #[test]
    fn test_deserialize_unknown_status_as_noauth() {
        // The service also reports states like "pending" or "preauthorized";
        // anything that is not accepted/rejected means the device cannot
        // authenticate.
        let s: AuthStatus = serde_json::from_str("\"pending\"").unwrap();
        assert_eq!(s, AuthStatus::NoAuth);
    }
}
