//! Connector error types.
//!
//! Error definitions with transient/permanent classification. The reconciler
//! decides continue-vs-abort from this taxonomy: transient errors may be
//! retried by an outer layer, credential rejections abort the tenant run.

use thiserror::Error;

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Error that can occur talking to a remote hub provider or status service.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Remote system unreachable or responding with a server error.
    #[error("remote unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Remote call exceeded its deadline.
    #[error("remote call timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Credentials rejected by the remote system. Fatal for the tenant's
    /// current run.
    #[error("authorization rejected: {message}")]
    AuthRejected { message: String },

    /// Object not found in the remote system.
    #[error("not found: {identifier}")]
    NotFound { identifier: String },

    /// Conflicting object state in the remote system.
    #[error("conflict: {identifier}")]
    Conflict { identifier: String },

    /// Integration configuration is invalid.
    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Remote system returned data that does not fit the expected shape.
    #[error("invalid data: {message}")]
    InvalidData { message: String },

    /// Request or response serialization failed.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// Internal invariant violation.
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl ConnectorError {
    /// Check if this error is transient and the operation may be retried.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConnectorError::Unavailable { .. } | ConnectorError::Timeout { .. }
        )
    }

    /// Check if this error is a credential rejection.
    #[must_use]
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, ConnectorError::AuthRejected { .. })
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        ConnectorError::Unavailable {
            message: message.into(),
            source: None,
        }
    }

    pub fn unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        ConnectorError::Unavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        ConnectorError::InvalidConfiguration {
            message: message.into(),
        }
    }

    pub fn invalid_data(message: impl Into<String>) -> Self {
        ConnectorError::InvalidData {
            message: message.into(),
        }
    }

    /// Map an HTTP status code from a remote API to the error taxonomy.
    ///
    /// 401/403 become [`ConnectorError::AuthRejected`], 404
    /// [`ConnectorError::NotFound`], 409/412 [`ConnectorError::Conflict`],
    /// anything else in the 5xx range [`ConnectorError::Unavailable`].
    pub fn from_status(status: u16, context: impl Into<String>) -> Self {
        let context = context.into();
        match status {
            401 | 403 => ConnectorError::AuthRejected { message: context },
            404 => ConnectorError::NotFound {
                identifier: context,
            },
            409 | 412 => ConnectorError::Conflict {
                identifier: context,
            },
            s if s >= 500 => ConnectorError::Unavailable {
                message: format!("{context}: status {s}"),
                source: None,
            },
            s => ConnectorError::Internal {
                message: format!("{context}: unexpected status {s}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ConnectorError::unavailable("down").is_transient());
        assert!(ConnectorError::Timeout { timeout_secs: 10 }.is_transient());
        assert!(!ConnectorError::AuthRejected {
            message: "bad key".into()
        }
        .is_transient());
        assert!(!ConnectorError::invalid_configuration("no host").is_transient());
    }

    #[test]
    fn test_from_status_mapping() {
        assert!(matches!(
            ConnectorError::from_status(401, "x"),
            ConnectorError::AuthRejected { .. }
        ));
        assert!(matches!(
            ConnectorError::from_status(403, "x"),
            ConnectorError::AuthRejected { .. }
        ));
        assert!(matches!(
            ConnectorError::from_status(404, "x"),
            ConnectorError::NotFound { .. }
        ));
        assert!(matches!(
            ConnectorError::from_status(409, "x"),
            ConnectorError::Conflict { .. }
        ));
        assert!(ConnectorError::from_status(503, "x").is_transient());
        assert!(matches!(
            ConnectorError::from_status(418, "x"),
            ConnectorError::Internal { .. }
        ));
    }
}
