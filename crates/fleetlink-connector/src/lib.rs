//! Hub connector framework.
//!
//! Capability-based trait definitions for IoT-hub provider integrations,
//! together with the shared error taxonomy, typed identifiers, and the
//! credential types providers authenticate with.
//!
//! A provider implementation (e.g. `fleetlink-connector-azure`) implements
//! the subset of twin capabilities its API supports; the reconciliation
//! engine only ever talks to the traits defined here.

pub mod connection_string;
pub mod error;
pub mod ids;
pub mod traits;
pub mod types;

pub use connection_string::ConnectionString;
pub use error::{ConnectorError, ConnectorResult};
pub use ids::{DeviceId, IntegrationId, TenantId};
pub use traits::{
    HubConnector, TwinCreateOp, TwinDeleteOp, TwinQueryOp, TwinSync, TwinUpdateOp,
};
pub use types::{Credentials, Provider, TwinStatus};
