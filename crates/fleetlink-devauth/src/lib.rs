//! Device-authentication service client.
//!
//! Read-only client for the per-device acceptance status of a tenant's
//! devices. The reconciliation engine treats devices unknown to the
//! service as unauthenticated.

pub mod client;
pub mod status;

pub use client::{DeviceAuthClient, DeviceAuthConfig};
pub use status::AuthStatus;
