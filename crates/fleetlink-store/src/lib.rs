//! Device inventory and integration persistence.
//!
//! The reconciliation engine reads tenants, devices, and integrations
//! through the [`DeviceStore`] trait and writes back integration-id
//! bookkeeping. Device records are never deleted here: pruning only
//! removes devices at provider hubs.

pub mod error;
pub mod models;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use models::{DeviceRecord, Integration};
pub use store::{DeviceStore, Page, PgDeviceStore};
