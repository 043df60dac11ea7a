//! # Device reconciliation engine
//!
//! Converges three systems of record onto a consistent view of every
//! device: the local inventory store, the device-authentication service,
//! and the tenant's hub provider integrations.
//!
//! For each tenant the engine pages through the locally known devices,
//! fetches acceptance and twin statuses from the two remote systems (one
//! bulk call each per batch), classifies every device, and issues the
//! minimal set of corrective twin operations:
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                         SyncEngine                            │
//! ├───────────────────────────────────────────────────────────────┤
//! │                                                               │
//! │  ┌────────────┐    ┌────────────┐    ┌────────────────────┐  │
//! │  │  Classifier │──►│  Planner   │──►│  Action execution   │  │
//! │  └────────────┘    └────────────┘    └────────────────────┘  │
//! │        ▲                                      │               │
//! │        │ auth + twin statuses                 │ twin writes,  │
//! │        │ (per batch, concurrent)              │ bookkeeping   │
//! │  ┌─────┴──────────────┐            ┌──────────▼───────────┐  │
//! │  │ AuthStatusSource / │            │ TwinSync connector / │  │
//! │  │ TwinQueryOp        │            │ DeviceStore          │  │
//! │  └────────────────────┘            └──────────────────────┘  │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Tenants are independent reconciliation domains and may be processed
//! concurrently; batches within a tenant are strictly sequential.
//! Classification is a pure function of the two fetched statuses and is
//! recomputed every run.

pub mod auth_source;
pub mod classify;
pub mod engine;
pub mod error;
pub mod plan;
pub mod registry;
pub mod report;

pub use auth_source::AuthStatusSource;
pub use classify::{classify, DeviceClass};
pub use engine::{SyncConfig, SyncEngine, TenantSelection};
pub use error::{SyncError, SyncResult};
pub use plan::{plan_batch, Action, PlannedAction};
pub use registry::{ConnectorFactory, ProviderRegistry};
pub use report::{DeviceFailure, SyncReport, TenantReport};
