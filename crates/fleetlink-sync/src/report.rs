//! Run reports and exit-code mapping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use fleetlink_connector::{DeviceId, TenantId};

use crate::plan::{Action, PlannedAction};

/// Process exit code: full success.
pub const EXIT_OK: i32 = 0;
/// Process exit code: one or more per-device action failures.
pub const EXIT_ACTION_FAILURES: i32 = 1;
/// Process exit code: at least one tenant run aborted.
pub const EXIT_TENANT_ABORTED: i32 = 2;
/// Process exit code: the run itself could not proceed.
pub const EXIT_FATAL: i32 = 3;

/// A failed corrective action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceFailure {
    pub device_id: DeviceId,
    /// The action that failed, e.g. `update:enabled`.
    pub action: String,
    pub error: String,
}

/// Per-tenant outcome of a reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantReport {
    pub tenant_id: TenantId,
    /// Devices listed from the local inventory for this run.
    pub devices_total: u64,
    /// Devices already consistent; no action issued.
    pub consistent: u64,
    /// Devices for which a corrective action succeeded.
    pub corrected: u64,
    pub twins_created: u64,
    pub twins_updated: u64,
    pub twins_deleted: u64,
    /// Per-device action failures; the run continued unless fail-early
    /// was set.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub failures: Vec<DeviceFailure>,
    /// Tenant had no integration configured and was skipped.
    #[serde(default)]
    pub skipped: bool,
    /// The tenant run was aborted; remaining devices were not attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
    /// The run was cancelled before this tenant completed.
    #[serde(default)]
    pub cancelled: bool,
}

impl TenantReport {
    #[must_use]
    pub fn new(tenant_id: TenantId) -> Self {
        Self {
            tenant_id,
            devices_total: 0,
            consistent: 0,
            corrected: 0,
            twins_created: 0,
            twins_updated: 0,
            twins_deleted: 0,
            failures: Vec::new(),
            skipped: false,
            aborted: None,
            cancelled: false,
        }
    }

    /// Record a successfully executed action.
    pub fn record_success(&mut self, planned: &PlannedAction) {
        self.corrected += 1;
        match planned.action {
            Action::Create(_) => self.twins_created += 1,
            Action::Update(_) => self.twins_updated += 1,
            Action::Delete => self.twins_deleted += 1,
        }
    }

    /// Record a failed action.
    pub fn record_failure(&mut self, planned: &PlannedAction, error: impl ToString) {
        self.failures.push(DeviceFailure {
            device_id: planned.device_id.clone(),
            action: planned.action.to_string(),
            error: error.to_string(),
        });
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// Total corrective actions issued successfully.
    #[must_use]
    pub fn actions_taken(&self) -> u64 {
        self.twins_created + self.twins_updated + self.twins_deleted
    }
}

/// Aggregate outcome of one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub batch_size: usize,
    pub fail_early: bool,
    pub tenants: Vec<TenantReport>,
}

impl SyncReport {
    #[must_use]
    pub fn new(batch_size: usize, fail_early: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            batch_size,
            fail_early,
            tenants: Vec::new(),
        }
    }

    /// Map the run outcome to a stable process exit code.
    ///
    /// `0` — every tenant fully reconciled; `1` — at least one per-device
    /// action failed but the run completed; `2` — at least one tenant run
    /// aborted (credential rejection or unreachable remote); the higher
    /// severity wins when both apply. `3` is reserved for run-level
    /// failures surfaced as errors, not reports.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.tenants.iter().any(|t| t.aborted.is_some()) {
            EXIT_TENANT_ABORTED
        } else if self.tenants.iter().any(TenantReport::has_failures) {
            EXIT_ACTION_FAILURES
        } else {
            EXIT_OK
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code() == EXIT_OK
    }

    /// Total corrective actions issued successfully across tenants.
    #[must_use]
    pub fn actions_taken(&self) -> u64 {
        self.tenants.iter().map(TenantReport::actions_taken).sum()
    }

    /// Total per-device failures across tenants.
    #[must_use]
    pub fn failure_count(&self) -> u64 {
        self.tenants.iter().map(|t| t.failures.len() as u64).sum()
    }
}
