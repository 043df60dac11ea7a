//! Reconciliation engine orchestrator.
//!
//! Drives a full reconciliation run: resolves each tenant's integrations,
//! pages through the local device inventory, fetches the two remote status
//! views per batch, classifies, plans, and executes corrective actions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fleetlink_connector::{DeviceId, IntegrationId, TenantId, TwinStatus, TwinSync};
use fleetlink_devauth::AuthStatus;
use fleetlink_store::{DeviceRecord, DeviceStore, Integration, Page};

use crate::auth_source::AuthStatusSource;
use crate::classify::{classify, DeviceClass};
use crate::error::{SyncError, SyncResult};
use crate::plan::{plan_batch, Action, PlannedAction};
use crate::registry::ConnectorFactory;
use crate::report::{SyncReport, TenantReport};

/// Default number of devices per batch.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Which tenants a run covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TenantSelection {
    /// Every tenant present in the device inventory.
    #[default]
    All,
    /// An explicit set of tenants.
    Only(Vec<TenantId>),
}

/// Engine configuration for one run.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub tenants: TenantSelection,
    /// Devices per batch; bounds memory and remote request size.
    pub batch_size: usize,
    /// Abort the whole run on the first failing action call.
    ///
    /// Implies sequential tenant processing so the abort point is
    /// deterministic.
    pub fail_early: bool,
    /// Maximum tenants reconciled concurrently. Tenants are independent
    /// domains, so values above 1 are always safe.
    pub tenant_parallelism: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tenants: TenantSelection::All,
            batch_size: DEFAULT_BATCH_SIZE,
            fail_early: false,
            tenant_parallelism: 1,
        }
    }
}

impl SyncConfig {
    pub fn validate(&self) -> SyncResult<()> {
        if self.batch_size == 0 {
            return Err(SyncError::Config("batch size must be positive".into()));
        }
        if self.tenant_parallelism == 0 {
            return Err(SyncError::Config(
                "tenant parallelism must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Flow control between the integration loop and the run loop.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    /// This tenant's run is over (aborted or cancelled); other tenants
    /// proceed.
    TenantDone,
    /// Fail-early tripped; the whole run stops.
    RunAborted,
}

/// The reconciler.
///
/// All state is scoped to one [`SyncEngine::sync`] call; the engine itself
/// is cheap to clone and share.
#[derive(Clone)]
pub struct SyncEngine {
    store: Arc<dyn DeviceStore>,
    auth: Arc<dyn AuthStatusSource>,
    connectors: Arc<dyn ConnectorFactory>,
    config: SyncConfig,
}

impl SyncEngine {
    pub fn new(
        store: Arc<dyn DeviceStore>,
        auth: Arc<dyn AuthStatusSource>,
        connectors: Arc<dyn ConnectorFactory>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            auth,
            connectors,
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run a full reconciliation over the configured tenants.
    ///
    /// Returns `Err` only when the run itself cannot proceed (store
    /// unreachable, invalid configuration). Tenant aborts and per-device
    /// failures are recorded in the report.
    pub async fn sync(&self, cancel: &CancellationToken) -> SyncResult<SyncReport> {
        self.config.validate()?;

        let tenants = match &self.config.tenants {
            TenantSelection::All => self.store.list_tenants().await?,
            TenantSelection::Only(tenants) => tenants.clone(),
        };
        info!(
            tenants = tenants.len(),
            batch_size = self.config.batch_size,
            fail_early = self.config.fail_early,
            "starting reconciliation run"
        );

        let mut report = SyncReport::new(self.config.batch_size, self.config.fail_early);
        if self.config.tenant_parallelism <= 1 || self.config.fail_early {
            self.sync_sequential(&tenants, cancel, &mut report).await?;
        } else {
            self.sync_parallel(&tenants, cancel, &mut report).await?;
        }

        report.finished_at = Some(chrono::Utc::now());
        info!(
            actions = report.actions_taken(),
            failures = report.failure_count(),
            exit_code = report.exit_code(),
            "reconciliation run finished"
        );
        Ok(report)
    }

    async fn sync_sequential(
        &self,
        tenants: &[TenantId],
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) -> SyncResult<()> {
        for tenant_id in tenants {
            if cancel.is_cancelled() {
                break;
            }
            let (tenant_report, flow) = self.sync_tenant(tenant_id, cancel).await?;
            report.tenants.push(tenant_report);
            if flow == Flow::RunAborted {
                break;
            }
        }
        Ok(())
    }

    async fn sync_parallel(
        &self,
        tenants: &[TenantId],
        cancel: &CancellationToken,
        report: &mut SyncReport,
    ) -> SyncResult<()> {
        let semaphore = Arc::new(Semaphore::new(self.config.tenant_parallelism));
        let mut tasks = JoinSet::new();
        for tenant_id in tenants {
            let engine = self.clone();
            let tenant_id = tenant_id.clone();
            let cancel = cancel.clone();
            let semaphore = Arc::clone(&semaphore);
            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| SyncError::Internal("semaphore closed".into()))?;
                if cancel.is_cancelled() {
                    return Ok(None);
                }
                engine
                    .sync_tenant(&tenant_id, &cancel)
                    .await
                    .map(|(report, _)| Some(report))
            });
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined.map_err(|e| SyncError::Internal(format!("tenant task failed: {e}")))? {
                Ok(Some(tenant_report)) => report.tenants.push(tenant_report),
                Ok(None) => {}
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(_) => {}
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        // Deterministic report order regardless of completion order.
        report.tenants.sort_by(|a, b| a.tenant_id.cmp(&b.tenant_id));
        Ok(())
    }

    /// Reconcile a single tenant across all of its integrations.
    async fn sync_tenant(
        &self,
        tenant_id: &TenantId,
        cancel: &CancellationToken,
    ) -> SyncResult<(TenantReport, Flow)> {
        let mut tenant_report = TenantReport::new(tenant_id.clone());

        let integrations = self.store.get_integrations(tenant_id).await?;
        if integrations.is_empty() {
            // Not an error: the tenant simply has nothing to reconcile.
            info!(tenant_id = %tenant_id, "no integration configured, skipping tenant");
            tenant_report.skipped = true;
            return Ok((tenant_report, Flow::Continue));
        }

        for integration in &integrations {
            let connector = match self.connectors.connector_for(integration) {
                Ok(connector) => connector,
                Err(e) => {
                    warn!(
                        tenant_id = %tenant_id,
                        integration_id = %integration.id,
                        error = %e,
                        "failed to build connector, aborting tenant"
                    );
                    tenant_report.aborted = Some(e.to_string());
                    return Ok((tenant_report, Flow::TenantDone));
                }
            };
            let flow = self
                .sync_integration(
                    tenant_id,
                    integration,
                    connector.as_ref(),
                    &mut tenant_report,
                    cancel,
                )
                .await?;
            if flow != Flow::Continue {
                return Ok((tenant_report, flow));
            }
        }

        info!(
            tenant_id = %tenant_id,
            devices = tenant_report.devices_total,
            consistent = tenant_report.consistent,
            corrected = tenant_report.corrected,
            failed = tenant_report.failures.len(),
            "tenant reconciled"
        );
        Ok((tenant_report, Flow::Continue))
    }

    /// Reconcile one tenant/integration pair, batch by batch.
    async fn sync_integration(
        &self,
        tenant_id: &TenantId,
        integration: &Integration,
        connector: &dyn TwinSync,
        tenant_report: &mut TenantReport,
        cancel: &CancellationToken,
    ) -> SyncResult<Flow> {
        let mut page = Page::first(self.config.batch_size as u64);
        loop {
            // Cooperative checkpoint: completed batches stay done, the
            // rest is simply not attempted.
            if cancel.is_cancelled() {
                tenant_report.cancelled = true;
                return Ok(Flow::TenantDone);
            }

            let devices = self
                .store
                .list_devices(tenant_id, Some(integration.id), page.clone())
                .await?;
            if devices.is_empty() {
                break;
            }
            let device_ids: Vec<DeviceId> =
                devices.iter().map(|d| d.device_id.clone()).collect();
            tenant_report.devices_total += devices.len() as u64;

            // The two status views are independent reads.
            let (auth_statuses, twins) = tokio::join!(
                self.auth.fetch_statuses(tenant_id, &device_ids),
                connector.query_twins(&device_ids),
            );
            let auth_statuses = match auth_statuses {
                Ok(statuses) => statuses,
                Err(e) => {
                    warn!(tenant_id = %tenant_id, error = %e, "acceptance status fetch failed, aborting tenant");
                    tenant_report.aborted = Some(e.to_string());
                    return Ok(Flow::TenantDone);
                }
            };
            let twins = match twins {
                Ok(twins) => twins,
                Err(e) => {
                    warn!(tenant_id = %tenant_id, error = %e, "twin query failed, aborting tenant");
                    tenant_report.aborted = Some(e.to_string());
                    return Ok(Flow::TenantDone);
                }
            };

            let flow = self
                .reconcile_batch(
                    tenant_id,
                    integration,
                    connector,
                    &devices,
                    &auth_statuses,
                    &twins,
                    tenant_report,
                )
                .await?;
            if flow != Flow::Continue {
                return Ok(flow);
            }

            if devices.len() < self.config.batch_size {
                break;
            }
            let Some(last) = devices.last() else { break };
            page = Page::after(last.device_id.clone(), self.config.batch_size as u64);
        }
        Ok(Flow::Continue)
    }

    /// Classify, plan, and execute one batch.
    #[allow(clippy::too_many_arguments)]
    async fn reconcile_batch(
        &self,
        tenant_id: &TenantId,
        integration: &Integration,
        connector: &dyn TwinSync,
        devices: &[DeviceRecord],
        auth_statuses: &HashMap<DeviceId, AuthStatus>,
        twins: &HashMap<DeviceId, TwinStatus>,
        tenant_report: &mut TenantReport,
    ) -> SyncResult<Flow> {
        let classified: Vec<(DeviceId, DeviceClass)> = devices
            .iter()
            .map(|device| {
                let auth = auth_statuses.get(&device.device_id).copied();
                let twin = twins.get(&device.device_id).copied();
                let class = classify(auth, twin);
                debug!(
                    tenant_id = %tenant_id,
                    device_id = %device.device_id,
                    auth = ?auth,
                    class = %class,
                    "classified device"
                );
                (device.device_id.clone(), class)
            })
            .collect();
        tenant_report.consistent += classified
            .iter()
            .filter(|(_, class)| class.is_consistent())
            .count() as u64;

        for planned in plan_batch(&classified) {
            match self
                .execute_action(tenant_id, integration, connector, devices, &planned)
                .await
            {
                Ok(()) => tenant_report.record_success(&planned),
                Err(e) => {
                    warn!(
                        tenant_id = %tenant_id,
                        device_id = %planned.device_id,
                        action = %planned.action,
                        error = %e,
                        "corrective action failed"
                    );
                    let auth_rejected =
                        matches!(&e, SyncError::Connector(ce) if ce.is_auth_rejected());
                    tenant_report.record_failure(&planned, &e);
                    if auth_rejected {
                        tenant_report.aborted = Some(e.to_string());
                        return Ok(Flow::TenantDone);
                    }
                    if self.config.fail_early {
                        return Ok(Flow::RunAborted);
                    }
                }
            }
        }
        Ok(Flow::Continue)
    }

    /// Execute one corrective action, including local integration-id
    /// bookkeeping on success.
    async fn execute_action(
        &self,
        tenant_id: &TenantId,
        integration: &Integration,
        connector: &dyn TwinSync,
        devices: &[DeviceRecord],
        planned: &PlannedAction,
    ) -> SyncResult<()> {
        match planned.action {
            Action::Delete => {
                connector.delete_twin(&planned.device_id).await?;
                self.remove_integration_id(tenant_id, integration.id, devices, &planned.device_id)
                    .await?;
            }
            Action::Create(status) => {
                connector.create_twin(&planned.device_id, status).await?;
                self.ensure_integration_id(tenant_id, integration.id, devices, &planned.device_id)
                    .await?;
            }
            Action::Update(status) => {
                connector
                    .set_twin_status(&planned.device_id, status)
                    .await?;
                self.ensure_integration_id(tenant_id, integration.id, devices, &planned.device_id)
                    .await?;
            }
        }
        Ok(())
    }

    async fn ensure_integration_id(
        &self,
        tenant_id: &TenantId,
        integration_id: IntegrationId,
        devices: &[DeviceRecord],
        device_id: &DeviceId,
    ) -> SyncResult<()> {
        let Some(record) = devices.iter().find(|d| &d.device_id == device_id) else {
            return Err(SyncError::Internal(format!(
                "planned action for device {device_id} outside the batch"
            )));
        };
        if record.has_integration(integration_id) {
            return Ok(());
        }
        let mut ids = record.integration_ids.clone();
        ids.push(integration_id);
        self.store
            .update_integration_ids(tenant_id, device_id, &ids)
            .await?;
        Ok(())
    }

    async fn remove_integration_id(
        &self,
        tenant_id: &TenantId,
        integration_id: IntegrationId,
        devices: &[DeviceRecord],
        device_id: &DeviceId,
    ) -> SyncResult<()> {
        let Some(record) = devices.iter().find(|d| &d.device_id == device_id) else {
            return Err(SyncError::Internal(format!(
                "planned action for device {device_id} outside the batch"
            )));
        };
        if !record.has_integration(integration_id) {
            return Ok(());
        }
        let ids: Vec<IntegrationId> = record
            .integration_ids
            .iter()
            .copied()
            .filter(|id| *id != integration_id)
            .collect();
        self.store
            .update_integration_ids(tenant_id, device_id, &ids)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = SyncConfig::default();
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.tenant_parallelism, 1);
        assert!(!config.fail_early);
        assert_eq!(config.tenants, TenantSelection::All);
    }

    #[test]
    fn test_config_rejects_zero_batch_size() {
        let config = SyncConfig {
            batch_size: 0,
            ..SyncConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_rejects_zero_parallelism() {
        let config = SyncConfig {
            tenant_parallelism: 0,
            ..SyncConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
