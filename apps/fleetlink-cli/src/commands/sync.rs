//! The `sync` subcommand: one full reconciliation run.

use clap::Args;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use fleetlink_connector::TenantId;
use fleetlink_devauth::{DeviceAuthClient, DeviceAuthConfig};
use fleetlink_store::{DeviceStore, PgDeviceStore};
use fleetlink_sync::engine::DEFAULT_BATCH_SIZE;
use fleetlink_sync::{
    AuthStatusSource, ProviderRegistry, SyncConfig, SyncEngine, SyncReport, TenantSelection,
};

use crate::config::CliConfig;
use crate::error::{CliError, CliResult};

#[derive(Debug, Args)]
pub struct SyncArgs {
    /// Devices fetched and reconciled per batch
    #[arg(long = "batch-size", value_name = "N")]
    pub batch_size: Option<usize>,

    /// Abort the run on the first failing corrective action
    #[arg(long = "fail-early")]
    pub fail_early: bool,

    /// Reconcile only this tenant (repeatable); all tenants when absent
    #[arg(long = "tenant", value_name = "TENANT_ID")]
    pub tenants: Vec<String>,

    /// Maximum tenants reconciled concurrently
    #[arg(long = "tenant-parallelism", value_name = "N", default_value_t = 1)]
    pub tenant_parallelism: usize,
}

impl SyncArgs {
    fn to_sync_config(&self) -> SyncConfig {
        let tenants = if self.tenants.is_empty() {
            TenantSelection::All
        } else {
            TenantSelection::Only(self.tenants.iter().map(|t| TenantId::from(t.as_str())).collect())
        };
        SyncConfig {
            tenants,
            batch_size: self.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            fail_early: self.fail_early,
            tenant_parallelism: self.tenant_parallelism,
        }
    }
}

pub async fn execute(args: SyncArgs) -> CliResult<i32> {
    let config = CliConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .connect(&config.database_url)
        .await
        .map_err(|e| CliError::Database(e.to_string()))?;
    let store = Arc::new(PgDeviceStore::new(pool)) as Arc<dyn DeviceStore>;

    let auth = Arc::new(DeviceAuthClient::new(
        DeviceAuthConfig::new(&config.deviceauth_url)
            .with_request_timeout(config.request_timeout_secs),
    )?) as Arc<dyn AuthStatusSource>;

    let engine = SyncEngine::new(
        store,
        auth,
        Arc::new(ProviderRegistry::new().with_request_timeout(config.request_timeout_secs)),
        args.to_sync_config(),
    );

    // Ctrl-C requests a cooperative stop at the next batch boundary.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupt received, stopping after the current batch");
                cancel.cancel();
            }
        });
    }

    let report = engine.sync(&cancel).await?;
    print_summary(&report);
    Ok(report.exit_code())
}

fn print_summary(report: &SyncReport) {
    for tenant in &report.tenants {
        if tenant.skipped {
            println!("tenant {}: skipped (no integration configured)", tenant.tenant_id);
            continue;
        }
        println!(
            "tenant {}: {} devices, {} consistent, {} corrected ({} created, {} updated, {} deleted), {} failed{}{}",
            tenant.tenant_id,
            tenant.devices_total,
            tenant.consistent,
            tenant.corrected,
            tenant.twins_created,
            tenant.twins_updated,
            tenant.twins_deleted,
            tenant.failures.len(),
            if tenant.cancelled { ", cancelled" } else { "" },
            match &tenant.aborted {
                Some(reason) => format!(", aborted: {reason}"),
                None => String::new(),
            },
        );
        for failure in &tenant.failures {
            println!(
                "  failed {} on device {}: {}",
                failure.action, failure.device_id, failure.error
            );
        }
    }
    println!(
        "sync finished: {} corrective actions, {} failures, exit code {}",
        report.actions_taken(),
        report.failure_count(),
        report.exit_code()
    );
}
