//! CLI configuration loaded from environment variables.
//!
//! Fail-fast: required variables must be present and valid before any
//! remote connection is attempted.

use std::env;

use crate::error::{CliError, CliResult};

/// Default per-request timeout in seconds for remote calls.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Postgres connection URL of the device inventory
    /// (`FLEETLINK_DATABASE_URL`).
    pub database_url: String,
    /// Base URL of the device-authentication service
    /// (`FLEETLINK_DEVICEAUTH_URL`).
    pub deviceauth_url: String,
    /// Per-request timeout in seconds
    /// (`FLEETLINK_REQUEST_TIMEOUT`, optional).
    pub request_timeout_secs: u64,
}

impl CliConfig {
    pub fn from_env() -> CliResult<Self> {
        let database_url = require("FLEETLINK_DATABASE_URL")?;
        let deviceauth_url = require("FLEETLINK_DEVICEAUTH_URL")?;
        let request_timeout_secs = match env::var("FLEETLINK_REQUEST_TIMEOUT") {
            Ok(raw) => raw.parse().map_err(|_| {
                CliError::Config(format!("FLEETLINK_REQUEST_TIMEOUT is not a number: {raw}"))
            })?,
            Err(_) => DEFAULT_REQUEST_TIMEOUT_SECS,
        };
        Ok(Self {
            database_url,
            deviceauth_url,
            request_timeout_secs,
        })
    }
}

fn require(name: &str) -> CliResult<String> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(CliError::Config(format!("{name} must be set"))),
    }
}
