//! Azure IoT Hub connector implementation.
//!
//! Talks to the IoT Hub service API (`api-version=2021-04-12`): bulk twin
//! queries through `POST /devices/query` with continuation paging, and
//! per-device registry writes through `PUT`/`DELETE /devices/{id}`.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use reqwest::{header, Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use fleetlink_connector::{
    ConnectorError, ConnectorResult, DeviceId, HubConnector, Provider, TwinCreateOp, TwinDeleteOp,
    TwinQueryOp, TwinStatus, TwinUpdateOp,
};

use crate::config::AzureConfig;

/// IoT Hub service API version sent with every request.
/// https://docs.microsoft.com/en-us/rest/api/iothub/service/devices
pub const API_VERSION: &str = "2021-04-12";

const HDR_CONTINUATION: &str = "x-ms-continuation";

/// Connector for a single Azure IoT Hub instance.
pub struct AzureIotHubConnector {
    config: AzureConfig,
    display_name: String,
    client: Client,
}

impl std::fmt::Debug for AzureIotHubConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The connection string holds the access key; never log it.
        f.debug_struct("AzureIotHubConnector")
            .field("host", &self.config.connection_string.effective_host())
            .field("display_name", &self.display_name)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct TwinQueryRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct TwinQueryRow {
    #[serde(rename = "deviceId")]
    device_id: String,
    status: Option<String>,
}

#[derive(Debug, Serialize)]
struct RegistryDeviceUpdate<'a> {
    #[serde(rename = "deviceId")]
    device_id: &'a str,
    status: TwinStatus,
}

#[derive(Debug, Deserialize)]
struct RegistryDevice {
    #[serde(rename = "deviceId")]
    #[allow(dead_code)]
    device_id: String,
    status: Option<String>,
}

impl AzureIotHubConnector {
    pub fn new(config: AzureConfig) -> ConnectorResult<Self> {
        config.validate()?;

        let display_name = format!(
            "iot-hub: {}",
            config.connection_string.effective_host()
        );
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ConnectorError::invalid_configuration(format!(
                "failed to build HTTP client: {e}"
            )))?;

        Ok(Self {
            config,
            display_name,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}?api-version={}", self.config.base_url(), path, API_VERSION)
    }

    fn authorization(&self) -> String {
        let expire_at = Utc::now() + ChronoDuration::seconds(self.config.token_ttl_secs as i64);
        self.config.connection_string.authorization(expire_at)
    }

    fn map_send_error(&self, err: reqwest::Error) -> ConnectorError {
        if err.is_timeout() {
            ConnectorError::Timeout {
                timeout_secs: self.config.request_timeout_secs,
            }
        } else {
            ConnectorError::unavailable_with_source("hub request failed", err)
        }
    }

    async fn error_from_response(&self, context: &str, rsp: Response) -> ConnectorError {
        let status = rsp.status().as_u16();
        let body = rsp.text().await.unwrap_or_default();
        debug!(context, status, body = %body, "hub request rejected");
        ConnectorError::from_status(status, context.to_string())
    }

    /// One page of a twin query. Returns the rows and the continuation
    /// token for the next page, if any.
    async fn query_page(
        &self,
        query: &str,
        continuation: Option<&str>,
    ) -> ConnectorResult<(Vec<TwinQueryRow>, Option<String>)> {
        let mut req = self
            .client
            .post(self.url("/devices/query"))
            .header(header::AUTHORIZATION, self.authorization())
            .json(&TwinQueryRequest { query });
        if let Some(token) = continuation {
            req = req.header(HDR_CONTINUATION, token);
        }

        let rsp = req.send().await.map_err(|e| self.map_send_error(e))?;
        if !rsp.status().is_success() {
            return Err(self.error_from_response("twin query", rsp).await);
        }

        let next = rsp
            .headers()
            .get(HDR_CONTINUATION)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        let rows: Vec<TwinQueryRow> = rsp.json().await.map_err(|e| {
            ConnectorError::Serialization {
                message: format!("twin query response: {e}"),
            }
        })?;
        Ok((rows, next))
    }

    /// Fetch the registry entry for a single device, `None` when absent.
    async fn get_device(&self, device_id: &DeviceId) -> ConnectorResult<Option<RegistryDevice>> {
        let rsp = self
            .client
            .get(self.url(&format!("/devices/{device_id}")))
            .header(header::AUTHORIZATION, self.authorization())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        if rsp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !rsp.status().is_success() {
            return Err(self.error_from_response("get device", rsp).await);
        }
        let device: RegistryDevice = rsp.json().await.map_err(|e| {
            ConnectorError::Serialization {
                message: format!("device response: {e}"),
            }
        })?;
        Ok(Some(device))
    }

    async fn put_device(
        &self,
        device_id: &DeviceId,
        status: TwinStatus,
        force: bool,
    ) -> ConnectorResult<Response> {
        let mut req = self
            .client
            .put(self.url(&format!("/devices/{device_id}")))
            .header(header::AUTHORIZATION, self.authorization())
            .json(&RegistryDeviceUpdate {
                device_id: device_id.as_str(),
                status,
            });
        if force {
            req = req.header(header::IF_MATCH, "*");
        }
        req.send().await.map_err(|e| self.map_send_error(e))
    }
}

#[async_trait]
impl HubConnector for AzureIotHubConnector {
    fn provider(&self) -> Provider {
        Provider::IotHub
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        let rsp = self
            .client
            .get(self.url("/statistics/devices"))
            .header(header::AUTHORIZATION, self.authorization())
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;
        if !rsp.status().is_success() {
            return Err(self.error_from_response("statistics", rsp).await);
        }
        Ok(())
    }
}

#[async_trait]
impl TwinQueryOp for AzureIotHubConnector {
    async fn query_twins(
        &self,
        device_ids: &[DeviceId],
    ) -> ConnectorResult<HashMap<DeviceId, TwinStatus>> {
        if device_ids.is_empty() {
            return Ok(HashMap::new());
        }

        // Device ids are single-quoted in the IoT Hub query language;
        // embedded quotes are stripped rather than escaped.
        let id_list = device_ids
            .iter()
            .map(|id| format!("'{}'", id.as_str().replace('\'', "")))
            .collect::<Vec<_>>()
            .join(",");
        let query = format!(
            "SELECT deviceId, status FROM devices WHERE deviceId IN [{id_list}]"
        );

        let mut twins = HashMap::with_capacity(device_ids.len());
        let mut continuation: Option<String> = None;
        loop {
            let (rows, next) = self.query_page(&query, continuation.as_deref()).await?;
            for row in rows {
                let Some(raw) = row.status else { continue };
                match raw.parse::<TwinStatus>() {
                    Ok(status) => {
                        twins.insert(DeviceId::from(row.device_id), status);
                    }
                    Err(_) => {
                        // Skip rather than fail the batch on a status value
                        // outside the registry contract.
                        warn!(
                            device_id = %row.device_id,
                            status = %raw,
                            "ignoring twin with unrecognized status"
                        );
                    }
                }
            }
            match next {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        Ok(twins)
    }
}

#[async_trait]
impl TwinCreateOp for AzureIotHubConnector {
    async fn create_twin(&self, device_id: &DeviceId, status: TwinStatus) -> ConnectorResult<()> {
        let rsp = self.put_device(device_id, status, false).await?;
        match rsp.status() {
            s if s.is_success() => Ok(()),
            // The twin already exists; overwrite it in place.
            StatusCode::CONFLICT | StatusCode::PRECONDITION_FAILED => {
                let rsp = self.put_device(device_id, status, true).await?;
                if rsp.status().is_success() {
                    Ok(())
                } else {
                    Err(self.error_from_response("create twin", rsp).await)
                }
            }
            _ => Err(self.error_from_response("create twin", rsp).await),
        }
    }
}

#[async_trait]
impl TwinUpdateOp for AzureIotHubConnector {
    async fn set_twin_status(
        &self,
        device_id: &DeviceId,
        status: TwinStatus,
    ) -> ConnectorResult<()> {
        let device = self.get_device(device_id).await?.ok_or_else(|| {
            ConnectorError::NotFound {
                identifier: device_id.to_string(),
            }
        })?;

        if device.status.as_deref() == Some(&status.to_string()) {
            debug!(device_id = %device_id, status = %status, "twin already in target status");
            return Ok(());
        }

        let rsp = self.put_device(device_id, status, true).await?;
        if !rsp.status().is_success() {
            return Err(self.error_from_response("update twin", rsp).await);
        }
        Ok(())
    }
}

#[async_trait]
impl TwinDeleteOp for AzureIotHubConnector {
    async fn delete_twin(&self, device_id: &DeviceId) -> ConnectorResult<()> {
        let rsp = self
            .client
            .delete(self.url(&format!("/devices/{device_id}")))
            .header(header::AUTHORIZATION, self.authorization())
            .header(header::IF_MATCH, "*")
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        match rsp.status() {
            s if s.is_success() => Ok(()),
            // Already gone.
            StatusCode::NOT_FOUND => Ok(()),
            _ => Err(self.error_from_response("delete twin", rsp).await),
        }
    }
}
