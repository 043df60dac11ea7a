//! Integration tests for the Azure IoT Hub connector against a wiremock
//! server: twin queries with continuation paging, registry writes,
//! idempotent deletes, and error taxonomy mapping.

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fleetlink_connector::{
    ConnectorError, DeviceId, HubConnector, TwinCreateOp, TwinDeleteOp, TwinQueryOp, TwinStatus,
    TwinUpdateOp,
};
use fleetlink_connector_azure::{AzureConfig, AzureIotHubConnector};

const CONNECTION_STRING: &str =
    "HostName=mock.azure-devices.net;SharedAccessKeyName=TestSync;SharedAccessKey=c2VjcmV0";

fn connector(server: &MockServer) -> AzureIotHubConnector {
    let config = AzureConfig::new(CONNECTION_STRING.parse().unwrap())
        .with_api_base(server.uri())
        .with_request_timeout(5);
    AzureIotHubConnector::new(config).unwrap()
}

#[tokio::test]
async fn test_query_twins_single_page() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/devices/query"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"deviceId": "dev-a", "status": "enabled"},
            {"deviceId": "dev-b", "status": "disabled"},
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server);
    let twins = connector
        .query_twins(&[DeviceId::from("dev-a"), DeviceId::from("dev-b"), DeviceId::from("dev-c")])
        .await
        .unwrap();

    assert_eq!(twins.len(), 2);
    assert_eq!(twins.get(&DeviceId::from("dev-a")), Some(&TwinStatus::Enabled));
    assert_eq!(twins.get(&DeviceId::from("dev-b")), Some(&TwinStatus::Disabled));
    // dev-c has no twin: absent from the map.
    assert!(!twins.contains_key(&DeviceId::from("dev-c")));
}

#[tokio::test]
async fn test_query_twins_follows_continuation() {
    let server = MockServer::start().await;

    // First page carries a continuation token.
    Mock::given(method("POST"))
        .and(path("/devices/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-ms-continuation", "page-2")
                .set_body_json(json!([{"deviceId": "dev-a", "status": "enabled"}])),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    // Second page is requested with the token and ends the scan.
    Mock::given(method("POST"))
        .and(path("/devices/query"))
        .and(header("x-ms-continuation", "page-2"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"deviceId": "dev-b", "status": "disabled"}])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server);
    let twins = connector
        .query_twins(&[DeviceId::from("dev-a"), DeviceId::from("dev-b")])
        .await
        .unwrap();

    assert_eq!(twins.len(), 2);
    assert_eq!(twins.get(&DeviceId::from("dev-b")), Some(&TwinStatus::Disabled));
}

#[tokio::test]
async fn test_query_twins_skips_unrecognized_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/devices/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"deviceId": "dev-a", "status": "enabled"},
            {"deviceId": "dev-x", "status": "quarantined"},
        ])))
        .mount(&server)
        .await;

    let connector = connector(&server);
    let twins = connector
        .query_twins(&[DeviceId::from("dev-a"), DeviceId::from("dev-x")])
        .await
        .unwrap();

    assert_eq!(twins.len(), 1);
    assert!(twins.contains_key(&DeviceId::from("dev-a")));
}

#[tokio::test]
async fn test_query_twins_maps_auth_rejection() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/devices/query"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let connector = connector(&server);
    let err = connector
        .query_twins(&[DeviceId::from("dev-a")])
        .await
        .unwrap_err();
    assert!(err.is_auth_rejected());
}

#[tokio::test]
async fn test_query_twins_maps_server_error_as_transient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/devices/query"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let connector = connector(&server);
    let err = connector
        .query_twins(&[DeviceId::from("dev-a")])
        .await
        .unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_create_twin_puts_registry_entry() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/devices/dev-a"))
        .and(header_exists("authorization"))
        .and(body_partial_json(json!({"deviceId": "dev-a", "status": "enabled"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(
            {"deviceId": "dev-a", "status": "enabled"}
        )))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server);
    connector
        .create_twin(&DeviceId::from("dev-a"), TwinStatus::Enabled)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_create_twin_overwrites_existing() {
    let server = MockServer::start().await;

    // The plain PUT conflicts, the retry carries If-Match and succeeds.
    Mock::given(method("PUT"))
        .and(path("/devices/dev-a"))
        .and(header("if-match", "*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(
            {"deviceId": "dev-a", "status": "enabled"}
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/devices/dev-a"))
        .respond_with(ResponseTemplate::new(409))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server);
    connector
        .create_twin(&DeviceId::from("dev-a"), TwinStatus::Enabled)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_set_twin_status_noops_when_already_converged() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/devices/dev-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(
            {"deviceId": "dev-a", "status": "disabled"}
        )))
        .expect(1)
        .mount(&server)
        .await;
    // No PUT mock mounted: a write would fail the test.

    let connector = connector(&server);
    connector
        .set_twin_status(&DeviceId::from("dev-a"), TwinStatus::Disabled)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_set_twin_status_updates_diverged_twin() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/devices/dev-a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(
            {"deviceId": "dev-a", "status": "disabled"}
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/devices/dev-a"))
        .and(header("if-match", "*"))
        .and(body_partial_json(json!({"status": "enabled"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(
            {"deviceId": "dev-a", "status": "enabled"}
        )))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server);
    connector
        .set_twin_status(&DeviceId::from("dev-a"), TwinStatus::Enabled)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_set_twin_status_missing_twin_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/devices/dev-a"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let connector = connector(&server);
    let err = connector
        .set_twin_status(&DeviceId::from("dev-a"), TwinStatus::Enabled)
        .await
        .unwrap_err();
    assert!(matches!(err, ConnectorError::NotFound { .. }));
}

#[tokio::test]
async fn test_delete_twin() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/devices/dev-a"))
        .and(header("if-match", "*"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server);
    connector.delete_twin(&DeviceId::from("dev-a")).await.unwrap();
}

#[tokio::test]
async fn test_delete_twin_absent_is_ok() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/devices/dev-a"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let connector = connector(&server);
    connector.delete_twin(&DeviceId::from("dev-a")).await.unwrap();
}

#[tokio::test]
async fn test_authorization_header_is_sas_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/statistics/devices"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(
            {"totalDeviceCount": 0, "enabledDeviceCount": 0, "disabledDeviceCount": 0}
        )))
        .mount(&server)
        .await;

    let connector = connector(&server);
    connector.test_connection().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0]
        .headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap();
    assert!(auth.starts_with("SharedAccessSignature sr="));
    assert!(auth.contains("&skn=TestSync"));
}
