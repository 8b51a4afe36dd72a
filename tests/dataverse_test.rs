use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use inventory_sync::config::{self, Dataverse};
use inventory_sync::dataverse::DataverseClient;
use inventory_sync::error::SyncError;
use inventory_sync::model::InventoryRecord;
use inventory_sync::upsert::RecordUpserter;

const TOKEN_PATH: &str = "/tenant-1/oauth2/v2.0/token";
const ENTITY_BASE: &str = "/api/data/v9.2/cr62d_productinventories";

fn settings_for(server: &MockServer) -> Dataverse {
    let cfg: config::Config = serde_yaml::from_str(config::example()).unwrap();
    let mut settings = cfg.dataverse;
    settings.environment_url = server.uri();
    settings.authority_host = server.uri();
    settings.tenant_id = "tenant-1".into();
    settings.client_id = "app-id".into();
    settings.client_secret = "app-secret".into();
    settings.request_timeout_secs = 5;
    settings
}

fn record(sku: &str, qty: i32) -> InventoryRecord {
    InventoryRecord::new(sku, qty, Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap())
}

fn record_path(sku: &str) -> String {
    format!("{}(cr62d_sku='{}')", ENTITY_BASE, sku)
}

async fn mount_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=app-id"))
        .and(body_string_contains("client_secret=app-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 3599,
            "access_token": "tok-123"
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn token_request_uses_environment_scope() {
    let server = MockServer::start().await;
    let scope = format!("scope={}", urlencoding::encode(&format!("{}/.default", server.uri())));

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains(scope.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-123"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = DataverseClient::new(settings_for(&server)).unwrap();
    assert!(client.push_batch(&[]).await.unwrap());
}

#[tokio::test]
async fn batch_upserts_each_record_with_batch_headers() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    for (sku, qty) in [("SKU001", 10), ("SKU002", 25)] {
        Mock::given(method("PATCH"))
            .and(path(record_path(sku)))
            .and(header("Authorization", "Bearer tok-123"))
            .and(header("Accept", "application/json"))
            .and(header("OData-MaxVersion", "4.0"))
            .and(header("OData-Version", "4.0"))
            .and(header("Prefer", "return=representation"))
            .and(body_json(json!({
                "cr62d_quantityonhand": qty,
                "cr62d_lastmodifiedexternal": "2024-06-01T09:00:00Z"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "cr62d_sku": sku })))
            .expect(1)
            .mount(&server)
            .await;
    }

    let client = DataverseClient::new(settings_for(&server)).unwrap();
    let ok = client
        .push_batch(&[record("SKU001", 10), record("SKU002", 25)])
        .await
        .unwrap();
    assert!(ok);
}

#[tokio::test]
async fn batch_stops_at_first_rejected_record() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("PATCH"))
        .and(path(record_path("SKU001")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(record_path("SKU002")))
        .respond_with(ResponseTemplate::new(400).set_body_string("invalid quantity"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(record_path("SKU003")))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let client = DataverseClient::new(settings_for(&server)).unwrap();
    let ok = client
        .push_batch(&[record("SKU001", 1), record("SKU002", -5), record("SKU003", 3)])
        .await
        .unwrap();
    assert!(!ok);
}

#[tokio::test]
async fn batch_stops_at_server_error_mid_batch() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("PATCH"))
        .and(path(record_path("SKU001")))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(record_path("SKU002")))
        .respond_with(ResponseTemplate::new(503).set_body_string("service unavailable"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(record_path("SKU003")))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let client = DataverseClient::new(settings_for(&server)).unwrap();
    let ok = client
        .push_batch(&[record("SKU001", 1), record("SKU002", 2), record("SKU003", 3)])
        .await
        .unwrap();
    assert!(!ok);
}

#[tokio::test]
async fn failed_authentication_sends_no_records() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let client = DataverseClient::new(settings_for(&server)).unwrap();
    let err = client.push_batch(&[record("SKU001", 1)]).await.unwrap_err();
    match err {
        SyncError::Authentication(msg) => {
            assert!(msg.contains("401"));
            assert!(msg.contains("invalid_client"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn empty_access_token_is_an_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "" })))
        .mount(&server)
        .await;

    let client = DataverseClient::new(settings_for(&server)).unwrap();
    let err = client.push_batch(&[record("SKU001", 1)]).await.unwrap_err();
    assert!(matches!(err, SyncError::Authentication(_)));
}

#[tokio::test]
async fn token_is_acquired_for_every_batch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok-123" })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path(record_path("SKU001")))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&server)
        .await;

    let client = DataverseClient::new(settings_for(&server)).unwrap();
    assert!(client.push_batch(&[record("SKU001", 1)]).await.unwrap());
    assert!(client.push_batch(&[record("SKU001", 2)]).await.unwrap());
}

#[tokio::test]
async fn key_is_url_escaped_in_record_address() {
    let server = MockServer::start().await;
    mount_token(&server).await;

    Mock::given(method("PATCH"))
        .and(path(record_path("BOX%2012%2FA")))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = DataverseClient::new(settings_for(&server)).unwrap();
    assert!(client.push_batch(&[record("BOX 12/A", 4)]).await.unwrap());
}

#[tokio::test]
async fn unreachable_environment_fails_the_batch() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access_token": "tok-123" })))
        .mount(&server)
        .await;

    let mut settings = settings_for(&server);
    // Nothing listens on port 9 locally.
    settings.environment_url = "http://127.0.0.1:9".into();
    let client = DataverseClient::new(settings).unwrap();

    let ok = client.push_batch(&[record("SKU001", 1)]).await.unwrap();
    assert!(!ok);
}

#[test]
fn construction_rejects_missing_secret() {
    let cfg: config::Config = serde_yaml::from_str(config::example()).unwrap();
    let mut settings = cfg.dataverse;
    settings.client_secret = String::new();
    let err = DataverseClient::new(settings).unwrap_err();
    assert!(matches!(err, SyncError::Configuration(ref m) if m.contains("client_secret")));
}
