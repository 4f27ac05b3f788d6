#![allow(clippy::unwrap_used)]
// Integration tests for `FlightDeckClient` using wiremock.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skysync_api::flightdeck::FdPointWrite;
use skysync_api::{Error, FlightDeckClient, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, FlightDeckClient) {
    let server = MockServer::start().await;
    let jwt: secrecy::SecretString = "test-jwt".to_string().into();
    let client = FlightDeckClient::from_token(
        &format!("{}/api", server.uri()),
        &jwt,
        &TransportConfig::default(),
    )
    .unwrap();
    (server, client)
}

// ── Sites ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_site_sends_bearer_token() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sites/building-a"))
        .and(header("authorization", "Bearer test-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 7,
            "name": "building-a",
            "client": "acme",
            "nice_name": "Building A",
            "address": "1 Main St",
            "latitude": 36.1,
            "longitude": -86.7
        })))
        .mount(&server)
        .await;

    let site = client.get_site("building-a").await.unwrap();
    assert_eq!(site.name, "building-a");
    assert_eq!(site.nice_name.as_deref(), Some("Building A"));
    assert_eq!(site.latitude, Some(36.1));
    assert!(site.kv_tags.is_empty());
}

#[tokio::test]
async fn test_get_site_unauthorized() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sites/building-a"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client.get_site("building-a").await;
    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

// ── Points ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_configured_points_page() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sites/building-a/configured_points"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "500"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [{
                "id": 101,
                "name": "acme/building-a/ZN-T",
                "site": "building-a",
                "client": "acme",
                "marker_tags": ["temp", "zone"],
                "kv_tags": {"haystackRef": "p:demo:r:abc", "unit": "°F"},
                "bacnet_data": {
                    "device_address": "10.0.0.5",
                    "device_id": 1001,
                    "device_name": "VAV-1",
                    "object_type": "analogInput",
                    "object_name": "Zone Temp"
                },
                "collect_enabled": true
            }],
            "page": 2,
            "pages": 3,
            "per_page": 500,
            "total": 1001
        })))
        .mount(&server)
        .await;

    let page = client.get_points("building-a", 2, 500, true).await.unwrap();
    assert_eq!(page.pages, 3);
    assert_eq!(page.items.len(), 1);

    let point = &page.items[0];
    assert_eq!(point.id, Some(101));
    let bacnet = point.bacnet_data.as_ref().unwrap();
    assert_eq!(bacnet.device_id.as_deref(), Some("1001"));
    assert_eq!(bacnet.object_name.as_deref(), Some("Zone Temp"));
    assert_eq!(point.kv_tags["haystackRef"], json!("p:demo:r:abc"));
}

#[tokio::test]
async fn test_get_all_points_uses_points_listing() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sites/building-a/points"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [], "page": 1, "pages": 1, "per_page": 500, "total": 0
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client.get_points("building-a", 1, 500, false).await.unwrap();
    assert!(page.items.is_empty());
}

#[tokio::test]
async fn test_server_error_surfaces_status() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sites/building-a/configured_points"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"message": "page corrupted"})),
        )
        .mount(&server)
        .await;

    let result = client.get_points("building-a", 3, 500, true).await;
    match result {
        Err(Error::FlightDeck { status, message }) => {
            assert_eq!(status, 500);
            assert_eq!(message, "page corrupted");
        }
        other => panic!("expected FlightDeck error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_write_points_merges_tags() {
    let (server, client) = setup().await;

    let write = FdPointWrite {
        name: "acme/building-a/ZN-T".into(),
        client: "acme".into(),
        site: "building-a".into(),
        kv_tags: BTreeMap::from([("haystackRef".to_owned(), "p:demo:r:abc".to_owned())]),
        marker_tags: Vec::new(),
    };

    Mock::given(method("PUT"))
        .and(path("/api/points"))
        .and(query_param("overwrite_m_tags", "false"))
        .and(query_param("overwrite_kv_tags", "false"))
        .and(body_json(json!({
            "points": [{
                "name": "acme/building-a/ZN-T",
                "client": "acme",
                "site": "building-a",
                "kv_tags": {"haystackRef": "p:demo:r:abc"},
                "marker_tags": []
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    client.write_points(&[write], false, false).await.unwrap();
}

// ── Timeseries ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_timeseries_encodes_point_name() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/points/acme%2Fbuilding-a%2FZN-T/timeseries"))
        .and(query_param("start_time", "2024-01-01T00:00:00Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "point_samples": [
                {"name": "acme/building-a/ZN-T", "value": "71.5", "time": "2024-01-01T00:05:00Z"},
                {"name": "acme/building-a/ZN-T", "value": 72.0, "time": "2024-01-01T00:10:00Z"}
            ]
        })))
        .mount(&server)
        .await;

    let samples = client
        .get_timeseries(
            "acme/building-a/ZN-T",
            "2024-01-01T00:00:00Z",
            "2024-01-02T00:00:00Z",
        )
        .await
        .unwrap();

    let values: Vec<Option<f64>> = samples.iter().map(|s| s.value.as_f64()).collect();
    assert_eq!(values, vec![Some(71.5), Some(72.0)]);
}

#[tokio::test]
async fn test_malformed_body_keeps_preview() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/sites/building-a"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let result = client.get_site("building-a").await;
    match result {
        Err(Error::Deserialization { body, .. }) => assert_eq!(body, "<html>oops</html>"),
        other => panic!("expected Deserialization error, got: {other:?}"),
    }
}
