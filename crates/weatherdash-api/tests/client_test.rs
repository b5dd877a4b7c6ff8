#![allow(clippy::unwrap_used)]
// Integration tests for `NetatmoClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use weatherdash_api::{Error, MeasureQuery, NetatmoClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, NetatmoClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = NetatmoClient::with_client(reqwest::Client::new(), base_url, "app-id");
    (server, client)
}

fn secret(value: &str) -> SecretString {
    SecretString::from(value.to_owned())
}

fn token_body(access: &str, refresh: &str) -> serde_json::Value {
    json!({
        "access_token": access,
        "refresh_token": refresh,
        "expires_in": 10800,
        "expire_in": 10800,
        "scope": ["read_station"]
    })
}

// ── OAuth ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_authenticate_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("client_id=app-id"))
        .and(body_string_contains("username=alice%40example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("acc-1", "ref-1")))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = client
        .authenticate("alice@example.com", &secret("pw"), &secret("app-secret"))
        .await
        .unwrap();

    assert_eq!(tokens.access_token.expose_secret(), "acc-1");
    assert_eq!(tokens.refresh_token.expose_secret(), "ref-1");
    assert_eq!(tokens.expires_in.map(|d| d.as_secs()), Some(10800));
}

#[tokio::test]
async fn test_authenticate_invalid_grant() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let result = client
        .authenticate("alice@example.com", &secret("wrong"), &secret("app-secret"))
        .await;

    match result {
        Err(ref e @ Error::OAuth { status, .. }) => {
            assert_eq!(status, 400);
            assert!(e.is_invalid_grant());
        }
        other => panic!("expected OAuth error, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_refresh_without_client_secret() {
    let (_server, client) = setup().await;

    let result = client.refresh(&secret("ref-1")).await;
    assert!(
        matches!(result, Err(Error::MissingClientSecret)),
        "expected MissingClientSecret, got: {result:?}"
    );
}

#[tokio::test]
async fn test_refresh_reuses_login_secret() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("acc-1", "ref-1")))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=ref-1"))
        .and(body_string_contains("client_secret=app-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("acc-2", "ref-2")))
        .expect(1)
        .mount(&server)
        .await;

    client
        .authenticate("alice@example.com", &secret("pw"), &secret("app-secret"))
        .await
        .unwrap();
    let tokens = client.refresh(&secret("ref-1")).await.unwrap();

    assert_eq!(tokens.access_token.expose_secret(), "acc-2");
    assert_eq!(tokens.refresh_token.expose_secret(), "ref-2");
}

// ── Station data ────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_station_data() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/getstationsdata"))
        .and(header("authorization", "Bearer acc-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "time_server": 1_600_000_000,
            "body": {
                "devices": [{
                    "_id": "70:ee:50:00:00:01",
                    "type": "NAMain",
                    "station_name": "Home",
                    "module_name": "Indoor",
                    "reachable": true,
                    "wifi_status": 42,
                    "dashboard_data": { "Temperature": 21.5, "CO2": 640, "Pressure": 1013.2 },
                    "modules": [{
                        "_id": "05:00:00:00:00:03",
                        "type": "NAModule3",
                        "module_name": "Rain gauge",
                        "reachable": true,
                        "rf_status": 70,
                        "battery_percent": 88,
                        "dashboard_data": { "Rain": 0.1, "sum_rain_1": 0.4, "sum_rain_24": 3.2 }
                    }]
                }],
                "user": {
                    "mail": "alice@example.com",
                    "administrative": { "lang": "fr", "unit": 0, "windunit": 2, "pressureunit": 0 }
                }
            }
        })))
        .mount(&server)
        .await;

    let body = client.get_station_data(&secret("acc-1")).await.unwrap();

    assert_eq!(body.devices.len(), 1);
    let station = &body.devices[0];
    assert_eq!(station.id, "70:ee:50:00:00:01");
    assert_eq!(station.station_name.as_deref(), Some("Home"));
    assert_eq!(
        station.dashboard_data.as_ref().and_then(|d| d.temperature),
        Some(21.5)
    );

    let rain = &station.modules[0];
    assert_eq!(rain.kind, "NAModule3");
    assert_eq!(rain.battery_percent, Some(88));
    assert_eq!(
        rain.dashboard_data.as_ref().and_then(|d| d.sum_rain_24),
        Some(3.2)
    );

    let admin = body.user.and_then(|u| u.administrative).unwrap();
    assert_eq!(admin.lang.as_deref(), Some("fr"));
    assert_eq!(admin.windunit, Some(2));
}

#[tokio::test]
async fn test_expired_access_token() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/getstationsdata"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 3, "message": "Access token expired" }
        })))
        .mount(&server)
        .await;

    let err = client
        .get_station_data(&secret("stale"))
        .await
        .unwrap_err();

    assert!(err.is_token_expired(), "expected expired token, got: {err:?}");
    assert_eq!(err.api_error_code(), Some(3));
}

#[tokio::test]
async fn test_server_error_without_envelope() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/getstationsdata"))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let result = client.get_station_data(&secret("acc-1")).await;
    assert!(
        matches!(result, Err(Error::Http { status: 502, .. })),
        "expected Http 502, got: {result:?}"
    );
}

// ── Measurements ────────────────────────────────────────────────────

fn rain_query() -> MeasureQuery {
    MeasureQuery {
        device_id: "70:ee:50:00:00:01".into(),
        module_id: "05:00:00:00:00:03".into(),
        scale: "1hour".into(),
        types: vec!["Rain".into()],
        date_begin: 1_600_000_000,
        date_end: None,
    }
}

#[tokio::test]
async fn test_get_measure() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/getmeasure"))
        .and(query_param("device_id", "70:ee:50:00:00:01"))
        .and(query_param("module_id", "05:00:00:00:00:03"))
        .and(query_param("scale", "1hour"))
        .and(query_param("type", "Rain"))
        .and(query_param("date_begin", "1600000000"))
        .and(query_param("optimize", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "body": {
                "1600003600": [0.2],
                "1600000000": [0.0],
                "1600007200": [null]
            }
        })))
        .mount(&server)
        .await;

    let points = client
        .get_measure(&secret("acc-1"), &rain_query())
        .await
        .unwrap();

    let stamps: Vec<i64> = points.iter().map(|p| p.timestamp).collect();
    assert_eq!(stamps, vec![1_600_000_000, 1_600_003_600, 1_600_007_200]);
    assert_eq!(points[1].values, vec![Some(0.2)]);
    assert_eq!(points[2].values, vec![None]);
}

#[tokio::test]
async fn test_get_measure_empty_range() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/getmeasure"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "ok",
            "body": []
        })))
        .mount(&server)
        .await;

    let points = client
        .get_measure(&secret("acc-1"), &rain_query())
        .await
        .unwrap();
    assert!(points.is_empty());
}

#[tokio::test]
async fn test_get_measure_invalid_token() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/getmeasure"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 2, "message": "Invalid access token" }
        })))
        .mount(&server)
        .await;

    let err = client
        .get_measure(&secret("revoked"), &rain_query())
        .await
        .unwrap_err();
    assert!(err.is_token_invalid(), "expected invalid token, got: {err:?}");
}
