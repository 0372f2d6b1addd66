#![allow(clippy::unwrap_used)]
// Integration tests for `NetatmoClient` using wiremock.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use netatmo_api::{AccessToken, Error, NetatmoClient, PasswordGrant};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, NetatmoClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = NetatmoClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

fn grant() -> PasswordGrant {
    PasswordGrant::read_station(
        "client-id",
        SecretString::from("client-secret".to_owned()),
        "me@example.com",
        SecretString::from("hunter2".to_owned()),
    )
}

fn token(value: &str) -> AccessToken {
    AccessToken::new(SecretString::from(value.to_owned()))
}

// ── Authentication tests ────────────────────────────────────────────

#[tokio::test]
async fn test_authenticate_success() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .and(body_string_contains("grant_type=password"))
        .and(body_string_contains("scope=read_station"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "token-1",
            "refresh_token": "refresh-1",
            "expires_in": 10800,
            "scope": ["read_station"]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let token = client.authenticate(&grant()).await.unwrap();

    assert_eq!(token.secret().expose_secret(), "token-1");
    assert!(token.expires_at().is_some());
    assert!(!token.is_expired(Utc::now()));
}

#[tokio::test]
async fn test_authenticate_rejected() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant"
        })))
        .mount(&server)
        .await;

    let result = client.authenticate(&grant()).await;

    assert!(
        matches!(result, Err(Error::Authentication { .. })),
        "expected Authentication error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_authenticate_during_outage_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
        .mount(&server)
        .await;

    let err = client.authenticate(&grant()).await.unwrap_err();

    assert!(
        matches!(err, Error::Api { status: 503, .. }),
        "expected a transient API error, got: {err:?}"
    );
    assert!(err.is_transient());
    assert!(!err.is_auth_expired());
}

// ── Station data tests ──────────────────────────────────────────────

#[tokio::test]
async fn test_stations_data() {
    let (server, client) = setup().await;

    let body = json!({
        "status": "ok",
        "time_server": 1_700_000_100,
        "body": {
            "devices": [{
                "_id": "70:ee:50:00:00:01",
                "station_name": "Home",
                "module_name": "Living Room",
                "type": "NAMain",
                "wifi_status": 56,
                "dashboard_data": {
                    "time_utc": 1_700_000_000,
                    "Temperature": 21.3,
                    "CO2": 612,
                    "Humidity": 45,
                    "Noise": 38,
                    "Pressure": 1013.2,
                    "AbsolutePressure": 1001.1,
                    "min_temp": 19.8,
                    "max_temp": 22.0,
                    "temp_trend": "stable",
                    "pressure_trend": "up"
                },
                "modules": [{
                    "_id": "02:00:00:00:00:01",
                    "module_name": "Garden",
                    "type": "NAModule1",
                    "battery_percent": 80,
                    "rf_status": 60,
                    "dashboard_data": { "time_utc": 1_700_000_000, "Temperature": 4.2 }
                }]
            }],
            "user": { "mail": "me@example.com" }
        }
    });

    Mock::given(method("GET"))
        .and(path("/api/getstationsdata"))
        .and(header("authorization", "Bearer token-1"))
        .and(query_param("get_favorites", "false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&body))
        .mount(&server)
        .await;

    let data = client.stations_data(&token("token-1"), None).await.unwrap();

    assert_eq!(data.devices.len(), 1);
    assert_eq!(data.default_home(), Some("Home"));
    assert_eq!(data.devices[0].modules.len(), 1);

    let last = data.last_data(None, None, Utc::now());
    assert_eq!(last.len(), 2);
    assert_eq!(last[1].0, "Garden");
}

#[tokio::test]
async fn test_stations_data_device_filter() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/getstationsdata"))
        .and(query_param("device_id", "70:ee:50:00:00:01"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "body": { "devices": [] } })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let data = client
        .stations_data(&token("token-1"), Some("70:ee:50:00:00:01"))
        .await
        .unwrap();
    assert!(data.devices.is_empty());
}

// ── Error handling tests ────────────────────────────────────────────

#[tokio::test]
async fn test_expired_token() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/getstationsdata"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "error": { "code": 3, "message": "Access token expired" }
        })))
        .mount(&server)
        .await;

    let result = client.stations_data(&token("stale"), None).await;

    let err = result.unwrap_err();
    assert!(matches!(err, Error::SessionExpired), "got: {err:?}");
    assert!(err.is_auth_expired());
}

#[tokio::test]
async fn test_rate_limited() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/getstationsdata"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let err = client.stations_data(&token("t"), None).await.unwrap_err();
    assert!(matches!(err, Error::RateLimited));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_malformed_body() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/getstationsdata"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = client.stations_data(&token("t"), None).await.unwrap_err();
    assert!(matches!(err, Error::Deserialization { ref body, .. } if body == "not json"));
}
