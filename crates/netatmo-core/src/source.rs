// ── Telemetry source ──
//
// Where snapshots come from. The supervisor only needs two things from a
// source, a login that yields a session and a fetch that uses one, plus
// a clear split between "the session is no good" and "try again later".

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use netatmo_api::{AccessToken, NetatmoClient, StationDevice, TransportConfig};
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::config::{ControllerConfig, Credentials};
use crate::error::CoreError;
use crate::model::TelemetrySnapshot;

/// Failure contract of a [`TelemetrySource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// Credentials refused or session no longer valid. Triggers a fresh login.
    #[error("authentication rejected: {message}")]
    Auth { message: String },

    /// Network or provider trouble. The cycle yields no data.
    #[error("telemetry unavailable: {message}")]
    Transient { message: String },
}

impl From<netatmo_api::Error> for SourceError {
    fn from(err: netatmo_api::Error) -> Self {
        let message = err.to_string();
        if err.is_auth_expired() {
            SourceError::Auth { message }
        } else {
            SourceError::Transient { message }
        }
    }
}

/// A provider of telemetry snapshots.
pub trait TelemetrySource: Send + Sync {
    /// Opaque login state. Replaced on re-authentication, never mutated.
    type Session: Send + Sync;

    fn authenticate(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<Self::Session, SourceError>> + Send;

    fn fetch_snapshot(
        &self,
        session: &Self::Session,
    ) -> impl Future<Output = Result<TelemetrySnapshot, SourceError>> + Send;
}

// ── Netatmo cloud ────────────────────────────────────────────────────

/// [`TelemetrySource`] backed by the Netatmo weather station API.
#[derive(Debug, Clone)]
pub struct NetatmoSource {
    client: NetatmoClient,
    station: Option<String>,
    stale_after: Option<Duration>,
}

impl NetatmoSource {
    pub fn new(config: &ControllerConfig) -> Result<Self, CoreError> {
        let base_url = Url::parse(&config.base_url)?;
        let transport = TransportConfig::default().with_timeout(config.timeout);
        let client = NetatmoClient::new(base_url, &transport)?;
        Ok(Self::with_client(
            client,
            config.station.clone(),
            config.stale_after,
        ))
    }

    pub fn with_client(
        client: NetatmoClient,
        station: Option<String>,
        stale_after: Option<Duration>,
    ) -> Self {
        Self {
            client,
            station,
            stale_after,
        }
    }
}

impl TelemetrySource for NetatmoSource {
    type Session = AccessToken;

    async fn authenticate(&self, credentials: &Credentials) -> Result<AccessToken, SourceError> {
        let token = self
            .client
            .authenticate(&credentials.password_grant())
            .await?;
        debug!(expires_at = ?token.expires_at(), "netatmo session established");
        Ok(token)
    }

    /// A token past its advertised lifetime is rejected up front so the
    /// supervisor logs in again without a wasted request.
    async fn fetch_snapshot(&self, session: &AccessToken) -> Result<TelemetrySnapshot, SourceError> {
        if session.is_expired(Utc::now()) {
            return Err(SourceError::Auth {
                message: "access token past its lifetime".into(),
            });
        }

        let data = self.client.stations_data(session, None).await?;
        let station = match self.station.as_deref() {
            None => data.default_home(),
            Some(selector) => data
                .station(Some(selector))
                .and_then(StationDevice::display_name),
        };
        let last = data.last_data(self.station.as_deref(), self.stale_after, Utc::now());
        debug!(modules = last.len(), "station data flattened");
        Ok(TelemetrySnapshot::from((station, last)))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> Credentials {
        Credentials {
            username: "me@example.com".into(),
            password: SecretString::from("pw".to_owned()),
            client_id: "id".into(),
            client_secret: SecretString::from("cs".to_owned()),
        }
    }

    async fn setup() -> (MockServer, NetatmoSource) {
        let server = MockServer::start().await;
        let config = ControllerConfig {
            base_url: server.uri(),
            ..ControllerConfig::default()
        };
        let source = NetatmoSource::new(&config).unwrap();
        (server, source)
    }

    #[tokio::test]
    async fn expired_session_is_an_auth_error() {
        let (server, source) = setup().await;
        Mock::given(method("GET"))
            .and(path("/api/getstationsdata"))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": { "code": 2, "message": "Invalid access token" }
            })))
            .mount(&server)
            .await;

        let token = AccessToken::new(SecretString::from("stale".to_owned()));
        let err = source.fetch_snapshot(&token).await.unwrap_err();
        assert!(matches!(err, SourceError::Auth { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let (server, source) = setup().await;
        Mock::given(method("GET"))
            .and(path("/api/getstationsdata"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let token = AccessToken::new(SecretString::from("t".to_owned()));
        let err = source.fetch_snapshot(&token).await.unwrap_err();
        assert!(matches!(err, SourceError::Transient { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn login_then_fetch() {
        let (server, source) = setup().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "token-1",
                "expires_in": 10800
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/getstationsdata"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "body": { "devices": [{
                    "_id": "70:ee:50:00:00:01",
                    "station_name": "Home",
                    "module_name": "Living Room",
                    "wifi_status": 50,
                    "dashboard_data": { "time_utc": 1_700_000_000, "Noise": 40 },
                    "modules": []
                }] }
            })))
            .mount(&server)
            .await;

        let session = source.authenticate(&credentials()).await.unwrap();
        let snapshot = source.fetch_snapshot(&session).await.unwrap();
        assert_eq!(snapshot.station(), Some("Home"));
        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("Living Room").unwrap().contains("wifi_status"));
    }

    #[tokio::test]
    async fn lapsed_token_is_refused_without_a_request() {
        let (server, source) = setup().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "short-lived",
                "expires_in": 0
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/getstationsdata"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "body": { "devices": [] } })))
            .expect(0)
            .mount(&server)
            .await;

        let session = source.authenticate(&credentials()).await.unwrap();
        let err = source.fetch_snapshot(&session).await.unwrap_err();
        assert!(matches!(err, SourceError::Auth { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn first_station_names_the_snapshot() {
        let (server, source) = setup().await;
        Mock::given(method("GET"))
            .and(path("/api/getstationsdata"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "body": { "devices": [
                    {
                        "_id": "70:ee:50:00:00:01",
                        "home_name": "Cabin",
                        "module_name": "Living Room",
                        "dashboard_data": { "time_utc": 1_700_000_000, "Noise": 40 },
                        "modules": []
                    },
                    {
                        "_id": "70:ee:50:00:00:02",
                        "station_name": "Office",
                        "module_name": "Desk",
                        "dashboard_data": { "time_utc": 1_700_000_000, "Noise": 35 },
                        "modules": []
                    }
                ] }
            })))
            .mount(&server)
            .await;

        let token = AccessToken::new(SecretString::from("t".to_owned()));
        let snapshot = source.fetch_snapshot(&token).await.unwrap();
        assert_eq!(snapshot.station(), Some("Cabin"));
        assert!(snapshot.get("Living Room").is_some());
    }

    #[tokio::test]
    async fn outage_at_login_is_transient() {
        let (server, source) = setup().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = source.authenticate(&credentials()).await.unwrap_err();
        assert!(matches!(err, SourceError::Transient { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn rejected_login_is_an_auth_error() {
        let (server, source) = setup().await;
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "error": "invalid_grant" })))
            .mount(&server)
            .await;

        let err = source.authenticate(&credentials()).await.unwrap_err();
        assert!(matches!(err, SourceError::Auth { .. }));
    }
}
