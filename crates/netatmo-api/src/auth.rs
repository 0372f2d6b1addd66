// OAuth password-grant authentication
//
// Netatmo issues bearer tokens from `POST /oauth2/token`. This client only
// implements the password grant: a session that stops working is replaced
// by logging in again, never by refreshing.

use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::client::{NetatmoClient, preview};
use crate::error::Error;

/// Scope needed to read weather station data.
pub const READ_STATION_SCOPE: &str = "read_station";

/// Everything the token endpoint needs for a password grant.
#[derive(Debug, Clone)]
pub struct PasswordGrant {
    pub client_id: String,
    pub client_secret: SecretString,
    pub username: String,
    pub password: SecretString,
    pub scope: String,
}

impl PasswordGrant {
    /// A grant requesting [`READ_STATION_SCOPE`].
    pub fn read_station(
        client_id: impl Into<String>,
        client_secret: SecretString,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            username: username.into(),
            password,
            scope: READ_STATION_SCOPE.to_owned(),
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Vec<String>,
}

/// A bearer token returned by the token endpoint.
///
/// Opaque to callers apart from its expiry; a new login yields a new value.
#[derive(Debug, Clone)]
pub struct AccessToken {
    token: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl AccessToken {
    /// Wrap a raw bearer token with no known expiry.
    pub fn new(token: SecretString) -> Self {
        Self {
            token,
            expires_at: None,
        }
    }

    pub fn secret(&self) -> &SecretString {
        &self.token
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Whether the token is past its advertised lifetime at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

impl NetatmoClient {
    /// Exchange user credentials for an access token.
    ///
    /// A 4xx from the token endpoint means the grant was refused and is
    /// reported as [`Error::Authentication`]. HTTP 429 and 5xx responses
    /// are provider trouble and stay transient.
    pub async fn authenticate(&self, grant: &PasswordGrant) -> Result<AccessToken, Error> {
        let url = self.endpoint("oauth2/token")?;
        debug!("requesting token at {}", url);

        let form = [
            ("grant_type", "password"),
            ("client_id", grant.client_id.as_str()),
            ("client_secret", grant.client_secret.expose_secret()),
            ("username", grant.username.as_str()),
            ("password", grant.password.expose_secret()),
            ("scope", grant.scope.as_str()),
        ];

        let resp = self
            .http()
            .post(url)
            .form(&form)
            .send()
            .await
            .map_err(Error::Transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(classify_token_error(status, &body));
        }

        let token: TokenResponse = self.parse_response(resp).await?;
        let issued_at = Utc::now();

        debug!(scope = ?token.scope, "token issued");
        Ok(AccessToken {
            token: SecretString::from(token.access_token),
            expires_at: token
                .expires_in
                .map(|secs| issued_at + Duration::seconds(secs)),
        })
    }
}

fn classify_token_error(status: StatusCode, body: &str) -> Error {
    if status == StatusCode::TOO_MANY_REQUESTS {
        Error::RateLimited
    } else if status.is_server_error() {
        Error::Api {
            message: preview(body),
            code: 0,
            status: status.as_u16(),
        }
    } else {
        Error::Authentication {
            message: format!("token request failed (HTTP {status}): {}", preview(body)),
        }
    }
}
