// Netatmo API HTTP client
//
// Wraps `reqwest::Client` with Netatmo-specific URL construction and
// error-envelope unwrapping. Endpoint groups (token, station data) are
// implemented as inherent methods in separate files to keep this module
// focused on transport mechanics.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;

/// Production endpoint of the Netatmo cloud.
pub const DEFAULT_BASE_URL: &str = "https://api.netatmo.com";

/// Netatmo reports token problems as numeric codes inside a 403:
/// 1 = missing, 2 = invalid, 3 = expired.
const TOKEN_ERROR_CODES: [i64; 3] = [1, 2, 3];

/// Netatmo's "user usage reached" code.
const RATE_LIMIT_CODE: i64 = 26;

/// Data endpoints wrap errors as `{"error":{"code":N,"message":"..."}}`.
#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Structured {
        code: i64,
        message: Option<String>,
    },
    /// OAuth endpoints use the RFC 6749 shape: `{"error":"invalid_grant"}`.
    OAuth(String),
}

/// Raw HTTP client for the Netatmo weather station API.
///
/// Holds no session state: every data call takes the [`AccessToken`]
/// explicitly, so a re-authenticated session is just a new token value.
///
/// [`AccessToken`]: crate::AccessToken
#[derive(Debug, Clone)]
pub struct NetatmoClient {
    http: reqwest::Client,
    base_url: Url,
}

impl NetatmoClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the API root, normally [`DEFAULT_BASE_URL`].
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The underlying HTTP client.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// The API base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build a full URL for an API path such as `api/getstationsdata`.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let full = format!("{base}/{}", path.trim_start_matches('/'));
        Url::parse(&full).map_err(Error::InvalidUrl)
    }

    // ── Response handling ────────────────────────────────────────────

    /// Decode a JSON response, mapping the Netatmo error envelope onto
    /// [`Error`] variants.
    pub(crate) async fn parse_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, Error> {
        let status = resp.status();
        let body = resp.text().await.map_err(Error::Transport)?;
        trace!(%status, len = body.len(), "response received");

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited);
        }

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: format!("{e} (body preview: {:?})", preview(&body)),
            body: body.clone(),
        })
    }

    /// Send a bearer-authenticated GET request and decode the JSON body.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        url: Url,
        bearer: &str,
    ) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self
            .http
            .get(url)
            .bearer_auth(bearer)
            .send()
            .await
            .map_err(Error::Transport)?;

        self.parse_response(resp).await
    }
}

/// Map a non-success response onto an [`Error`].
fn classify_error(status: reqwest::StatusCode, body: &str) -> Error {
    let status_code = status.as_u16();

    match serde_json::from_str::<ErrorEnvelope>(body).map(|env| env.error) {
        Ok(ErrorBody::Structured { code, .. }) if TOKEN_ERROR_CODES.contains(&code) => {
            Error::SessionExpired
        }
        Ok(ErrorBody::Structured { code, .. }) if code == RATE_LIMIT_CODE => Error::RateLimited,
        Ok(ErrorBody::Structured { code, message }) => Error::Api {
            message: message.unwrap_or_default(),
            code,
            status: status_code,
        },
        Ok(ErrorBody::OAuth(reason)) => Error::Authentication { message: reason },
        Err(_) if status == reqwest::StatusCode::UNAUTHORIZED => Error::SessionExpired,
        Err(_) => Error::Api {
            message: preview(body),
            code: 0,
            status: status_code,
        },
    }
}

/// First 200 characters of a response body.
pub(crate) fn preview(body: &str) -> String {
    body.chars().take(200).collect()
}
