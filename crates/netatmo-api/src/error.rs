use thiserror::Error;

/// Top-level error type for the `netatmo-api` crate.
///
/// Covers every failure mode of the weather station API surface:
/// authentication, transport, the `{error: {code, message}}` envelope,
/// and payload decoding. `netatmo-core` collapses these into the
/// auth-vs-transient split its supervisor cares about.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Token request rejected (wrong credentials, unknown client, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// The access token expired or was revoked.
    #[error("Session expired -- re-authentication required")]
    SessionExpired,

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Rate limited by the cloud API.
    #[error("Rate limited by the Netatmo API")]
    RateLimited,

    // ── API ─────────────────────────────────────────────────────────
    /// Structured error from the `{"error": {"code", "message"}}` envelope.
    #[error("Netatmo API error (HTTP {status}, code {code}): {message}")]
    Api {
        message: String,
        code: i64,
        status: u16,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this error indicates auth has expired
    /// and re-authentication might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Authentication { .. } | Self::SessionExpired)
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::RateLimited => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
