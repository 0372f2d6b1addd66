// ── Core error types ──
//
// Errors surfaced by netatmo-core. Transport details never leak past
// this layer: the telemetry source folds them into `SourceError`, and
// the supervisor turns those into the variants below.

use thiserror::Error;

use crate::config::CredentialField;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration incomplete: missing {}", field_list(.missing))]
    ConfigurationIncomplete { missing: Vec<CredentialField> },

    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Session errors ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Netatmo service unavailable: {reason}")]
    ServiceUnavailable { reason: String },

    // ── Discovery errors ─────────────────────────────────────────────
    #[error("Discovery failed: {reason}")]
    DiscoveryFailed { reason: String },

    #[error("No weather station modules found")]
    NoModules,

    // ── Lifecycle errors ─────────────────────────────────────────────
    #[error("Controller is not running")]
    ControllerNotRunning,
}

fn field_list(fields: &[CredentialField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<netatmo_api::Error> for CoreError {
    fn from(err: netatmo_api::Error) -> Self {
        match err {
            netatmo_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            netatmo_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            netatmo_api::Error::SessionExpired => CoreError::AuthenticationFailed {
                message: "Session expired".into(),
            },
            other => CoreError::Config {
                message: other.to_string(),
            },
        }
    }
}

impl From<url::ParseError> for CoreError {
    fn from(err: url::ParseError) -> Self {
        CoreError::Config {
            message: format!("Invalid URL: {err}"),
        }
    }
}

/// Why a module produced no reading this cycle.
///
/// Every variant takes the same path: the previous reading stands and
/// nothing is emitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadingError {
    #[error("No data for module '{module}' in this snapshot")]
    NoData { module: String },

    #[error("Required field '{field}' is missing")]
    MissingField { field: &'static str },

    #[error("Field '{field}' is malformed: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incomplete_configuration_lists_every_field() {
        let err = CoreError::ConfigurationIncomplete {
            missing: vec![CredentialField::Username, CredentialField::ClientSecret],
        };
        assert_eq!(
            err.to_string(),
            "Configuration incomplete: missing Username, ClientSecret"
        );
    }
}
