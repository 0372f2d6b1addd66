//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text and process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use netatmo_config::ConfigError;
use netatmo_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    /// `EX_TEMPFAIL`: a process supervisor should start us again.
    pub const RESTART: i32 = 75;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Credentials ──────────────────────────────────────────────────

    #[error("Credentials incomplete for profile '{profile}': missing {missing}")]
    #[diagnostic(
        code(netatmo::credentials_incomplete),
        help(
            "Set the missing values in the profile, or via NETATMO_USERNAME, NETATMO_PASSWORD,\n\
             NETATMO_CLIENT_ID and NETATMO_CLIENT_SECRET.\n\
             Store secrets with: netatmo-ws config set-secret password --profile {profile}"
        )
    )]
    CredentialsIncomplete { profile: String, missing: String },

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(netatmo::auth_failed),
        help(
            "Verify the username, password and OAuth client of profile '{profile}'.\n\
             Client credentials are listed at https://dev.netatmo.com/apps"
        )
    )]
    AuthFailed { profile: String, message: String },

    #[error("Netatmo service unavailable: {reason}")]
    #[diagnostic(
        code(netatmo::unavailable),
        help("The Netatmo cloud did not answer the login. Retry later; nothing is wrong with the credentials.")
    )]
    ServiceUnavailable { reason: String },

    // ── Station ──────────────────────────────────────────────────────

    #[error("Station discovery failed: {reason}")]
    #[diagnostic(
        code(netatmo::discovery_failed),
        help("Check network access to the Netatmo API and retry.")
    )]
    DiscoveryFailed { reason: String },

    #[error("No weather station modules found")]
    #[diagnostic(
        code(netatmo::no_modules),
        help("Check the station name in the profile, or drop stale_after to include idle modules.")
    )]
    NoModules,

    #[error("Module '{identifier}' not found")]
    #[diagnostic(
        code(netatmo::module_not_found),
        help("Run: netatmo-ws discover to see available modules")
    )]
    ModuleNotFound { identifier: String },

    #[error("Session could not be re-established; restart requested")]
    #[diagnostic(
        code(netatmo::restart),
        help("Exit code 75 asks a process supervisor (systemd Restart=on-failure) to start a fresh process.")
    )]
    RestartRequested,

    #[error("Controller is not running")]
    #[diagnostic(code(netatmo::not_running))]
    NotRunning,

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(netatmo::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(netatmo::profile_not_found),
        help("Available profiles: {available}\nConfig file: netatmo-ws config path")
    )]
    ProfileNotFound { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(netatmo::config))]
    Config(ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON serialization failed: {0}")]
    #[diagnostic(code(netatmo::json))]
    Json(#[from] serde_json::Error),

    #[error("YAML serialization failed: {0}")]
    #[diagnostic(code(netatmo::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::CredentialsIncomplete { .. } | Self::AuthFailed { .. } => exit_code::AUTH,
            Self::DiscoveryFailed { .. } | Self::ServiceUnavailable { .. } => {
                exit_code::CONNECTION
            }
            Self::NoModules | Self::ModuleNotFound { .. } | Self::ProfileNotFound { .. } => {
                exit_code::NOT_FOUND
            }
            Self::RestartRequested => exit_code::RESTART,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }

    /// Attach the active profile name to a core error.
    pub fn from_core(err: CoreError, profile: &str) -> Self {
        match err {
            CoreError::ConfigurationIncomplete { missing } => Self::CredentialsIncomplete {
                profile: profile.to_owned(),
                missing: missing
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            },
            CoreError::AuthenticationFailed { message } => Self::AuthFailed {
                profile: profile.to_owned(),
                message,
            },
            other => other.into(),
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConfigurationIncomplete { .. } | CoreError::AuthenticationFailed { .. } => {
                Self::from_core(err, "current")
            }
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
            CoreError::ServiceUnavailable { reason } => Self::ServiceUnavailable { reason },
            CoreError::DiscoveryFailed { reason } => Self::DiscoveryFailed { reason },
            CoreError::NoModules => Self::NoModules,
            CoreError::ControllerNotRunning => Self::NotRunning,
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::ProfileNotFound { name, available } => {
                Self::ProfileNotFound { name, available }
            }
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}
