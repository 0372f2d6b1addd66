//! Configuration for netatmo-ws.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext), and
//! translation to `netatmo_core::ControllerConfig` / `CredentialParams`.
//! Missing credentials are not an error here: they come back as `None`
//! so the supervisor can raise one notice per field.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use netatmo_core::{ControllerConfig, CredentialParams, IndoorOrdering};

/// Keyring service name secrets are stored under.
pub const KEYRING_SERVICE: &str = "netatmo-ws";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "NETATMO_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named station profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Seconds between polls.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_output")]
    pub output: String,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            timeout: default_timeout(),
            output: default_output(),
        }
    }
}

fn default_poll_interval() -> u64 {
    60
}
fn default_timeout() -> u64 {
    30
}
fn default_output() -> String {
    "table".into()
}

/// A named Netatmo account + station.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// Netatmo account e-mail.
    pub username: Option<String>,

    /// Account password (plaintext, prefer keyring or env var).
    pub password: Option<String>,

    /// Environment variable holding the password.
    pub password_env: Option<String>,

    /// OAuth application client id.
    pub client_id: Option<String>,

    /// OAuth client secret (plaintext, prefer keyring or env var).
    pub client_secret: Option<String>,

    /// Environment variable holding the client secret.
    pub client_secret_env: Option<String>,

    /// Station name or id; the first station when unset.
    pub station: Option<String>,

    /// Ignore modules that have not reported for this many seconds.
    pub stale_after: Option<u64>,

    #[serde(default)]
    pub indoor_ordering: IndoorOrdering,

    /// API root override.
    pub base_url: Option<String>,

    /// Override poll interval.
    pub poll_interval: Option<u64>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

impl Config {
    /// Pick a profile by name, falling back to `default_profile`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into());

        self.profiles
            .get(&name)
            .map(|p| (name.clone(), p))
            .ok_or_else(|| ConfigError::ProfileNotFound {
                available: self.available_profiles(),
                name,
            })
    }

    fn available_profiles(&self) -> String {
        if self.profiles.is_empty() {
            "none".into()
        } else {
            self.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
        }
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "netatmo-ws", "netatmo-ws").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("netatmo-ws");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from a specific file + environment. A missing file yields defaults.
///
/// Environment keys nest on a double underscore, so
/// `NETATMO_DEFAULTS__POLL_INTERVAL=30` overrides `defaults.poll_interval`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

// ── Credential resolution ───────────────────────────────────────────

/// A secret that can live in the keyring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretField {
    Password,
    ClientSecret,
}

impl SecretField {
    fn keyring_key(self, profile_name: &str) -> String {
        match self {
            Self::Password => format!("{profile_name}/password"),
            Self::ClientSecret => format!("{profile_name}/client-secret"),
        }
    }

    fn global_env(self) -> String {
        match self {
            Self::Password => format!("{ENV_PREFIX}PASSWORD"),
            Self::ClientSecret => format!("{ENV_PREFIX}CLIENT_SECRET"),
        }
    }
}

/// Store a secret in the system keyring for a profile.
pub fn store_secret(
    profile_name: &str,
    field: SecretField,
    value: &str,
) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &field.keyring_key(profile_name))?;
    entry.set_password(value)?;
    Ok(())
}

fn keyring_secret(profile_name: &str, field: SecretField) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &field.keyring_key(profile_name))
        .ok()
        .and_then(|entry| entry.get_password().ok())
}

/// First non-empty value of: profile's env var, global env var,
/// keyring, plaintext.
fn resolve_secret(
    env_override: Option<String>,
    global_env: Option<String>,
    keyring: impl FnOnce() -> Option<String>,
    plaintext: Option<&String>,
) -> Option<SecretString> {
    env_override
        .filter(|v| !v.is_empty())
        .or_else(|| global_env.filter(|v| !v.is_empty()))
        .or_else(|| keyring().filter(|v| !v.is_empty()))
        .or_else(|| plaintext.filter(|v| !v.is_empty()).cloned())
        .map(SecretString::from)
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn profile_secret(
    profile_name: &str,
    field: SecretField,
    env_name: Option<&String>,
    plaintext: Option<&String>,
) -> Option<SecretString> {
    resolve_secret(
        env_name.and_then(|name| env_var(name)),
        env_var(&field.global_env()),
        || keyring_secret(profile_name, field),
        plaintext,
    )
}

/// Resolve every credential a profile can supply. Absent ones stay `None`.
pub fn resolve_credentials(profile: &Profile, profile_name: &str) -> CredentialParams {
    CredentialParams {
        username: profile
            .username
            .clone()
            .or_else(|| env_var(&format!("{ENV_PREFIX}USERNAME"))),
        password: profile_secret(
            profile_name,
            SecretField::Password,
            profile.password_env.as_ref(),
            profile.password.as_ref(),
        ),
        client_id: profile
            .client_id
            .clone()
            .or_else(|| env_var(&format!("{ENV_PREFIX}CLIENT_ID"))),
        client_secret: profile_secret(
            profile_name,
            SecretField::ClientSecret,
            profile.client_secret_env.as_ref(),
            profile.client_secret.as_ref(),
        ),
    }
}

/// Build a `ControllerConfig` from a profile and the global defaults.
pub fn profile_to_controller_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<ControllerConfig, ConfigError> {
    let base_url = match profile.base_url {
        Some(ref raw) => {
            url::Url::parse(raw).map_err(|e| ConfigError::Validation {
                field: "base_url".into(),
                reason: format!("{e}: {raw}"),
            })?;
            raw.clone()
        }
        None => ControllerConfig::default().base_url,
    };

    let timeout = profile.timeout.unwrap_or(defaults.timeout);
    if timeout == 0 {
        return Err(ConfigError::Validation {
            field: "timeout".into(),
            reason: "must be at least 1 second".into(),
        });
    }

    Ok(ControllerConfig {
        base_url,
        timeout: Duration::from_secs(timeout),
        station: profile.station.clone(),
        stale_after: profile.stale_after.map(Duration::from_secs),
        poll_interval: Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval)),
        indoor_ordering: profile.indoor_ordering,
    })
}
