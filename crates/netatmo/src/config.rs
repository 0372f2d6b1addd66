//! CLI configuration: thin wrapper around `netatmo_config`.
//!
//! Loads the config file (or the one named by `--config`), picks the active
//! profile and applies `GlobalOpts` flag overrides.

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use netatmo_config::{Config, ConfigError, Profile};
use netatmo_core::{ControllerConfig, CredentialParams};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

pub use netatmo_config::{SecretField, store_secret};

/// Everything a command needs to build a controller.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub controller: ControllerConfig,
    pub credentials: CredentialParams,
}

/// Config file in effect: `--config` or the platform default.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(netatmo_config::config_path)
}

pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(netatmo_config::load_config_from(&config_path(global))?)
}

/// `defaults.output` from the config file, if it names a known format.
pub fn default_output(global: &GlobalOpts) -> Option<OutputFormat> {
    let cfg = load(global).ok()?;
    <OutputFormat as ValueEnum>::from_str(&cfg.defaults.output, true).ok()
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Resolve profile, credentials and controller settings.
///
/// With no `--profile` and no matching entry in the file, an empty profile
/// is used so credentials can come from the environment alone.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load(global)?;
    let profile_name = active_profile_name(global, &cfg);

    let fallback = Profile::default();
    let profile = match cfg.profile(Some(&profile_name)) {
        Ok((_, profile)) => profile,
        Err(ConfigError::ProfileNotFound { .. }) if global.profile.is_none() => {
            tracing::debug!(profile = %profile_name, "profile not in config, using environment");
            &fallback
        }
        Err(e) => return Err(e.into()),
    };

    let mut controller = netatmo_config::profile_to_controller_config(profile, &cfg.defaults)?;
    if let Some(ref station) = global.station {
        controller.station = Some(station.clone());
    }
    if let Some(timeout) = global.timeout {
        if timeout == 0 {
            return Err(CliError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }
        controller.timeout = Duration::from_secs(timeout);
    }

    let credentials = netatmo_config::resolve_credentials(profile, &profile_name);

    Ok(Resolved {
        profile_name,
        controller,
        credentials,
    })
}
