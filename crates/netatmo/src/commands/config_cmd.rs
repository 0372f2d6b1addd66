//! Config subcommand handlers.

use std::fmt::Write;

use netatmo_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, SecretKind, SetSecretArgs};
use crate::config::{self, SecretField};
use crate::error::CliError;
use crate::output;

/// Format config for display, masking secrets.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "poll_interval = {}", cfg.defaults.poll_interval);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);

    for (name, p) in &cfg.profiles {
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        if let Some(ref u) = p.username {
            let _ = writeln!(out, "username = \"{u}\"");
        }
        if p.password.is_some() {
            let _ = writeln!(out, "password = \"****\"");
        }
        if let Some(ref env) = p.password_env {
            let _ = writeln!(out, "password_env = \"{env}\"");
        }
        if let Some(ref id) = p.client_id {
            let _ = writeln!(out, "client_id = \"{id}\"");
        }
        if p.client_secret.is_some() {
            let _ = writeln!(out, "client_secret = \"****\"");
        }
        if let Some(ref env) = p.client_secret_env {
            let _ = writeln!(out, "client_secret_env = \"{env}\"");
        }
        if let Some(ref station) = p.station {
            let _ = writeln!(out, "station = \"{station}\"");
        }
        if let Some(secs) = p.stale_after {
            let _ = writeln!(out, "stale_after = {secs}");
        }
        let ordering = match p.indoor_ordering {
            netatmo_core::IndoorOrdering::Provider => "provider",
            netatmo_core::IndoorOrdering::ByName => "name",
        };
        let _ = writeln!(out, "indoor_ordering = \"{ordering}\"");
        if let Some(ref url) = p.base_url {
            let _ = writeln!(out, "base_url = \"{url}\"");
        }
        if let Some(secs) = p.poll_interval {
            let _ = writeln!(out, "poll_interval = {secs}");
        }
        if let Some(secs) = p.timeout {
            let _ = writeln!(out, "timeout = {secs}");
        }
    }

    out
}

fn set_secret(args: &SetSecretArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let profile_name = config::active_profile_name(global, &cfg);

    let (field, label) = match args.secret {
        SecretKind::Password => (SecretField::Password, "Password"),
        SecretKind::ClientSecret => (SecretField::ClientSecret, "Client secret"),
    };

    let value = rpassword::prompt_password(format!("{label} for profile '{profile_name}': "))?;
    if value.is_empty() {
        return Err(CliError::Validation {
            field: "secret".into(),
            reason: format!("{label} cannot be empty"),
        });
    }

    config::store_secret(&profile_name, field, &value)?;
    if !global.quiet {
        eprintln!("{label} stored in system keyring for profile '{profile_name}'");
    }
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = config::config_path(global);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }
        ConfigCommand::Show => {
            let cfg = config::load(global)?;
            output::print_output(&format_config_redacted(&cfg), global.quiet);
            Ok(())
        }
        ConfigCommand::SetSecret(ref secret) => set_secret(secret, global),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use netatmo_config::Profile;

    #[test]
    fn redacts_plaintext_secrets() {
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "home".into(),
            Profile {
                username: Some("me@example.com".into()),
                password: Some("hunter2".into()),
                client_secret: Some("s3cret".into()),
                ..Profile::default()
            },
        );

        let shown = format_config_redacted(&cfg);
        assert!(shown.contains("[profiles.home]"));
        assert!(shown.contains("username = \"me@example.com\""));
        assert!(shown.contains("password = \"****\""));
        assert!(!shown.contains("hunter2"));
        assert!(!shown.contains("s3cret"));
    }
}
