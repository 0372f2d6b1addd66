// ── Runtime configuration ──
//
// These types describe the credentials and tuning the controller runs
// with. They never touch disk: the config crate resolves a profile into
// `CredentialParams` + `ControllerConfig` and hands them in.

use std::time::Duration;

use netatmo_api::PasswordGrant;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoEnumIterator};

/// One of the four credentials a session needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum CredentialField {
    Username,
    Password,
    #[strum(serialize = "ClientID")]
    ClientId,
    ClientSecret,
}

impl CredentialField {
    /// Notice key raised while this field is unset.
    pub fn notice_key(self) -> &'static str {
        match self {
            Self::Username => "username",
            Self::Password => "password",
            Self::ClientId => "client_id",
            Self::ClientSecret => "client_secret",
        }
    }

    /// Text shown to the user while this field is unset.
    pub fn notice_message(self) -> String {
        format!("Please set the {self} parameter")
    }
}

/// Credentials as supplied by the host, any of which may be absent.
#[derive(Debug, Clone, Default)]
pub struct CredentialParams {
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub client_id: Option<String>,
    pub client_secret: Option<SecretString>,
}

impl CredentialParams {
    /// Fields that are unset or empty, in declaration order.
    pub fn missing(&self) -> Vec<CredentialField> {
        CredentialField::iter()
            .filter(|field| {
                let value = match field {
                    CredentialField::Username => self.username.as_deref(),
                    CredentialField::Password => {
                        self.password.as_ref().map(ExposeSecret::expose_secret)
                    }
                    CredentialField::ClientId => self.client_id.as_deref(),
                    CredentialField::ClientSecret => {
                        self.client_secret.as_ref().map(ExposeSecret::expose_secret)
                    }
                };
                value.is_none_or(str::is_empty)
            })
            .collect()
    }

    /// Complete credentials, or the list of fields still missing.
    pub fn resolve(&self) -> Result<Credentials, Vec<CredentialField>> {
        let missing = self.missing();
        match (
            &self.username,
            &self.password,
            &self.client_id,
            &self.client_secret,
        ) {
            (Some(username), Some(password), Some(client_id), Some(client_secret))
                if missing.is_empty() =>
            {
                Ok(Credentials {
                    username: username.clone(),
                    password: password.clone(),
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                })
            }
            _ => Err(missing),
        }
    }
}

/// A complete set of credentials.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
    pub client_id: String,
    pub client_secret: SecretString,
}

impl Credentials {
    /// Whether both sets would log into the same account the same way.
    pub fn same_as(&self, other: &Credentials) -> bool {
        self.username == other.username
            && self.client_id == other.client_id
            && self.password.expose_secret() == other.password.expose_secret()
            && self.client_secret.expose_secret() == other.client_secret.expose_secret()
    }

    /// The password grant these credentials produce.
    pub fn password_grant(&self) -> PasswordGrant {
        PasswordGrant::read_station(
            self.client_id.clone(),
            self.client_secret.clone(),
            self.username.clone(),
            self.password.clone(),
        )
    }
}

/// How indoor modules are numbered at discovery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndoorOrdering {
    /// Snapshot iteration order, as the provider returns it.
    #[default]
    Provider,
    /// Module names sorted ascending, so ordinals survive provider reordering.
    #[serde(rename = "name")]
    ByName,
}

/// Configuration for a single weather-station controller.
///
/// Built by the CLI, passed to `Controller`. Core never reads config files.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// API root, normally `https://api.netatmo.com`.
    pub base_url: String,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Station name or id to read; `None` picks the first one.
    pub station: Option<String>,
    /// Drop module readings older than this.
    pub stale_after: Option<Duration>,
    /// Time between polls. Zero disables background polling.
    pub poll_interval: Duration,
    pub indoor_ordering: IndoorOrdering,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: netatmo_api::DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(30),
            station: None,
            stale_after: None,
            poll_interval: Duration::from_secs(60),
            indoor_ordering: IndoorOrdering::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn secret(value: &str) -> Option<SecretString> {
        Some(SecretString::from(value.to_owned()))
    }

    #[test]
    fn every_field_missing_when_empty() {
        let params = CredentialParams::default();
        assert_eq!(
            params.missing(),
            vec![
                CredentialField::Username,
                CredentialField::Password,
                CredentialField::ClientId,
                CredentialField::ClientSecret,
            ]
        );
    }

    #[test]
    fn empty_strings_count_as_missing() {
        let params = CredentialParams {
            username: Some(String::new()),
            password: secret("pw"),
            client_id: Some("id".into()),
            client_secret: secret(""),
        };
        assert_eq!(
            params.missing(),
            vec![CredentialField::Username, CredentialField::ClientSecret]
        );
        assert!(params.resolve().is_err());
    }

    #[test]
    fn complete_params_resolve() {
        let params = CredentialParams {
            username: Some("me@example.com".into()),
            password: secret("pw"),
            client_id: Some("id".into()),
            client_secret: secret("cs"),
        };
        let creds = params.resolve().expect("complete");
        assert_eq!(creds.username, "me@example.com");
        assert!(creds.same_as(&creds.clone()));

        let other = Credentials {
            password: SecretString::from("changed".to_owned()),
            ..creds.clone()
        };
        assert!(!creds.same_as(&other));
    }

    #[test]
    fn field_display_matches_parameter_names() {
        assert_eq!(CredentialField::ClientId.to_string(), "ClientID");
        assert_eq!(
            CredentialField::Password.notice_message(),
            "Please set the Password parameter"
        );
    }
}
