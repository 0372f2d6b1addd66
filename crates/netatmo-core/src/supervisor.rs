// ── Poll/session supervisor ──
//
// Owns the session, the classifier and the module registry, and runs
// one cycle at a time: configure, discover, poll. A rejected session is
// replaced once per cycle; if the replacement fails too the supervisor
// gives up and asks the host for a restart.

use indexmap::IndexMap;
use serde::Serialize;
use strum::Display;
use tracing::{debug, error, info, warn};

use crate::classify::{Classification, Classifier};
use crate::config::{CredentialField, CredentialParams, Credentials, IndoorOrdering};
use crate::error::{CoreError, ReadingError};
use crate::model::{Driver, DriverValue, ModuleAddress, TelemetrySnapshot, node_definitions};
use crate::module::{Module, ModuleSnapshot};
use crate::sink::DriverSink;
use crate::source::{SourceError, TelemetrySource};

/// Notice raised while the provider refuses the configured credentials.
pub const AUTH_NOTICE_KEY: &str = "authentication";

/// Lifecycle state of a [`Supervisor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize)]
pub enum SupervisorState {
    Unconfigured,
    Configuring,
    Discovering,
    Polling,
    Reauthenticating,
    Failed,
}

/// What a cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CycleOutcome {
    /// Nothing to do in the current state.
    Skipped,
    /// Another cycle was already running; this trigger was dropped.
    Coalesced,
    /// The source had a transient failure; no module was touched.
    NoData,
    /// `refreshed` modules published a reading, `silent` kept their last one.
    Completed { refreshed: usize, silent: usize },
    /// Re-authentication failed; the host should restart.
    RestartRequested,
}

/// Drives a [`TelemetrySource`] and publishes to a [`DriverSink`].
pub struct Supervisor<S: TelemetrySource, K: DriverSink> {
    source: S,
    sink: K,
    state: SupervisorState,
    credentials: Option<Credentials>,
    session: Option<S::Session>,
    classifier: Classifier,
    modules: IndexMap<String, Module>,
    station: Option<String>,
}

impl<S: TelemetrySource, K: DriverSink> Supervisor<S, K> {
    pub fn new(source: S, sink: K, ordering: IndoorOrdering) -> Self {
        Self {
            source,
            sink,
            state: SupervisorState::Unconfigured,
            credentials: None,
            session: None,
            classifier: Classifier::new(ordering),
            modules: IndexMap::new(),
            station: None,
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Station name reported at the last discovery.
    pub fn station(&self) -> Option<&str> {
        self.station.as_deref()
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &Module> {
        self.modules.values()
    }

    pub fn snapshots(&self) -> Vec<ModuleSnapshot> {
        self.modules.values().map(Module::snapshot).collect()
    }

    // ── Configuration ────────────────────────────────────────────────

    /// Apply credentials and, if they changed, log in and discover.
    ///
    /// Every missing field raises its own notice. Unchanged credentials
    /// with a live session are a no-op. A provider outage during login
    /// keeps the credentials, so applying them again retries the login.
    pub async fn configure(&mut self, params: &CredentialParams) -> Result<CycleOutcome, CoreError> {
        let credentials = match params.resolve() {
            Ok(credentials) => credentials,
            Err(missing) => {
                self.sync_field_notices(&missing);
                warn!(missing = missing.len(), "credentials incomplete");
                self.state = SupervisorState::Unconfigured;
                self.session = None;
                self.credentials = None;
                return Err(CoreError::ConfigurationIncomplete { missing });
            }
        };

        let unchanged = self
            .credentials
            .as_ref()
            .is_some_and(|current| current.same_as(&credentials));
        if unchanged && self.session.is_some() {
            debug!("credentials unchanged, keeping session");
            return Ok(CycleOutcome::Skipped);
        }

        self.sink.clear_notices();
        self.state = SupervisorState::Configuring;
        info!(username = %credentials.username, "logging in");

        match self.source.authenticate(&credentials).await {
            Ok(session) => {
                self.session = Some(session);
                self.credentials = Some(credentials);
                info!("session established");
                self.discover().await
            }
            Err(SourceError::Transient { message }) => {
                warn!(%message, "Netatmo unreachable, login not attempted");
                self.session = None;
                self.credentials = Some(credentials);
                self.state = SupervisorState::Unconfigured;
                Err(CoreError::ServiceUnavailable { reason: message })
            }
            Err(e @ SourceError::Auth { .. }) => {
                error!(error = %e, "login failed");
                self.session = None;
                self.credentials = None;
                self.state = SupervisorState::Unconfigured;
                self.sink
                    .add_notice(AUTH_NOTICE_KEY, &format!("Netatmo login failed: {e}"));
                Err(CoreError::AuthenticationFailed {
                    message: e.to_string(),
                })
            }
        }
    }

    fn sync_field_notices(&mut self, missing: &[CredentialField]) {
        use strum::IntoEnumIterator;

        for field in CredentialField::iter() {
            if missing.contains(&field) {
                self.sink
                    .add_notice(field.notice_key(), &field.notice_message());
            } else {
                self.sink.remove_notice(field.notice_key());
            }
        }
    }

    // ── Discovery ────────────────────────────────────────────────────

    /// Fetch one snapshot, classify it and create any new modules.
    ///
    /// Failures are logged and returned; discovery is only retried when
    /// triggered again.
    pub async fn discover(&mut self) -> Result<CycleOutcome, CoreError> {
        let Some(session) = self.session.as_ref() else {
            info!("not configured, skipping discovery");
            return Ok(CycleOutcome::Skipped);
        };
        self.state = SupervisorState::Discovering;

        let snapshot = match self.source.fetch_snapshot(session).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(error = %e, "discovery failed");
                self.settle_after_failed_discovery();
                return Err(CoreError::DiscoveryFailed {
                    reason: e.to_string(),
                });
            }
        };

        if let Some(station) = snapshot.station() {
            info!(station, "weather station");
            self.station = Some(station.to_owned());
        }

        for (name, classification) in self.classifier.classify_snapshot(&snapshot) {
            let Classification::Assigned { kind, address } = classification else {
                continue;
            };
            if self.modules.contains_key(&name) {
                continue;
            }
            info!(module = %name, %kind, %address, "adding module");
            self.sink.add_node(&address, kind, &name);
            self.modules
                .insert(name.clone(), Module::new(name, kind, address));
        }

        if self.modules.is_empty() {
            error!("no weather station modules found");
            self.settle_after_failed_discovery();
            return Err(CoreError::NoModules);
        }

        self.sink.emit(
            &ModuleAddress::controller(),
            Driver::St,
            DriverValue::Integer(1),
            true,
        );
        let (refreshed, silent) = self.refresh_all(&snapshot, true);
        self.state = SupervisorState::Polling;
        Ok(CycleOutcome::Completed { refreshed, silent })
    }

    fn settle_after_failed_discovery(&mut self) {
        self.state = if self.modules.is_empty() {
            SupervisorState::Discovering
        } else {
            SupervisorState::Polling
        };
    }

    // ── Polling ──────────────────────────────────────────────────────

    /// Run one poll cycle.
    pub async fn poll(&mut self) -> CycleOutcome {
        let ready = matches!(
            self.state,
            SupervisorState::Polling | SupervisorState::Reauthenticating | SupervisorState::Failed
        );
        if !ready || self.modules.is_empty() {
            debug!(state = %self.state, "nothing to poll");
            return CycleOutcome::Skipped;
        }

        let first = match self.session.as_ref() {
            Some(session) => self.source.fetch_snapshot(session).await,
            None => Err(SourceError::Auth {
                message: "no active session".into(),
            }),
        };

        let snapshot = match first {
            Ok(snapshot) => snapshot,
            Err(SourceError::Transient { message }) => {
                warn!(%message, "no station data this cycle");
                return CycleOutcome::NoData;
            }
            Err(SourceError::Auth { message }) => {
                info!(%message, "session rejected, logging in again");
                match self.reauthenticate().await {
                    Some(snapshot) => snapshot,
                    None => return self.fail(),
                }
            }
        };

        self.state = SupervisorState::Polling;
        let (refreshed, silent) = self.refresh_all(&snapshot, false);
        debug!(refreshed, silent, "poll complete");
        CycleOutcome::Completed { refreshed, silent }
    }

    /// One fresh login and one retried fetch. Any failure is final.
    async fn reauthenticate(&mut self) -> Option<TelemetrySnapshot> {
        self.state = SupervisorState::Reauthenticating;
        self.session = None;
        let credentials = self.credentials.as_ref()?;

        let session = match self.source.authenticate(credentials).await {
            Ok(session) => session,
            Err(e) => {
                error!(error = %e, "re-authentication failed");
                return None;
            }
        };
        let retried = self.source.fetch_snapshot(&session).await;
        self.session = Some(session);

        match retried {
            Ok(snapshot) => {
                info!("session renewed");
                Some(snapshot)
            }
            Err(e) => {
                error!(error = %e, "fetch failed after re-authentication");
                None
            }
        }
    }

    fn fail(&mut self) -> CycleOutcome {
        self.state = SupervisorState::Failed;
        error!("cannot recover session, requesting restart");
        self.sink.request_restart();
        CycleOutcome::RestartRequested
    }

    fn refresh_all(&mut self, snapshot: &TelemetrySnapshot, first_poll: bool) -> (usize, usize) {
        let mut refreshed = 0;
        let mut silent = 0;

        for module in self.modules.values_mut() {
            let result = module
                .refresh(snapshot, first_poll, &mut self.sink)
                .map(|_| ());
            match result {
                Ok(()) => refreshed += 1,
                Err(e @ ReadingError::NoData { .. }) => {
                    debug!(module = %module.name(), "{e}");
                    silent += 1;
                }
                Err(e) => {
                    warn!(
                        module = %module.name(),
                        address = %module.address(),
                        error = %e,
                        "discarding reading"
                    );
                    silent += 1;
                }
            }
        }

        (refreshed, silent)
    }

    // ── Host commands ────────────────────────────────────────────────

    /// Re-install every node definition.
    pub fn update_profile(&mut self) {
        info!("installing node definitions");
        self.sink.install_profile(&node_definitions());
    }

    pub fn remove_notices(&mut self) {
        self.sink.clear_notices();
    }
}
