//! `run`: poll the station until Ctrl-C or a restart request.
//!
//! Missing or refused credentials do not stop the daemon. It keeps
//! running with its notices raised and picks up new settings whenever
//! the config is reloaded (SIGHUP, or `--reload-interval`).

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use netatmo_core::{
    Command, CommandResult, Controller, CoreError, CycleOutcome, DriverSink, NetatmoSource,
    SupervisorState,
};

use crate::cli::{GlobalOpts, RunArgs};
use crate::config::{self, Resolved};
use crate::error::CliError;
use crate::sink::LogSink;

type Daemon<K> = Controller<NetatmoSource, K>;

pub async fn handle(args: &RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let resolved = resolve(args, global)?;
    let mut reload = ReloadTrigger::new(args.reload_interval);

    let controller = Controller::netatmo(resolved.controller.clone(), LogSink::new())?;
    controller.start().await;
    controller.execute(Command::UpdateProfile).await?;

    if let Err(e) = apply_credentials(&controller, &resolved).await {
        controller.shutdown().await;
        return Err(e);
    }

    let station = controller.station().await.unwrap_or_default();
    info!(
        profile = %resolved.profile_name,
        station = %station,
        interval = %humantime::format_duration(resolved.controller.poll_interval),
        "polling"
    );

    let mut restart = controller.restart_requested();
    let result = loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                if let Err(e) = signal {
                    error!(error = %e, "failed to listen for Ctrl-C");
                }
                info!("interrupted, shutting down");
                break Ok(());
            }
            changed = restart.wait_for(|requested| *requested) => {
                break if changed.is_ok() {
                    Err(CliError::RestartRequested)
                } else {
                    Err(CliError::NotRunning)
                };
            }
            cause = reload.fired() => {
                info!(%cause, "reloading configuration");
                match resolve(args, global) {
                    Ok(fresh) => {
                        if let Err(e) = apply_credentials(&controller, &fresh).await {
                            warn!(error = %e, "reload failed, keeping current session");
                        }
                    }
                    Err(e) => warn!(error = %e, "config unreadable, keeping current settings"),
                }
            }
        }
    };

    controller.shutdown().await;
    result
}

fn resolve(args: &RunArgs, global: &GlobalOpts) -> Result<Resolved, CliError> {
    let mut resolved = config::resolve(global)?;
    if let Some(interval) = args.interval {
        resolved.controller.poll_interval = interval;
    }
    if resolved.controller.poll_interval.is_zero() {
        return Err(CliError::Validation {
            field: "poll_interval".into(),
            reason: "must be greater than zero for run".into(),
        });
    }
    Ok(resolved)
}

/// Hand the profile's credentials to the controller.
///
/// Incomplete, refused or unreachable logins leave the controller
/// unconfigured with its notices up and are not errors here. Only
/// failures that no reload can fix are returned.
async fn apply_credentials<K: DriverSink + 'static>(
    controller: &Daemon<K>,
    resolved: &Resolved,
) -> Result<(), CliError> {
    let profile = resolved.profile_name.as_str();
    let configured = controller
        .execute(Command::UpdateCredentials(resolved.credentials.clone()))
        .await;

    match configured {
        Ok(CommandResult::Cycle(CycleOutcome::Skipped)) => {
            if *controller.state().borrow() == SupervisorState::Discovering {
                rediscover(controller).await;
            } else {
                debug!(profile, "credentials unchanged");
            }
        }
        Ok(CommandResult::Cycle(outcome)) => {
            info!(profile, result = %describe(outcome), "station discovered");
        }
        Ok(CommandResult::Ok) => {}
        Err(CoreError::ConfigurationIncomplete { missing }) => {
            warn!(profile, missing = missing.len(), "waiting for credentials");
        }
        Err(CoreError::AuthenticationFailed { message }) => {
            warn!(profile, %message, "login refused, waiting for new credentials");
        }
        Err(CoreError::ServiceUnavailable { reason }) => {
            warn!(profile, %reason, "Netatmo unreachable, login retried on next reload");
        }
        Err(CoreError::DiscoveryFailed { .. } | CoreError::NoModules) => {
            warn!("initial discovery failed, retrying once");
            rediscover(controller).await;
        }
        Err(e) => return Err(CliError::from_core(e, profile)),
    }
    Ok(())
}

async fn rediscover<K: DriverSink + 'static>(controller: &Daemon<K>) {
    match controller.execute(Command::Discover).await {
        Ok(CommandResult::Cycle(outcome)) => {
            info!(result = %describe(outcome), "station discovered");
        }
        Ok(CommandResult::Ok) => {}
        Err(e) => warn!(error = %e, "discovery failed, retried on next reload"),
    }
}

/// Summarize a cycle for the log.
fn describe(outcome: CycleOutcome) -> String {
    match outcome {
        CycleOutcome::Completed { refreshed, silent } => {
            format!("{refreshed} refreshed, {silent} unchanged")
        }
        other => format!("{other:?}"),
    }
}

// ── Reload trigger ───────────────────────────────────────────────────

#[cfg(unix)]
type Hangup = tokio::signal::unix::Signal;
#[cfg(not(unix))]
type Hangup = std::convert::Infallible;

/// What asked for a config reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReloadCause {
    Hangup,
    Timer,
}

impl std::fmt::Display for ReloadCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hangup => f.write_str("SIGHUP"),
            Self::Timer => f.write_str("reload interval"),
        }
    }
}

/// SIGHUP plus an optional fixed reload period.
struct ReloadTrigger {
    hangup: Option<Hangup>,
    timer: Option<Interval>,
}

impl ReloadTrigger {
    fn new(every: Option<Duration>) -> Self {
        Self {
            hangup: listen_hangup(),
            timer: every.map(reload_timer),
        }
    }

    /// Resolves on the next reload request. Pending forever if no
    /// trigger is available.
    async fn fired(&mut self) -> ReloadCause {
        tokio::select! {
            () = next_hangup(self.hangup.as_mut()) => ReloadCause::Hangup,
            () = next_tick(self.timer.as_mut()) => ReloadCause::Timer,
        }
    }
}

/// First tick one full period from now.
fn reload_timer(period: Duration) -> Interval {
    let mut timer = tokio::time::interval_at(Instant::now() + period, period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
    timer
}

#[cfg(unix)]
fn listen_hangup() -> Option<Hangup> {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::hangup()) {
        Ok(hangup) => Some(hangup),
        Err(e) => {
            warn!(error = %e, "cannot listen for SIGHUP, reloads disabled");
            None
        }
    }
}

#[cfg(not(unix))]
fn listen_hangup() -> Option<Hangup> {
    None
}

#[cfg(unix)]
async fn next_hangup(hangup: Option<&mut Hangup>) {
    if let Some(hangup) = hangup {
        if hangup.recv().await.is_some() {
            return;
        }
    }
    std::future::pending().await
}

#[cfg(not(unix))]
async fn next_hangup(_hangup: Option<&mut Hangup>) {
    std::future::pending().await
}

async fn next_tick(timer: Option<&mut Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
