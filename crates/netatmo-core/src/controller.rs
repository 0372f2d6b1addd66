// ── Controller ──
//
// Async handle around a `Supervisor`. The supervisor sits behind one
// mutex, which is the cycle boundary: timer triggers only `try_lock` and
// are dropped while a cycle runs, while commands and credential updates
// wait their turn. Background work is a poll task and a command task,
// both stopped through a `CancellationToken`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandEnvelope, CommandResult};
use crate::config::{ControllerConfig, CredentialParams};
use crate::error::CoreError;
use crate::module::ModuleSnapshot;
use crate::sink::DriverSink;
use crate::source::{NetatmoSource, TelemetrySource};
use crate::supervisor::{CycleOutcome, Supervisor, SupervisorState};

const COMMAND_CHANNEL_SIZE: usize = 16;

/// The main entry point for hosts.
///
/// Cheaply cloneable via `Arc<ControllerInner>`.
pub struct Controller<S: TelemetrySource + 'static, K: DriverSink + 'static> {
    inner: Arc<ControllerInner<S, K>>,
}

impl<S: TelemetrySource + 'static, K: DriverSink + 'static> Clone for Controller<S, K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<S: TelemetrySource, K: DriverSink> {
    config: ControllerConfig,
    supervisor: Mutex<Supervisor<S, K>>,
    state: watch::Sender<SupervisorState>,
    restart: watch::Sender<bool>,
    command_tx: mpsc::Sender<CommandEnvelope>,
    command_rx: Mutex<Option<mpsc::Receiver<CommandEnvelope>>>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<K: DriverSink + 'static> Controller<NetatmoSource, K> {
    /// A controller reading from the Netatmo cloud.
    pub fn netatmo(config: ControllerConfig, sink: K) -> Result<Self, CoreError> {
        let source = NetatmoSource::new(&config)?;
        Ok(Self::new(source, sink, config))
    }
}

impl<S: TelemetrySource + 'static, K: DriverSink + 'static> Controller<S, K> {
    /// Create a controller. Does not start background tasks; call
    /// [`start()`](Self::start) for that.
    pub fn new(source: S, sink: K, config: ControllerConfig) -> Self {
        let supervisor = Supervisor::new(source, sink, config.indoor_ordering);
        let (state, _) = watch::channel(supervisor.state());
        let (restart, _) = watch::channel(false);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        Self {
            inner: Arc::new(ControllerInner {
                config,
                supervisor: Mutex::new(supervisor),
                state,
                restart,
                command_tx,
                command_rx: Mutex::new(Some(command_rx)),
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Spawn the command processor and, if an interval is configured,
    /// the poll task.
    pub async fn start(&self) {
        let mut handles = self.inner.task_handles.lock().await;

        if let Some(rx) = self.inner.command_rx.lock().await.take() {
            let ctrl = self.clone();
            handles.push(tokio::spawn(command_processor_task(ctrl, rx)));
        }

        let period = self.inner.config.poll_interval;
        if !period.is_zero() {
            let ctrl = self.clone();
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(poll_task(ctrl, period, cancel)));
        }

        info!(poll_interval = ?period, "controller started");
    }

    /// Stop background tasks. A cycle in flight finishes first.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        info!("controller stopped");
    }

    // ── Cycles ───────────────────────────────────────────────────────

    /// Apply new credentials once any in-flight cycle has finished.
    ///
    /// Changed credentials log in again and rediscover.
    pub async fn update_credentials(
        &self,
        params: &CredentialParams,
    ) -> Result<CycleOutcome, CoreError> {
        let mut sup = self.inner.supervisor.lock().await;
        let result = sup.configure(params).await;
        self.publish(&sup, result.as_ref().ok().copied());
        result
    }

    pub async fn discover(&self) -> Result<CycleOutcome, CoreError> {
        let mut sup = self.inner.supervisor.lock().await;
        let result = sup.discover().await;
        self.publish(&sup, result.as_ref().ok().copied());
        result
    }

    /// Timer-driven poll. Dropped if a cycle is already running.
    pub async fn poll_now(&self) -> CycleOutcome {
        let Ok(mut sup) = self.inner.supervisor.try_lock() else {
            return CycleOutcome::Coalesced;
        };
        let outcome = sup.poll().await;
        self.publish(&sup, Some(outcome));
        outcome
    }

    /// Explicit poll. Waits for any running cycle, then polls.
    pub async fn query_all(&self) -> CycleOutcome {
        let mut sup = self.inner.supervisor.lock().await;
        let outcome = sup.poll().await;
        self.publish(&sup, Some(outcome));
        outcome
    }

    pub async fn update_profile(&self) {
        self.inner.supervisor.lock().await.update_profile();
    }

    pub async fn remove_notices(&self) {
        self.inner.supervisor.lock().await.remove_notices();
    }

    fn publish(&self, sup: &Supervisor<S, K>, outcome: Option<CycleOutcome>) {
        self.inner.state.send_replace(sup.state());
        if outcome == Some(CycleOutcome::RestartRequested) {
            self.inner.restart.send_replace(true);
        }
    }

    // ── Command execution ────────────────────────────────────────────

    /// Execute a command through the command processor.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        if self.inner.cancel.is_cancelled() || self.inner.command_rx.lock().await.is_some() {
            return Err(CoreError::ControllerNotRunning);
        }

        let (tx, rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(CommandEnvelope {
                command: cmd,
                response_tx: tx,
            })
            .await
            .map_err(|_| CoreError::ControllerNotRunning)?;

        rx.await.map_err(|_| CoreError::ControllerNotRunning)?
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Subscribe to supervisor state changes.
    pub fn state(&self) -> watch::Receiver<SupervisorState> {
        self.inner.state.subscribe()
    }

    /// Flips to `true` once the supervisor has asked for a restart.
    pub fn restart_requested(&self) -> watch::Receiver<bool> {
        self.inner.restart.subscribe()
    }

    /// Last-known reading of every module, in discovery order.
    pub async fn readings(&self) -> Vec<ModuleSnapshot> {
        self.inner.supervisor.lock().await.snapshots()
    }

    /// Station name seen at the last discovery.
    pub async fn station(&self) -> Option<String> {
        self.inner
            .supervisor
            .lock()
            .await
            .station()
            .map(str::to_owned)
    }

    /// Run `f` against the supervisor between cycles.
    pub async fn with_supervisor<R>(&self, f: impl FnOnce(&mut Supervisor<S, K>) -> R) -> R {
        let mut sup = self.inner.supervisor.lock().await;
        f(&mut sup)
    }
}

// ── Background tasks ─────────────────────────────────────────────────

/// Poll on a fixed interval until cancelled.
async fn poll_task<S: TelemetrySource + 'static, K: DriverSink + 'static>(
    controller: Controller<S, K>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match controller.poll_now().await {
                    CycleOutcome::Coalesced => debug!("cycle in flight, poll dropped"),
                    CycleOutcome::RestartRequested => warn!("poll requested a restart"),
                    outcome => debug!(?outcome, "poll finished"),
                }
            }
        }
    }
}

/// Process commands from the mpsc channel in arrival order.
async fn command_processor_task<S: TelemetrySource + 'static, K: DriverSink + 'static>(
    controller: Controller<S, K>,
    mut rx: mpsc::Receiver<CommandEnvelope>,
) {
    let cancel = controller.inner.cancel.clone();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            envelope = rx.recv() => {
                let Some(envelope) = envelope else { break };
                let result = route_command(&controller, envelope.command).await;
                let _ = envelope.response_tx.send(result);
            }
        }
    }
}

async fn route_command<S: TelemetrySource + 'static, K: DriverSink + 'static>(
    controller: &Controller<S, K>,
    cmd: Command,
) -> Result<CommandResult, CoreError> {
    debug!(?cmd, "routing command");
    match cmd {
        Command::Discover => controller.discover().await.map(CommandResult::Cycle),
        Command::QueryAll => Ok(CommandResult::Cycle(controller.query_all().await)),
        Command::UpdateProfile => {
            controller.update_profile().await;
            Ok(CommandResult::Ok)
        }
        Command::RemoveNotices => {
            controller.remove_notices().await;
            Ok(CommandResult::Ok)
        }
        Command::UpdateCredentials(params) => controller
            .update_credentials(&params)
            .await
            .map(CommandResult::Cycle),
    }
}
