// ── Host commands ──
//
// Requests from the host flow through one channel and are processed in
// arrival order by the controller's command task.

use tokio::sync::oneshot;

use crate::config::CredentialParams;
use crate::error::CoreError;
use crate::supervisor::CycleOutcome;

/// A command envelope sent through the command channel.
/// Contains the command and a oneshot response channel.
pub(crate) struct CommandEnvelope {
    pub command: Command,
    pub response_tx: oneshot::Sender<Result<CommandResult, CoreError>>,
}

/// Everything the host can ask the controller to do.
#[derive(Debug, Clone)]
pub enum Command {
    /// Run discovery again.
    Discover,
    /// Poll every module now.
    QueryAll,
    /// Re-install node definitions.
    UpdateProfile,
    /// Clear every notice.
    RemoveNotices,
    /// Replace credentials; applied once the current cycle finishes.
    UpdateCredentials(CredentialParams),
}

/// Result of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    Ok,
    Cycle(CycleOutcome),
}
