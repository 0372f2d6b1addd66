//! Command handlers.

pub mod config_cmd;
pub mod discover;
pub mod profile;
pub mod query;
pub mod run;

use netatmo_core::{Controller, MemorySink, NetatmoSource};

use crate::cli::{Command, GlobalOpts};
use crate::config::{self, Resolved};
use crate::error::CliError;

pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(&args, global).await,
        Command::Discover => discover::handle(global).await,
        Command::Query(args) => query::handle(&args, global).await,
        Command::Profile => profile::handle(global),
        Command::Config(args) => config_cmd::handle(args, global),
        Command::Completions(_) => Ok(()),
    }
}

/// Log in and discover once, with no background polling.
pub(crate) async fn connect_once(
    global: &GlobalOpts,
) -> Result<(Resolved, Controller<NetatmoSource, MemorySink>), CliError> {
    let mut resolved = config::resolve(global)?;
    resolved.controller.poll_interval = std::time::Duration::ZERO;

    let controller = Controller::netatmo(resolved.controller.clone(), MemorySink::new())?;
    controller
        .update_credentials(&resolved.credentials)
        .await
        .map_err(|e| CliError::from_core(e, &resolved.profile_name))?;

    Ok((resolved, controller))
}
