//! Command dispatch: bridges CLI args -> engine calls -> output formatting.

pub mod ack;
pub mod config_cmd;
pub mod resume;
pub mod util;
pub mod watch;

use alertd_core::Engine;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a hub-bound command to the appropriate handler.
pub async fn dispatch(cmd: Command, engine: &Engine, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Watch(args) => watch::handle(engine, &args, global).await,
        Command::Ack(args) => ack::handle(engine, args, global).await,
        Command::Resume => resume::handle(engine, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
