//! Command dispatch: bridges CLI args -> engine calls -> output formatting.

pub mod history;
pub mod init;
pub mod job;
pub mod refs;
pub mod sync;
pub mod timezones;
pub mod version;

use crate::cli::{Command, GlobalOpts};
use crate::config::Session;
use crate::error::CliError;

/// Dispatch a command that needs both servers.
pub async fn dispatch(
    cmd: Command,
    session: &Session,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Sync(args) => sync::handle(args, session, global).await,
        Command::SyncRefs(args) => refs::handle(args, session, global).await,
        Command::WriteHistory(args) => history::handle(args, session, global).await,
        Command::CheckTimezones(args) => timezones::handle(args, session, global).await,
        Command::Job(args) => job::handle(args, session, global).await,
        Command::Version | Command::Init(_) | Command::Completions(_) => Ok(()),
    }
}
