//! Command dispatch: bridges CLI args -> dashboard calls -> output formatting.

pub mod config_cmd;
pub mod device;
pub mod ports;
pub mod routes;
pub mod system;
pub mod util;
pub mod watch;

use vuart_core::Dashboard;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a device-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    dashboard: &Dashboard,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Ports(args) => ports::handle(dashboard, args, global).await,
        Command::Routes(args) => routes::handle(dashboard, args, global).await,
        Command::Device(args) => device::handle(dashboard, args, global).await,
        Command::System => system::handle(dashboard, global).await,
        Command::Watch(args) => watch::handle(dashboard, args, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => unreachable!(),
    }
}
