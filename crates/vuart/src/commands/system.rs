//! System command handler.

use vuart_core::{Dashboard, SystemInfo};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

fn detail(info: &SystemInfo) -> String {
    [
        format!("Firmware:      {}", info.firmware),
        format!("Version:       {}", info.version),
        format!("Ports:         {}", info.port_count),
        format!("Active routes: {}", info.active_routes),
        format!("Free heap:     {}", util::format_bytes(info.free_heap)),
        format!("Uptime:        {}", util::format_uptime(info.uptime)),
    ]
    .join("\n")
}

pub async fn handle(dashboard: &Dashboard, global: &GlobalOpts) -> Result<(), CliError> {
    let info = dashboard.fetch_system().await?;
    let out = output::render_single(global.output, &info, detail, |i| i.version.clone())?;
    output::print_output(&out, global.quiet);
    Ok(())
}
