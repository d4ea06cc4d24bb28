//! Device configuration command handlers.

use secrecy::SecretString;
use tabled::Tabled;
use vuart_core::{ConfigUpdate, Dashboard, DeviceConfig, Reply, TcpConfig, WifiCredentials};

use crate::cli::{DeviceArgs, DeviceCommand, DeviceSetArgs, GlobalOpts, TcpSlot};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Rendering ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct TcpRow {
    #[tabled(rename = "Slot")]
    slot: usize,
    #[tabled(rename = "Mode")]
    mode: &'static str,
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Port")]
    port: String,
}

fn detail(cfg: &DeviceConfig) -> String {
    let wifi = &cfg.wifi;
    let mut out = [
        format!("WiFi SSID:  {}", or_dash(&wifi.ssid)),
        format!("WiFi mode:  {}", or_dash(&wifi.mode)),
        format!("IP:         {}", or_dash(&wifi.ip)),
        format!("Connected:  {}", wifi.connected),
    ]
    .join("\n");

    let rows: Vec<TcpRow> = cfg
        .tcp_configs
        .iter()
        .enumerate()
        .map(|(slot, tc)| TcpRow {
            slot,
            mode: if tc.is_server { "server" } else { "client" },
            host: or_dash(&tc.host).to_string(),
            port: if tc.port == 0 {
                "off".into()
            } else {
                tc.port.to_string()
            },
        })
        .collect();
    if !rows.is_empty() {
        out.push_str("\n\n");
        out.push_str(&output::render_table(&rows));
    }
    out
}

fn or_dash(s: &str) -> &str {
    if s.is_empty() { "-" } else { s }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: DeviceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DeviceCommand::Show => {
            let cfg = dashboard.fetch_config().await?;
            let out = output::render_single(global.output, &cfg, detail, |c| c.wifi.ip.clone())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        DeviceCommand::Set(set) => {
            let update = build_update(dashboard, set).await?;
            match dashboard.update_config(&update).await? {
                Reply::Entity(cfg) => {
                    let out =
                        output::render_single(global.output, &cfg, detail, |c| c.wifi.ip.clone())?;
                    output::print_output(&out, global.quiet);
                }
                Reply::Ack(ack) => {
                    if ack.wifi_changing == Some(true) {
                        tracing::warn!("device is switching WiFi networks and will drop this link");
                    }
                    if !global.quiet {
                        eprintln!("Device configuration updated");
                    }
                }
            }
            Ok(())
        }

        DeviceCommand::Reset => {
            if !util::confirm(
                "Factory-reset the device configuration? Ports, routes, and WiFi settings are lost.",
                global.yes,
            )? {
                return Ok(());
            }
            dashboard.reset_config().await?;
            if !global.quiet {
                eprintln!("Device configuration reset");
            }
            Ok(())
        }
    }
}

async fn build_update(dashboard: &Dashboard, set: DeviceSetArgs) -> Result<ConfigUpdate, CliError> {
    let password = if set.ask_password {
        let pw = rpassword::prompt_password("WiFi password: ")?;
        Some(SecretString::from(pw))
    } else {
        None
    };

    let wifi = (set.ssid.is_some() || password.is_some()).then(|| WifiCredentials {
        ssid: set.ssid,
        password,
    });

    let tcp_configs = if set.tcp.is_empty() {
        None
    } else {
        // The firmware applies the list by index, so send every slot.
        let current = dashboard.fetch_config().await?.tcp_configs;
        Some(apply_tcp_slots(current, &set.tcp))
    };

    if wifi.is_none() && tcp_configs.is_none() {
        return Err(CliError::Validation {
            field: "device set".into(),
            reason: "nothing to change; pass --ssid, --ask-password, or --tcp".into(),
        });
    }

    Ok(ConfigUpdate { wifi, tcp_configs })
}

fn apply_tcp_slots(mut configs: Vec<TcpConfig>, slots: &[TcpSlot]) -> Vec<TcpConfig> {
    for slot in slots {
        if configs.len() <= slot.slot {
            configs.resize_with(slot.slot + 1, TcpConfig::default);
        }
        configs[slot.slot] = TcpConfig {
            host: slot.host.clone(),
            port: slot.port,
            is_server: slot.is_server,
        };
    }
    configs.truncate(util::TCP_SLOTS);
    configs
}
