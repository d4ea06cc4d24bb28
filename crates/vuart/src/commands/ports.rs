//! Port command handlers.

use std::sync::Arc;

use tabled::Tabled;
use vuart_core::{
    Dashboard, LineCodingUpdate, Port, PortConfigUpdate, PortId, Reply, SignalLines,
    SignalOverrides,
};

use crate::cli::{GlobalOpts, Parity, PortConfigureArgs, PortsArgs, PortsCommand, StopBits};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct PortRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    ptype: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Line")]
    line: String,
    #[tabled(rename = "Signals")]
    signals: String,
}

impl From<&Arc<Port>> for PortRow {
    fn from(p: &Arc<Port>) -> Self {
        Self {
            id: p.id.to_string(),
            name: p.name.clone(),
            ptype: p.port_type.to_string(),
            state: p.state.to_string(),
            line: p
                .line_coding
                .map_or_else(|| "-".into(), |lc| lc.summary()),
            signals: p.signals.map_or_else(|| "-".into(), |s| signal_list(&s)),
        }
    }
}

/// Asserted lines, e.g. `DTR RTS`.
fn signal_list(lines: &SignalLines) -> String {
    let high = [
        ("DTR", lines.dtr),
        ("RTS", lines.rts),
        ("CTS", lines.cts),
        ("DSR", lines.dsr),
        ("DCD", lines.dcd),
        ("RI", lines.ri),
    ]
    .into_iter()
    .filter_map(|(name, on)| on.then_some(name))
    .collect::<Vec<_>>();
    if high.is_empty() {
        "-".into()
    } else {
        high.join(" ")
    }
}

fn detail(p: &Port) -> String {
    let mut lines = vec![
        format!("ID:      {}", p.id),
        format!("Name:    {}", p.name),
        format!("Type:    {}", p.port_type),
        format!("State:   {}", p.state),
    ];
    if let Some(lc) = p.line_coding {
        lines.push(format!("Line:    {}", lc.summary()));
    }
    if let Some(s) = p.signals {
        lines.push(format!("Signals: {}", signal_list(&s)));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: PortsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        PortsCommand::List => {
            dashboard.refresh_ports().await?;
            let snap = dashboard.ports_snapshot();
            let out = output::render_list(
                global.output,
                snap.as_slice(),
                |p| PortRow::from(p),
                |p| p.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        PortsCommand::Configure(cfg) => {
            let id = PortId(cfg.id);
            let update = build_update(&cfg)?;
            let reply = dashboard
                .update_port_config(id, &update)
                .await
                .map_err(util::not_found_as("port", id, "ports list"))?;

            match reply {
                Reply::Entity(port) => {
                    let out = output::render_single(
                        global.output,
                        &port,
                        detail,
                        |p| p.id.to_string(),
                    )?;
                    output::print_output(&out, global.quiet);
                }
                Reply::Ack(_) if !global.quiet => eprintln!("Port {id} updated"),
                Reply::Ack(_) => {}
            }
            Ok(())
        }
    }
}

fn build_update(args: &PortConfigureArgs) -> Result<PortConfigUpdate, CliError> {
    let line_coding = LineCodingUpdate {
        baud_rate: args.baud,
        data_bits: args.data_bits,
        stop_bits: args.stop_bits.map(|s| match s {
            StopBits::One => 0,
            StopBits::OnePointFive => 1,
            StopBits::Two => 2,
        }),
        parity: args.parity.map(|p| match p {
            Parity::None => 0,
            Parity::Odd => 1,
            Parity::Even => 2,
            Parity::Mark => 3,
            Parity::Space => 4,
        }),
        flow_control: args.flow_control,
    };

    let signal_overrides = args.override_mask.map(|mask| SignalOverrides {
        mask: Some(mask),
        values: Some(args.override_values.unwrap_or(0) & mask),
    });

    let update = PortConfigUpdate {
        line_coding: (line_coding != LineCodingUpdate::default()).then_some(line_coding),
        signal_overrides,
    };

    if update == PortConfigUpdate::default() {
        return Err(CliError::Validation {
            field: "ports configure".into(),
            reason: "nothing to change; pass at least one of --baud, --data-bits, \
                     --stop-bits, --parity, --flow-control, --override-mask"
                .into(),
        });
    }
    Ok(update)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::{Cli, Command};

    fn configure_args(args: &[&str]) -> PortConfigureArgs {
        let mut argv = vec!["vuart", "ports", "configure"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Ports(PortsArgs {
                command: PortsCommand::Configure(cfg),
            }) => cfg,
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn line_coding_flags_map_to_wire_codes() {
        let update = build_update(&configure_args(&[
            "2",
            "--baud",
            "9600",
            "--parity",
            "even",
            "--stop-bits",
            "2",
        ]))
        .unwrap();
        let lc = update.line_coding.unwrap();
        assert_eq!(lc.baud_rate, Some(9600));
        assert_eq!(lc.parity, Some(2));
        assert_eq!(lc.stop_bits, Some(2));
        assert_eq!(lc.data_bits, None);
        assert!(update.signal_overrides.is_none());
    }

    #[test]
    fn override_values_are_limited_to_mask() {
        let update = build_update(&configure_args(&[
            "0",
            "--override-mask",
            "dtr,rts",
            "--override-values",
            "dtr,cts",
        ]))
        .unwrap();
        assert_eq!(
            update.signal_overrides.unwrap(),
            SignalOverrides {
                mask: Some(0b11),
                values: Some(0b01),
            }
        );
        assert!(update.line_coding.is_none());
    }

    #[test]
    fn empty_update_is_rejected() {
        assert!(matches!(
            build_update(&configure_args(&["1"])),
            Err(CliError::Validation { .. })
        ));
    }
}
