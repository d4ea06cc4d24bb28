//! Live view of the signal and data-flow stores.
//!
//! Starts the dashboard's push channels and re-renders on every store
//! change until Ctrl-C. Channel lifecycle goes to stderr.

use std::collections::BTreeMap;
use std::io::IsTerminal;

use serde::Serialize;
use tabled::Tabled;
use tokio::sync::watch;
use tokio_stream::{Stream, StreamExt};
use tracing::{info, warn};

use vuart_core::{
    ChannelEndpoint, ChannelState, Dashboard, DashboardConfig, DataFlowState, PortId, RouteId,
    SignalLine, SignalState,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs, WatchTarget};
use crate::error::CliError;
use crate::output;

use super::util;

/// Enable only the channels `target` needs.
pub fn select_channels(config: &mut DashboardConfig, target: WatchTarget) {
    config.signals_enabled = matches!(target, WatchTarget::Signals | WatchTarget::All);
    config.monitor_enabled = matches!(target, WatchTarget::Monitor | WatchTarget::All);
}

// ── Rows ────────────────────────────────────────────────────────────

#[derive(Tabled)]
struct SignalRow {
    #[tabled(rename = "Port")]
    port: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "DTR")]
    dtr: String,
    #[tabled(rename = "RTS")]
    rts: String,
    #[tabled(rename = "CTS")]
    cts: String,
    #[tabled(rename = "DSR")]
    dsr: String,
    #[tabled(rename = "DCD")]
    dcd: String,
    #[tabled(rename = "RI")]
    ri: String,
}

#[derive(Tabled)]
struct FlowRow {
    #[tabled(rename = "Route")]
    route: String,
    #[tabled(rename = "Type")]
    rtype: String,
    #[tabled(rename = "Src→Dst")]
    tx: String,
    #[tabled(rename = "Dst→Src")]
    rx: String,
    #[tabled(rename = "Total")]
    total: String,
}

/// Structured output for one update.
#[derive(Serialize)]
struct WatchEvent<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    signals: Option<&'a SignalState>,
    #[serde(rename = "dataFlow", skip_serializing_if = "Option::is_none")]
    data_flow: Option<&'a DataFlowState>,
}

// ── View ────────────────────────────────────────────────────────────

struct View {
    target: WatchTarget,
    format: OutputFormat,
    color: bool,
    clear: bool,
}

impl View {
    fn shows_signals(&self) -> bool {
        matches!(self.target, WatchTarget::Signals | WatchTarget::All)
    }

    fn shows_flows(&self) -> bool {
        matches!(self.target, WatchTarget::Monitor | WatchTarget::All)
    }

    fn render(&self, dashboard: &Dashboard) -> Result<String, CliError> {
        let signals = self.shows_signals().then(|| dashboard.signals_snapshot());
        let flows = self.shows_flows().then(|| dashboard.data_flow_snapshot());

        let event = WatchEvent {
            signals: signals.as_deref(),
            data_flow: flows.as_deref(),
        };

        match self.format {
            OutputFormat::Table => Ok(self.render_tables(dashboard, &event)),
            OutputFormat::Plain => Ok(render_plain(&event)),
            // One document per update; json-compact gives one line each.
            other => output::render_single(other, &event, |_| String::new(), |_| String::new()),
        }
    }

    fn render_tables(&self, dashboard: &Dashboard, event: &WatchEvent<'_>) -> String {
        let mut out = String::new();
        if self.clear {
            out.push_str("\x1b[2J\x1b[H");
        }

        if let Some(signals) = event.signals {
            let names: BTreeMap<PortId, String> = dashboard
                .ports_snapshot()
                .iter()
                .map(|p| (p.id, p.name.clone()))
                .collect();
            let rows: Vec<SignalRow> = signals
                .iter()
                .map(|(id, lines)| {
                    let cell = |line: SignalLine| {
                        output::signal_cell(&line.to_string(), lines.get(line), self.color)
                    };
                    SignalRow {
                        port: id.to_string(),
                        name: names.get(id).cloned().unwrap_or_default(),
                        dtr: cell(SignalLine::Dtr),
                        rts: cell(SignalLine::Rts),
                        cts: cell(SignalLine::Cts),
                        dsr: cell(SignalLine::Dsr),
                        dcd: cell(SignalLine::Dcd),
                        ri: cell(SignalLine::Ri),
                    }
                })
                .collect();
            out.push_str(&format!(
                "Signals (last frame {})\n{}\n",
                util::format_age(dashboard.last_signal_frame()),
                output::render_table(&rows)
            ));
        }

        if let Some(flows) = event.data_flow {
            let types: BTreeMap<RouteId, String> = dashboard
                .routes_snapshot()
                .iter()
                .map(|r| (r.id, r.route_type.to_string()))
                .collect();
            let rows: Vec<FlowRow> = flows
                .iter()
                .map(|(id, counters)| FlowRow {
                    route: id.to_string(),
                    rtype: types.get(id).cloned().unwrap_or_default(),
                    tx: util::format_bytes(counters.bytes_source_to_dest),
                    rx: util::format_bytes(counters.bytes_dest_to_source),
                    total: util::format_bytes(counters.total()),
                })
                .collect();
            out.push_str(&format!(
                "Data flow (last frame {})\n{}\n",
                util::format_age(dashboard.last_data_flow_frame()),
                output::render_table(&rows)
            ));
        }

        out
    }
}

/// `port 7 DTR CTS` / `route 1 512 64` lines.
fn render_plain(event: &WatchEvent<'_>) -> String {
    let mut lines = Vec::new();
    if let Some(signals) = event.signals {
        for (id, state) in signals {
            let high: Vec<String> = [
                SignalLine::Dtr,
                SignalLine::Rts,
                SignalLine::Cts,
                SignalLine::Dsr,
                SignalLine::Dcd,
                SignalLine::Ri,
            ]
            .into_iter()
            .filter(|l| state.get(*l))
            .map(|l| l.to_string())
            .collect();
            lines.push(format!("port {id} {}", high.join(" ")).trim_end().to_string());
        }
    }
    if let Some(flows) = event.data_flow {
        for (id, c) in flows {
            lines.push(format!(
                "route {id} {} {}",
                c.bytes_source_to_dest, c.bytes_dest_to_source
            ));
        }
    }
    lines.join("\n")
}

fn describe(state: &ChannelState) -> String {
    match state {
        ChannelState::Connecting { attempt: 0 } => "connecting".into(),
        ChannelState::Connecting { attempt } => format!("reconnecting (attempt {attempt})"),
        ChannelState::Open => "connected".into(),
        ChannelState::Closed { retry_in, .. } => format!(
            "disconnected, retrying in {}",
            humantime::format_duration(*retry_in)
        ),
        ChannelState::Stopped => "stopped".into(),
    }
}

/// Next item from an optional stream; pends forever when absent.
async fn next_update<S: Stream + Unpin>(stream: &mut Option<S>) -> Option<S::Item> {
    match stream {
        Some(stream) => stream.next().await,
        None => std::future::pending().await,
    }
}

/// Next state from an optional channel; pends forever when absent.
async fn next_state(rx: &mut Option<watch::Receiver<ChannelState>>) -> Option<ChannelState> {
    match rx {
        Some(rx) => {
            rx.changed().await.ok()?;
            Some(rx.borrow_and_update().clone())
        }
        None => std::future::pending().await,
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    // Names and route types for the table; the live view works without them.
    if let Err(e) = dashboard.refresh_all().await {
        warn!(error = %e, "initial refresh failed; showing ids only");
    }

    dashboard.start()?;

    let mut signal_state = dashboard.channel_state(ChannelEndpoint::Signals);
    let mut monitor_state = dashboard.channel_state(ChannelEndpoint::Monitor);

    let interactive = std::io::stdout().is_terminal();
    let view = View {
        target: args.target,
        format: global.output,
        color: output::should_color(global.color),
        clear: interactive && global.output == OutputFormat::Table,
    };

    // Each stream yields the store's current state first, which draws the
    // initial view.
    let mut signals = view
        .shows_signals()
        .then(|| dashboard.signals().into_stream());
    let mut flows = view.shows_flows().then(|| dashboard.data_flow().into_stream());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        let redraw = tokio::select! {
            _ = &mut ctrl_c => break,
            Some(_) = next_update(&mut signals) => true,
            Some(_) = next_update(&mut flows) => true,
            Some(state) = next_state(&mut signal_state) => {
                report(ChannelEndpoint::Signals, &state, global.quiet);
                false
            }
            Some(state) = next_state(&mut monitor_state) => {
                report(ChannelEndpoint::Monitor, &state, global.quiet);
                false
            }
        };
        if redraw {
            output::print_output(&view.render(dashboard)?, global.quiet);
        }
    }

    info!("watch interrupted");
    Ok(())
}

fn report(endpoint: ChannelEndpoint, state: &ChannelState, quiet: bool) {
    info!(%endpoint, ?state, "channel state changed");
    if !quiet {
        eprintln!("{endpoint}: {}", describe(state));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use vuart_core::{FlowCounters, SignalLines};

    use super::*;

    #[test]
    fn target_selects_channels() {
        let mut config = DashboardConfig::new("http://192.168.4.1".parse().unwrap());
        select_channels(&mut config, WatchTarget::Monitor);
        assert!(!config.signals_enabled);
        assert!(config.monitor_enabled);

        select_channels(&mut config, WatchTarget::All);
        assert!(config.signals_enabled && config.monitor_enabled);
    }

    #[test]
    fn plain_output_lists_high_lines_and_counters() {
        let mut signals = SignalState::new();
        signals.insert(
            PortId(7),
            SignalLines {
                dtr: true,
                cts: true,
                ..SignalLines::default()
            },
        );
        signals.insert(PortId(8), SignalLines::default());
        let mut flows = DataFlowState::new();
        flows.insert(
            RouteId(1),
            FlowCounters {
                bytes_source_to_dest: 512,
                bytes_dest_to_source: 64,
            },
        );

        let out = render_plain(&WatchEvent {
            signals: Some(&signals),
            data_flow: Some(&flows),
        });
        assert_eq!(out, "port 7 DTR CTS\nport 8\nroute 1 512 64");
    }

    #[test]
    fn json_event_skips_unwatched_stores() {
        let signals = SignalState::new();
        let json = serde_json::to_string(&WatchEvent {
            signals: Some(&signals),
            data_flow: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"signals":{}}"#);
    }

    #[test]
    fn channel_states_read_naturally() {
        assert_eq!(describe(&ChannelState::Connecting { attempt: 0 }), "connecting");
        assert_eq!(
            describe(&ChannelState::Closed {
                attempt: 0,
                retry_in: Duration::from_secs(3),
            }),
            "disconnected, retrying in 3s"
        );
    }
}
