//! Route command handlers.

use std::sync::Arc;

use tabled::Tabled;
use vuart_core::{Dashboard, NewRoute, PortId, Route, RouteId, RouteType};

use crate::cli::{GlobalOpts, RouteCreateArgs, RouteKind, RoutesArgs, RoutesCommand};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct RouteRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    rtype: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Source")]
    src: String,
    #[tabled(rename = "Destinations")]
    dst: String,
    #[tabled(rename = "Src→Dst")]
    tx: String,
    #[tabled(rename = "Dst→Src")]
    rx: String,
}

impl From<&Arc<Route>> for RouteRow {
    fn from(r: &Arc<Route>) -> Self {
        Self {
            id: r.id.to_string(),
            rtype: r.route_type.to_string(),
            active: if r.active { "yes" } else { "no" }.into(),
            src: r.src_port_id.to_string(),
            dst: port_list(&r.dst_port_ids),
            tx: util::format_bytes(r.bytes_src_to_dst),
            rx: util::format_bytes(r.bytes_dst_to_src),
        }
    }
}

fn port_list(ids: &[PortId]) -> String {
    ids.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

fn detail(r: &Route) -> String {
    let mut lines = vec![
        format!("ID:           {}", r.id),
        format!("Type:         {}", r.route_type),
        format!("Active:       {}", r.active),
        format!("Source:       {}", r.src_port_id),
        format!("Destinations: {}", port_list(&r.dst_port_ids)),
    ];
    for m in &r.signal_map {
        lines.push(format!(
            "Signal map:   {:#x} -> {:#x}",
            m.from_signal, m.to_signal
        ));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    dashboard: &Dashboard,
    args: RoutesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        RoutesCommand::List => {
            dashboard.refresh_routes().await?;
            let snap = dashboard.routes_snapshot();
            let out = output::render_list(
                global.output,
                snap.as_slice(),
                |r| RouteRow::from(r),
                |r| r.id.to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RoutesCommand::Create(create) => {
            let route = new_route(&create)?;
            let created = dashboard.create_route(&route).await?;
            let out = output::render_single(global.output, &created, detail, |r| {
                r.id.to_string()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        RoutesCommand::Delete { id } => {
            let id = RouteId(id);
            if !util::confirm(&format!("Delete route {id}?"), global.yes)? {
                return Ok(());
            }
            dashboard
                .delete_route(id)
                .await
                .map_err(util::not_found_as("route", id, "routes list"))?;
            if !global.quiet {
                eprintln!("Route {id} deleted");
            }
            Ok(())
        }
    }
}

fn new_route(args: &RouteCreateArgs) -> Result<NewRoute, CliError> {
    let route_type = match args.route_type {
        RouteKind::Bridge => RouteType::Bridge,
        RouteKind::Clone => RouteType::Clone,
        RouteKind::Merge => RouteType::Merge,
    };

    if route_type == RouteType::Bridge && args.dst.len() != 1 {
        return Err(CliError::Validation {
            field: "dst".into(),
            reason: format!(
                "a bridge connects exactly two ports; got {} destinations",
                args.dst.len()
            ),
        });
    }
    if args.dst.contains(&args.src) {
        return Err(CliError::Validation {
            field: "dst".into(),
            reason: format!("port {} is both source and destination", args.src),
        });
    }

    Ok(NewRoute::new(
        route_type,
        PortId(args.src),
        args.dst.iter().copied().map(PortId),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn args(kind: RouteKind, src: u32, dst: &[u32]) -> RouteCreateArgs {
        RouteCreateArgs {
            route_type: kind,
            src,
            dst: dst.to_vec(),
        }
    }

    #[test]
    fn clone_route_fans_out() {
        let route = new_route(&args(RouteKind::Clone, 0, &[1, 2, 3])).unwrap();
        assert_eq!(route.route_type, RouteType::Clone);
        assert_eq!(route.dst_port_ids, vec![PortId(1), PortId(2), PortId(3)]);
        assert!(route.id.is_none());
    }

    #[test]
    fn bridge_needs_one_destination() {
        assert!(new_route(&args(RouteKind::Bridge, 1, &[2])).is_ok());
        assert!(new_route(&args(RouteKind::Bridge, 1, &[2, 3])).is_err());
    }

    #[test]
    fn self_loops_are_rejected() {
        assert!(new_route(&args(RouteKind::Merge, 4, &[1, 4])).is_err());
    }
}
