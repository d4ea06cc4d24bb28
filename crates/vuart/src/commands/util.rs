//! Shared helpers for command handlers.

use std::io::IsTerminal;
use std::str::FromStr;
use std::time::Duration;

use bytesize::ByteSize;
use chrono::{DateTime, Utc};

use vuart_core::{CoreError, SignalLine};

use crate::cli::TcpSlot;
use crate::error::CliError;

/// TCP slots the firmware persists.
pub const TCP_SLOTS: usize = 4;

/// All six control lines set.
const ALL_SIGNALS: u32 = 0b11_1111;

// ── Prompts ─────────────────────────────────────────────────────────

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::NonInteractiveRequiresYes {
            action: message.into(),
        });
    }
    dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(|e| CliError::Io(std::io::Error::other(e)))
}

// ── Error remapping ─────────────────────────────────────────────────

/// Turn a device 404 into a `NotFound` naming the entity asked for.
pub fn not_found_as(
    resource_type: &'static str,
    identifier: impl ToString,
    list_command: &'static str,
) -> impl FnOnce(CoreError) -> CliError {
    let identifier = identifier.to_string();
    move |err| match err {
        CoreError::NotFound { .. } => CliError::NotFound {
            resource_type: resource_type.into(),
            identifier,
            list_command: list_command.into(),
        },
        other => other.into(),
    }
}

// ── Argument parsers ────────────────────────────────────────────────

/// Parse a signal set: `dtr,rts`, `none`, or a numeric mask (`0x3`, `3`).
pub fn parse_signal_mask(raw: &str) -> Result<u32, String> {
    let raw = raw.trim();
    let mask = if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("invalid hex mask '{raw}': {e}"))?
    } else if raw.chars().all(|c| c.is_ascii_digit()) && !raw.is_empty() {
        raw.parse::<u32>()
            .map_err(|e| format!("invalid mask '{raw}': {e}"))?
    } else if raw.is_empty() || raw.eq_ignore_ascii_case("none") {
        0
    } else {
        raw.split(',')
            .map(|name| {
                SignalLine::from_str(name.trim()).map_err(|_| {
                    format!("unknown signal '{}' (expected dtr, rts, cts, dsr, dcd, ri)", name.trim())
                })
            })
            .try_fold(0, |acc, line| line.map(|l| acc | l.mask()))?
    };

    if mask & !ALL_SIGNALS != 0 {
        return Err(format!("mask {mask:#x} has bits outside the six control lines"));
    }
    Ok(mask)
}

/// Parse `slot=host:port[:server]`.
pub fn parse_tcp_slot(raw: &str) -> Result<TcpSlot, String> {
    let (slot, target) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected slot=host:port[:server], got '{raw}'"))?;

    let slot: usize = slot
        .trim()
        .parse()
        .map_err(|_| format!("invalid slot '{slot}'"))?;
    if slot >= TCP_SLOTS {
        return Err(format!("slot must be 0-{}, got {slot}", TCP_SLOTS - 1));
    }

    let (target, is_server) = match target.strip_suffix(":server") {
        Some(rest) => (rest, true),
        None => (target, false),
    };
    let (host, port) = target
        .rsplit_once(':')
        .ok_or_else(|| format!("expected host:port, got '{target}'"))?;
    let port: u16 = port
        .parse()
        .map_err(|_| format!("invalid port '{port}'"))?;
    if host.is_empty() && !is_server {
        return Err("a client slot needs a host".into());
    }

    Ok(TcpSlot {
        slot,
        host: host.to_string(),
        port,
        is_server,
    })
}

// ── Display helpers ─────────────────────────────────────────────────

pub fn format_bytes(n: u64) -> String {
    ByteSize(n).to_string()
}

pub fn format_uptime(secs: u64) -> String {
    humantime::format_duration(Duration::from_secs(secs)).to_string()
}

/// "12s ago", or "never".
pub fn format_age(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "never".into(),
        |at| {
            let secs = (Utc::now() - at).num_seconds().max(0).unsigned_abs();
            format!("{} ago", humantime::format_duration(Duration::from_secs(secs)))
        },
    )
}
