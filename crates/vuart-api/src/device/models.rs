// Device API response and request types
//
// Mirrors the JSON the firmware emits. Field names are camelCase on the
// wire; enums are numeric discriminants with an `Other` escape hatch so
// a firmware that grows a new port or route type doesn't break listing.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use strum::{EnumIter, EnumString};

// ── Identities ───────────────────────────────────────────────────────

/// Device-assigned port identity. The client never invents one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PortId(pub u32);

/// Device-assigned route identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(pub u32);

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PortId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

impl From<u32> for RouteId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

// ── Port ─────────────────────────────────────────────────────────────

/// Port transport type. Wire value: `0` CDC, `1` UART, `2` TCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(from = "u8", into = "u8")]
#[strum(ascii_case_insensitive)]
pub enum PortType {
    #[strum(serialize = "cdc")]
    Cdc,
    #[strum(serialize = "uart")]
    Uart,
    #[strum(serialize = "tcp")]
    Tcp,
    #[strum(disabled)]
    Other(u8),
}

impl From<u8> for PortType {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::Cdc,
            1 => Self::Uart,
            2 => Self::Tcp,
            other => Self::Other(other),
        }
    }
}

impl From<PortType> for u8 {
    fn from(t: PortType) -> Self {
        match t {
            PortType::Cdc => 0,
            PortType::Uart => 1,
            PortType::Tcp => 2,
            PortType::Other(v) => v,
        }
    }
}

impl fmt::Display for PortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cdc => f.write_str("CDC"),
            Self::Uart => f.write_str("UART"),
            Self::Tcp => f.write_str("TCP"),
            Self::Other(v) => write!(f, "type-{v}"),
        }
    }
}

/// Port lifecycle state as reported by the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "u8", into = "u8")]
pub enum PortState {
    #[default]
    Disabled,
    Ready,
    Active,
    Error,
    Other(u8),
}

impl From<u8> for PortState {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::Disabled,
            1 => Self::Ready,
            2 => Self::Active,
            3 => Self::Error,
            other => Self::Other(other),
        }
    }
}

impl From<PortState> for u8 {
    fn from(s: PortState) -> Self {
        match s {
            PortState::Disabled => 0,
            PortState::Ready => 1,
            PortState::Active => 2,
            PortState::Error => 3,
            PortState::Other(v) => v,
        }
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Ready => f.write_str("ready"),
            Self::Active => f.write_str("active"),
            Self::Error => f.write_str("error"),
            Self::Other(v) => write!(f, "state-{v}"),
        }
    }
}

/// Serial line coding. `stop_bits`: 0 = 1, 1 = 1.5, 2 = 2.
/// `parity`: 0 none, 1 odd, 2 even, 3 mark, 4 space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineCoding {
    pub baud_rate: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    pub parity: u8,
    #[serde(default)]
    pub flow_control: bool,
}

impl Default for LineCoding {
    fn default() -> Self {
        Self {
            baud_rate: 115_200,
            data_bits: 8,
            stop_bits: 0,
            parity: 0,
            flow_control: false,
        }
    }
}

impl LineCoding {
    /// Conventional short form, e.g. `115200 8N1`.
    pub fn summary(&self) -> String {
        let parity = match self.parity {
            0 => 'N',
            1 => 'O',
            2 => 'E',
            3 => 'M',
            4 => 'S',
            _ => '?',
        };
        let stop = match self.stop_bits {
            0 => "1",
            1 => "1.5",
            2 => "2",
            _ => "?",
        };
        let flow = if self.flow_control { " RTS/CTS" } else { "" };
        format!("{} {}{parity}{stop}{flow}", self.baud_rate, self.data_bits)
    }
}

/// One of the six serial control lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, EnumIter, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
#[strum(ascii_case_insensitive)]
pub enum SignalLine {
    Dtr,
    Rts,
    Cts,
    Dsr,
    Dcd,
    Ri,
}

impl SignalLine {
    /// Firmware bitmask for this line.
    pub fn mask(self) -> u32 {
        match self {
            Self::Dtr => 1 << 0,
            Self::Rts => 1 << 1,
            Self::Cts => 1 << 2,
            Self::Dsr => 1 << 3,
            Self::Dcd => 1 << 4,
            Self::Ri => 1 << 5,
        }
    }
}

/// State of the six control lines of one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SignalLines {
    #[serde(default)]
    pub dtr: bool,
    #[serde(default)]
    pub rts: bool,
    #[serde(default)]
    pub cts: bool,
    #[serde(default)]
    pub dsr: bool,
    #[serde(default)]
    pub dcd: bool,
    #[serde(default)]
    pub ri: bool,
}

impl SignalLines {
    pub fn get(&self, line: SignalLine) -> bool {
        match line {
            SignalLine::Dtr => self.dtr,
            SignalLine::Rts => self.rts,
            SignalLine::Cts => self.cts,
            SignalLine::Dsr => self.dsr,
            SignalLine::Dcd => self.dcd,
            SignalLine::Ri => self.ri,
        }
    }

    /// Pack into the firmware bitmask layout.
    pub fn to_bits(&self) -> u32 {
        use strum::IntoEnumIterator;
        SignalLine::iter()
            .filter(|l| self.get(*l))
            .fold(0, |acc, l| acc | l.mask())
    }

    pub fn from_bits(bits: u32) -> Self {
        Self {
            dtr: bits & SignalLine::Dtr.mask() != 0,
            rts: bits & SignalLine::Rts.mask() != 0,
            cts: bits & SignalLine::Cts.mask() != 0,
            dsr: bits & SignalLine::Dsr.mask() != 0,
            dcd: bits & SignalLine::Dcd.mask() != 0,
            ri: bits & SignalLine::Ri.mask() != 0,
        }
    }
}

/// A configurable communication port on the device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    pub id: PortId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub port_type: PortType,
    #[serde(default)]
    pub state: PortState,
    #[serde(default)]
    pub line_coding: Option<LineCoding>,
    #[serde(default)]
    pub signals: Option<SignalLines>,
}

/// Partial line-coding update; absent fields keep the device's value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineCodingUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baud_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_bits: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_bits: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow_control: Option<bool>,
}

/// Manual signal overrides: lines set in `mask` are forced to the
/// matching bit of `values`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<u32>,
}

/// Body of `PUT /api/ports/{id}/config`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_coding: Option<LineCodingUpdate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_overrides: Option<SignalOverrides>,
}

// ── Route ────────────────────────────────────────────────────────────

/// Route topology. Wire value: `0` Bridge, `1` Clone, `2` Merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString)]
#[serde(from = "u8", into = "u8")]
#[strum(ascii_case_insensitive)]
pub enum RouteType {
    /// Bidirectional 1:1 passthrough.
    #[strum(serialize = "bridge")]
    Bridge,
    /// Fan-out: source to every destination.
    #[strum(serialize = "clone")]
    Clone,
    /// Fan-in: every destination into the source.
    #[strum(serialize = "merge")]
    Merge,
    #[strum(disabled)]
    Other(u8),
}

impl From<u8> for RouteType {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::Bridge,
            1 => Self::Clone,
            2 => Self::Merge,
            other => Self::Other(other),
        }
    }
}

impl From<RouteType> for u8 {
    fn from(t: RouteType) -> Self {
        match t {
            RouteType::Bridge => 0,
            RouteType::Clone => 1,
            RouteType::Merge => 2,
            RouteType::Other(v) => v,
        }
    }
}

impl fmt::Display for RouteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bridge => f.write_str("Bridge"),
            Self::Clone => f.write_str("Clone"),
            Self::Merge => f.write_str("Merge"),
            Self::Other(v) => write!(f, "type-{v}"),
        }
    }
}

/// Maps a control line on the source onto a different line on the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalMapping {
    pub from_signal: u32,
    pub to_signal: u32,
}

/// A configured connection between ports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: RouteId,
    #[serde(rename = "type")]
    pub route_type: RouteType,
    #[serde(default)]
    pub active: bool,
    pub src_port_id: PortId,
    #[serde(default)]
    pub dst_port_ids: Vec<PortId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signal_map: Vec<SignalMapping>,
    #[serde(default)]
    pub bytes_src_to_dst: u64,
    #[serde(default)]
    pub bytes_dst_to_src: u64,
}

/// Body of `PUT /api/routes`. The device assigns the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRoute {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RouteId>,
    #[serde(rename = "type")]
    pub route_type: RouteType,
    pub src_port_id: PortId,
    pub dst_port_ids: Vec<PortId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signal_map: Vec<SignalMapping>,
}

impl NewRoute {
    pub fn new(route_type: RouteType, src: PortId, dst: impl IntoIterator<Item = PortId>) -> Self {
        Self {
            id: None,
            route_type,
            src_port_id: src,
            dst_port_ids: dst.into_iter().collect(),
            signal_map: Vec::new(),
        }
    }
}

// ── Device configuration ─────────────────────────────────────────────

/// WiFi status section of the device configuration (password never exposed).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WifiStatus {
    #[serde(default)]
    pub ssid: String,
    #[serde(default)]
    pub mode: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default)]
    pub connected: bool,
}

/// Per-slot TCP port configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TcpConfig {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,
    #[serde(default)]
    pub is_server: bool,
}

/// Device configuration as returned by `GET /api/config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceConfig {
    pub wifi: WifiStatus,
    pub tcp_configs: Vec<TcpConfig>,
    /// Fields this client doesn't model yet, kept verbatim.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// WiFi credential change.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WifiCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_secret"
    )]
    pub password: Option<SecretString>,
}

/// Body of `PUT /api/config`. Only present sections are applied.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wifi: Option<WifiCredentials>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcp_configs: Option<Vec<TcpConfig>>,
}

#[allow(clippy::ref_option)]
fn serialize_secret<S: Serializer>(secret: &Option<SecretString>, s: S) -> Result<S::Ok, S::Error> {
    match secret {
        Some(v) => s.serialize_str(v.expose_secret()),
        None => s.serialize_none(),
    }
}

// ── System ───────────────────────────────────────────────────────────

/// `GET /api/system` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemInfo {
    #[serde(default)]
    pub firmware: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub port_count: u32,
    #[serde(default)]
    pub active_routes: u32,
    #[serde(default)]
    pub free_heap: u64,
    /// Seconds since boot.
    #[serde(default)]
    pub uptime: u64,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── Acknowledgements ─────────────────────────────────────────────────

/// Plain acknowledgement body, e.g. `{"ok":true}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Set by `PUT /api/config` when new WiFi credentials are being applied;
    /// the device drops its current link shortly after replying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wifi_changing: Option<bool>,
}

/// Response of an endpoint that either echoes the updated entity or
/// answers with a bare [`Ack`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reply<T> {
    Entity(T),
    Ack(Ack),
}

impl<T> Reply<T> {
    pub fn entity(self) -> Option<T> {
        match self {
            Self::Entity(t) => Some(t),
            Self::Ack(_) => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        match self {
            Self::Entity(_) => true,
            Self::Ack(ack) => ack.ok,
        }
    }
}
