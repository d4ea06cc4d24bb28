//! Clap derive structures for the `vuart` CLI.
//!
//! Defines the command tree, global flags, and shared value enums.

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::commands::util::{parse_signal_mask, parse_tcp_slot};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// vuart -- manage a Virtual UART port router from the command line
#[derive(Debug, Parser)]
#[command(
    name = "vuart",
    version,
    about = "Manage Virtual UART port routers from the command line",
    long_about = "Inspect and configure the ports and routes of a serial/USB-to-network\n\
        router, and watch its control signals and traffic counters live.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Device profile to use
    #[arg(long, short = 'p', env = "VUART_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device base URL (overrides profile)
    #[arg(long, short = 'd', env = "VUART_DEVICE", global = true)]
    pub device: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "VUART_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates (HTTP requests only)
    #[arg(long, short = 'k', env = "VUART_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "VUART_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and configure ports
    #[command(alias = "p")]
    Ports(PortsArgs),

    /// List, create, and delete routes
    #[command(alias = "r")]
    Routes(RoutesArgs),

    /// Show or change device configuration (WiFi, TCP slots)
    Device(DeviceArgs),

    /// Show firmware and system information
    #[command(alias = "sys")]
    System,

    /// Follow live control signals and traffic counters
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Manage device profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PORTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PortsArgs {
    #[command(subcommand)]
    pub command: PortsCommand,
}

#[derive(Debug, Subcommand)]
pub enum PortsCommand {
    /// List all ports
    #[command(alias = "ls")]
    List,

    /// Change a port's line coding or force control lines
    Configure(PortConfigureArgs),
}

#[derive(Debug, Args)]
pub struct PortConfigureArgs {
    /// Port id (see `vuart ports list`)
    pub id: u32,

    /// Baud rate
    #[arg(long)]
    pub baud: Option<u32>,

    /// Data bits
    #[arg(long, value_parser = clap::value_parser!(u8).range(5..=8))]
    pub data_bits: Option<u8>,

    /// Stop bits
    #[arg(long)]
    pub stop_bits: Option<StopBits>,

    /// Parity
    #[arg(long)]
    pub parity: Option<Parity>,

    /// RTS/CTS hardware flow control
    #[arg(long)]
    pub flow_control: Option<bool>,

    /// Lines to force, e.g. `dtr,rts` or a bitmask such as `0x3`
    #[arg(long, value_parser = parse_signal_mask)]
    pub override_mask: Option<u32>,

    /// Forced values for the masked lines, same syntax as --override-mask
    #[arg(long, value_parser = parse_signal_mask, requires = "override_mask")]
    pub override_values: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StopBits {
    #[value(name = "1")]
    One,
    #[value(name = "1.5")]
    OnePointFive,
    #[value(name = "2")]
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Parity {
    None,
    Odd,
    Even,
    Mark,
    Space,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ROUTES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RoutesArgs {
    #[command(subcommand)]
    pub command: RoutesCommand,
}

#[derive(Debug, Subcommand)]
pub enum RoutesCommand {
    /// List all routes with their byte counters
    #[command(alias = "ls")]
    List,

    /// Create a route; the device assigns its id
    Create(RouteCreateArgs),

    /// Delete a route
    #[command(alias = "rm")]
    Delete {
        /// Route id (see `vuart routes list`)
        id: u32,
    },
}

#[derive(Debug, Args)]
pub struct RouteCreateArgs {
    /// Route topology
    #[arg(long = "type", short = 't')]
    pub route_type: RouteKind,

    /// Source port id
    #[arg(long)]
    pub src: u32,

    /// Destination port id(s)
    #[arg(long, required = true, num_args = 1.., value_delimiter = ',')]
    pub dst: Vec<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RouteKind {
    /// Bidirectional 1:1 passthrough
    Bridge,
    /// Source fans out to every destination
    Clone,
    /// Every destination merges into the source
    Merge,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DEVICE
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DeviceArgs {
    #[command(subcommand)]
    pub command: DeviceCommand,
}

#[derive(Debug, Subcommand)]
pub enum DeviceCommand {
    /// Show the device configuration
    Show,

    /// Change WiFi credentials or TCP slot settings
    Set(DeviceSetArgs),

    /// Factory-reset the device configuration
    Reset,
}

#[derive(Debug, Args)]
pub struct DeviceSetArgs {
    /// WiFi network name
    #[arg(long)]
    pub ssid: Option<String>,

    /// Prompt for the WiFi password
    #[arg(long)]
    pub ask_password: bool,

    /// TCP slot as `slot=host:port[:server]` (repeatable)
    #[arg(long = "tcp", value_parser = parse_tcp_slot)]
    pub tcp: Vec<TcpSlot>,
}

/// One `--tcp` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpSlot {
    pub slot: usize,
    pub host: String,
    pub port: u16,
    pub is_server: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Which live channel(s) to follow
    #[arg(default_value = "all")]
    pub target: WatchTarget,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WatchTarget {
    /// Control lines per port (`/ws/signals`)
    Signals,
    /// Byte counters per route (`/ws/monitor`)
    Monitor,
    /// Both channels
    All,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the config file location
    Path,

    /// Show the current configuration
    Show,

    /// Add or replace a device profile
    AddProfile(AddProfileArgs),

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct AddProfileArgs {
    /// Profile name
    pub name: String,

    /// Device base URL, e.g. http://192.168.4.1
    #[arg(long = "url")]
    pub url: String,

    /// Store `insecure = true` (accept invalid TLS certificates)
    #[arg(long)]
    pub allow_insecure: bool,

    /// Request timeout in seconds
    #[arg(long = "profile-timeout")]
    pub timeout: Option<u64>,

    /// Drop live entries for ports/routes missing after a refresh
    #[arg(long)]
    pub prune_stale: bool,

    /// Make this the default profile
    #[arg(long)]
    pub default: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
