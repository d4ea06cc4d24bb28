//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use vuart_config::ConfigError;
use vuart_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────

    #[error("Could not connect to device at {url}")]
    #[diagnostic(
        code(vuart::connection_failed),
        help(
            "Check that the device is powered and reachable ({reason}).\n\
             In access-point mode it answers at http://192.168.4.1"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request to {url} timed out")]
    #[diagnostic(
        code(vuart::timeout),
        help("Increase the timeout with --timeout or check the device's WiFi link.")
    )]
    Timeout { url: String },

    // ── Resources ────────────────────────────────────────────────────

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(vuart::not_found),
        help("Run: vuart {list_command} to see available {resource_type}s")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
        list_command: String,
    },

    // ── Device responses ─────────────────────────────────────────────

    #[error("Device rejected the request: {message}")]
    #[diagnostic(code(vuart::rejected))]
    Rejected { message: String },

    #[error("Device error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    #[diagnostic(code(vuart::api_error))]
    ApiError { status: Option<u16>, message: String },

    #[error("Unexpected response from device: {message}")]
    #[diagnostic(
        code(vuart::decode),
        help("The device firmware may be newer than this CLI.")
    )]
    Decode { message: String },

    // ── Validation ───────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(vuart::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────

    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(vuart::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: vuart config add-profile <name> --url <device-url>"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No device configured")]
    #[diagnostic(
        code(vuart::no_config),
        help(
            "Pass --device <url>, set VUART_DEVICE, or create a profile with:\n\
             vuart config add-profile default --url http://192.168.4.1\n\
             Config file: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(vuart::config))]
    Config(ConfigError),

    // ── Interactive ──────────────────────────────────────────────────

    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(vuart::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── Internal ─────────────────────────────────────────────────────

    #[error("{0}")]
    #[diagnostic(code(vuart::internal))]
    Internal(String),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(vuart::json))]
    Json(#[from] serde_json::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },

            CoreError::Timeout { url } => Self::Timeout { url },

            // Handlers that know which entity they asked for remap this
            // through `util::not_found_as`.
            CoreError::NotFound { message } => Self::ApiError {
                status: Some(404),
                message,
            },

            CoreError::Api { status, message } => Self::ApiError { status, message },

            CoreError::Rejected { message } => Self::Rejected { message },

            CoreError::Decode { message } => Self::Decode { message },

            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::ShutDown => Self::Internal("dashboard was already shut down".into()),
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            other => Self::Config(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        let conn: CliError = CoreError::ConnectionFailed {
            url: "http://dev".into(),
            reason: "refused".into(),
        }
        .into();
        assert_eq!(conn.exit_code(), exit_code::CONNECTION);

        let timeout: CliError = CoreError::Timeout {
            url: "http://dev".into(),
        }
        .into();
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);

        let api: CliError = CoreError::Api {
            status: Some(400),
            message: "Invalid port".into(),
        }
        .into();
        assert_eq!(api.exit_code(), exit_code::GENERAL);
        assert_eq!(api.to_string(), "Device error (HTTP 400): Invalid port");

        let bad_url: CliError = ConfigError::Validation {
            field: "device".into(),
            reason: "bad".into(),
        }
        .into();
        assert_eq!(bad_url.exit_code(), exit_code::USAGE);
    }

    #[test]
    fn shut_down_dashboard_is_a_general_failure() {
        let err: CliError = CoreError::ShutDown.into();
        assert!(matches!(err, CliError::Internal(_)));
        assert_eq!(err.exit_code(), exit_code::GENERAL);
    }
}
