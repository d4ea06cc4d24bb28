// ── Core error types ──
//
// User-facing errors from vuart-core. Consumers never match on reqwest or
// serde errors directly; the `From<vuart_api::Error>` impl translates
// transport-layer failures into domain-appropriate variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach device at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Device request timed out ({url})")]
    Timeout { url: String },

    // ── Device responses ─────────────────────────────────────────────
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Device error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Api { status: Option<u16>, message: String },

    #[error("Operation rejected by device: {message}")]
    Rejected { message: String },

    #[error("Unexpected response from device: {message}")]
    Decode { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Lifecycle ────────────────────────────────────────────────────
    #[error("Dashboard has been shut down")]
    ShutDown,
}

impl CoreError {
    /// Whether retrying the same request later might succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout { .. } => true,
            Self::Api { status, .. } => status.is_some_and(|s| s >= 500),
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<vuart_api::Error> for CoreError {
    fn from(err: vuart_api::Error) -> Self {
        match err {
            vuart_api::Error::Transport(ref e) => {
                let url = e.url().map(ToString::to_string).unwrap_or_else(|| "<unknown>".into());
                if e.is_timeout() {
                    CoreError::Timeout { url }
                } else if e.is_connect() || e.is_request() {
                    CoreError::ConnectionFailed {
                        url,
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        status: e.status().map(|s| s.as_u16()),
                        message: e.to_string(),
                    }
                }
            }
            vuart_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            vuart_api::Error::Tls(msg) => CoreError::Config {
                message: format!("TLS setup failed: {msg}"),
            },
            vuart_api::Error::Api { status: 404, message } => CoreError::NotFound { message },
            vuart_api::Error::Api { status, message } => CoreError::Api {
                status: Some(status),
                message,
            },
            vuart_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
            vuart_api::Error::Deserialization { message, body: _ } => CoreError::Decode { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_status_maps_to_not_found() {
        let err = CoreError::from(vuart_api::Error::Api {
            status: 404,
            message: "Route not found".into(),
        });
        assert!(matches!(err, CoreError::NotFound { ref message } if message == "Route not found"));
    }

    #[test]
    fn api_status_is_rendered() {
        let err = CoreError::from(vuart_api::Error::Api {
            status: 400,
            message: "Invalid port ID".into(),
        });
        assert_eq!(err.to_string(), "Device error (HTTP 400): Invalid port ID");
        assert!(!err.is_transient());
    }

    #[test]
    fn server_errors_are_transient() {
        let err = CoreError::from(vuart_api::Error::Api {
            status: 503,
            message: "busy".into(),
        });
        assert!(err.is_transient());
    }

    #[test]
    fn decode_failures_keep_the_message() {
        let err = CoreError::from(vuart_api::Error::Deserialization {
            message: "expected value at line 1".into(),
            body: "<html>".into(),
        });
        assert_eq!(
            err.to_string(),
            "Unexpected response from device: expected value at line 1"
        );
    }
}
