//! Push frames carried by the `/ws/signals` and `/ws/monitor` channels.
//!
//! Every frame is a JSON object with a `type` discriminant. The two shapes
//! this client understands are decoded into [`Frame::Signal`] and
//! [`Frame::DataFlow`]; any other discriminant becomes [`Frame::Unknown`]
//! so newer firmware can add frame types without breaking older clients.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::device::models::{PortId, RouteId, SignalLines};

const SIGNAL_TYPE: &str = "signal";
const DATA_FLOW_TYPE: &str = "dataFlow";

/// `{"type":"signal","portId":N,"signals":{...}}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalFrame {
    pub port_id: PortId,
    pub signals: SignalLines,
}

/// `{"type":"dataFlow","routeId":N,"bytesSrcToDst":N,"bytesDstToSrc":N}`
///
/// Counters are absolute totals from the device, not deltas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataFlowFrame {
    pub route_id: RouteId,
    pub bytes_src_to_dst: u64,
    pub bytes_dst_to_src: u64,
}

/// A decoded push frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Signal(SignalFrame),
    DataFlow(DataFlowFrame),
    /// Discriminant this client doesn't know (or none at all). Ignored by consumers.
    Unknown(String),
}

/// Why a text frame could not be turned into a [`Frame`].
#[derive(Debug, Error)]
pub enum FrameError {
    /// Not JSON, or not a JSON object.
    #[error("frame is not a JSON object: {0}")]
    Decode(#[source] serde_json::Error),

    /// Known discriminant with missing or mistyped fields.
    #[error("malformed {kind} frame: {source}")]
    Protocol {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl Frame {
    /// Decode one text frame.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let value: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(text).map_err(FrameError::Decode)?;

        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .to_owned();

        match kind.as_str() {
            SIGNAL_TYPE => serde_json::from_value(serde_json::Value::Object(value))
                .map(Self::Signal)
                .map_err(|source| FrameError::Protocol {
                    kind: SIGNAL_TYPE,
                    source,
                }),
            DATA_FLOW_TYPE => serde_json::from_value(serde_json::Value::Object(value))
                .map(Self::DataFlow)
                .map_err(|source| FrameError::Protocol {
                    kind: DATA_FLOW_TYPE,
                    source,
                }),
            _ => Ok(Self::Unknown(kind)),
        }
    }

    /// The wire discriminant of this frame.
    pub fn kind(&self) -> &str {
        match self {
            Self::Signal(_) => SIGNAL_TYPE,
            Self::DataFlow(_) => DATA_FLOW_TYPE,
            Self::Unknown(kind) => kind,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_signal_frame() {
        let frame = Frame::parse(
            r#"{"type":"signal","portId":7,"signals":{"dtr":true,"rts":false,"cts":false,"dsr":false,"dcd":false,"ri":false}}"#,
        )
        .unwrap();

        let sig = match frame {
            Frame::Signal(sig) => sig,
            other => panic!("expected signal frame, got {other:?}"),
        };
        assert_eq!(sig.port_id, PortId(7));
        assert!(sig.signals.dtr);
        assert!(!sig.signals.ri);
    }

    #[test]
    fn parses_data_flow_frame() {
        let frame =
            Frame::parse(r#"{"type":"dataFlow","routeId":3,"bytesSrcToDst":1024,"bytesDstToSrc":17}"#)
                .unwrap();
        assert_eq!(
            frame,
            Frame::DataFlow(DataFlowFrame {
                route_id: RouteId(3),
                bytes_src_to_dst: 1024,
                bytes_dst_to_src: 17,
            })
        );
        assert_eq!(frame.kind(), "dataFlow");
    }

    #[test]
    fn unknown_discriminant_is_not_an_error() {
        let frame = Frame::parse(r#"{"type":"heartbeat","seq":4}"#).unwrap();
        assert_eq!(frame, Frame::Unknown("heartbeat".into()));
    }

    #[test]
    fn missing_discriminant_is_unknown() {
        let frame = Frame::parse(r#"{"portId":1}"#).unwrap();
        assert_eq!(frame, Frame::Unknown(String::new()));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(matches!(Frame::parse("not json"), Err(FrameError::Decode(_))));
        assert!(matches!(Frame::parse("[1,2]"), Err(FrameError::Decode(_))));
    }

    #[test]
    fn known_type_with_missing_fields_is_a_protocol_error() {
        let err = Frame::parse(r#"{"type":"dataFlow","routeId":3}"#).unwrap_err();
        assert!(matches!(err, FrameError::Protocol { kind: "dataFlow", .. }));
    }
}
