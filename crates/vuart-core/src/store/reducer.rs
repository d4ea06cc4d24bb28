// ── Live-store reducers ──
//
// Pure, total functions: previous state plus one frame gives the next
// state. Frames of a different kind leave the state unchanged. Decoding
// errors never get this far; the codec drops them.

use vuart_api::Frame;

use super::live::{DataFlowState, FlowCounters, SignalState};

/// Replace the signal entry for the frame's port.
pub fn apply_signal_update(state: &SignalState, frame: &Frame) -> SignalState {
    let mut next = state.clone();
    if let Frame::Signal(update) = frame {
        next.insert(update.port_id, update.signals);
    }
    next
}

/// Replace the counters for the frame's route. Values are the device's
/// absolute totals, so they overwrite rather than accumulate.
pub fn apply_data_flow_update(state: &DataFlowState, frame: &Frame) -> DataFlowState {
    let mut next = state.clone();
    if let Frame::DataFlow(update) = frame {
        next.insert(
            update.route_id,
            FlowCounters {
                bytes_source_to_dest: update.bytes_src_to_dst,
                bytes_dest_to_source: update.bytes_dst_to_src,
            },
        );
    }
    next
}
