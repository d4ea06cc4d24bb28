// vuart-api: Async Rust client for the Virtual UART port router (HTTP + push channels)

pub mod channel;
pub mod device;
pub mod error;
pub mod frame;
pub mod transport;

pub use channel::{ChannelConfig, ChannelEndpoint, ChannelHandle, ChannelState, ReconnectConfig};
pub use device::DeviceClient;
pub use device::models;
pub use error::Error;
pub use frame::{DataFlowFrame, Frame, FrameError, SignalFrame};
pub use transport::{TlsMode, TransportConfig};
