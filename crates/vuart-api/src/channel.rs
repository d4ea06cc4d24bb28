//! Push channels with auto-reconnect.
//!
//! The device streams live data over two independent WebSocket endpoints,
//! `/ws/signals` and `/ws/monitor`. A [`ChannelHandle`] owns one of them:
//! it connects in a background task, decodes every text frame into a
//! [`Frame`], broadcasts known frames to subscribers, and reconnects with
//! capped exponential backoff whenever the connection closes for any
//! reason. The loop runs until [`ChannelHandle::shutdown`] is called.
//!
//! # Example
//!
//! ```rust,ignore
//! use tokio_util::sync::CancellationToken;
//! use vuart_api::channel::{ChannelConfig, ChannelEndpoint, ChannelHandle};
//!
//! let url = client.websocket_url(ChannelEndpoint::Signals.path())?;
//! let handle = ChannelHandle::spawn(
//!     ChannelEndpoint::Signals,
//!     url,
//!     ChannelConfig::default(),
//!     CancellationToken::new(),
//! );
//! let mut rx = handle.subscribe();
//!
//! while let Ok(frame) = rx.recv().await {
//!     println!("{}: {frame:?}", frame.kind());
//! }
//! ```

use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::BuildHasher;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use crate::error::Error;
use crate::frame::Frame;

// ── Broadcast channel capacity ───────────────────────────────────────

const FRAME_CHANNEL_CAPACITY: usize = 1024;

/// Sent once after every successful open. The firmware only registers a
/// WebSocket client for broadcasts after it has received a frame from it.
const HELLO_FRAME: &str = r#"{"type":"hello"}"#;

// ── Endpoint ─────────────────────────────────────────────────────────

/// The two push endpoints the device exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelEndpoint {
    /// Per-port control-line changes.
    Signals,
    /// Per-route byte counters.
    Monitor,
}

impl ChannelEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            Self::Signals => "/ws/signals",
            Self::Monitor => "/ws/monitor",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Signals => "signals",
            Self::Monitor => "monitor",
        }
    }
}

impl fmt::Display for ChannelEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ── State ────────────────────────────────────────────────────────────

/// Observable lifecycle of a channel.
///
/// `Connecting → Open → Closed → Connecting → …` until shutdown, which
/// moves it to `Stopped` from any state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelState {
    Connecting { attempt: u32 },
    Open,
    Closed { attempt: u32, retry_in: Duration },
    Stopped,
}

impl ChannelState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Backoff configuration for channel reconnection.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt after a close. Default: 3s.
    pub initial_delay: Duration,

    /// Upper bound on the exponential part of the delay. Default: 30s.
    pub max_delay: Duration,

    /// Maximum consecutive failed attempts before giving up.
    /// `None` means retry forever.
    pub max_retries: Option<u32>,

    /// Extra random delay as a fraction of the computed delay, in `[0, jitter)`.
    /// Default: 0.25. Never shortens the delay and is not applied to the
    /// first attempt, which always waits exactly `initial_delay`.
    pub jitter: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(30),
            max_retries: None,
            jitter: 0.25,
        }
    }
}

/// Per-channel options.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub reconnect: ReconnectConfig,
    /// Send a registration frame right after each open.
    pub announce_on_open: bool,
    /// Upper bound on one connect plus handshake; expiry counts as a failed attempt.
    pub connect_timeout: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            announce_on_open: true,
            connect_timeout: Duration::from_secs(10),
        }
    }
}

// ── Backoff ──────────────────────────────────────────────────────────

/// Retry schedule: `min(initial * 2^attempt, max) * (1 + jitter)`, with no
/// jitter on attempt 0.
///
/// The attempt counter resets whenever a connection reaches `Open`, so a
/// channel that was up and then dropped always waits `initial_delay` first.
#[derive(Debug)]
pub(crate) struct Backoff {
    config: ReconnectConfig,
    attempt: u32,
    seed: RandomState,
}

impl Backoff {
    pub(crate) fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempt: 0,
            seed: RandomState::new(),
        }
    }

    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }

    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Delay before the next attempt, or `None` once `max_retries` is spent.
    pub(crate) fn next_delay(&mut self) -> Option<Duration> {
        if let Some(max) = self.config.max_retries {
            if self.attempt >= max {
                return None;
            }
        }
        let base = calculate_backoff(self.attempt, &self.config);
        let delay = if self.attempt == 0 {
            base
        } else {
            base.mul_f64(1.0 + self.config.jitter.max(0.0) * self.jitter_fraction())
        };
        self.attempt = self.attempt.saturating_add(1);
        Some(delay)
    }

    /// Per-process random value in `[0, 1)` for the current attempt.
    ///
    /// `RandomState` is keyed randomly per process, so clients that lost
    /// the device at the same instant spread their reconnects apart.
    #[allow(clippy::cast_precision_loss, clippy::as_conversions)]
    fn jitter_fraction(&self) -> f64 {
        let h = self.seed.hash_one(self.attempt);
        (h >> 11) as f64 / (1u64 << 53) as f64
    }
}

/// Capped exponential delay without jitter.
fn calculate_backoff(attempt: u32, config: &ReconnectConfig) -> Duration {
    let factor = 2u32.checked_pow(attempt.min(31)).unwrap_or(u32::MAX);
    config
        .initial_delay
        .checked_mul(factor)
        .unwrap_or(config.max_delay)
        .min(config.max_delay)
        .max(config.initial_delay.min(config.max_delay))
}

// ── ChannelHandle ────────────────────────────────────────────────────

/// Handle to a running push channel.
///
/// Dropping the handle does not stop the background task; call
/// [`shutdown`](Self::shutdown) (or cancel the token passed to
/// [`spawn`](Self::spawn)) to tear it down.
pub struct ChannelHandle {
    endpoint: ChannelEndpoint,
    url: Url,
    frame_tx: broadcast::Sender<Frame>,
    state_rx: watch::Receiver<ChannelState>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    /// Spawn the connect/read/reconnect loop for `endpoint` at `url`.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background. Must be called from within a Tokio runtime.
    pub fn spawn(
        endpoint: ChannelEndpoint,
        url: Url,
        config: ChannelConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (frame_tx, _) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ChannelState::Connecting { attempt: 0 });

        let task = tokio::spawn(channel_loop(
            endpoint,
            url.clone(),
            frame_tx.clone(),
            state_tx,
            config,
            cancel.clone(),
        ));

        Self {
            endpoint,
            url,
            frame_tx,
            state_rx,
            cancel,
            task,
        }
    }

    pub fn endpoint(&self) -> ChannelEndpoint {
        self.endpoint
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get a new receiver for decoded frames.
    ///
    /// Multiple consumers can subscribe concurrently. A consumer that
    /// falls behind receives [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<Frame> {
        self.frame_tx.subscribe()
    }

    /// Watch the connection lifecycle.
    pub fn state(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    pub fn current_state(&self) -> ChannelState {
        self.state_rx.borrow().clone()
    }

    /// Stop the loop: any pending connect, read, or backoff wait ends now.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Stop the loop and wait for the background task to finish.
    pub async fn shutdown_and_wait(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(endpoint = %self.endpoint, error = %e, "channel task ended abnormally");
        }
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// How a single connection ended.
enum Disconnect {
    /// Never reached `Open`.
    Failed(Error),
    /// Was open, then closed (cleanly when `reason` is `None`).
    Closed { reason: Option<Error> },
}

/// Main loop: connect → read → on close, back off → reconnect.
async fn channel_loop(
    endpoint: ChannelEndpoint,
    url: Url,
    frame_tx: broadcast::Sender<Frame>,
    state_tx: watch::Sender<ChannelState>,
    config: ChannelConfig,
    cancel: CancellationToken,
) {
    let mut backoff = Backoff::new(config.reconnect.clone());

    loop {
        state_tx.send_replace(ChannelState::Connecting {
            attempt: backoff.attempt(),
        });

        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            outcome = connect_and_read(
                endpoint,
                &url,
                &frame_tx,
                &state_tx,
                &cancel,
                &config,
            ) => outcome,
        };

        match outcome {
            Disconnect::Closed { reason: None } => {
                info!(%endpoint, "channel closed");
                backoff.reset();
            }
            Disconnect::Closed { reason: Some(e) } => {
                warn!(%endpoint, error = %e, "channel dropped");
                backoff.reset();
            }
            Disconnect::Failed(e) => {
                warn!(%endpoint, error = %e, attempt = backoff.attempt(), "channel connect failed");
            }
        }

        if cancel.is_cancelled() {
            break;
        }

        let attempt = backoff.attempt();
        let Some(delay) = backoff.next_delay() else {
            error!(
                %endpoint,
                max_retries = ?config.reconnect.max_retries,
                "channel reconnection limit reached, giving up"
            );
            break;
        };

        info!(
            %endpoint,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "waiting before reconnect"
        );
        state_tx.send_replace(ChannelState::Closed {
            attempt,
            retry_in: delay,
        });

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    state_tx.send_replace(ChannelState::Stopped);
    debug!(%endpoint, "channel loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one WebSocket connection and read frames until it drops.
async fn connect_and_read(
    endpoint: ChannelEndpoint,
    url: &Url,
    frame_tx: &broadcast::Sender<Frame>,
    state_tx: &watch::Sender<ChannelState>,
    cancel: &CancellationToken,
    config: &ChannelConfig,
) -> Disconnect {
    info!(%endpoint, url = %url, "connecting channel");

    let connect = tokio_tungstenite::connect_async(url.as_str());
    let (ws_stream, _response) = match tokio::time::timeout(config.connect_timeout, connect).await
    {
        Ok(Ok(pair)) => pair,
        Ok(Err(e)) => return Disconnect::Failed(Error::WebSocketConnect(e.to_string())),
        Err(_) => {
            return Disconnect::Failed(Error::WebSocketConnect(format!(
                "no handshake within {}ms",
                config.connect_timeout.as_millis()
            )));
        }
    };

    state_tx.send_replace(ChannelState::Open);
    info!(%endpoint, "channel open");

    let (mut write, mut read) = ws_stream.split();

    if config.announce_on_open {
        if let Err(e) = write.send(Message::text(HELLO_FRAME)).await {
            return Disconnect::Closed {
                reason: Some(Error::WebSocketConnect(e.to_string())),
            };
        }
    }

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                // Best effort; the peer may already be gone.
                let _ = write.send(Message::Close(None)).await;
                return Disconnect::Closed { reason: None };
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => dispatch(endpoint, &text, frame_tx),
                    Some(Ok(Message::Ping(_))) => {
                        // tungstenite queues the pong automatically
                        trace!(%endpoint, "channel ping");
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            info!(
                                %endpoint,
                                code = %cf.code,
                                reason = %cf.reason,
                                "close frame received"
                            );
                        } else {
                            info!(%endpoint, "close frame received (no payload)");
                        }
                        return Disconnect::Closed { reason: None };
                    }
                    Some(Err(e)) => {
                        return Disconnect::Closed {
                            reason: Some(Error::WebSocketConnect(e.to_string())),
                        };
                    }
                    None => {
                        debug!(%endpoint, "channel stream ended");
                        return Disconnect::Closed { reason: None };
                    }
                    Some(Ok(_)) => {
                        // Binary, Pong, raw Frame -- nothing to do
                    }
                }
            }
        }
    }
}

// ── Frame dispatch ───────────────────────────────────────────────────

/// Decode one text frame and broadcast it if this client understands it.
fn dispatch(endpoint: ChannelEndpoint, text: &str, frame_tx: &broadcast::Sender<Frame>) {
    match Frame::parse(text) {
        Ok(Frame::Unknown(kind)) => {
            trace!(%endpoint, kind, "ignoring frame of unknown type");
        }
        Ok(frame) => {
            // No subscribers right now is fine
            let _ = frame_tx.send(frame);
        }
        Err(e) => {
            debug!(%endpoint, error = %e, "dropping undecodable frame");
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
