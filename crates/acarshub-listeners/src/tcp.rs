//! Reconnecting TCP decoder listener.

use crate::framing::StreamReassembler;
use crate::{ListenerEvent, ListenerStats, SharedState, DEFAULT_TCP_RECONNECT_DELAY};
use acarshub_protocol::DecoderType;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, warn};

const READ_BUF_SIZE: usize = 16 * 1024;

/// One reconnecting TCP client for a single enabled decoder. Owns its
/// connection and reconnect timer exclusively; holds no shared state with
/// other listeners beyond the event channel it was handed.
pub struct TcpListenerClient {
    decoder: DecoderType,
    host: String,
    port: u16,
    reconnect_delay: Duration,
    state: SharedState,
}

impl TcpListenerClient {
    pub fn new(decoder: DecoderType, host: impl Into<String>, port: u16) -> Self {
        Self {
            decoder,
            host: host.into(),
            port,
            reconnect_delay: DEFAULT_TCP_RECONNECT_DELAY,
            state: SharedState::new(),
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn connected(&self) -> bool {
        self.state.stats().connected
    }

    pub fn get_stats(&self) -> ListenerStats {
        self.state.stats()
    }

    /// No-op if already running. Spawns the reconnect loop as a background
    /// task and returns immediately.
    pub fn start(&self, events: mpsc::Sender<ListenerEvent>) {
        if !self.state.mark_started() {
            return;
        }
        let decoder = self.decoder;
        let host = self.host.clone();
        let port = self.port;
        let reconnect_delay = self.reconnect_delay;
        let state = self.state.clone();
        tokio::spawn(async move {
                run(decoder, host, port, reconnect_delay, state, events).await;
        });
    }

    /// No-op if not running. Causes the background task's next check to
    /// exit cleanly; any in-flight read is abandoned when the socket drops.
    pub fn stop(&self) {
        self.state.mark_stopped();
    }
}

async fn run(
    decoder: DecoderType,
    host: String,
    port: u16,
    reconnect_delay: Duration,
    state: SharedState,
    events: mpsc::Sender<ListenerEvent>,
) {
    let mut stream: Option<TcpStream> = None;
    let mut reassembler = StreamReassembler::new();

    while state.is_running() {
        match stream.as_mut() {
            Some(s) => {
                let mut buf = vec![0u8; READ_BUF_SIZE];
                match s.read(&mut buf).await {
                    Ok(0) => {
                        // Peer closed the connection cleanly.
                        stream = None;
                        state.connected.store(false, Ordering::SeqCst);
                        let _ = events.send(ListenerEvent::Disconnected { decoder }).await;
                    }
                    Ok(n) => {
                        let text = String::from_utf8_lossy(&buf[..n]);
                        for value in reassembler.feed(&text) {
                            state.messages_received.fetch_add(1, Ordering::SeqCst);
                            let _ = events
                            .send(ListenerEvent::Message { decoder, payload: value })
                            .await;
                        }
                    }
                    Err(e) => {
                        stream = None;
                        state.connected.store(false, Ordering::SeqCst);
                        state.errors.fetch_add(1, Ordering::SeqCst);
                        let _ = events
                        .send(ListenerEvent::Error { decoder, message: e.to_string() })
                        .await;
                        let _ = events.send(ListenerEvent::Disconnected { decoder }).await;
                    }
                }
            }
            None => match TcpStream::connect((host.as_str(), port)).await {
                Ok(s) => {
                    debug!(?decoder, %host, port, "connected");
                    state.connected.store(true, Ordering::SeqCst);
                    state.reconnects.fetch_add(1, Ordering::SeqCst);
                    let _ = events.send(ListenerEvent::Connected { decoder }).await;
                    stream = Some(s);
                }
                Err(e) => {
                    warn!(?decoder, %host, port, error = %e, "connect failed, retrying");
                    state.errors.fetch_add(1, Ordering::SeqCst);
                    sleep(reconnect_delay).await;
                }
            },
        }
    }
}
