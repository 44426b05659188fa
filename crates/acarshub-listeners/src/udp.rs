//! UDP decoder listener. "Connected" means successfully
//! bound; datagrams are atomic and never reassembled across packets.

use crate::framing::parse_datagram;
use crate::{ListenerEvent, ListenerStats, SharedState, DEFAULT_UDP_RETRY_DELAY};
use acarshub_protocol::DecoderType;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, warn};

const DATAGRAM_BUF_SIZE: usize = 64 * 1024;

pub struct UdpListenerClient {
    decoder: DecoderType,
    host: String,
    port: u16,
    retry_delay: Duration,
    state: SharedState,
}

impl UdpListenerClient {
    pub fn new(decoder: DecoderType, host: impl Into<String>, port: u16) -> Self {
        Self {
            decoder,
            host: host.into(),
            port,
            retry_delay: DEFAULT_UDP_RETRY_DELAY,
            state: SharedState::new(),
        }
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn connected(&self) -> bool {
        self.state.stats().connected
    }

    pub fn get_stats(&self) -> ListenerStats {
        self.state.stats()
    }

    pub fn start(&self, events: mpsc::Sender<ListenerEvent>) {
        if !self.state.mark_started() {
            return;
        }
        let decoder = self.decoder;
        let host = self.host.clone();
        let port = self.port;
        let retry_delay = self.retry_delay;
        let state = self.state.clone();
        tokio::spawn(async move {
                run(decoder, host, port, retry_delay, state, events).await;
        });
    }

    pub fn stop(&self) {
        self.state.mark_stopped();
    }
}

async fn run(
    decoder: DecoderType,
    host: String,
    port: u16,
    retry_delay: Duration,
    state: SharedState,
    events: mpsc::Sender<ListenerEvent>,
) {
    let socket = loop {
        if !state.is_running() {
            return;
        }
        match UdpSocket::bind((host.as_str(), port)).await {
            Ok(s) => break s,
            Err(e) => {
                warn!(?decoder, %host, port, error = %e, "bind failed, retrying");
                state.errors.fetch_add(1, Ordering::SeqCst);
                let _ = events
                .send(ListenerEvent::Error { decoder, message: e.to_string() })
                .await;
                sleep(retry_delay).await;
            }
        }
    };

    debug!(?decoder, %host, port, "bound");
    state.connected.store(true, Ordering::SeqCst);
    let _ = events.send(ListenerEvent::Connected { decoder }).await;

    let mut buf = vec![0u8; DATAGRAM_BUF_SIZE];
    while state.is_running() {
        match socket.recv(&mut buf).await {
            Ok(n) => {
                let text = String::from_utf8_lossy(&buf[..n]);
                for value in parse_datagram(&text) {
                    state.messages_received.fetch_add(1, Ordering::SeqCst);
                    let _ = events
                    .send(ListenerEvent::Message { decoder, payload: value })
                    .await;
                }
            }
            Err(e) => {
                state.errors.fetch_add(1, Ordering::SeqCst);
                let _ = events
                .send(ListenerEvent::Error { decoder, message: e.to_string() })
                .await;
            }
        }
    }

    state.connected.store(false, Ordering::SeqCst);
    let _ = events.send(ListenerEvent::Disconnected { decoder }).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn binds_and_parses_a_datagram() {
        let (tx, mut rx) = mpsc::channel(16);
        let client = UdpListenerClient::new(DecoderType::Hfdl, "127.0.0.1", 0);
        client.start(tx);

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for connected event")
        .unwrap();
        assert!(matches!(event, ListenerEvent::Connected { .. }));

        client.stop();
    }

    #[tokio::test]
    async fn start_is_a_no_op_when_already_running() {
        let (tx, _rx) = mpsc::channel(16);
        let client = UdpListenerClient::new(DecoderType::Hfdl, "127.0.0.1", 0);
        client.start(tx.clone());
        client.start(tx);
        client.stop();
    }
}
