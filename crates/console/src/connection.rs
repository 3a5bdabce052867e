//! Push channel to the server with automatic reconnection
//!
//! The channel is receive-only: inbound frames are decoded into
//! [`InboundEvent`]s and forwarded to the subscriber. Whenever the channel
//! closes, for whatever reason, exactly one reconnect is scheduled using the
//! configured [`ReconnectStrategy`]. There is no retry limit.

use anyhow::{anyhow, Result};
use futures::StreamExt;
use shared::InboundEvent;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::reconnect::ReconnectStrategy;

/// Upper bound on one connect plus handshake; expiry counts as a close
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle of the push channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

/// Result of one channel instance
enum ConnectionResult {
    /// Channel closed or errored (reconnect)
    Closed,
    /// Nobody is listening for events anymore (exit)
    Shutdown,
}

pub struct ConnectionManager {
    url: String,
    strategy: Box<dyn ReconnectStrategy>,
    connect_timeout: Duration,
    state_tx: watch::Sender<ConnectionState>,
}

impl ConnectionManager {
    pub fn new(url: impl Into<String>, strategy: Box<dyn ReconnectStrategy>) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            url: url.into(),
            strategy,
            connect_timeout: CONNECT_TIMEOUT,
            state_tx,
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Subscribe to state transitions. Each transition replaces the value.
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Run the connect/reconnect loop on a background task
    pub fn spawn(self, events: mpsc::Sender<InboundEvent>) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run(events))
    }

    /// Connect, forward events, and reconnect forever.
    ///
    /// Returns only once the `events` receiver has been dropped.
    pub async fn run(mut self, events: mpsc::Sender<InboundEvent>) -> Result<()> {
        loop {
            self.set_state(ConnectionState::Connecting);

            match self.run_connection(&events).await {
                Ok(ConnectionResult::Shutdown) => {
                    self.set_state(ConnectionState::Disconnected);
                    tracing::debug!("Event subscriber gone, stopping connection manager");
                    return Ok(());
                }
                Ok(ConnectionResult::Closed) => {
                    tracing::info!("Channel disconnected");
                }
                Err(e) => {
                    tracing::warn!("Channel error: {}", e);
                }
            }

            self.set_state(ConnectionState::Disconnected);
            if events.is_closed() {
                return Ok(());
            }

            let delay = self.strategy.next_delay();
            tracing::info!("Reconnecting in {:?}...", delay);
            tokio::time::sleep(delay).await;
        }
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    async fn run_connection(&mut self, events: &mpsc::Sender<InboundEvent>) -> Result<ConnectionResult> {
        tracing::debug!("Connecting to {}...", self.url);
        let connect = connect_async(self.url.as_str());
        let (mut ws_stream, _) = tokio::time::timeout(self.connect_timeout, connect)
            .await
            .map_err(|_| anyhow!("Connect timed out after {:?}", self.connect_timeout))??;

        self.set_state(ConnectionState::Connected);
        self.strategy.reset();
        tracing::info!("Channel connected to {}", self.url);

        while let Some(msg_result) = ws_stream.next().await {
            match msg_result {
                Ok(Message::Text(text)) => match serde_json::from_str::<InboundEvent>(&text) {
                    Ok(event) => {
                        if events.send(event).await.is_err() {
                            return Ok(ConnectionResult::Shutdown);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Dropping malformed frame: {}", e);
                    }
                },
                Ok(Message::Close(_)) => {
                    tracing::info!("Server closed channel");
                    break;
                }
                Ok(_) => {
                    // Ping/pong handled by tungstenite, binary frames unused
                }
                Err(e) => {
                    tracing::warn!("Channel read error: {}", e);
                    break;
                }
            }
        }

        Ok(ConnectionResult::Closed)
    }
}
