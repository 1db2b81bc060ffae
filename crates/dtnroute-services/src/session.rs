//! Event channel session — one WebSocket connection to the node.
//!
//! A session owns a fresh [`Dispatcher`]; all state is dropped with it, so
//! every reconnect starts from an empty directory and tracker and relies on
//! the node's `PeerState` snapshot.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::{Interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use dtnroute_core::{Outbound, ProtocolError};

use crate::dispatch::{DispatchStats, Dispatcher};

type Channel = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: Box<tungstenite::Error>,
    },
    #[error("event channel failed: {0}")]
    Transport(#[from] Box<tungstenite::Error>),
    #[error("failed to encode outbound event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Why a session stopped without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The node closed the channel.
    Closed,
    /// Local shutdown was requested.
    Shutdown,
}

pub struct Session {
    url: String,
    channel: Channel,
    dispatcher: Dispatcher,
    stats_interval: Option<Duration>,
}

impl Session {
    /// Establish the event channel.
    pub async fn connect(url: &str) -> Result<Self, SessionError> {
        let (channel, _) = connect_async(url).await.map_err(|e| SessionError::Connect {
            url: url.to_string(),
            source: Box::new(e),
        })?;
        tracing::info!(url, "connected to node");
        Ok(Self {
            url: url.to_string(),
            channel,
            dispatcher: Dispatcher::new(),
            stats_interval: None,
        })
    }

    /// Log dispatcher stats every `interval`. `None` disables.
    pub fn with_stats_interval(mut self, interval: Option<Duration>) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Process events until the channel closes, fails, or shutdown fires.
    ///
    /// Returns the final stats alongside the reason the session ended.
    pub async fn run(
        mut self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(SessionEnd, DispatchStats), SessionError> {
        let mut ticker = self.stats_interval.map(|period| {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        let end = loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    if let Err(e) = self.channel.close(None).await {
                        tracing::debug!(error = %e, "close on shutdown failed");
                    }
                    break SessionEnd::Shutdown;
                }
                _ = tick(&mut ticker) => self.dispatcher.log_stats(),
                frame = self.channel.next() => match frame {
                    None => break SessionEnd::Closed,
                    Some(Err(e)) => return Err(SessionError::Transport(Box::new(e))),
                    Some(Ok(Message::Close(frame))) => {
                        tracing::debug!(?frame, "close frame from node");
                        // Flushes the close reply tungstenite queued on receipt.
                        if let Err(e) = self.channel.close(None).await {
                            tracing::debug!(error = %e, "close reply failed");
                        }
                        break SessionEnd::Closed;
                    }
                    Some(Ok(Message::Text(text))) => {
                        tracing::trace!(event = text.as_str(), "received");
                        if let Some(out) = self.dispatcher.handle_text(text.as_str()) {
                            self.send(&out).await?;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => self.dispatcher.reject(&ProtocolError::NonText),
                    // Pongs for incoming pings are queued by tungstenite itself.
                    Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                },
            }
        };

        tracing::info!(url = %self.url, reason = ?end, "event channel closed");
        self.dispatcher.log_stats();
        Ok((end, self.dispatcher.stats()))
    }

    async fn send(&mut self, out: &Outbound) -> Result<(), SessionError> {
        let text = out.to_text()?;
        tracing::trace!(event = %text, "sending");
        self.channel
            .send(Message::text(text))
            .await
            .map_err(|e| SessionError::Transport(Box::new(e)))
    }
}

async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
