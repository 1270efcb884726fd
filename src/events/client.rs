// src/events/client.rs

//! Connection to the buck daemon's event channel.
//!
//! The daemon's HTTP server exposes a websocket at `/ws/build`. One
//! connection is shared by every subscriber. Each text frame is a JSON
//! object decoded into an [`EngineEvent`] and fanned out over a broadcast
//! channel.
//!
//! Each subscription starts with a synthetic `SocketConnected`, so a consumer
//! can tell "connected, nothing happened yet" apart from "never connected".
//! That holds even if the connection has already closed again: the
//! subscription then yields `SocketConnected` and ends. Reconnecting (and
//! re-discovering the port) is up to the caller.

use std::net::{Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

use futures::stream::{self, Stream, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::errors::{BuckError, Result};
use crate::events::message::EngineEvent;

/// Events buffered per subscriber before it starts lagging.
const SUBSCRIBER_BUFFER: usize = 256;

/// Path of the build event websocket on the daemon's HTTP server.
pub const EVENTS_PATH: &str = "/ws/build";

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub type EventSubscription = Pin<Box<dyn Stream<Item = EngineEvent> + Send>>;

/// Opens event connections.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventStreamClient;

impl EventStreamClient {
    /// Connect to the daemon's event port on localhost.
    pub async fn connect(port: u16) -> Result<EventStream> {
        Self::connect_addr(SocketAddr::from((Ipv4Addr::LOCALHOST, port))).await
    }

    pub async fn connect_addr(addr: SocketAddr) -> Result<EventStream> {
        let url = format!("ws://{addr}{EVENTS_PATH}");
        let (socket, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| BuckError::EventStream(format!("connecting to {url}: {e}")))?;
        info!(%url, "connected to buck event stream");

        let (tx, _) = broadcast::channel(SUBSCRIBER_BUFFER);
        let sender = Arc::new(Mutex::new(Some(tx.clone())));

        let reader_sender = Arc::clone(&sender);
        tokio::spawn(async move {
            read_events(socket, &tx).await;
            // Dropping the last senders closes every subscription.
            reader_sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
            drop(tx);
            info!(%addr, "buck event stream closed");
        });

        Ok(EventStream { addr, sender })
    }
}

async fn read_events(mut socket: Socket, tx: &broadcast::Sender<EngineEvent>) {
    while let Some(frame) = socket.next().await {
        match frame {
            Ok(Message::Text(text)) => relay(text.as_str(), tx),
            Ok(Message::Close(_)) => break,
            // Pings are answered by tungstenite itself.
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "buck event connection failed");
                break;
            }
        }
    }
}

fn relay(raw: &str, tx: &broadcast::Sender<EngineEvent>) {
    if raw.trim().is_empty() {
        return;
    }
    match EngineEvent::decode(raw) {
        Ok(event) => {
            debug!(kind = event.kind(), "buck event");
            // No subscribers is fine; the event is simply dropped.
            let _ = tx.send(event);
        }
        Err(e) => warn!(error = %e, "skipping undecodable buck event"),
    }
}

/// Shared handle on one event connection. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventStream {
    addr: SocketAddr,
    sender: Arc<Mutex<Option<broadcast::Sender<EngineEvent>>>>,
}

impl EventStream {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn is_connected(&self) -> bool {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Attach a new subscriber.
    ///
    /// Yields `SocketConnected` first, then every event received from now on.
    /// On a connection that has already closed only `SocketConnected` is
    /// yielded.
    pub fn subscribe(&self) -> EventSubscription {
        let rx = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(broadcast::Sender::subscribe);

        let connected = stream::once(async { EngineEvent::SocketConnected });
        let Some(rx) = rx else {
            debug!(addr = %self.addr, "subscribing to a closed event stream");
            return Box::pin(connected);
        };

        let events = stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(event) => return Some((event, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "event subscriber lagged; events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Box::pin(connected.chain(events))
    }
}
