use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{EncodeError, TransportError};
use crate::protocol::encode;
use crate::types::Command;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Identifies one connection attempt. A fresh id is minted on every connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Open,
    Closed,
}

/// Outcome of a send. Dropped commands are never queued or replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    Dropped,
}

/// Inbound traffic from the link, tagged with the connection it came from.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    Message { connection: ConnectionId, text: String },
    Closed { connection: ConnectionId, reason: String },
}

impl LinkEvent {
    pub fn connection(&self) -> ConnectionId {
        match self {
            LinkEvent::Message { connection, .. } | LinkEvent::Closed { connection, .. } => {
                *connection
            }
        }
    }
}

/// Outbound half of a link to the backend. Text frames only.
pub trait Transport: Send {
    fn send_text(&mut self, text: String) -> Result<(), TransportError>;
    fn close(&mut self);
}

/// WebSocket client transport.
///
/// A writer task drains an unbounded channel into the socket; a reader task forwards
/// text frames as `LinkEvent`s and reports a `Closed` event when the stream ends.
pub struct WsTransport {
    outbound: Option<UnboundedSender<Message>>,
    reader: JoinHandle<()>,
}

impl WsTransport {
    pub async fn open(
        url: &str,
        connection: ConnectionId,
        events: UnboundedSender<LinkEvent>,
    ) -> Result<Self, TransportError> {
        let (socket, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|source| TransportError::Connect {
                url: url.to_string(),
                source,
            })?;
        let (mut sink, mut stream) = socket.split();

        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

        tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(e) = sink.send(message).await {
                    debug!("Writer for {} stopped: {}", connection, e);
                    return;
                }
                if closing {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader = tokio::spawn(async move {
            let mut reason = "stream ended".to_string();
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if events.send(LinkEvent::Message { connection, text }).is_err() {
                            return;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        reason = frame
                            .map(|f| format!("closed by peer: {}", f.reason))
                            .unwrap_or_else(|| "closed by peer".to_string());
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        reason = e.to_string();
                        break;
                    }
                }
            }
            let _ = events.send(LinkEvent::Closed { connection, reason });
        });

        Ok(Self {
            outbound: Some(outbound),
            reader,
        })
    }
}

impl Transport for WsTransport {
    fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        let outbound = self.outbound.as_ref().ok_or(TransportError::Closed)?;
        outbound
            .send(Message::Text(text))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        if let Some(outbound) = self.outbound.take() {
            let _ = outbound.send(Message::Close(None));
        }
        self.reader.abort();
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// Owns the single link to the motion backend.
///
/// `Connecting -> Open -> Closed`, with `Closed` reachable from anywhere. Opening a new
/// connection closes the previous one, and events still in flight from it are ignored
/// by `accept`. Nothing reconnects automatically.
pub struct ConnectionManager {
    state: ConnectionState,
    current: Option<ConnectionId>,
    transport: Option<Box<dyn Transport>>,
    events: UnboundedSender<LinkEvent>,
    connect_timeout: Duration,
}

impl ConnectionManager {
    /// Create a closed manager and the ordered channel its inbound events arrive on.
    pub fn new() -> (Self, UnboundedReceiver<LinkEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let manager = Self {
            state: ConnectionState::Closed,
            current: None,
            transport: None,
            events,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        };
        (manager, events_rx)
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn current(&self) -> Option<ConnectionId> {
        self.current
    }

    /// Open a WebSocket connection to `url`, closing any existing one first.
    pub async fn connect(&mut self, url: &str) -> Result<ConnectionId, TransportError> {
        self.close();

        let id = ConnectionId::new();
        self.current = Some(id);
        self.state = ConnectionState::Connecting;
        info!("Connecting to {} ({})", url, id);

        let opened = tokio::time::timeout(
            self.connect_timeout,
            WsTransport::open(url, id, self.events.clone()),
        )
        .await;

        match opened {
            Ok(Ok(transport)) => {
                self.transport = Some(Box::new(transport));
                self.state = ConnectionState::Open;
                info!("Connected to {}", url);
                Ok(id)
            }
            Ok(Err(e)) => {
                warn!("Connection failed: {}", e);
                self.current = None;
                self.state = ConnectionState::Closed;
                Err(e)
            }
            Err(_) => {
                warn!("Timed out connecting to {}", url);
                self.current = None;
                self.state = ConnectionState::Closed;
                Err(TransportError::Timeout(url.to_string()))
            }
        }
    }

    /// Adopt an already open transport as the current connection.
    pub fn attach(&mut self, transport: Box<dyn Transport>) -> ConnectionId {
        self.close();
        let id = ConnectionId::new();
        self.current = Some(id);
        self.transport = Some(transport);
        self.state = ConnectionState::Open;
        id
    }

    /// Encode and transmit `command`. Anything not `Open` drops it without writing.
    pub fn send(&mut self, command: &Command) -> Result<Delivery, EncodeError> {
        if self.state != ConnectionState::Open {
            warn!("Not connected, dropping command {:?}", command.target);
            return Ok(Delivery::Dropped);
        }
        let text = encode(command)?;
        Ok(self.send_text(text))
    }

    pub fn send_text(&mut self, text: String) -> Delivery {
        if self.state != ConnectionState::Open {
            warn!("Not connected, dropping message");
            return Delivery::Dropped;
        }
        let Some(transport) = self.transport.as_mut() else {
            warn!("Not connected, dropping message");
            return Delivery::Dropped;
        };

        debug!("Sending {}", text);
        match transport.send_text(text) {
            Ok(()) => Delivery::Sent,
            Err(e) => {
                warn!("Send failed, closing connection: {}", e);
                self.close();
                Delivery::Dropped
            }
        }
    }

    /// Tear down the current connection, if any.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close();
            info!("Connection closed");
        }
        self.current = None;
        self.state = ConnectionState::Closed;
    }

    /// Filter an inbound event. Returns the text of messages on the current connection.
    ///
    /// A `Closed` event for the current connection moves the manager to `Closed`.
    pub fn accept(&mut self, event: LinkEvent) -> Option<String> {
        if Some(event.connection()) != self.current {
            debug!("Ignoring event from superseded connection {}", event.connection());
            return None;
        }

        match event {
            LinkEvent::Message { text, .. } => Some(text),
            LinkEvent::Closed { reason, .. } => {
                warn!("Connection lost: {}", reason);
                if let Some(mut transport) = self.transport.take() {
                    transport.close();
                }
                self.current = None;
                self.state = ConnectionState::Closed;
                None
            }
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close();
    }
}
