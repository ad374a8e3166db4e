use crane_lib::{decode_command, encode_response, Response, Status};
use eyre::Result;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;
use tracing::{debug, info, warn};

use crate::motion::MotionController;

/// Updates a slow client may fall behind by before it starts skipping them.
const UPDATE_BUFFER: usize = 64;

type ClientSink = SplitSink<WebSocketStream<TcpStream>, Message>;

/// The one simulated crane, shared by every connected client.
///
/// A single motion task steps the controller and broadcasts each update, so all clients see
/// the same pose and a target from any client supersedes the one in progress.
pub struct Backend {
    controller: Mutex<MotionController>,
    updates: broadcast::Sender<Response>,
    tick: Duration,
}

impl Backend {
    pub fn new(controller: MotionController, tick: Duration) -> Arc<Self> {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER);
        Arc::new(Self {
            controller: Mutex::new(controller),
            updates,
            tick,
        })
    }

    /// Step the crane every tick while it has a target. Runs until the task is dropped.
    pub async fn run_motion(self: Arc<Self>) {
        let dt = self.tick.as_secs_f64();
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let update = {
                let mut controller = self.controller.lock().await;
                if !controller.is_moving() {
                    continue;
                }
                let status = controller.step(dt);
                if status == Status::Stopped {
                    info!("Target reached: {:?}", controller.state());
                }
                controller.snapshot(status)
            };

            // No receivers just means nobody is connected
            let _ = self.updates.send(update);
        }
    }

    /// Serve one WebSocket client until it disconnects.
    pub async fn serve_client(self: Arc<Self>, stream: TcpStream) -> Result<()> {
        let peer = stream.peer_addr()?;
        let socket = tokio_tungstenite::accept_async(stream).await?;
        let (mut sink, mut inbound) = socket.split();
        info!("Client {} connected", peer);

        // Subscribe before the snapshot so no update falls between the two
        let mut updates = self.updates.subscribe();
        let initial = {
            let controller = self.controller.lock().await;
            controller.snapshot(controller.status())
        };
        send(&mut sink, &initial).await?;

        loop {
            tokio::select! {
                frame = inbound.next() => {
                    let text = match frame {
                        Some(Ok(Message::Text(text))) => text,
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => continue,
                        Some(Err(e)) => {
                            warn!("Client {} read error: {}", peer, e);
                            break;
                        }
                    };

                    if let Some(reply) = self.handle_command(&text).await {
                        send(&mut sink, &reply).await?;
                    }
                }

                update = updates.recv() => match update {
                    Ok(response) => send(&mut sink, &response).await?,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Client {} skipped {} updates", peer, skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        info!("Client {} disconnected", peer);
        Ok(())
    }

    /// Apply a command from a client. Returns the error reply for that client, if any.
    async fn handle_command(&self, text: &str) -> Option<Response> {
        let command = match decode_command(text) {
            Ok(command) => command,
            Err(e) => {
                warn!("Bad command: {}", e);
                return Some(Response::error(format!("invalid command: {}", e)));
            }
        };

        let mut controller = self.controller.lock().await;
        match controller.set_target(&command) {
            Ok(()) => {
                debug!("New target {:?}", controller.target());
                None
            }
            Err(reason) => Some(Response::error(reason.to_string())),
        }
    }
}

async fn send(sink: &mut ClientSink, response: &Response) -> Result<()> {
    let text = encode_response(response)?;
    sink.send(Message::Text(text)).await?;
    Ok(())
}
