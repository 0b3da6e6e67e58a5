use futures_util::{SinkExt, StreamExt};
use smashstats_core::prelude::*;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// How the stand-in upload server answers.
#[derive(Clone, Debug)]
pub struct MockBehavior {
    /// Answer to `AUTHENTICATE`.
    pub validate: bool,
    /// `success` flag of every ack.
    pub ack_success: bool,
    /// Echo the uploaded hash in acks; otherwise reply with a different one.
    pub echo_hash: bool,
    /// Send websocket pings at this interval.
    pub ping_interval: Option<Duration>,
    /// Drop the connection instead of acknowledging an upload.
    pub close_on_upload: bool,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            validate: true,
            ack_success: true,
            echo_hash: true,
            ping_interval: None,
            close_on_upload: false,
        }
    }
}

/// Upload server that accepts every credential and acks every game.
pub struct AcceptAllServer {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<ClientMessage>>>,
}

impl AcceptAllServer {
    /// Binds to a free local port and starts accepting connections.
    pub async fn start(behavior: MockBehavior) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let received = Arc::new(Mutex::new(Vec::new()));
        info!(%addr, "Mock upload server listening");

        let log = received.clone();
        tokio::spawn(async move {
            while let Ok((stream, peer)) = listener.accept().await {
                debug!(%peer, "Mock upload connection");
                tokio::spawn(handle_connection(stream, behavior.clone(), log.clone()));
            }
        });

        Ok(Self { addr, received })
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Every client message received so far, across connections.
    pub fn received(&self) -> Vec<ClientMessage> {
        self.received
            .lock()
            .map(|received| received.clone())
            .unwrap_or_default()
    }

    pub fn uploads(&self) -> Vec<UploadGame> {
        self.received()
            .into_iter()
            .filter_map(|message| match message {
                ClientMessage::UploadGame(game) => Some(game),
                _ => None,
            })
            .collect()
    }
}

fn reply(message: &ClientMessage, behavior: &MockBehavior) -> Option<ServerMessage> {
    match message {
        ClientMessage::Authenticate(_) => Some(ServerMessage::Authenticate(AuthenticateResponse {
            validated: behavior.validate,
        })),
        ClientMessage::UploadGame(_) if behavior.close_on_upload => None,
        ClientMessage::UploadGame(game) => Some(ServerMessage::UploadGame(UploadAck {
            hash: if behavior.echo_hash {
                game.hash.clone()
            } else {
                format!("{}-other", game.hash)
            },
            file_name: game.file_name.clone(),
            success: behavior.ack_success,
        })),
    }
}

async fn handle_connection(
    stream: TcpStream,
    behavior: MockBehavior,
    received: Arc<Mutex<Vec<ClientMessage>>>,
) {
    let mut ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("Mock handshake failed: {e}");
            return;
        }
    };
    let mut ping = behavior.ping_interval.map(tokio::time::interval);

    loop {
        let inbound = tokio::select! {
            message = ws.next() => message,
            _ = async {
                match ping.as_mut() {
                    Some(interval) => { interval.tick().await; }
                    None => std::future::pending::<()>().await,
                }
            } => {
                if ws.send(Message::Ping(Vec::new().into())).await.is_err() {
                    return;
                }
                continue;
            }
        };

        let text = match inbound {
            Some(Ok(Message::Text(text))) => text.to_string(),
            Some(Ok(Message::Close(_))) | None | Some(Err(_)) => return,
            Some(Ok(_)) => continue,
        };
        let message = match serde_json::from_str::<ClientMessage>(&text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Mock server got malformed message: {e}");
                continue;
            }
        };
        if let Ok(mut log) = received.lock() {
            log.push(message.clone());
        }

        match reply(&message, &behavior) {
            Some(response) => {
                let Ok(text) = response.to_text() else {
                    return;
                };
                if ws.send(Message::Text(text.into())).await.is_err() {
                    return;
                }
                if let ServerMessage::Authenticate(AuthenticateResponse { validated: false }) =
                    response
                {
                    let _ = ws.close(None).await;
                    return;
                }
            }
            None => {
                let _ = ws.close(None).await;
                return;
            }
        }
    }
}
