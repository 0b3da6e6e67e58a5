use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};

/// What the session sees of the underlying socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Text(String),
    Ping,
    /// Inbound traffic that carries no session message.
    Activity,
    Closed,
    Error(String),
}

/// A bidirectional text channel to the stats service.
pub trait Transport: Send {
    fn send(&mut self, text: String) -> impl Future<Output = Result<(), String>> + Send;

    /// Next inbound event. Returns `Closed` forever once the socket is gone.
    fn next_event(&mut self) -> impl Future<Output = TransportEvent> + Send;

    fn terminate(&mut self) -> impl Future<Output = ()> + Send;
}

pub struct WsTransport {
    ws: Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl WsTransport {
    pub async fn connect(url: &str) -> Result<Self, String> {
        debug!(%url, "Opening upload socket");
        let (ws, _) = connect_async(url).await.map_err(|e| e.to_string())?;
        Ok(Self { ws: Some(ws) })
    }
}

impl Transport for WsTransport {
    async fn send(&mut self, text: String) -> Result<(), String> {
        let Some(ws) = self.ws.as_mut() else {
            return Err("socket closed".into());
        };
        ws.send(Message::Text(text.into()))
            .await
            .map_err(|e| e.to_string())
    }

    async fn next_event(&mut self) -> TransportEvent {
        let Some(ws) = self.ws.as_mut() else {
            return TransportEvent::Closed;
        };
        match ws.next().await {
            Some(Ok(Message::Text(text))) => TransportEvent::Text(text.to_string()),
            Some(Ok(Message::Ping(_))) => {
                trace!("Ping");
                TransportEvent::Ping
            }
            Some(Ok(Message::Close(_))) | None => {
                self.ws = None;
                TransportEvent::Closed
            }
            Some(Ok(_)) => TransportEvent::Activity,
            Some(Err(e)) => {
                self.ws = None;
                TransportEvent::Error(e.to_string())
            }
        }
    }

    async fn terminate(&mut self) {
        if let Some(mut ws) = self.ws.take() {
            let _ = ws.close(None).await;
        }
    }
}
