use crate::{
    Heartbeat, Session, SessionConfig, SessionError, SessionEvent, SessionState, Transport,
    TransportEvent, WsTransport,
};
use smashstats_core::prelude::*;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tracing::{debug, info, instrument, warn};

/// A live upload connection: the session state machine driven over a
/// transport, watched by the heartbeat.
///
/// Once the heartbeat lapses the session reports itself disconnected, and
/// the transport is terminated by the next read or upload.
pub struct UploadSession<T = WsTransport> {
    transport: T,
    session: Session,
    heartbeat: Heartbeat,
}

impl UploadSession<WsTransport> {
    /// Opens the websocket and completes the credential handshake.
    #[instrument(skip(credential, config), fields(id = %credential.id))]
    pub async fn connect(
        url: &str,
        credential: UploadCredential,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let transport = WsTransport::connect(url)
            .await
            .map_err(SessionError::Transport)?;
        Self::start(transport, credential, config).await
    }
}

impl<T: Transport> UploadSession<T> {
    /// Wraps an already opened transport. Nothing is sent until
    /// [`authenticate`](Self::authenticate).
    pub fn new(
        transport: T,
        credential: UploadCredential,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let mut session = Session::new(credential);
        session.open()?;
        Ok(Self {
            transport,
            session,
            heartbeat: Heartbeat::new(config.heartbeat_timeout()),
        })
    }

    pub async fn start(
        transport: T,
        credential: UploadCredential,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let mut upload = Self::new(transport, credential, config)?;
        upload.authenticate().await?;
        Ok(upload)
    }

    pub fn state(&self) -> &SessionState {
        self.session.state()
    }

    pub fn is_connected(&self) -> bool {
        self.heartbeat.is_connected()
    }

    /// Flag that drops once the heartbeat lapses or the transport closes.
    pub fn connected_flag(&self) -> Arc<AtomicBool> {
        self.heartbeat.flag()
    }

    pub async fn authenticate(&mut self) -> Result<(), SessionError> {
        let message = self.session.transport_opened()?;
        self.heartbeat.watch();
        self.send(&message).await?;
        loop {
            match self.next_message().await? {
                SessionEvent::Authenticated => {
                    info!("Upload session authenticated");
                    return Ok(());
                }
                SessionEvent::Rejected => {
                    self.transport.terminate().await;
                    self.heartbeat.expire();
                    return Err(SessionError::AuthenticationRejected);
                }
                _ => continue,
            }
        }
    }

    /// Sends one record and waits for its ack.
    #[instrument(skip(self, game), fields(file_name = %game.file_name))]
    pub async fn send_game(&mut self, game: UploadGame) -> Result<UploadAck, SessionError> {
        if self.session.is_authenticated() && self.heartbeat.is_expired() {
            return Err(self.timed_out().await);
        }
        self.session.begin_upload(&game)?;
        self.send(&ClientMessage::UploadGame(game)).await?;
        loop {
            if let SessionEvent::Acknowledged(ack) = self.next_message().await? {
                debug!(success = ack.success, "Upload acknowledged");
                return Ok(ack);
            }
        }
    }

    pub async fn close(&mut self) {
        if let Some(in_flight) = self.session.close() {
            warn!(file_name = %in_flight.file_name, "Closing with an upload in flight");
        }
        self.transport.terminate().await;
        self.heartbeat.expire();
    }

    async fn send(&mut self, message: &ClientMessage) -> Result<(), SessionError> {
        let text = message
            .to_text()
            .map_err(|e| SessionError::Malformed(e.to_string()))?;
        if let Err(e) = self.transport.send(text).await {
            self.lost();
            return Err(SessionError::Transport(e));
        }
        Ok(())
    }

    async fn timed_out(&mut self) -> SessionError {
        warn!("Heartbeat timed out, terminating connection");
        self.transport.terminate().await;
        self.lost();
        SessionError::HeartbeatTimeout(self.heartbeat.timeout())
    }

    fn lost(&mut self) {
        self.heartbeat.expire();
        if let Some(in_flight) = self.session.transport_closed() {
            warn!(file_name = %in_flight.file_name, "Upload failed, connection lost");
        }
    }

    /// Waits for the next session-level event. Heartbeats and stray or
    /// malformed messages are consumed here.
    pub async fn next_message(&mut self) -> Result<SessionEvent, SessionError> {
        let lapsed = self.heartbeat.lapsed();
        loop {
            if self.heartbeat.is_expired() {
                return Err(self.timed_out().await);
            }
            let event = tokio::select! {
                event = self.transport.next_event() => event,
                _ = lapsed.notified() => return Err(self.timed_out().await),
            };

            match event {
                TransportEvent::Ping | TransportEvent::Activity => self.heartbeat.beat(),
                TransportEvent::Text(text) => {
                    self.heartbeat.beat();
                    let message = match ServerMessage::from_text(&text) {
                        Ok(message) => message,
                        Err(e) => {
                            warn!("Dropping malformed message: {e}");
                            continue;
                        }
                    };
                    match self.session.receive(message) {
                        Ok(SessionEvent::Heartbeat) => {}
                        Ok(event) => return Ok(event),
                        Err(e) => warn!("Dropping message: {e}"),
                    }
                }
                TransportEvent::Closed => {
                    info!("Upload connection closed");
                    self.lost();
                    return Err(SessionError::Closed);
                }
                TransportEvent::Error(e) => {
                    warn!("Upload connection error: {e}");
                    self.lost();
                    return Err(SessionError::Transport(e));
                }
            }
        }
    }
}

impl<T: Transport> UploadSink for UploadSession<T> {
    type Error = SessionError;

    fn is_authenticated(&self) -> bool {
        self.session.is_authenticated() && self.heartbeat.is_connected()
    }

    async fn upload(&mut self, game: UploadGame) -> Result<UploadAck, SessionError> {
        self.send_game(game).await
    }
}
