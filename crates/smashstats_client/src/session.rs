//! Transport-agnostic state machine of the upload session.
//!
//! ```text
//! Disconnected -> Connecting -> Authenticating -> Ready <-> Sent
//!                                      |
//!                                      +-> Closed (credential rejected)
//! ```
//!
//! Any transport close drops back to `Disconnected`; an in-flight upload is
//! handed back to the caller as failed and is never retried here.

use crate::SessionError;
use smashstats_core::prelude::*;
use tracing::{debug, trace, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Authenticating,
    Ready,
    Sent(InFlight),
    Closed,
}

/// The upload awaiting its ack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlight {
    pub file_name: String,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Authenticated,
    Rejected,
    Acknowledged(UploadAck),
    Heartbeat,
}

#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    credential: UploadCredential,
}

impl Session {
    pub fn new(credential: UploadCredential) -> Self {
        Self {
            state: SessionState::Disconnected,
            credential,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Ready | SessionState::Sent(_))
    }

    fn invalid(&self, action: &'static str) -> SessionError {
        SessionError::InvalidTransition {
            action,
            state: self.state.clone(),
        }
    }

    /// Explicit open request.
    pub fn open(&mut self) -> Result<(), SessionError> {
        match self.state {
            SessionState::Disconnected => {
                self.state = SessionState::Connecting;
                Ok(())
            }
            _ => Err(self.invalid("open")),
        }
    }

    /// The transport is up; returns the authentication message to send.
    pub fn transport_opened(&mut self) -> Result<ClientMessage, SessionError> {
        match self.state {
            SessionState::Connecting => {
                self.state = SessionState::Authenticating;
                Ok(ClientMessage::Authenticate(self.credential.clone()))
            }
            _ => Err(self.invalid("authenticate")),
        }
    }

    /// Claims the session for one upload. Must succeed before anything is
    /// written to the transport.
    pub fn begin_upload(&mut self, game: &UploadGame) -> Result<(), SessionError> {
        match self.state {
            SessionState::Ready => {
                self.state = SessionState::Sent(InFlight {
                    file_name: game.file_name.clone(),
                    hash: game.hash.clone(),
                });
                Ok(())
            }
            SessionState::Sent(_) => Err(self.invalid("upload")),
            _ => Err(SessionError::NotAuthenticated),
        }
    }

    pub fn receive(&mut self, message: ServerMessage) -> Result<SessionEvent, SessionError> {
        match (&self.state, message) {
            (_, ServerMessage::Heartbeat) => {
                trace!("Heartbeat");
                Ok(SessionEvent::Heartbeat)
            }
            (SessionState::Authenticating, ServerMessage::Authenticate(response)) => {
                if response.validated {
                    debug!("Upload key validated");
                    self.state = SessionState::Ready;
                    Ok(SessionEvent::Authenticated)
                } else {
                    warn!("Upload key rejected by server");
                    self.state = SessionState::Closed;
                    Ok(SessionEvent::Rejected)
                }
            }
            (SessionState::Sent(in_flight), ServerMessage::UploadGame(ack)) => {
                if ack.file_name != in_flight.file_name {
                    return Err(SessionError::UnexpectedAck(ack.file_name));
                }
                if ack.hash != in_flight.hash {
                    warn!(file_name = %ack.file_name, "Ack hash differs from the uploaded hash");
                }
                self.state = SessionState::Ready;
                Ok(SessionEvent::Acknowledged(ack))
            }
            (_, ServerMessage::Authenticate(_)) => {
                Err(SessionError::UnexpectedMessage("AUTHENTICATE"))
            }
            (_, ServerMessage::UploadGame(ack)) => Err(SessionError::UnexpectedAck(ack.file_name)),
        }
    }

    /// The transport closed or failed. Returns the upload that was in flight.
    pub fn transport_closed(&mut self) -> Option<InFlight> {
        let previous = std::mem::replace(&mut self.state, SessionState::Disconnected);
        match previous {
            SessionState::Closed => {
                self.state = SessionState::Closed;
                None
            }
            SessionState::Sent(in_flight) => Some(in_flight),
            _ => None,
        }
    }

    /// Ends the session for good.
    pub fn close(&mut self) -> Option<InFlight> {
        let in_flight = self.transport_closed();
        self.state = SessionState::Closed;
        in_flight
    }
}
