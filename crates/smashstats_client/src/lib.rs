//! Network side of smashstats: the HTTP API client and the persistent
//! upload session.

mod config;
mod heartbeat;
mod http;
mod session;
mod transport;
mod upload;

pub use config::*;
pub use heartbeat::Heartbeat;
pub use http::SmashStatsClient;
pub use session::*;
pub use transport::*;
pub use upload::UploadSession;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server returned error {0}: {1}")]
    ServerError(StatusCode, String),

    #[error("Validation error: {0}")]
    Validation(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session is not authenticated")]
    NotAuthenticated,

    #[error("Cannot {action} while {state:?}")]
    InvalidTransition {
        action: &'static str,
        state: SessionState,
    },

    #[error("Unable to verify upload key with server")]
    AuthenticationRejected,

    #[error("Unexpected ack for '{0}'")]
    UnexpectedAck(String),

    #[error("Unexpected {0} message")]
    UnexpectedMessage(&'static str),

    #[error("Malformed message: {0}")]
    Malformed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("No heartbeat from server within {0:?}")]
    HeartbeatTimeout(std::time::Duration),

    #[error("Connection closed")]
    Closed,
}
