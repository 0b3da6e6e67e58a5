//! Local bookkeeping of smashstats: which replays have been converted, what
//! each converted record contains, and which records still have to be sent
//! to the remote service.
//!
//! Everything hangs off a [`SyncContext`], which owns the index, both work
//! queues, the credential cache and the polled error slot.

mod context;
mod credentials;
mod error_slot;
mod index;
mod processing;
mod progress;
mod settings;
mod upload;

pub use context::{CONNECTION_ERROR, GAMES_DIRECTORY_ERROR, SelectedCode, SyncContext};
pub use credentials::CredentialCache;
pub use error_slot::ErrorSlot;
pub use index::{ContentIndex, UploadItem};
pub use processing::{ProcessingQueue, REPLAY_EXTENSION, ScanSummary};
pub use progress::{Progress, ProgressTracker, UI_ALLOWANCE};
pub use settings::Settings;
pub use upload::UploadQueue;

use smashstats_core::prelude::*;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Stored record '{file_name}' does not match its index hash")]
    HashMismatch { file_name: String },

    #[error("No index entry for '{0}'")]
    MissingEntry(String),

    #[error("Upload session is not authenticated")]
    NotAuthenticated,

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Can't get key for invalid player code '{0}'")]
    InvalidCode(String),

    #[error("Could not get upload key from server: {0}")]
    Credential(String),

    #[error("No player code selected")]
    NoSelectedCode,
}

impl QueueError {
    pub fn kind(&self) -> FailureKind {
        match self {
            QueueError::Storage(_) => FailureKind::Storage,
            QueueError::HashMismatch { .. } | QueueError::MissingEntry(_) => FailureKind::Identity,
            QueueError::NotAuthenticated | QueueError::Upload(_) => FailureKind::Protocol,
            QueueError::InvalidCode(_) | QueueError::NoSelectedCode => FailureKind::Validation,
            QueueError::Credential(_) => FailureKind::Connectivity,
        }
    }
}

pub mod prelude {
    pub use crate::{
        ContentIndex, CredentialCache, ErrorSlot, Progress, QueueError, ScanSummary,
        SelectedCode, Settings, SyncContext, UploadItem,
    };
}
