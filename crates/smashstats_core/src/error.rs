use thiserror::Error;

/// Coarse failure classes used for reporting and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed or unreadable replay. Skipped, batch continues.
    Parse,
    /// Structural cross-check failed. Skipped, batch continues.
    Validation,
    /// Disk read/write failure for a single item.
    Storage,
    /// Stored record hash disagrees with the index.
    Identity,
    /// Malformed inbound message or out-of-order send.
    Protocol,
    /// Remote service unreachable.
    Connectivity,
}

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed replay: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("Replay could not be parsed: {0}")]
    Parse(#[from] ParseError),

    #[error("Game does not have a valid start time")]
    MissingStartTime,

    #[error("Game start time '{0}' is not a valid timestamp")]
    InvalidStartTime(String),

    #[error("Game does not have 2 valid players (found {0})")]
    InvalidPlayerCount(usize),

    #[error("Game stat parsing failed - invalid players")]
    PlayerMismatch,

    #[error("Game stat parsing failed - computed stats dont match expected order ({0})")]
    SummarySchemaMismatch(String),

    #[error("Game stat parsing failed - no {section} stats for player {player_index}")]
    MissingPlayerStats {
        section: &'static str,
        player_index: u8,
    },

    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NormalizeError {
    pub fn kind(&self) -> FailureKind {
        match self {
            NormalizeError::Parse(_) => FailureKind::Parse,
            _ => FailureKind::Validation,
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Storage directory is not valid: {0}")]
    InvalidDirectory(String),

    #[error("Storage backend error: {0}")]
    Generic(String),
}
