use smashstats_core::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Serves pre-built replays by file name, ignoring the directory part of
/// the path. Unknown names fail like a missing file.
#[derive(Clone, Default)]
pub struct InMemoryParser {
    replays: Arc<Mutex<HashMap<String, Result<ParsedReplay, String>>>>,
}

impl InMemoryParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, file_name: impl Into<String>, replay: ParsedReplay) {
        if let Ok(mut replays) = self.replays.lock() {
            replays.insert(file_name.into(), Ok(replay));
        }
    }

    /// Registers a file that fails to decode.
    pub fn insert_corrupt(&self, file_name: impl Into<String>) {
        if let Ok(mut replays) = self.replays.lock() {
            replays.insert(file_name.into(), Err("unexpected end of replay".into()));
        }
    }

    pub fn with(self, file_name: impl Into<String>, replay: ParsedReplay) -> Self {
        self.insert(file_name, replay);
        self
    }
}

impl ReplayParser for InMemoryParser {
    async fn parse(&self, path: &Path) -> Result<ParsedReplay, ParseError> {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let entry = self
            .replays
            .lock()
            .map_err(|_| ParseError::Malformed("parser lock poisoned".into()))?
            .get(&file_name)
            .cloned();
        match entry {
            Some(Ok(replay)) => Ok(replay),
            Some(Err(reason)) => Err(ParseError::Malformed(reason)),
            None => Err(ParseError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no replay registered for {file_name}"),
            ))),
        }
    }
}
