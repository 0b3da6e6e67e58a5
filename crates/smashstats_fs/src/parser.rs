use smashstats_core::prelude::*;
use std::path::Path;
use tokio::fs;

/// Reads replays that an upstream decoder has already dumped to JSON.
///
/// The dump holds the full [`ParsedReplay`] accessor surface, so the
/// binary format itself never has to be understood here.
#[derive(Clone, Debug, Default)]
pub struct ReplayDumpParser;

impl ReplayParser for ReplayDumpParser {
    async fn parse(&self, path: &Path) -> Result<ParsedReplay, ParseError> {
        let data = fs::read(path).await?;
        serde_json::from_slice(&data)
            .map_err(|e| ParseError::Malformed(format!("{}: {e}", path.display())))
    }
}
