use crate::{ContentIndex, Progress, ProgressTracker, QueueError};
use bytes::Bytes;
use serde::Serialize;
use smashstats_core::prelude::*;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

pub const REPLAY_EXTENSION: &str = "slp";

/// Written in place of a record when conversion fails, so the replay is
/// not picked up again.
const EMPTY_RECORD: &[u8] = b"{}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    /// Replays in the source directory.
    pub slp_count: usize,
    /// Replays not yet converted.
    pub new_slp_count: usize,
}

fn replay_stem(file_name: &str) -> Option<&str> {
    let path = Path::new(file_name);
    let is_replay = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(REPLAY_EXTENSION));
    if !is_replay {
        return None;
    }
    path.file_stem().and_then(|stem| stem.to_str())
}

/// Converts new replays one at a time.
pub struct ProcessingQueue<P: ReplayParser> {
    normalizer: StatsNormalizer<P>,
    source: PathBuf,
    pending: Vec<String>,
    progress: ProgressTracker,
}

impl<P: ReplayParser> ProcessingQueue<P> {
    pub fn new(parser: P, source: impl Into<PathBuf>) -> Self {
        Self {
            normalizer: StatsNormalizer::new(parser),
            source: source.into(),
            pending: Vec::new(),
            progress: ProgressTracker::default(),
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn set_source(&mut self, source: impl Into<PathBuf>) {
        self.source = source.into();
        self.pending.clear();
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Rebuilds the worklist from the source directory listing.
    #[instrument(skip(self, index), fields(source = %self.source.display()))]
    pub async fn scan<S: RecordStorage>(
        &mut self,
        index: &mut ContentIndex<S>,
    ) -> Result<ScanSummary, QueueError> {
        index.load_processed_identities().await?;
        self.pending.clear();

        let mut names = Vec::new();
        let mut entries = fs::read_dir(&self.source).await.map_err(StorageError::Io)?;
        while let Some(entry) = entries.next_entry().await.map_err(StorageError::Io)? {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        names.sort();

        let mut slp_count = 0;
        for name in names {
            let Some(stem) = replay_stem(&name) else {
                continue;
            };
            slp_count += 1;
            if !index.is_processed(stem) {
                self.pending.push(name);
            }
        }

        let summary = ScanSummary {
            slp_count,
            new_slp_count: self.pending.len(),
        };
        info!(
            slp_count = summary.slp_count,
            new_slp_count = summary.new_slp_count,
            "Scanned replay directory"
        );
        Ok(summary)
    }

    /// Converts and stores the next pending replay. `restart` resets the
    /// progress counters.
    ///
    /// A replay that fails to convert is stored as an empty record with an
    /// index entry that has no players and no hash. A storage failure leaves
    /// the index untouched so the replay is picked up by the next scan.
    pub async fn process_next<S: RecordStorage>(
        &mut self,
        index: &mut ContentIndex<S>,
        restart: bool,
    ) -> Result<Progress, QueueError> {
        if restart {
            self.progress.reset();
        }
        let started = Instant::now();
        let Some(file_name) = self.pending.pop() else {
            return Ok(Progress::finished());
        };
        let stem = replay_stem(&file_name).unwrap_or(&file_name).to_string();
        let path = self.source.join(&file_name);

        let (data, codes, hash) = match self.normalizer.convert(&path).await {
            Ok(converted) => {
                let data = serde_json::to_vec(&converted.record).map_err(StorageError::from)?;
                (Bytes::from(data), converted.codes, converted.record.hash)
            }
            Err(e) => {
                warn!(%file_name, kind = ?e.kind(), "Storing empty record: {e}");
                (Bytes::from_static(EMPTY_RECORD), Vec::new(), None)
            }
        };

        index.storage().write_record(&stem, data).await?;
        index.record_processed(&stem, codes, hash);
        index.persist_metadata().await?;
        debug!(%file_name, "Processed replay");

        Ok(self.progress.record_processed(started.elapsed()))
    }
}
