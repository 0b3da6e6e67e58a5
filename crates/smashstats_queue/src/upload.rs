use crate::{ContentIndex, Progress, ProgressTracker, QueueError, UploadItem};
use smashstats_core::prelude::*;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

/// Sends eligible records for the selected code, one at a time.
#[derive(Debug, Default)]
pub struct UploadQueue {
    code: String,
    pending: Vec<UploadItem>,
    progress: ProgressTracker,
}

impl UploadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Rebuilds the worklist from the index.
    pub fn load_eligible<S: RecordStorage>(&mut self, index: &ContentIndex<S>, code: &str) -> usize {
        self.code = code.to_string();
        self.pending = index.eligible_for_upload(code);
        info!(%code, count = self.pending.len(), "Loaded games to upload");
        self.pending.len()
    }

    /// Uploads the next pending record and applies its ack.
    ///
    /// The item is consumed whatever the outcome; failures are returned for
    /// logging and never retried here.
    #[instrument(skip_all, fields(code = %self.code))]
    pub async fn upload_next<S: RecordStorage, U: UploadSink>(
        &mut self,
        index: &mut ContentIndex<S>,
        sink: &mut U,
        restart: bool,
    ) -> Result<Progress, QueueError> {
        if restart {
            self.progress.reset();
        }
        let started = Instant::now();
        let Some(item) = self.pending.pop() else {
            return Ok(Progress::finished());
        };

        let data = index.storage().read_record(&item.file_name).await?;
        let record: StatsRecord = serde_json::from_slice(&data).map_err(StorageError::from)?;
        if record.hash.as_deref() != Some(item.hash.as_str()) {
            error!(file_name = %item.file_name, "Stored game and metadata hash mismatch");
            return Err(QueueError::HashMismatch {
                file_name: item.file_name,
            });
        }
        if !sink.is_authenticated() {
            error!(file_name = %item.file_name, "No authenticated upload session");
            return Err(QueueError::NotAuthenticated);
        }

        let ack = sink
            .upload(UploadGame {
                game_obj: record,
                hash: item.hash,
                file_name: item.file_name,
            })
            .await
            .map_err(|e| QueueError::Upload(e.to_string()))?;

        let applied = index.apply_ack(&self.code, &ack);
        index.persist_metadata().await?;
        applied?;
        debug!(file_name = %ack.file_name, success = ack.success, "Upload acknowledged");

        Ok(self.progress.record_uploaded(started.elapsed()))
    }
}
