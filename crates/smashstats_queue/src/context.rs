use crate::{
    ContentIndex, CredentialCache, ErrorSlot, ProcessingQueue, Progress, QueueError, ScanSummary,
    UploadQueue,
};
use serde::Serialize;
use smashstats_core::prelude::*;
use std::path::PathBuf;
use tracing::{info, instrument, warn};

pub const GAMES_DIRECTORY_ERROR: &str =
    "SmashStats folder could not be created. Do you have permission to write files locally?";

pub const CONNECTION_ERROR: &str =
    "Could not connect to server. Check you are connected to the internet.";

const CREDENTIAL_ERROR: &str =
    "Could not get upload key from server. Check you are connected to the internet.";

/// The code uploads are made for, with how many processed games include it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedCode {
    pub code: String,
    pub games: usize,
}

/// Everything one installation tracks between runs.
///
/// Load with [`open`](Self::open), drive the queues one item at a time, and
/// [`flush`](Self::flush) before dropping.
pub struct SyncContext<P: ReplayParser, S: RecordStorage> {
    index: ContentIndex<S>,
    processing: ProcessingQueue<P>,
    uploads: UploadQueue,
    credentials: CredentialCache,
    errors: ErrorSlot,
    selected_code: Option<String>,
}

impl<P: ReplayParser, S: RecordStorage> SyncContext<P, S> {
    #[instrument(skip_all)]
    pub async fn open(parser: P, storage: S, source: impl Into<PathBuf>) -> Self {
        let errors = ErrorSlot::new();
        if !storage.is_valid() {
            errors.set(GAMES_DIRECTORY_ERROR);
        }

        let credentials = CredentialCache::load(&storage).await;
        let mut index = ContentIndex::new(storage);
        index.load_metadata().await;
        info!(entries = index.metadata().len(), "Loaded metadata");

        Self {
            index,
            processing: ProcessingQueue::new(parser, source),
            uploads: UploadQueue::new(),
            credentials,
            errors,
            selected_code: None,
        }
    }

    pub fn errors(&self) -> &ErrorSlot {
        &self.errors
    }

    pub fn index(&self) -> &ContentIndex<S> {
        &self.index
    }

    pub fn credentials(&self) -> &CredentialCache {
        &self.credentials
    }

    pub fn processing(&self) -> &ProcessingQueue<P> {
        &self.processing
    }

    pub fn uploads(&self) -> &UploadQueue {
        &self.uploads
    }

    pub fn set_source(&mut self, source: impl Into<PathBuf>) {
        self.processing.set_source(source);
    }

    /// Sets the code to upload for; an empty code clears the selection.
    pub fn select_code(&mut self, code: impl Into<String>) {
        let code = code.into();
        self.selected_code = (!code.is_empty()).then_some(code);
    }

    fn report<T>(&self, result: Result<T, QueueError>) -> Result<T, QueueError> {
        if let Err(e) = &result
            && matches!(e.kind(), FailureKind::Storage | FailureKind::Connectivity)
        {
            self.errors.set(e.to_string());
        }
        result
    }

    /// Records the outcome of a connectivity check. A failure is placed in
    /// the error slot.
    pub fn connection_status<E: std::fmt::Display>(&self, result: Result<(), E>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                warn!("Server unreachable: {e}");
                self.errors.set(CONNECTION_ERROR);
                false
            }
        }
    }

    pub async fn scan(&mut self) -> Result<ScanSummary, QueueError> {
        let result = self.processing.scan(&mut self.index).await;
        self.report(result)
    }

    pub async fn process_next(&mut self, restart: bool) -> Result<Progress, QueueError> {
        let result = self.processing.process_next(&mut self.index, restart).await;
        self.report(result)
    }

    pub async fn codes_by_frequency(&mut self) -> Result<Vec<(String, usize)>, QueueError> {
        self.index.load_processed_identities().await?;
        Ok(self.index.codes_by_frequency())
    }

    pub async fn games_for_code(&mut self, code: &str) -> Result<usize, QueueError> {
        self.index.load_processed_identities().await?;
        Ok(self.index.games_for_code(code))
    }

    /// The explicitly selected code, or else the most frequent one.
    pub async fn selected_code(&mut self) -> Result<Option<SelectedCode>, QueueError> {
        self.index.load_processed_identities().await?;
        Ok(match &self.selected_code {
            Some(code) => Some(SelectedCode {
                code: code.clone(),
                games: self.index.games_for_code(code),
            }),
            None => self
                .index
                .codes_by_frequency()
                .into_iter()
                .next()
                .map(|(code, games)| SelectedCode { code, games }),
        })
    }

    /// Rebuilds the upload worklist for the selected code.
    pub async fn load_eligible(&mut self) -> Result<usize, QueueError> {
        let code = self
            .selected_code()
            .await?
            .map(|selected| selected.code)
            .ok_or(QueueError::NoSelectedCode)?;
        Ok(self.uploads.load_eligible(&self.index, &code))
    }

    /// Credential for the selected code, issuing one if none is cached.
    pub async fn credential<I: CredentialIssuer>(
        &mut self,
        issuer: &I,
    ) -> Result<UploadCredential, QueueError> {
        let code = self
            .selected_code
            .clone()
            .ok_or(QueueError::NoSelectedCode)?;
        let result = self
            .credentials
            .credential_for(&code, self.index.storage(), issuer)
            .await;
        if let Err(QueueError::Credential(_)) = &result {
            self.errors.set(CREDENTIAL_ERROR);
            return result;
        }
        self.report(result)
    }

    /// Loads the upload worklist and, when anything is eligible, the
    /// credential to open a session with.
    pub async fn prepare_upload<I: CredentialIssuer>(
        &mut self,
        issuer: &I,
    ) -> Result<Option<(UploadCredential, usize)>, QueueError> {
        let count = self.load_eligible().await?;
        if self.selected_code.is_none() {
            self.selected_code = Some(self.uploads.code().to_string());
        }
        let credential = self.credential(issuer).await?;
        if count == 0 {
            info!("No games to upload");
            return Ok(None);
        }
        Ok(Some((credential, count)))
    }

    pub async fn upload_next<U: UploadSink>(
        &mut self,
        sink: &mut U,
        restart: bool,
    ) -> Result<Progress, QueueError> {
        let result = self
            .uploads
            .upload_next(&mut self.index, sink, restart)
            .await;
        self.report(result)
    }

    pub async fn flush(&self) -> Result<(), QueueError> {
        let result = self.index.persist_metadata().await.map_err(QueueError::from);
        self.report(result)
    }
}
