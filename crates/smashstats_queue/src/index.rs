use crate::QueueError;
use bytes::Bytes;
use smashstats_core::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument, warn};

/// One record waiting to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadItem {
    /// Replay file stem; also the stored record's name.
    pub file_name: String,
    pub hash: String,
}

/// What has been converted, and what each conversion produced.
///
/// The processed set is rebuilt from the storage listing on every
/// [`load_processed_identities`](Self::load_processed_identities); the
/// metadata map mirrors `metadata.json`.
#[derive(Debug, Clone)]
pub struct ContentIndex<S: RecordStorage> {
    storage: S,
    processed: BTreeSet<String>,
    metadata: MetadataMap,
}

impl<S: RecordStorage> ContentIndex<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            processed: BTreeSet::new(),
            metadata: MetadataMap::new(),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Full rescan of stored records. An invalid storage directory yields
    /// an empty set.
    #[instrument(skip(self))]
    pub async fn load_processed_identities(&mut self) -> Result<usize, StorageError> {
        self.processed.clear();
        if !self.storage.is_valid() {
            warn!("Games directory is not valid, nothing is processed");
            return Ok(0);
        }
        self.processed.extend(self.storage.list_records().await?);
        debug!(count = self.processed.len(), "Rescanned processed games");
        Ok(self.processed.len())
    }

    pub fn is_processed(&self, stem: &str) -> bool {
        self.processed.contains(stem)
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Loads `metadata.json`. Missing or malformed content leaves an empty map.
    pub async fn load_metadata(&mut self) {
        self.metadata = match self.storage.read_sidecar(METADATA_FILE).await {
            Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|e| {
                warn!("metadata.json is malformed, starting empty: {e}");
                MetadataMap::new()
            }),
            Err(StorageError::NotFound(_)) => {
                info!("metadata.json not found");
                MetadataMap::new()
            }
            Err(e) => {
                warn!("metadata.json could not be read: {e}");
                MetadataMap::new()
            }
        };
    }

    pub async fn persist_metadata(&self) -> Result<(), StorageError> {
        let data = serde_json::to_vec(&self.metadata)?;
        self.storage
            .write_sidecar(METADATA_FILE, Bytes::from(data))
            .await
    }

    pub fn metadata(&self) -> &MetadataMap {
        &self.metadata
    }

    pub fn entry(&self, stem: &str) -> Option<&ProcessedEntry> {
        self.metadata.get(&ReplayIdentity::from_stem(stem).key())
    }

    /// Adds or replaces the entry for `stem`, with every code marked not
    /// uploaded.
    pub fn record_processed(
        &mut self,
        stem: &str,
        codes: Vec<Option<String>>,
        hash: Option<String>,
    ) -> ReplayIdentity {
        let identity = ReplayIdentity::from_stem(stem);
        self.metadata
            .insert(identity.key(), ProcessedEntry::new(codes, hash));
        self.processed.insert(stem.to_string());
        identity
    }

    /// Applies a server ack for `code`. The status only changes when the
    /// acked hash matches the indexed one.
    pub fn apply_ack(&mut self, code: &str, ack: &UploadAck) -> Result<(), QueueError> {
        let entry = self
            .metadata
            .get_mut(&ReplayIdentity::from_stem(&ack.file_name).key())
            .ok_or_else(|| QueueError::MissingEntry(ack.file_name.clone()))?;
        if entry.hash.as_deref() != Some(ack.hash.as_str()) {
            warn!(file_name = %ack.file_name, "Metadata game hash mismatch with uploaded game");
            return Err(QueueError::HashMismatch {
                file_name: ack.file_name.clone(),
            });
        }
        entry.set_upload_status(code, ack.success);
        Ok(())
    }

    /// How many processed games each resolvable code appears in.
    pub fn code_frequencies(&self) -> BTreeMap<String, usize> {
        let mut frequencies = BTreeMap::new();
        for entry in self.processed.iter().filter_map(|stem| self.entry(stem)) {
            for code in entry.codes() {
                *frequencies.entry(code.to_string()).or_default() += 1;
            }
        }
        frequencies
    }

    /// Codes by descending frequency, ties by code.
    pub fn codes_by_frequency(&self) -> Vec<(String, usize)> {
        let mut codes: Vec<_> = self.code_frequencies().into_iter().collect();
        codes.sort_by(|(a_code, a), (b_code, b)| b.cmp(a).then_with(|| a_code.cmp(b_code)));
        codes
    }

    pub fn games_for_code(&self, code: &str) -> usize {
        self.code_frequencies().get(code).copied().unwrap_or(0)
    }

    /// Processed records not yet uploaded for `code`.
    pub fn eligible_for_upload(&self, code: &str) -> Vec<UploadItem> {
        self.processed
            .iter()
            .filter_map(|stem| {
                let entry = self.entry(stem)?;
                if !entry.is_eligible_for(code) {
                    return None;
                }
                Some(UploadItem {
                    file_name: stem.clone(),
                    hash: entry.valid_hash()?.to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records and sidecars kept in memory.
    #[derive(Clone, Default)]
    struct MemoryStorage {
        records: Arc<Mutex<BTreeMap<String, Bytes>>>,
        sidecars: Arc<Mutex<BTreeMap<String, Bytes>>>,
    }

    impl RecordStorage for MemoryStorage {
        fn is_valid(&self) -> bool {
            true
        }

        async fn write_record(&self, stem: &str, data: Bytes) -> Result<(), StorageError> {
            self.records.lock().unwrap().insert(stem.into(), data);
            Ok(())
        }

        async fn read_record(&self, stem: &str) -> Result<Bytes, StorageError> {
            let records = self.records.lock().unwrap();
            records
                .get(stem)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(stem.into()))
        }

        async fn list_records(&self) -> Result<Vec<String>, StorageError> {
            Ok(self.records.lock().unwrap().keys().cloned().collect())
        }

        async fn read_sidecar(&self, name: &str) -> Result<Bytes, StorageError> {
            let sidecars = self.sidecars.lock().unwrap();
            sidecars
                .get(name)
                .cloned()
                .ok_or_else(|| StorageError::NotFound(name.into()))
        }

        async fn write_sidecar(&self, name: &str, data: Bytes) -> Result<(), StorageError> {
            self.sidecars.lock().unwrap().insert(name.into(), data);
            Ok(())
        }
    }

    fn codes(first: &str, second: &str) -> Vec<Option<String>> {
        vec![Some(first.into()), Some(second.into())]
    }

    async fn index_with(games: &[(&str, Vec<Option<String>>)]) -> ContentIndex<MemoryStorage> {
        let storage = MemoryStorage::default();
        let mut index = ContentIndex::new(storage.clone());
        for (stem, players) in games {
            storage
                .write_record(stem, Bytes::from_static(b"{}"))
                .await
                .unwrap();
            index.record_processed(stem, players.clone(), Some(format!("hash-{stem}")));
        }
        index.load_processed_identities().await.unwrap();
        index
    }

    #[tokio::test]
    async fn frequencies_rank_codes() {
        let index = index_with(&[
            ("Game_1", codes("AAA#1", "BBB#2")),
            ("Game_2", codes("AAA#1", "CCC#3")),
            ("Game_3", codes("CCC#3", "AAA#1")),
            ("Game_4", vec![Some("AAA#1".into()), Some("X".into())]),
        ])
        .await;

        assert_eq!(
            index.codes_by_frequency(),
            vec![
                ("AAA#1".to_string(), 4),
                ("CCC#3".to_string(), 2),
                ("BBB#2".to_string(), 1)
            ]
        );
        assert_eq!(index.games_for_code("CCC#3"), 2);
        assert_eq!(index.games_for_code("ZZZ#9"), 0);
    }

    #[tokio::test]
    async fn frequencies_only_count_stored_games() {
        let mut index = index_with(&[("Game_1", codes("AAA#1", "BBB#2"))]).await;
        index.record_processed("Gone", codes("AAA#1", "BBB#2"), Some("abcdefgh".into()));
        index.load_processed_identities().await.unwrap();
        assert_eq!(index.games_for_code("AAA#1"), 1);
    }

    #[tokio::test]
    async fn eligibility_requires_both_codes_and_tracks_per_code_status() {
        let mut index = index_with(&[
            ("Game_1", codes("AAA#1", "BBB#2")),
            ("Game_2", vec![Some("AAA#1".into()), None]),
        ])
        .await;

        let eligible = index.eligible_for_upload("AAA#1");
        assert_eq!(
            eligible,
            vec![UploadItem {
                file_name: "Game_1".into(),
                hash: "hash-Game_1".into(),
            }]
        );

        let ack = UploadAck {
            hash: "hash-Game_1".into(),
            file_name: "Game_1".into(),
            success: true,
        };
        index.apply_ack("AAA#1", &ack).unwrap();
        assert!(index.eligible_for_upload("AAA#1").is_empty());
        assert_eq!(index.eligible_for_upload("BBB#2").len(), 1);
        assert!(index.eligible_for_upload("ZZZ#9").is_empty());
    }

    #[tokio::test]
    async fn mismatched_ack_leaves_status_alone() {
        let mut index = index_with(&[("Game_1", codes("AAA#1", "BBB#2"))]).await;
        let ack = UploadAck {
            hash: "something-else".into(),
            file_name: "Game_1".into(),
            success: true,
        };
        assert!(matches!(
            index.apply_ack("AAA#1", &ack),
            Err(QueueError::HashMismatch { .. })
        ));
        assert_eq!(index.eligible_for_upload("AAA#1").len(), 1);

        let unknown = UploadAck {
            file_name: "Nope".into(),
            ..ack
        };
        assert!(matches!(
            index.apply_ack("AAA#1", &unknown),
            Err(QueueError::MissingEntry(_))
        ));
    }

    #[tokio::test]
    async fn failed_ack_keeps_the_game_eligible() {
        let mut index = index_with(&[("Game_1", codes("AAA#1", "BBB#2"))]).await;
        let ack = UploadAck {
            hash: "hash-Game_1".into(),
            file_name: "Game_1".into(),
            success: false,
        };
        index.apply_ack("AAA#1", &ack).unwrap();
        assert_eq!(index.eligible_for_upload("AAA#1").len(), 1);
    }

    #[tokio::test]
    async fn metadata_round_trips_and_tolerates_garbage() {
        let index = index_with(&[("Game_1", codes("AAA#1", "BBB#2"))]).await;
        index.persist_metadata().await.unwrap();

        let mut reloaded = ContentIndex::new(index.storage().clone());
        reloaded.load_metadata().await;
        assert_eq!(reloaded.metadata(), index.metadata());

        index
            .storage()
            .write_sidecar(METADATA_FILE, Bytes::from_static(b"[not a map"))
            .await
            .unwrap();
        reloaded.load_metadata().await;
        assert!(reloaded.metadata().is_empty());

        let mut fresh = ContentIndex::new(MemoryStorage::default());
        fresh.load_metadata().await;
        assert!(fresh.metadata().is_empty());
    }
}
