use crate::QueueError;
use bytes::Bytes;
use smashstats_core::prelude::*;
use tracing::{info, warn};

/// Upload credentials per participant code, mirrored to `keys.json`.
#[derive(Debug, Clone, Default)]
pub struct CredentialCache {
    keys: CodeKeys,
}

impl CredentialCache {
    /// Reads `keys.json`; anything unreadable starts an empty cache.
    pub async fn load<S: RecordStorage>(storage: &S) -> Self {
        let keys = match storage.read_sidecar(KEYS_FILE).await {
            Ok(data) => serde_json::from_slice(&data).unwrap_or_else(|e| {
                warn!("keys.json is malformed, starting empty: {e}");
                CodeKeys::new()
            }),
            Err(e) => {
                info!("keys.json not loaded: {e}");
                CodeKeys::new()
            }
        };
        Self { keys }
    }

    pub fn keys(&self) -> &CodeKeys {
        &self.keys
    }

    /// A complete cached credential for `code`.
    pub fn get(&self, code: &str) -> Option<&UploadCredential> {
        self.keys.get(code).filter(|credential| credential.is_complete())
    }

    /// Cached credential, or a freshly issued one that is then cached and
    /// persisted.
    pub async fn credential_for<S: RecordStorage, I: CredentialIssuer>(
        &mut self,
        code: &str,
        storage: &S,
        issuer: &I,
    ) -> Result<UploadCredential, QueueError> {
        if resolve_code(code).is_none() {
            return Err(QueueError::InvalidCode(code.to_string()));
        }
        if let Some(credential) = self.get(code) {
            return Ok(credential.clone());
        }

        let credential = issuer
            .issue_credential(code)
            .await
            .map_err(|e| QueueError::Credential(e.to_string()))?;
        if !credential.is_complete() {
            return Err(QueueError::Credential("incomplete credential".into()));
        }
        info!(%code, id = %credential.id, "Caching new upload key");
        self.keys.insert(code.to_string(), credential.clone());
        let data = serde_json::to_vec(&self.keys).map_err(StorageError::from)?;
        storage.write_sidecar(KEYS_FILE, Bytes::from(data)).await?;
        Ok(credential)
    }
}
