use crate::error::*;
use crate::metadata::UploadCredential;
use crate::protocol::{UploadAck, UploadGame};
use crate::replay::ParsedReplay;

use bytes::Bytes;
use std::path::Path;

/// Decodes a raw replay file into its structured accessors.
pub trait ReplayParser: Send + Sync + 'static + Clone {
    fn parse(&self, path: &Path)
    -> impl Future<Output = Result<ParsedReplay, ParseError>> + Send;
}

/// Durable storage for converted records and the sidecar files next to them.
pub trait RecordStorage: Send + Sync + 'static + Clone {
    /// Whether the storage location is safe to write to.
    fn is_valid(&self) -> bool;

    fn write_record(
        &self,
        stem: &str,
        data: Bytes,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
    fn read_record(&self, stem: &str) -> impl Future<Output = Result<Bytes, StorageError>> + Send;

    /// Stems of every stored record.
    fn list_records(&self) -> impl Future<Output = Result<Vec<String>, StorageError>> + Send;

    fn read_sidecar(&self, name: &str)
    -> impl Future<Output = Result<Bytes, StorageError>> + Send;
    fn write_sidecar(
        &self,
        name: &str,
        data: Bytes,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Carries one record to the remote service and waits for its ack.
pub trait UploadSink: Send {
    type Error: std::error::Error + Send + Sync + 'static;

    fn is_authenticated(&self) -> bool;

    fn upload(
        &mut self,
        game: UploadGame,
    ) -> impl Future<Output = Result<UploadAck, Self::Error>> + Send;
}

/// Issues upload credentials for participant codes.
pub trait CredentialIssuer: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    fn issue_credential(
        &self,
        code: &str,
    ) -> impl Future<Output = Result<UploadCredential, Self::Error>> + Send;
}
