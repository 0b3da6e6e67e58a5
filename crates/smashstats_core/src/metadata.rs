use crate::identity::resolve_code;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const METADATA_FILE: &str = "metadata.json";
pub const KEYS_FILE: &str = "keys.json";

/// Hashes shorter than this are treated as missing.
pub const MIN_HASH_LEN: usize = 6;

pub const NOT_UPLOADED: u8 = 0;
pub const UPLOADED: u8 = 1;

/// `metadata.json`: replay identity key -> entry.
pub type MetadataMap = BTreeMap<String, ProcessedEntry>;

/// `keys.json`: participant code -> credential.
pub type CodeKeys = BTreeMap<String, UploadCredential>;

/// Index entry for one converted replay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessedEntry {
    /// Participant codes by slot; `None` (or a short code) when unresolvable.
    #[serde(default)]
    pub players: Vec<Option<String>>,
    /// Upload status per locally selected participant code.
    #[serde(default)]
    pub uploaded: BTreeMap<String, u8>,
    #[serde(default)]
    pub hash: Option<String>,
}

impl ProcessedEntry {
    pub fn new(players: Vec<Option<String>>, hash: Option<String>) -> Self {
        let uploaded = players
            .iter()
            .flatten()
            .filter_map(|code| resolve_code(code))
            .map(|code| (code.to_string(), NOT_UPLOADED))
            .collect();
        Self {
            players,
            uploaded,
            hash,
        }
    }

    /// Both slot codes, if both resolve.
    pub fn resolved_players(&self) -> Option<(&str, &str)> {
        match self.players.as_slice() {
            [Some(first), Some(second)] => Some((resolve_code(first)?, resolve_code(second)?)),
            _ => None,
        }
    }

    /// All resolvable codes in slot order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.players
            .iter()
            .flatten()
            .filter_map(|code| resolve_code(code))
    }

    pub fn valid_hash(&self) -> Option<&str> {
        self.hash
            .as_deref()
            .filter(|hash| hash.len() >= MIN_HASH_LEN)
    }

    /// Not yet uploaded for `code`, has a usable hash, and both slots
    /// resolve with `code` being one of them.
    pub fn is_eligible_for(&self, code: &str) -> bool {
        self.uploaded.get(code) == Some(&NOT_UPLOADED)
            && self.valid_hash().is_some()
            && self
                .resolved_players()
                .is_some_and(|(first, second)| first == code || second == code)
    }

    pub fn set_upload_status(&mut self, code: &str, uploaded: bool) {
        let status = if uploaded { UPLOADED } else { NOT_UPLOADED };
        self.uploaded.insert(code.to_string(), status);
    }
}

/// Credential issued by the remote service for one participant code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadCredential {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub id: String,
}

impl UploadCredential {
    pub fn new(key: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            id: id.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.key.is_empty() && !self.id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(players: [Option<&str>; 2], hash: Option<&str>) -> ProcessedEntry {
        ProcessedEntry::new(
            players.iter().map(|p| p.map(str::to_string)).collect(),
            hash.map(str::to_string),
        )
    }

    #[test]
    fn one_sided_entries_are_never_eligible() {
        let e = entry([Some("AAA#1"), None], Some("abcdef123"));
        assert!(!e.is_eligible_for("AAA#1"));
        let e = entry([Some("AAA#1"), Some("B")], Some("abcdef123"));
        assert!(!e.is_eligible_for("AAA#1"));
        assert!(!e.is_eligible_for("B"));
    }

    #[test]
    fn upload_status_is_tracked_per_code() {
        let mut e = entry([Some("AAA#1"), Some("BBB#2")], Some("abcdef123"));
        assert!(e.is_eligible_for("AAA#1"));
        assert!(e.is_eligible_for("BBB#2"));
        e.set_upload_status("AAA#1", true);
        assert!(!e.is_eligible_for("AAA#1"));
        assert!(e.is_eligible_for("BBB#2"));
        assert!(!e.is_eligible_for("CCC#3"));
    }

    #[test]
    fn short_or_missing_hash_is_not_eligible() {
        assert!(!entry([Some("AAA#1"), Some("BBB#2")], Some("abcde")).is_eligible_for("AAA#1"));
        assert!(!entry([Some("AAA#1"), Some("BBB#2")], None).is_eligible_for("AAA#1"));
    }

    #[test]
    fn reads_legacy_blank_codes() {
        let json = r#"{"players":["AAA#1",""],"uploaded":{"AAA#1":0,"":0},"hash":"abcdef123"}"#;
        let e: ProcessedEntry = serde_json::from_str(json).unwrap();
        assert_eq!(e.resolved_players(), None);
        assert_eq!(e.codes().collect::<Vec<_>>(), vec!["AAA#1"]);
        assert!(!e.is_eligible_for("AAA#1"));
    }

    #[test]
    fn credential_completeness() {
        assert!(UploadCredential::new("k", "i").is_complete());
        assert!(!UploadCredential::new("", "i").is_complete());
        let partial: UploadCredential = serde_json::from_str(r#"{"key":"k"}"#).unwrap();
        assert!(!partial.is_complete());
    }
}
