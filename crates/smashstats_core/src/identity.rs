use serde::{Deserialize, Serialize};
use std::fmt;

/// Codes shorter than this are treated as "no code" for that slot.
pub const MIN_CODE_LEN: usize = 3;

/// Stable key for a replay, derived from its file stem.
///
/// This is the classic 31-multiplier string hash over UTF-16 code units,
/// wrapped to a signed 32-bit integer. Collisions are possible but rare
/// within a single replay folder. The decimal form is the key used in
/// `metadata.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReplayIdentity(i32);

impl ReplayIdentity {
    pub fn from_stem(stem: &str) -> Self {
        let hash = stem.encode_utf16().fold(0i32, |hash, unit| {
            hash.wrapping_shl(5)
                .wrapping_sub(hash)
                .wrapping_add(i32::from(unit))
        });
        Self(hash)
    }

    pub fn value(&self) -> i32 {
        self.0
    }

    pub fn key(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for ReplayIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns the code if it is long enough to identify a participant.
pub fn resolve_code(code: &str) -> Option<&str> {
    (code.encode_utf16().count() >= MIN_CODE_LEN).then_some(code)
}
