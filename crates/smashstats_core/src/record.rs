use crate::replay::{ActionCounters, GameResult, OverallMetrics, StockEvent};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Key of the embedded content hash; excluded from the hash input.
const HASH_FIELD: &str = "hash";

/// The canonical, normalized statistics of one two-player replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRecord {
    pub slp_version: String,
    pub played_on: Option<String>,
    #[serde(rename = "isPAL")]
    pub is_pal: bool,
    pub stage_id: u16,
    pub stage_name: String,
    pub start_at: String,
    pub start_at_epoch: i64,
    /// Formatted `m:ss`.
    pub duration: String,
    pub duration_seconds: u32,
    /// False when the game is shorter than 30s or has no stock-loss events.
    pub is_valid: bool,
    pub last_frame: i32,
    pub playable_frame_count: i32,
    pub game_complete: bool,
    pub game_end_method: Option<u8>,
    pub lras_initiator_index: Option<i8>,
    /// Player index of the winner, or -1 when unresolved.
    pub winning_player: i8,
    pub stocks: Vec<StockEvent>,
    /// Keyed by player index.
    pub players: BTreeMap<String, PlayerStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub player_index: u8,
    pub name: String,
    pub code: String,
    pub port: u8,
    pub character_id: u8,
    pub character_color: u8,
    pub character_name: String,
    pub character_color_name: String,
    pub game_result: GameResult,
    pub final_stock_count: u8,
    pub stats: PlayerGameStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerGameStats {
    #[serde(flatten)]
    pub actions: ActionCounters,
    #[serde(flatten)]
    pub overall: OverallMetrics,
    pub l_cancels: LCancelStats,
    /// Per-move breakdown as reported by the computed summary.
    pub kill_moves: serde_json::Value,
    pub neutral_opener_moves: serde_json::Value,
    pub early_kills: u32,
    pub late_deaths: u32,
    pub self_destructs: u32,
    pub avg_kill_percent: Option<f64>,
    pub high_damage_punishes: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LCancelStats {
    pub successful: u32,
    pub failed: u32,
    pub total: u32,
    /// `None` when no L-cancel window was observed.
    pub ratio: Option<f64>,
    pub failed_moves: Vec<String>,
}

impl LCancelStats {
    pub fn record_success(&mut self) {
        self.successful += 1;
    }

    pub fn record_failure(&mut self, move_name: &str) {
        self.failed += 1;
        self.failed_moves.push(move_name.to_string());
    }

    /// Fills in `total` and `ratio` from the counters.
    pub fn finish(mut self) -> Self {
        self.total = self.successful + self.failed;
        self.ratio = (self.total > 0).then(|| f64::from(self.successful) / f64::from(self.total));
        self
    }
}

impl StatsRecord {
    /// SHA-256 over the canonical JSON of the record, minus the hash field.
    ///
    /// Canonical means object keys sorted, so the digest does not depend on
    /// struct field order or on how the record was read back.
    pub fn content_hash(&self) -> Result<String, serde_json::Error> {
        let mut value = serde_json::to_value(self)?;
        if let Some(object) = value.as_object_mut() {
            object.remove(HASH_FIELD);
        }
        let canonical = serde_json::to_vec(&value)?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }

    /// Computes the content hash and embeds it.
    pub fn seal(&mut self) -> Result<String, serde_json::Error> {
        let hash = self.content_hash()?;
        self.hash = Some(hash.clone());
        Ok(hash)
    }

    /// True when the embedded hash matches the current content.
    pub fn verify_hash(&self) -> bool {
        match (&self.hash, self.content_hash()) {
            (Some(embedded), Ok(computed)) => *embedded == computed,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn sample_record() -> StatsRecord {
        let mut players = BTreeMap::new();
        for (index, code) in [(0u8, "AAA#111"), (1, "BBB#222")] {
            players.insert(
                index.to_string(),
                PlayerStats {
                    player_index: index,
                    name: format!("player{index}"),
                    code: code.to_string(),
                    port: index + 1,
                    character_id: 2,
                    character_color: 0,
                    character_name: "Fox".into(),
                    character_color_name: "Default".into(),
                    game_result: if index == 0 {
                        GameResult::Winner
                    } else {
                        GameResult::Loser
                    },
                    final_stock_count: if index == 0 { 2 } else { 0 },
                    stats: PlayerGameStats {
                        l_cancels: LCancelStats::default().finish(),
                        avg_kill_percent: Some(112.5),
                        ..Default::default()
                    },
                },
            );
        }
        StatsRecord {
            slp_version: "3.12.0".into(),
            played_on: Some("dolphin".into()),
            is_pal: false,
            stage_id: 31,
            stage_name: "Battlefield".into(),
            start_at: "2023-11-04T18:15:12Z".into(),
            start_at_epoch: 1699121712,
            duration: "3:20".into(),
            duration_seconds: 200,
            is_valid: true,
            last_frame: 12000,
            playable_frame_count: 12123,
            game_complete: true,
            game_end_method: Some(2),
            lras_initiator_index: None,
            winning_player: 0,
            stocks: vec![StockEvent {
                player_index: 1,
                start_frame: -123,
                end_frame: Some(3000),
                start_percent: 0.0,
                end_percent: Some(87.3),
                current_percent: 87.3,
                count: 4,
                death_animation: Some(1),
            }],
            players,
            hash: None,
        }
    }

    #[test]
    fn hash_ignores_embedded_hash() {
        let mut record = sample_record();
        let before = record.content_hash().unwrap();
        let sealed = record.seal().unwrap();
        assert_eq!(before, sealed);
        assert_eq!(record.content_hash().unwrap(), sealed);
        assert!(record.verify_hash());
    }

    #[test]
    fn mutating_a_field_changes_the_hash() {
        let mut record = sample_record();
        let original = record.seal().unwrap();
        record.winning_player = 1;
        assert_ne!(record.content_hash().unwrap(), original);
        assert!(!record.verify_hash());
    }

    #[test]
    fn hash_survives_json_round_trip() {
        let mut record = sample_record();
        let hash = record.seal().unwrap();
        let text = serde_json::to_string(&record).unwrap();
        let back: StatsRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back.hash.as_deref(), Some(hash.as_str()));
        assert!(back.verify_hash());
    }

    #[test]
    fn empty_l_cancels_have_no_ratio() {
        let stats = LCancelStats::default().finish();
        assert_eq!(stats.total, 0);
        assert_eq!(stats.ratio, None);
        let json = serde_json::to_value(&stats).unwrap();
        assert!(json["ratio"].is_null());
    }
}
