//! The structured accessor surface of a decoded replay.
//!
//! A [`ReplayParser`](crate::traits::ReplayParser) yields one [`ParsedReplay`]
//! per file. Field names follow the camelCase layout of the upstream parser so
//! decoded dumps can be read without translation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedReplay {
    pub settings: GameSettings,
    pub metadata: GameMetadata,
    #[serde(default)]
    pub game_end: GameEnd,
    pub stats: RawStats,
    /// Keyed by frame number.
    #[serde(default)]
    pub frames: BTreeMap<i32, Frame>,
    /// Aggregate stats computed by an independent pass over the same data.
    pub computed: ComputedStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSettings {
    #[serde(default)]
    pub slp_version: String,
    #[serde(rename = "isPAL", default)]
    pub is_pal: bool,
    pub stage_id: u16,
    pub players: Vec<PlayerSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSettings {
    pub player_index: u8,
    pub port: u8,
    pub character_id: u8,
    #[serde(default)]
    pub character_color: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMetadata {
    pub start_at: Option<String>,
    #[serde(default)]
    pub last_frame: i32,
    pub played_on: Option<String>,
    /// Keyed by player index.
    #[serde(default)]
    pub players: BTreeMap<String, MetadataPlayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataPlayer {
    #[serde(default)]
    pub names: PlayerNames,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerNames {
    #[serde(default)]
    pub netplay: String,
    #[serde(default)]
    pub code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameEnd {
    pub game_end_method: Option<u8>,
    pub lras_initiator_index: Option<i8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStats {
    #[serde(default)]
    pub stocks: Vec<StockEvent>,
    #[serde(default)]
    pub playable_frame_count: i32,
    #[serde(default)]
    pub game_complete: bool,
    #[serde(default)]
    pub action_counts: Vec<ActionCounts>,
    #[serde(default)]
    pub overall: Vec<OverallStats>,
}

/// One stock, ending in a stock-loss event when `end_frame` is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockEvent {
    pub player_index: u8,
    pub start_frame: i32,
    pub end_frame: Option<i32>,
    pub start_percent: f64,
    pub end_percent: Option<f64>,
    pub current_percent: f64,
    pub count: u8,
    pub death_animation: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCounts {
    pub player_index: u8,
    #[serde(default)]
    pub opponent_index: u8,
    #[serde(flatten)]
    pub counters: ActionCounters,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionCounters {
    pub wavedash_count: u32,
    pub waveland_count: u32,
    pub air_dodge_count: u32,
    pub dash_dance_count: u32,
    pub spot_dodge_count: u32,
    pub ledgegrab_count: u32,
    pub roll_count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    pub player_index: u8,
    #[serde(default)]
    pub opponent_index: u8,
    #[serde(flatten)]
    pub metrics: OverallMetrics,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OverallMetrics {
    pub input_count: u32,
    pub conversion_count: u32,
    pub total_damage: f64,
    pub kill_count: u32,
    pub successful_conversions: Ratio,
    pub inputs_per_minute: Ratio,
    pub openings_per_kill: Ratio,
    pub damage_per_opening: Ratio,
    pub neutral_win_ratio: Ratio,
    pub counter_hit_ratio: Ratio,
    pub beneficial_trade_ratio: Ratio,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ratio {
    pub count: f64,
    pub total: f64,
    pub ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default)]
    pub players: Vec<FramePlayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FramePlayer {
    pub pre: PreFrameUpdate,
    pub post: PostFrameUpdate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreFrameUpdate {
    pub player_index: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFrameUpdate {
    pub action_state_id: u16,
    /// 1 = success, 2 = failure, anything else = not applicable.
    #[serde(default)]
    pub l_cancel_status: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputedStats {
    #[serde(default)]
    pub games: Vec<ComputedGame>,
    #[serde(default)]
    pub summary: Vec<SummarySection>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputedGame {
    #[serde(default)]
    pub players: Vec<ComputedPlayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedPlayer {
    pub character_id: u8,
    #[serde(default)]
    pub game_result: GameResult,
    #[serde(default)]
    pub final_stock_count: u8,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Winner,
    Loser,
    #[default]
    #[serde(other)]
    Unknown,
}

/// One named section of the computed summary, with one result per slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummarySection {
    pub id: String,
    #[serde(default)]
    pub results: Vec<SummaryResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    #[serde(default)]
    pub result: serde_json::Value,
    #[serde(default)]
    pub simple: Option<SimpleResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimpleResult {
    #[serde(default)]
    pub number: f64,
}
