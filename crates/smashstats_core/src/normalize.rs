//! Turns a [`ParsedReplay`] into a validated, hashed [`StatsRecord`].

use crate::catalog::{attack_action, character_color_name, character_name, stage_name};
use crate::error::NormalizeError;
use crate::identity::resolve_code;
use crate::record::{LCancelStats, PlayerGameStats, PlayerStats, StatsRecord};
use crate::replay::{
    ComputedPlayer, Frame, GameResult, ParsedReplay, PlayerSettings, SummaryResult,
    SummarySection,
};
use crate::traits::ReplayParser;

use chrono::{DateTime, NaiveDateTime};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Games shorter than this are stored but flagged invalid.
pub const MIN_VALID_DURATION_SECS: u32 = 30;

/// Offset-less timestamps accepted after RFC 3339, read as UTC.
const NAIVE_START_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

const NTSC_FPS: f64 = 60.0;
const PAL_FPS: f64 = 50.0;

const L_CANCEL_SUCCESS: u8 = 1;
const L_CANCEL_FAILURE: u8 = 2;

/// Summary sections read from the computed stats, by position.
const KILL_MOVES: (usize, &str) = (3, "killMoves");
const NEUTRAL_OPENER_MOVES: (usize, &str) = (4, "neutralOpenerMoves");
const EARLY_KILLS: (usize, &str) = (5, "earlyKills");
const LATE_DEATHS: (usize, &str) = (6, "lateDeaths");
const SELF_DESTRUCTS: (usize, &str) = (7, "selfDestructs");
const AVG_KILL_PERCENT: (usize, &str) = (9, "avgKillPercent");
const HIGH_DAMAGE_PUNISHES: (usize, &str) = (10, "highDamagePunishes");

/// A successfully normalized replay.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedGame {
    /// Sealed record (hash embedded).
    pub record: StatsRecord,
    /// Codes by slot; `None` when shorter than the minimum code length.
    pub codes: Vec<Option<String>>,
}

impl ConvertedGame {
    pub fn hash(&self) -> Option<&str> {
        self.record.hash.as_deref()
    }
}

/// Parses and normalizes replay files.
#[derive(Clone)]
pub struct StatsNormalizer<P: ReplayParser> {
    parser: P,
}

impl<P: ReplayParser> StatsNormalizer<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }

    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub async fn convert(&self, path: &Path) -> Result<ConvertedGame, NormalizeError> {
        let replay = self.parser.parse(path).await?;
        let converted = normalize(&replay);
        if let Err(e) = &converted {
            warn!("Error processing game: {} | {e}", path.display());
        }
        converted
    }
}

struct Summary<'a> {
    kill_moves: &'a SummarySection,
    neutral_opener_moves: &'a SummarySection,
    early_kills: &'a SummarySection,
    late_deaths: &'a SummarySection,
    self_destructs: &'a SummarySection,
    avg_kill_percent: &'a SummarySection,
    high_damage_punishes: &'a SummarySection,
}

impl<'a> Summary<'a> {
    fn from_sections(sections: &'a [SummarySection]) -> Result<Self, NormalizeError> {
        let section = |(position, id): (usize, &str)| {
            sections
                .get(position)
                .filter(|section| section.id == id)
                .ok_or_else(|| NormalizeError::SummarySchemaMismatch(id.to_string()))
        };
        Ok(Self {
            kill_moves: section(KILL_MOVES)?,
            neutral_opener_moves: section(NEUTRAL_OPENER_MOVES)?,
            early_kills: section(EARLY_KILLS)?,
            late_deaths: section(LATE_DEATHS)?,
            self_destructs: section(SELF_DESTRUCTS)?,
            avg_kill_percent: section(AVG_KILL_PERCENT)?,
            high_damage_punishes: section(HIGH_DAMAGE_PUNISHES)?,
        })
    }
}

fn slot_result<'a>(
    section: &'a SummarySection,
    slot: usize,
) -> Result<&'a SummaryResult, NormalizeError> {
    section
        .results
        .get(slot)
        .ok_or_else(|| NormalizeError::SummarySchemaMismatch(section.id.clone()))
}

fn simple_count(section: &SummarySection, slot: usize) -> Result<u32, NormalizeError> {
    let number = slot_result(section, slot)?
        .simple
        .as_ref()
        .map(|simple| simple.number)
        .ok_or_else(|| NormalizeError::SummarySchemaMismatch(section.id.clone()))?;
    Ok(number.max(0.0).round() as u32)
}

fn result_count(section: &SummarySection, slot: usize) -> Result<u32, NormalizeError> {
    slot_result(section, slot)?
        .result
        .as_f64()
        .map(|number| number.max(0.0).round() as u32)
        .ok_or_else(|| NormalizeError::SummarySchemaMismatch(section.id.clone()))
}

/// Converts a frame count to whole seconds, rounded.
pub fn frames_to_seconds(frame_count: i32, is_pal: bool) -> u32 {
    let fps = if is_pal { PAL_FPS } else { NTSC_FPS };
    (f64::from(frame_count.max(0)) / fps).round() as u32
}

/// Formats a frame count as `m:ss`, truncating partial seconds.
pub fn frames_to_duration(frame_count: i32, is_pal: bool) -> String {
    let fps = if is_pal { PAL_FPS } else { NTSC_FPS };
    let total = (f64::from(frame_count.max(0)) / fps).floor() as u64;
    format!("{}:{:02}", (total / 60) % 60, total % 60)
}

/// Counts L-cancel outcomes for one player across all frames.
///
/// Only frames where the player is in a catalogued attack state are
/// considered; flag values other than success/failure are ignored.
pub fn l_cancel_stats<'a>(
    frames: impl IntoIterator<Item = &'a Frame>,
    player_index: u8,
) -> LCancelStats {
    let mut stats = LCancelStats::default();
    for frame in frames {
        let Some(player) = frame
            .players
            .iter()
            .find(|player| player.pre.player_index == player_index)
        else {
            continue;
        };
        let Some(attack) = attack_action(player.post.action_state_id) else {
            continue;
        };
        match player.post.l_cancel_status {
            Some(L_CANCEL_SUCCESS) => stats.record_success(),
            Some(L_CANCEL_FAILURE) => stats.record_failure(attack.nice_name),
            _ => {}
        }
    }
    stats.finish()
}

/// Seconds since the epoch for an RFC 3339 timestamp, or one without an
/// offset taken as UTC.
fn start_time_epoch(start_at: &str) -> Option<i64> {
    if let Ok(time) = DateTime::parse_from_rfc3339(start_at) {
        return Some(time.timestamp());
    }
    NAIVE_START_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(start_at, format).ok())
        .map(|time| time.and_utc().timestamp())
}

fn cross_check<'a>(
    settings: &'a [PlayerSettings],
    computed: &'a [ComputedPlayer],
) -> Result<[(&'a PlayerSettings, &'a ComputedPlayer); 2], NormalizeError> {
    match (settings, computed) {
        ([p1, p2, ..], [c1, c2, ..])
            if p1.character_id == c1.character_id && p2.character_id == c2.character_id =>
        {
            Ok([(p1, c1), (p2, c2)])
        }
        _ => Err(NormalizeError::PlayerMismatch),
    }
}

/// Validates and normalizes one parsed replay.
pub fn normalize(replay: &ParsedReplay) -> Result<ConvertedGame, NormalizeError> {
    let ParsedReplay {
        settings,
        metadata,
        game_end,
        stats,
        frames,
        computed,
    } = replay;

    let codes: Vec<Option<String>> = metadata
        .players
        .values()
        .map(|player| resolve_code(&player.names.code).map(str::to_string))
        .collect();

    let start_at = metadata
        .start_at
        .as_deref()
        .filter(|start_at| !start_at.is_empty())
        .ok_or(NormalizeError::MissingStartTime)?;
    let start_at_epoch = start_time_epoch(start_at)
        .ok_or_else(|| NormalizeError::InvalidStartTime(start_at.to_string()))?;

    if codes.len() != 2 {
        return Err(NormalizeError::InvalidPlayerCount(codes.len()));
    }

    let computed_players = computed
        .games
        .first()
        .map(|game| game.players.as_slice())
        .unwrap_or_default();
    let slots = cross_check(&settings.players, computed_players)?;
    let summary = Summary::from_sections(&computed.summary)?;

    let duration_seconds = frames_to_seconds(metadata.last_frame, settings.is_pal);
    let is_valid = duration_seconds >= MIN_VALID_DURATION_SECS && !stats.stocks.is_empty();

    let mut winning_player = -1;
    let mut players = BTreeMap::new();
    for (slot, (player, computed_player)) in slots.into_iter().enumerate() {
        let index = player.player_index;
        let missing = |section| NormalizeError::MissingPlayerStats {
            section,
            player_index: index,
        };

        let names = metadata
            .players
            .get(&index.to_string())
            .map(|p| &p.names)
            .ok_or_else(|| missing("metadata"))?;
        let actions = stats
            .action_counts
            .iter()
            .find(|counts| counts.player_index == index)
            .ok_or_else(|| missing("actionCounts"))?;
        let overall = stats
            .overall
            .iter()
            .find(|overall| overall.player_index == index)
            .ok_or_else(|| missing("overall"))?;

        let game_stats = PlayerGameStats {
            actions: actions.counters.clone(),
            overall: overall.metrics.clone(),
            l_cancels: l_cancel_stats(frames.values(), index),
            kill_moves: slot_result(summary.kill_moves, slot)?.result.clone(),
            neutral_opener_moves: slot_result(summary.neutral_opener_moves, slot)?
                .result
                .clone(),
            early_kills: simple_count(summary.early_kills, slot)?,
            late_deaths: simple_count(summary.late_deaths, slot)?,
            self_destructs: result_count(summary.self_destructs, slot)?,
            avg_kill_percent: slot_result(summary.avg_kill_percent, slot)?.result.as_f64(),
            high_damage_punishes: simple_count(summary.high_damage_punishes, slot)?,
        };

        if computed_player.game_result == GameResult::Winner {
            winning_player = index as i8;
        }

        players.insert(
            index.to_string(),
            PlayerStats {
                player_index: index,
                name: names.netplay.clone(),
                code: names.code.clone(),
                port: player.port,
                character_id: player.character_id,
                character_color: player.character_color,
                character_name: character_name(player.character_id).to_string(),
                character_color_name: character_color_name(
                    player.character_id,
                    player.character_color,
                )
                .to_string(),
                game_result: computed_player.game_result,
                final_stock_count: computed_player.final_stock_count,
                stats: game_stats,
            },
        );
    }

    let mut record = StatsRecord {
        slp_version: settings.slp_version.clone(),
        played_on: metadata.played_on.clone(),
        is_pal: settings.is_pal,
        stage_id: settings.stage_id,
        stage_name: stage_name(settings.stage_id).to_string(),
        start_at: start_at.to_string(),
        start_at_epoch,
        duration: frames_to_duration(metadata.last_frame, settings.is_pal),
        duration_seconds,
        is_valid,
        last_frame: metadata.last_frame,
        playable_frame_count: stats.playable_frame_count,
        game_complete: stats.game_complete,
        game_end_method: game_end.game_end_method,
        lras_initiator_index: game_end.lras_initiator_index,
        winning_player,
        stocks: stats.stocks.clone(),
        players,
        hash: None,
    };
    let hash = record.seal()?;
    debug!(%hash, is_valid, duration_seconds, "Normalized replay");

    Ok(ConvertedGame { record, codes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replay::*;

    fn frame(player_index: u8, action_state_id: u16, l_cancel_status: Option<u8>) -> Frame {
        Frame {
            players: vec![FramePlayer {
                pre: PreFrameUpdate { player_index },
                post: PostFrameUpdate {
                    action_state_id,
                    l_cancel_status,
                },
            }],
        }
    }

    #[test]
    fn classifies_l_cancels_only_in_attack_states() {
        let frames = [
            frame(0, 44, Some(1)),
            frame(0, 44, Some(2)),
            frame(0, 1, Some(1)),
        ];
        let stats = l_cancel_stats(&frames, 0);
        assert_eq!(stats.successful, 1);
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.ratio, Some(0.5));
        assert_eq!(stats.failed_moves, vec!["Jab 1".to_string()]);
    }

    #[test]
    fn ignores_not_applicable_flags_and_other_players() {
        let frames = [
            frame(0, 70, Some(0)),
            frame(0, 70, None),
            frame(0, 70, Some(3)),
            frame(1, 70, Some(1)),
        ];
        let stats = l_cancel_stats(&frames, 0);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.ratio, None);
        assert_eq!(l_cancel_stats(&frames, 1).successful, 1);
    }

    #[test]
    fn duration_uses_region_frame_rate() {
        assert_eq!(frames_to_seconds(1800, false), 30);
        assert_eq!(frames_to_seconds(1800, true), 36);
        assert_eq!(frames_to_seconds(1739, false), 29);
        assert_eq!(frames_to_duration(12000, false), "3:20");
        assert_eq!(frames_to_duration(12000, true), "4:00");
        assert_eq!(frames_to_duration(-123, false), "0:00");
    }
}
