use serde_json::json;
use smashstats_core::replay::*;
use std::collections::BTreeMap;

pub const DEFAULT_START_AT: &str = "2023-06-20T20:21:54Z";

/// Summary section ids in the order the aggregate pass emits them.
pub const SUMMARY_SECTION_IDS: [&str; 11] = [
    "openingsPerKill",
    "damagePerOpening",
    "neutralWins",
    "killMoves",
    "neutralOpenerMoves",
    "earlyKills",
    "lateDeaths",
    "selfDestructs",
    "inputsPerMinute",
    "avgKillPercent",
    "highDamagePunishes",
];

const FOX: u8 = 2;
const FALCO: u8 = 20;
const BATTLEFIELD: u16 = 31;

/// Builder for synthetic two-player replays.
///
/// Defaults to a complete 60 second NTSC game on Battlefield, Fox (slot 0)
/// beating Falco (slot 1) with one stock taken.
#[derive(Debug, Clone)]
pub struct ReplayFixture {
    replay: ParsedReplay,
}

impl ReplayFixture {
    pub fn two_player(codes: [&str; 2]) -> Self {
        let players = [(0u8, FOX), (1u8, FALCO)];

        let settings = GameSettings {
            slp_version: "3.12.0".into(),
            is_pal: false,
            stage_id: BATTLEFIELD,
            players: players
                .iter()
                .map(|&(index, character_id)| PlayerSettings {
                    player_index: index,
                    port: index + 1,
                    character_id,
                    character_color: 0,
                })
                .collect(),
        };

        let metadata = GameMetadata {
            start_at: Some(DEFAULT_START_AT.into()),
            last_frame: 0,
            played_on: Some("dolphin".into()),
            players: codes
                .iter()
                .enumerate()
                .map(|(index, code)| {
                    let names = PlayerNames {
                        netplay: format!("Player {}", index + 1),
                        code: (*code).to_string(),
                    };
                    (index.to_string(), MetadataPlayer { names })
                })
                .collect(),
        };

        let stats = RawStats {
            stocks: vec![StockEvent {
                player_index: 1,
                start_frame: -123,
                end_frame: Some(3000),
                start_percent: 0.0,
                end_percent: Some(112.5),
                current_percent: 112.5,
                count: 4,
                death_animation: Some(1),
            }],
            playable_frame_count: 0,
            game_complete: true,
            action_counts: players
                .iter()
                .map(|&(index, _)| ActionCounts {
                    player_index: index,
                    opponent_index: 1 - index,
                    counters: ActionCounters {
                        wavedash_count: 3 + u32::from(index),
                        dash_dance_count: 7,
                        ledgegrab_count: 1,
                        ..Default::default()
                    },
                })
                .collect(),
            overall: players
                .iter()
                .map(|&(index, _)| OverallStats {
                    player_index: index,
                    opponent_index: 1 - index,
                    metrics: OverallMetrics {
                        input_count: 400,
                        conversion_count: 6,
                        total_damage: 112.5,
                        kill_count: u32::from(index == 0),
                        ..Default::default()
                    },
                })
                .collect(),
        };

        let computed = ComputedStats {
            games: vec![ComputedGame {
                players: vec![
                    ComputedPlayer {
                        character_id: FOX,
                        game_result: GameResult::Winner,
                        final_stock_count: 4,
                    },
                    ComputedPlayer {
                        character_id: FALCO,
                        game_result: GameResult::Loser,
                        final_stock_count: 3,
                    },
                ],
            }],
            summary: SUMMARY_SECTION_IDS
                .iter()
                .map(|id| summary_section(id))
                .collect(),
        };

        Self {
            replay: ParsedReplay {
                settings,
                metadata,
                game_end: GameEnd {
                    game_end_method: Some(2),
                    lras_initiator_index: None,
                },
                stats,
                frames: BTreeMap::new(),
                computed,
            },
        }
        .duration_seconds(60)
    }

    /// Sets the last frame; playable frames include the 123 frame countdown.
    pub fn duration_frames(mut self, frames: i32) -> Self {
        self.replay.metadata.last_frame = frames;
        self.replay.stats.playable_frame_count = frames + 123;
        self
    }

    pub fn duration_seconds(self, seconds: u32) -> Self {
        let fps = if self.replay.settings.is_pal { 50 } else { 60 };
        self.duration_frames((seconds * fps) as i32)
    }

    /// Switches to PAL, keeping the frame count.
    pub fn pal(mut self) -> Self {
        self.replay.settings.is_pal = true;
        self
    }

    pub fn without_stocks(mut self) -> Self {
        self.replay.stats.stocks.clear();
        self
    }

    pub fn without_start_time(mut self) -> Self {
        self.replay.metadata.start_at = None;
        self
    }

    pub fn start_at(mut self, start_at: &str) -> Self {
        self.replay.metadata.start_at = Some(start_at.into());
        self
    }

    pub fn with_frames(mut self, frames: impl IntoIterator<Item = (i32, Frame)>) -> Self {
        self.replay.frames.extend(frames);
        self
    }

    /// Makes the player in `slot` the winner.
    pub fn winner(mut self, slot: usize) -> Self {
        if let Some(game) = self.replay.computed.games.first_mut() {
            for (index, player) in game.players.iter_mut().enumerate() {
                player.game_result = if index == slot {
                    GameResult::Winner
                } else {
                    GameResult::Loser
                };
            }
        }
        self
    }

    /// Arbitrary edit for cases the builder does not cover.
    pub fn map(mut self, edit: impl FnOnce(&mut ParsedReplay)) -> Self {
        edit(&mut self.replay);
        self
    }

    pub fn build(self) -> ParsedReplay {
        self.replay
    }

    /// The replay as the JSON dump read by the file parser.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.replay)
    }
}

/// One frame with a single player's post-frame state.
pub fn attack_frame(player_index: u8, action_state_id: u16, l_cancel_status: Option<u8>) -> Frame {
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

fn summary_section(id: &str) -> SummarySection {
    let results = (0..2u8)
        .map(|slot| {
            let number = f64::from(slot + 1);
            let result = match id {
                "killMoves" => json!([{"move": "Up Smash", "count": slot}]),
                "neutralOpenerMoves" => json!([{"move": "Neutral Air", "count": 2 + slot}]),
                "avgKillPercent" => json!(95.5 + f64::from(slot)),
                _ => json!(number),
            };
            SummaryResult {
                result,
                simple: Some(SimpleResult { number }),
            }
        })
        .collect();
    SummarySection {
        id: id.to_string(),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_a_complete_game() {
        let replay = ReplayFixture::two_player(["ABC#123", "XYZ#987"]).build();
        assert_eq!(replay.metadata.last_frame, 3600);
        assert_eq!(replay.settings.players.len(), 2);
        assert_eq!(replay.metadata.players["1"].names.code, "XYZ#987");
        assert_eq!(replay.computed.summary[3].id, "killMoves");
        assert_eq!(replay.computed.summary[10].id, "highDamagePunishes");
    }

    #[test]
    fn winner_flips_results() {
        let replay = ReplayFixture::two_player(["ABC#123", "XYZ#987"])
            .winner(1)
            .build();
        let players = &replay.computed.games[0].players;
        assert_eq!(players[0].game_result, GameResult::Loser);
        assert_eq!(players[1].game_result, GameResult::Winner);
    }
}
