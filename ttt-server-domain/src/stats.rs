use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::debug;
use serde::Serialize;

use crate::{
    ServiceResult,
    player::{ArcPlayerRepository, PlayerId},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameOutcome {
    Won,
    Lost,
    Drawn,
}

/// Cumulative results of a player. Only the four counters are stored state,
/// every other field is recomputed from them whenever a counter changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    games_played: u32,
    games_won: u32,
    games_lost: u32,
    games_drawn: u32,
    total_moves: u32,
    win_rate: f64,
    efficiency: f64,
    average_moves_per_win: f64,
}

impl PlayerStats {
    pub fn from_counters(
        games_won: u32,
        games_lost: u32,
        games_drawn: u32,
        total_moves: u32,
    ) -> Self {
        let mut stats = PlayerStats {
            games_won,
            games_lost,
            games_drawn,
            total_moves,
            ..Default::default()
        };
        stats.recompute();
        stats
    }

    pub fn record(&mut self, outcome: GameOutcome, moves_in_game: u32) {
        match outcome {
            GameOutcome::Won => self.games_won += 1,
            GameOutcome::Lost => self.games_lost += 1,
            GameOutcome::Drawn => self.games_drawn += 1,
        }
        self.total_moves += moves_in_game;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.games_played = self.games_won + self.games_lost + self.games_drawn;
        self.win_rate = if self.games_played == 0 {
            0.0
        } else {
            self.games_won as f64 / self.games_played as f64 * 100.0
        };
        self.efficiency = if self.total_moves == 0 {
            0.0
        } else {
            self.games_won as f64 / self.total_moves as f64
        };
        self.average_moves_per_win = if self.games_won == 0 {
            0.0
        } else {
            self.total_moves as f64 / self.games_won as f64
        };
    }

    pub fn games_played(&self) -> u32 {
        self.games_played
    }
    pub fn games_won(&self) -> u32 {
        self.games_won
    }
    pub fn games_lost(&self) -> u32 {
        self.games_lost
    }
    pub fn games_drawn(&self) -> u32 {
        self.games_drawn
    }
    pub fn total_moves(&self) -> u32 {
        self.total_moves
    }
    pub fn win_rate(&self) -> f64 {
        self.win_rate
    }
    pub fn efficiency(&self) -> f64 {
        self.efficiency
    }
    pub fn average_moves_per_win(&self) -> f64 {
        self.average_moves_per_win
    }
}

pub type ArcStatsService = Arc<Box<dyn StatsService + Send + Sync + 'static>>;
pub trait StatsService {
    fn update_after_game(
        &self,
        player_id: &PlayerId,
        outcome: GameOutcome,
        moves_in_game: u32,
    ) -> ServiceResult<PlayerStats>;
}

pub struct StatsServiceImpl {
    player_repository: ArcPlayerRepository,
}

impl StatsServiceImpl {
    pub fn new(player_repository: ArcPlayerRepository) -> Self {
        Self { player_repository }
    }
}

impl StatsService for StatsServiceImpl {
    fn update_after_game(
        &self,
        player_id: &PlayerId,
        outcome: GameOutcome,
        moves_in_game: u32,
    ) -> ServiceResult<PlayerStats> {
        let player = self.player_repository.update_player(player_id, &mut |player| {
            player.stats.record(outcome, moves_in_game);
            player.updated_at = Utc::now();
            Ok(())
        })?;
        debug!(
            "Player {} {:?} a game of {} moves, now {}/{}/{}",
            player_id,
            outcome,
            moves_in_game,
            player.stats.games_won,
            player.stats.games_lost,
            player.stats.games_drawn
        );
        Ok(player.stats)
    }
}

#[derive(Clone, Default)]
pub struct MockStatsService {
    reports: Arc<Mutex<Vec<(PlayerId, GameOutcome, u32)>>>,
}

impl MockStatsService {
    pub fn get_reports(&self) -> Vec<(PlayerId, GameOutcome, u32)> {
        self.reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default()
    }
}

impl StatsService for MockStatsService {
    fn update_after_game(
        &self,
        player_id: &PlayerId,
        outcome: GameOutcome,
        moves_in_game: u32,
    ) -> ServiceResult<PlayerStats> {
        if let Ok(mut reports) = self.reports.lock() {
            reports.push((player_id.clone(), outcome, moves_in_game));
        }
        let mut stats = PlayerStats::default();
        stats.record(outcome, moves_in_game);
        Ok(stats)
    }
}
