use std::{fmt, sync::Arc};

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;
use ttt_core::{TttBoard, TttBoardState, TttPos};
use uuid::Uuid;

use crate::{
    EntityKind, ServiceError, ServiceResult,
    player::{ArcPlayerRepository, PlayerId},
    stats::{ArcStatsService, GameOutcome},
    store::EntityStore,
    util::validate_game_name,
};

pub type GameId = String;

const PLAYERS_PER_GAME: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Active,
    Completed,
    Draw,
}

impl GameStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, GameStatus::Completed | GameStatus::Draw)
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GameStatus::Waiting => "waiting",
            GameStatus::Active => "active",
            GameStatus::Completed => "completed",
            GameStatus::Draw => "draw",
        };
        write!(f, "{}", s)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub id: String,
    pub game_id: GameId,
    pub player_id: PlayerId,
    pub row: i32,
    pub col: i32,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub status: GameStatus,
    pub board: TttBoard<PlayerId>,
    pub players: Vec<PlayerId>,
    pub current_player_id: Option<PlayerId>,
    pub winner_id: Option<PlayerId>,
    pub moves: Vec<Move>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Game {
    /// A fresh game without players. A missing name becomes `Game <id prefix>`.
    pub fn new(name: Option<String>) -> Self {
        let id = Uuid::new_v4().to_string();
        let name = name.unwrap_or_else(|| format!("Game {}", &id[..8]));
        let now = Utc::now();
        Game {
            id,
            name,
            status: GameStatus::Waiting,
            board: TttBoard::new(),
            players: Vec::with_capacity(PLAYERS_PER_GAME),
            current_player_id: None,
            winner_id: None,
            moves: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn opponent_of(&self, player_id: &PlayerId) -> Option<&PlayerId> {
        if !self.players.contains(player_id) {
            return None;
        }
        self.players.iter().find(|p| *p != player_id)
    }

    fn join(&mut self, player_id: &PlayerId) -> ServiceResult<()> {
        if self.status != GameStatus::Waiting {
            return ServiceError::invalid_state(format!(
                "cannot join a game that is {}",
                self.status
            ));
        }
        if self.players.contains(player_id) {
            return ServiceError::invalid_state("player already joined this game");
        }
        if self.players.len() >= PLAYERS_PER_GAME {
            return ServiceError::invalid_state("game is full");
        }
        self.players.push(player_id.clone());
        if self.players.len() == PLAYERS_PER_GAME {
            self.status = GameStatus::Active;
            self.current_player_id = self.players.first().cloned();
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    fn apply_move(&mut self, player_id: &PlayerId, pos: TttPos) -> ServiceResult<Move> {
        if !pos.is_valid() {
            let field = if (0..3).contains(&pos.row) { "col" } else { "row" };
            return ServiceError::invalid_input(field, "must be between 0 and 2");
        }
        if self.status != GameStatus::Active {
            return ServiceError::invalid_state(format!(
                "cannot move in a game that is {}",
                self.status
            ));
        }
        if !self.players.contains(player_id) {
            return ServiceError::conflict("player is not part of this game");
        }
        if self.current_player_id.as_ref() != Some(player_id) {
            return ServiceError::conflict("it is not this player's turn");
        }
        if let Err(e) = self.board.do_place(&pos, player_id.clone()) {
            return ServiceError::conflict(format!(
                "cannot place at ({}, {}): {}",
                pos.row, pos.col, e
            ));
        }

        let now = Utc::now();
        let mv = Move {
            id: Uuid::new_v4().to_string(),
            game_id: self.id.clone(),
            player_id: player_id.clone(),
            row: pos.row,
            col: pos.col,
            timestamp: now,
        };
        self.moves.push(mv.clone());
        self.updated_at = now;

        match self.board.evaluate(player_id) {
            TttBoardState::Win(winner) => {
                self.status = GameStatus::Completed;
                self.winner_id = Some(winner);
            }
            TttBoardState::Draw => {
                self.status = GameStatus::Draw;
            }
            TttBoardState::Ongoing => {
                self.current_player_id = self.opponent_of(player_id).cloned();
            }
        }
        Ok(mv)
    }

    /// Per-participant outcomes of a finished game, in join order.
    pub fn outcomes(&self) -> Vec<(PlayerId, GameOutcome)> {
        match self.status {
            GameStatus::Completed => self
                .players
                .iter()
                .map(|p| {
                    let outcome = if self.winner_id.as_ref() == Some(p) {
                        GameOutcome::Won
                    } else {
                        GameOutcome::Lost
                    };
                    (p.clone(), outcome)
                })
                .collect(),
            GameStatus::Draw => self
                .players
                .iter()
                .map(|p| (p.clone(), GameOutcome::Drawn))
                .collect(),
            GameStatus::Waiting | GameStatus::Active => Vec::new(),
        }
    }
}

/// Empty cells in row-major order.
pub fn get_valid_moves(board: &TttBoard<PlayerId>) -> Vec<TttPos> {
    board.valid_moves().collect()
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveResult {
    pub game: Game,
    #[serde(rename = "move")]
    pub mv: Move,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStatusView {
    pub game_id: GameId,
    pub status: GameStatus,
    pub current_player_id: Option<PlayerId>,
    pub winner_id: Option<PlayerId>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMoveCount {
    pub player_id: PlayerId,
    pub moves: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameStats {
    pub game_id: GameId,
    pub status: GameStatus,
    pub total_moves: usize,
    pub moves_by_player: Vec<PlayerMoveCount>,
    pub empty_cells: usize,
    pub winner_id: Option<PlayerId>,
    pub duration_seconds: i64,
}

impl From<&Game> for GameStats {
    fn from(game: &Game) -> Self {
        let moves_by_player = game
            .players
            .iter()
            .map(|p| PlayerMoveCount {
                player_id: p.clone(),
                moves: game.moves.iter().filter(|m| &m.player_id == p).count(),
            })
            .collect();
        GameStats {
            game_id: game.id.clone(),
            status: game.status,
            total_moves: game.moves.len(),
            moves_by_player,
            empty_cells: game.board.valid_moves().count(),
            winner_id: game.winner_id.clone(),
            duration_seconds: (game.updated_at - game.created_at).num_seconds(),
        }
    }
}

pub type ArcGameRepository = Arc<Box<dyn GameRepository + Send + Sync + 'static>>;
pub trait GameRepository {
    fn create_game(&self, game: &Game) -> ServiceResult<()>;
    fn get_game(&self, id: &GameId) -> ServiceResult<Game>;
    fn get_games(&self) -> Vec<Game>;
    fn update_game(
        &self,
        id: &GameId,
        f: &mut dyn FnMut(&mut Game) -> ServiceResult<()>,
    ) -> ServiceResult<Game>;
    fn delete_game(
        &self,
        id: &GameId,
        check: &mut dyn FnMut(&Game) -> ServiceResult<()>,
    ) -> ServiceResult<Game>;
}

pub struct GameRepositoryImpl {
    games: EntityStore<GameId, Game>,
}

impl GameRepositoryImpl {
    pub fn new() -> Self {
        Self {
            games: EntityStore::new(EntityKind::Game),
        }
    }
}

impl Default for GameRepositoryImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl GameRepository for GameRepositoryImpl {
    fn create_game(&self, game: &Game) -> ServiceResult<()> {
        self.games.insert(game.id.clone(), game.clone())
    }

    fn get_game(&self, id: &GameId) -> ServiceResult<Game> {
        self.games.get(id)
    }

    fn get_games(&self) -> Vec<Game> {
        self.games.values()
    }

    fn update_game(
        &self,
        id: &GameId,
        f: &mut dyn FnMut(&mut Game) -> ServiceResult<()>,
    ) -> ServiceResult<Game> {
        self.games.update(id, f)
    }

    fn delete_game(
        &self,
        id: &GameId,
        check: &mut dyn FnMut(&Game) -> ServiceResult<()>,
    ) -> ServiceResult<Game> {
        self.games.remove_if(id, check)
    }
}

pub type ArcGameService = Arc<Box<dyn GameService + Send + Sync + 'static>>;
pub trait GameService {
    fn create_game(&self, name: Option<&str>) -> ServiceResult<Game>;
    fn get_game(&self, id: &GameId) -> ServiceResult<Game>;
    fn list_games(&self, status: Option<GameStatus>) -> Vec<Game>;
    fn get_game_status(&self, id: &GameId) -> ServiceResult<GameStatusView>;
    fn join_game(&self, id: &GameId, player_id: &PlayerId) -> ServiceResult<Game>;
    fn make_move(
        &self,
        id: &GameId,
        player_id: &PlayerId,
        row: i32,
        col: i32,
    ) -> ServiceResult<MoveResult>;
    fn get_valid_moves(&self, id: &GameId) -> ServiceResult<Vec<TttPos>>;
    fn get_game_stats(&self, id: &GameId) -> ServiceResult<GameStats>;
    fn delete_game(&self, id: &GameId) -> ServiceResult<()>;
}

pub struct GameServiceImpl {
    game_repository: ArcGameRepository,
    player_repository: ArcPlayerRepository,
    stats_service: ArcStatsService,
}

impl GameServiceImpl {
    pub fn new(
        game_repository: ArcGameRepository,
        player_repository: ArcPlayerRepository,
        stats_service: ArcStatsService,
    ) -> Self {
        Self {
            game_repository,
            player_repository,
            stats_service,
        }
    }

    /// Records the result for every participant, then fails with the first error seen.
    fn report_outcomes(&self, game: &Game) -> ServiceResult<()> {
        let moves_in_game = game.moves.len() as u32;
        let mut first_error = None;
        for (player_id, outcome) in game.outcomes() {
            if let Err(e) = self
                .stats_service
                .update_after_game(&player_id, outcome, moves_in_game)
            {
                warn!(
                    "Failed to record {:?} for player {} in game {}: {}",
                    outcome, player_id, game.id, e
                );
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl GameService for GameServiceImpl {
    fn create_game(&self, name: Option<&str>) -> ServiceResult<Game> {
        let name = match name {
            Some(name) if !name.is_empty() => Some(validate_game_name(name)?),
            _ => None,
        };
        let game = Game::new(name);
        self.game_repository.create_game(&game)?;
        info!("Created game {} ({})", game.id, game.name);
        Ok(game)
    }

    fn get_game(&self, id: &GameId) -> ServiceResult<Game> {
        self.game_repository.get_game(id)
    }

    fn list_games(&self, status: Option<GameStatus>) -> Vec<Game> {
        self.game_repository
            .get_games()
            .into_iter()
            .filter(|g| status.is_none_or(|s| g.status == s))
            .collect()
    }

    fn get_game_status(&self, id: &GameId) -> ServiceResult<GameStatusView> {
        let game = self.game_repository.get_game(id)?;
        Ok(GameStatusView {
            game_id: game.id,
            status: game.status,
            current_player_id: game.current_player_id,
            winner_id: game.winner_id,
        })
    }

    fn join_game(&self, id: &GameId, player_id: &PlayerId) -> ServiceResult<Game> {
        self.game_repository.get_game(id)?;
        self.player_repository.get_player(player_id)?;
        let game = self
            .game_repository
            .update_game(id, &mut |game| game.join(player_id))?;
        debug!(
            "Player {} joined game {} ({} of {})",
            player_id,
            id,
            game.players.len(),
            PLAYERS_PER_GAME
        );
        if game.status == GameStatus::Active {
            info!("Game {} started", id);
        }
        Ok(game)
    }

    fn make_move(
        &self,
        id: &GameId,
        player_id: &PlayerId,
        row: i32,
        col: i32,
    ) -> ServiceResult<MoveResult> {
        let pos = TttPos::new(row, col);
        let mut recorded = None;
        let game = self.game_repository.update_game(id, &mut |game| {
            recorded = Some(game.apply_move(player_id, pos)?);
            Ok(())
        })?;
        let Some(mv) = recorded else {
            return ServiceError::invalid_state("move was not recorded");
        };
        debug!("Player {} played ({}, {}) in game {}", player_id, row, col, id);

        // Only the move that ended an active game can observe a terminal state here.
        if game.status.is_terminal() {
            info!(
                "Game {} finished as {} after {} moves",
                id,
                game.status,
                game.moves.len()
            );
            self.report_outcomes(&game)?;
        }
        Ok(MoveResult { game, mv })
    }

    fn get_valid_moves(&self, id: &GameId) -> ServiceResult<Vec<TttPos>> {
        let game = self.game_repository.get_game(id)?;
        Ok(get_valid_moves(&game.board))
    }

    fn get_game_stats(&self, id: &GameId) -> ServiceResult<GameStats> {
        let game = self.game_repository.get_game(id)?;
        Ok(GameStats::from(&game))
    }

    fn delete_game(&self, id: &GameId) -> ServiceResult<()> {
        self.game_repository.delete_game(id, &mut |game| {
            if game.status == GameStatus::Active {
                return ServiceError::invalid_state("cannot delete an active game");
            }
            Ok(())
        })?;
        info!("Deleted game {}", id);
        Ok(())
    }
}
