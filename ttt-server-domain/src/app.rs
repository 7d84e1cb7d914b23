use std::sync::Arc;

use crate::{
    game::{ArcGameRepository, ArcGameService, GameRepositoryImpl, GameServiceImpl},
    leaderboard::{ArcLeaderboardService, LeaderboardServiceImpl},
    player::{ArcPlayerRepository, ArcPlayerService, PlayerRepositoryImpl, PlayerServiceImpl},
    stats::{ArcStatsService, StatsServiceImpl},
};

#[derive(Clone)]
pub struct AppState {
    pub game_service: ArcGameService,
    pub player_service: ArcPlayerService,
    pub stats_service: ArcStatsService,
    pub leaderboard_service: ArcLeaderboardService,

    pub game_repository: ArcGameRepository,
    pub player_repository: ArcPlayerRepository,
}

pub fn construct_app(
    game_repository: ArcGameRepository,
    player_repository: ArcPlayerRepository,
) -> AppState {
    let stats_service: ArcStatsService =
        Arc::new(Box::new(StatsServiceImpl::new(player_repository.clone())));

    let player_service: ArcPlayerService =
        Arc::new(Box::new(PlayerServiceImpl::new(player_repository.clone())));

    let game_service: ArcGameService = Arc::new(Box::new(GameServiceImpl::new(
        game_repository.clone(),
        player_repository.clone(),
        stats_service.clone(),
    )));

    let leaderboard_service: ArcLeaderboardService = Arc::new(Box::new(
        LeaderboardServiceImpl::new(player_repository.clone()),
    ));

    AppState {
        game_service,
        player_service,
        stats_service,
        leaderboard_service,

        game_repository,
        player_repository,
    }
}

/// Application wired to fresh in-memory stores.
pub fn construct_in_memory_app() -> AppState {
    construct_app(
        Arc::new(Box::new(GameRepositoryImpl::new())),
        Arc::new(Box::new(PlayerRepositoryImpl::new())),
    )
}
