use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use log::{debug, info, warn};
use tokio::task::JoinSet;
use ttt_server_domain::{
    ServiceResult,
    app::AppState,
    game::GameId,
    leaderboard::{LeaderboardFilters, LeaderboardMetric, LeaderboardPage},
    player::PlayerId,
};

use crate::config::SimulationConfig;

const TICK: Duration = Duration::from_millis(100);
const REPORT_INTERVAL: Duration = Duration::from_secs(1);
const LEADERBOARD_SIZE: i64 = 10;

#[derive(Default)]
pub struct SimulationCounters {
    pub sent: AtomicU64,
    pub accepted: AtomicU64,
    pub games_started: AtomicU64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimulationReport {
    pub sent: u64,
    pub accepted: u64,
    pub games_started: u64,
    pub elapsed: Duration,
}

struct Table {
    game_id: GameId,
    seats: (PlayerId, PlayerId),
}

/// Fires random moves at a few games from many tasks at once and
/// replaces every game that finishes with a fresh one between the same players.
pub struct Simulation {
    app: AppState,
    config: SimulationConfig,
    players: Vec<PlayerId>,
    tables: Vec<Table>,
    counters: Arc<SimulationCounters>,
}

impl Simulation {
    pub fn setup(app: AppState, config: SimulationConfig) -> ServiceResult<Self> {
        let mut players = Vec::with_capacity(config.players);
        for i in 1..=config.players {
            let player = app
                .player_service
                .create_player(&format!("P{}", i), &format!("p{}@example.com", i))?;
            players.push(player.id);
        }

        let mut simulation = Simulation {
            app,
            config,
            players,
            tables: Vec::new(),
            counters: Arc::new(SimulationCounters::default()),
        };
        for i in 0..simulation.config.games {
            let seats = (
                simulation.players[(2 * i) % simulation.players.len()].clone(),
                simulation.players[(2 * i + 1) % simulation.players.len()].clone(),
            );
            let name = format!("PerfTest{}", i + 1);
            let game_id = simulation.open_table(Some(name.as_str()), &seats)?;
            simulation.tables.push(Table { game_id, seats });
        }
        Ok(simulation)
    }

    fn open_table(&self, name: Option<&str>, seats: &(PlayerId, PlayerId)) -> ServiceResult<GameId> {
        let game = self.app.game_service.create_game(name)?;
        self.app.game_service.join_game(&game.id, &seats.0)?;
        self.app.game_service.join_game(&game.id, &seats.1)?;
        self.counters.games_started.fetch_add(1, Ordering::Relaxed);
        Ok(game.id)
    }

    fn refresh_finished_tables(&mut self) {
        for i in 0..self.tables.len() {
            let finished = match self.app.game_service.get_game_status(&self.tables[i].game_id) {
                Ok(status) => status.status.is_terminal(),
                Err(e) => {
                    warn!("Lost track of game {}: {}", self.tables[i].game_id, e);
                    true
                }
            };
            if !finished {
                continue;
            }
            match self.open_table(None, &self.tables[i].seats) {
                Ok(game_id) => {
                    debug!("Table {} continues with game {}", i, game_id);
                    self.tables[i].game_id = game_id;
                }
                Err(e) => warn!("Failed to open a new game for table {}: {}", i, e),
            }
        }
    }

    fn fire_batch(&self, tasks: &mut JoinSet<()>) {
        let batch_size = (self.config.target_tps / 10).max(1);
        for _ in 0..batch_size {
            let row: i32 = rand::random_range(0..3);
            let col: i32 = rand::random_range(0..3);
            let first_seat: bool = rand::random();
            self.counters.sent.fetch_add(1, Ordering::Relaxed);
            for table in &self.tables {
                let player = if first_seat {
                    table.seats.0.clone()
                } else {
                    table.seats.1.clone()
                };
                let game_id = table.game_id.clone();
                let game_service = self.app.game_service.clone();
                let counters = self.counters.clone();
                tasks.spawn_blocking(move || {
                    match game_service.make_move(&game_id, &player, row, col) {
                        Ok(_) => {
                            counters.accepted.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => debug!("Move ({}, {}) in {} rejected: {}", row, col, game_id, e),
                    }
                });
            }
        }
    }

    fn report(&self, started: Instant) -> SimulationReport {
        SimulationReport {
            sent: self.counters.sent.load(Ordering::Relaxed),
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            games_started: self.counters.games_started.load(Ordering::Relaxed),
            elapsed: started.elapsed(),
        }
    }

    /// Runs until the configured duration has passed or `shutdown` resolves.
    pub async fn run<F>(mut self, shutdown: F) -> SimulationReport
    where
        F: Future<Output = ()>,
    {
        let started = Instant::now();
        let deadline = started + self.config.duration;
        let mut tick = tokio::time::interval(TICK);
        let mut report = tokio::time::interval(REPORT_INTERVAL);
        report.tick().await;
        tokio::pin!(shutdown);

        info!(
            "Simulating {} moves/s on {} games for {:?}",
            self.config.target_tps,
            self.tables.len(),
            self.config.duration
        );

        while Instant::now() < deadline {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tick.tick() => {
                    self.refresh_finished_tables();
                    let mut tasks = JoinSet::new();
                    self.fire_batch(&mut tasks);
                    while let Some(result) = tasks.join_next().await {
                        if let Err(e) = result {
                            warn!("Move task failed: {}", e);
                        }
                    }
                }
                _ = report.tick() => {
                    let current = self.report(started);
                    let secs = current.elapsed.as_secs_f64();
                    info!(
                        "elapsed={:.1}s sent={} accepted={} games={} rate={:.1}/s",
                        secs,
                        current.sent,
                        current.accepted,
                        current.games_started,
                        current.sent as f64 / secs.max(f64::EPSILON)
                    );
                }
            }
        }

        self.report(started)
    }
}

pub fn leaderboard(app: &AppState) -> ServiceResult<LeaderboardPage> {
    app.leaderboard_service.rank(
        LeaderboardMetric::Wins,
        1,
        LEADERBOARD_SIZE,
        &LeaderboardFilters::default(),
    )
}
