use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::{DashMap, mapref::entry::Entry};
use log::{debug, info};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    EntityKind, ServiceError, ServiceResult,
    leaderboard::LeaderboardMetric,
    stats::PlayerStats,
    store::EntityStore,
    util::{validate_email, validate_player_name},
};

pub type PlayerId = String;

const DEFAULT_SEARCH_LIMIT: i64 = 10;
const MAX_SEARCH_LIMIT: i64 = 100;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub email: String,
    pub stats: PlayerStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Player {
    /// Expects a name and email that already went through validation.
    pub fn new(name: String, email: String) -> Self {
        let now = Utc::now();
        Player {
            id: Uuid::new_v4().to_string(),
            name,
            email,
            stats: PlayerStats::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct PlayerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
}

pub type ArcPlayerRepository = Arc<Box<dyn PlayerRepository + Send + Sync + 'static>>;
pub trait PlayerRepository {
    fn create_player(&self, player: &Player) -> ServiceResult<()>;
    fn get_player(&self, id: &PlayerId) -> ServiceResult<Player>;
    fn get_player_by_email(&self, email: &str) -> ServiceResult<Player>;
    fn get_players(&self) -> Vec<Player>;
    fn update_player(
        &self,
        id: &PlayerId,
        f: &mut dyn FnMut(&mut Player) -> ServiceResult<()>,
    ) -> ServiceResult<Player>;
    fn delete_player(&self, id: &PlayerId) -> ServiceResult<Player>;
}

/// Players keyed by id plus an index from normalized email to owner.
/// A player entry is always locked before an email entry, never the other way round.
pub struct PlayerRepositoryImpl {
    players: EntityStore<PlayerId, Player>,
    emails: DashMap<String, PlayerId>,
}

impl PlayerRepositoryImpl {
    pub fn new() -> Self {
        Self {
            players: EntityStore::new(EntityKind::Player),
            emails: DashMap::new(),
        }
    }

    fn reserve_email(&self, email: &str, id: &PlayerId) -> ServiceResult<()> {
        match self.emails.entry(email.to_string()) {
            Entry::Occupied(e) if e.get() != id => {
                ServiceError::conflict(format!("email {} is already in use", email))
            }
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(e) => {
                e.insert(id.clone());
                Ok(())
            }
        }
    }

    fn release_email(&self, email: &str, id: &PlayerId) {
        self.emails.remove_if(email, |_, owner| owner == id);
    }
}

impl Default for PlayerRepositoryImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl PlayerRepository for PlayerRepositoryImpl {
    fn create_player(&self, player: &Player) -> ServiceResult<()> {
        self.reserve_email(&player.email, &player.id)?;
        if let Err(e) = self.players.insert(player.id.clone(), player.clone()) {
            self.release_email(&player.email, &player.id);
            return Err(e);
        }
        Ok(())
    }

    fn get_player(&self, id: &PlayerId) -> ServiceResult<Player> {
        self.players.get(id)
    }

    fn get_player_by_email(&self, email: &str) -> ServiceResult<Player> {
        let owner = self.emails.get(email).map(|owner| owner.clone());
        match owner {
            Some(id) => self.players.get(&id),
            None => ServiceError::not_found(EntityKind::Player, email),
        }
    }

    fn get_players(&self) -> Vec<Player> {
        self.players.values()
    }

    fn update_player(
        &self,
        id: &PlayerId,
        f: &mut dyn FnMut(&mut Player) -> ServiceResult<()>,
    ) -> ServiceResult<Player> {
        self.players.update(id, |player| {
            let old_email = player.email.clone();
            f(player)?;
            if player.email != old_email {
                self.reserve_email(&player.email, &player.id)?;
                self.release_email(&old_email, &player.id);
            }
            Ok(())
        })
    }

    fn delete_player(&self, id: &PlayerId) -> ServiceResult<Player> {
        let player = self.players.remove_if(id, |_| Ok(()))?;
        self.release_email(&player.email, &player.id);
        Ok(player)
    }
}

pub type ArcPlayerService = Arc<Box<dyn PlayerService + Send + Sync + 'static>>;
pub trait PlayerService {
    fn create_player(&self, name: &str, email: &str) -> ServiceResult<Player>;
    fn get_player(&self, id: &PlayerId) -> ServiceResult<Player>;
    fn get_player_by_email(&self, email: &str) -> ServiceResult<Player>;
    fn update_player(&self, id: &PlayerId, update: PlayerUpdate) -> ServiceResult<Player>;
    fn delete_player(&self, id: &PlayerId) -> ServiceResult<()>;
    fn list_players(&self) -> Vec<Player>;
    fn search_players_by_name(&self, query: &str, limit: Option<i64>)
    -> ServiceResult<Vec<Player>>;
    fn get_player_stats(&self, id: &PlayerId) -> ServiceResult<PlayerStats>;
}

pub struct PlayerServiceImpl {
    player_repository: ArcPlayerRepository,
}

impl PlayerServiceImpl {
    pub fn new(player_repository: ArcPlayerRepository) -> Self {
        Self { player_repository }
    }
}

impl PlayerService for PlayerServiceImpl {
    fn create_player(&self, name: &str, email: &str) -> ServiceResult<Player> {
        let name = validate_player_name(name)?;
        let email = validate_email(email)?;
        let player = Player::new(name, email);
        self.player_repository.create_player(&player)?;
        info!("Created player {} ({})", player.id, player.name);
        Ok(player)
    }

    fn get_player(&self, id: &PlayerId) -> ServiceResult<Player> {
        self.player_repository.get_player(id)
    }

    fn get_player_by_email(&self, email: &str) -> ServiceResult<Player> {
        self.player_repository
            .get_player_by_email(&email.trim().to_lowercase())
    }

    fn update_player(&self, id: &PlayerId, update: PlayerUpdate) -> ServiceResult<Player> {
        self.player_repository.update_player(id, &mut |player| {
            let mut changed = false;
            if let Some(name) = update.name.as_deref() {
                let name = validate_player_name(name)?;
                if player.name != name {
                    player.name = name;
                    changed = true;
                }
            }
            if let Some(email) = update.email.as_deref() {
                let email = validate_email(email)?;
                if player.email != email {
                    player.email = email;
                    changed = true;
                }
            }
            if changed {
                player.updated_at = Utc::now();
            }
            Ok(())
        })
    }

    fn delete_player(&self, id: &PlayerId) -> ServiceResult<()> {
        let player = self.player_repository.delete_player(id)?;
        info!("Deleted player {} ({})", player.id, player.name);
        Ok(())
    }

    fn list_players(&self) -> Vec<Player> {
        let mut players = self.player_repository.get_players();
        players.sort_by(|a, b| {
            LeaderboardMetric::Wins
                .compare(&a.stats, &b.stats)
                .then_with(|| LeaderboardMetric::Efficiency.compare(&a.stats, &b.stats))
        });
        players
    }

    fn search_players_by_name(
        &self,
        query: &str,
        limit: Option<i64>,
    ) -> ServiceResult<Vec<Player>> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return ServiceError::invalid_input("query", "must not be empty");
        }
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        if !(1..=MAX_SEARCH_LIMIT).contains(&limit) {
            return ServiceError::invalid_input(
                "limit",
                format!("must be between 1 and {}", MAX_SEARCH_LIMIT),
            );
        }
        let players: Vec<Player> = self
            .player_repository
            .get_players()
            .into_iter()
            .filter(|p| p.name.to_lowercase().contains(&query))
            .take(limit as usize)
            .collect();
        debug!("Search for {:?} matched {} players", query, players.len());
        Ok(players)
    }

    fn get_player_stats(&self, id: &PlayerId) -> ServiceResult<PlayerStats> {
        Ok(self.player_repository.get_player(id)?.stats)
    }
}
