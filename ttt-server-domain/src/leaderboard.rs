use std::{cmp::Ordering, sync::Arc};

use chrono::{DateTime, Utc};
use log::debug;
use serde::Serialize;

use crate::{
    ServiceError, ServiceResult,
    player::{ArcPlayerRepository, Player},
    stats::PlayerStats,
    util::MAX_NAME_LENGTH,
};

pub const MAX_PAGE_LIMIT: i64 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaderboardMetric {
    Wins,
    Efficiency,
}

impl LeaderboardMetric {
    /// Orders higher values first.
    pub fn compare(&self, a: &PlayerStats, b: &PlayerStats) -> Ordering {
        match self {
            LeaderboardMetric::Wins => b.games_won().cmp(&a.games_won()),
            LeaderboardMetric::Efficiency => b.efficiency().total_cmp(&a.efficiency()),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct LeaderboardFilters {
    pub min_games: Option<i64>,
    pub name_contains: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

/// Filters after validation, ready to be applied to players.
struct PlayerFilter {
    min_games: Option<u32>,
    name_contains: Option<String>,
    date_from: Option<DateTime<Utc>>,
    date_to: Option<DateTime<Utc>>,
}

impl PlayerFilter {
    fn from_filters(filters: &LeaderboardFilters) -> ServiceResult<Self> {
        let min_games = match filters.min_games {
            Some(n) if n < 0 => {
                return ServiceError::invalid_input("minGames", "must not be negative");
            }
            Some(n) => Some(u32::try_from(n).unwrap_or(u32::MAX)),
            None => None,
        };
        let name_contains = match filters.name_contains.as_deref() {
            Some(name) => {
                // length applies to the raw value, emptiness to the trimmed one
                let too_long = name.chars().count() > MAX_NAME_LENGTH;
                let name = name.trim();
                if name.is_empty() || too_long {
                    return ServiceError::invalid_input(
                        "nameContains",
                        format!("must be between 1 and {} characters", MAX_NAME_LENGTH),
                    );
                }
                Some(name.to_lowercase())
            }
            None => None,
        };
        if let (Some(from), Some(to)) = (filters.date_from, filters.date_to) {
            if from > to {
                return ServiceError::invalid_input("dateFrom", "must not be after dateTo");
            }
        }
        Ok(PlayerFilter {
            min_games,
            name_contains,
            date_from: filters.date_from,
            date_to: filters.date_to,
        })
    }

    fn matches(&self, player: &Player) -> bool {
        self.min_games
            .is_none_or(|min| player.stats.games_played() >= min)
            && self
                .name_contains
                .as_ref()
                .is_none_or(|needle| player.name.to_lowercase().contains(needle))
            && self.date_from.is_none_or(|from| player.created_at >= from)
            && self.date_to.is_none_or(|to| player.created_at <= to)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardPage {
    pub metric: LeaderboardMetric,
    pub players: Vec<Player>,
    pub total: usize,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

pub type ArcLeaderboardService = Arc<Box<dyn LeaderboardService + Send + Sync + 'static>>;
pub trait LeaderboardService {
    fn rank(
        &self,
        metric: LeaderboardMetric,
        page: i64,
        limit: i64,
        filters: &LeaderboardFilters,
    ) -> ServiceResult<LeaderboardPage>;
    fn top_players(&self, metric: LeaderboardMetric, count: i64) -> ServiceResult<Vec<Player>>;
}

pub struct LeaderboardServiceImpl {
    player_repository: ArcPlayerRepository,
}

impl LeaderboardServiceImpl {
    pub fn new(player_repository: ArcPlayerRepository) -> Self {
        Self { player_repository }
    }

    fn validate_limit(field: &str, limit: i64) -> ServiceResult<usize> {
        if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
            return ServiceError::invalid_input(
                field,
                format!("must be between 1 and {}", MAX_PAGE_LIMIT),
            );
        }
        Ok(limit as usize)
    }

    fn ranked(&self, metric: LeaderboardMetric, filter: Option<&PlayerFilter>) -> Vec<Player> {
        let mut players: Vec<Player> = self
            .player_repository
            .get_players()
            .into_iter()
            .filter(|p| filter.is_none_or(|f| f.matches(p)))
            .collect();
        players.sort_by(|a, b| metric.compare(&a.stats, &b.stats));
        players
    }
}

impl LeaderboardService for LeaderboardServiceImpl {
    fn rank(
        &self,
        metric: LeaderboardMetric,
        page: i64,
        limit: i64,
        filters: &LeaderboardFilters,
    ) -> ServiceResult<LeaderboardPage> {
        if page < 1 {
            return ServiceError::invalid_input("page", "must be at least 1");
        }
        let page_size = Self::validate_limit("limit", limit)?;
        let filter = PlayerFilter::from_filters(filters)?;

        let ranked = self.ranked(metric, Some(&filter));
        let total = ranked.len();
        let total_pages = total.div_ceil(page_size) as i64;
        let players: Vec<Player> = ranked
            .into_iter()
            .skip((page as usize - 1).saturating_mul(page_size))
            .take(page_size)
            .collect();

        debug!(
            "Leaderboard by {:?}: page {}/{} with {} of {} players",
            metric,
            page,
            total_pages,
            players.len(),
            total
        );

        Ok(LeaderboardPage {
            metric,
            players,
            total,
            page,
            limit,
            total_pages,
            has_next: page < total_pages,
            has_prev: page > 1,
        })
    }

    fn top_players(&self, metric: LeaderboardMetric, count: i64) -> ServiceResult<Vec<Player>> {
        let count = Self::validate_limit("count", count)?;
        let mut players = self.ranked(metric, None);
        players.truncate(count);
        Ok(players)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::player::PlayerRepositoryImpl;

    use super::*;

    fn seeded(rows: &[(&str, u32, u32, u32)]) -> (ArcPlayerRepository, LeaderboardServiceImpl) {
        let repository: ArcPlayerRepository = Arc::new(Box::new(PlayerRepositoryImpl::new()));
        for (i, &(name, won, lost, moves)) in rows.iter().enumerate() {
            let mut player = Player::new(name.to_string(), format!("p{}@example.com", i));
            player.stats = PlayerStats::from_counters(won, lost, 0, moves);
            repository.create_player(&player).unwrap();
        }
        (repository.clone(), LeaderboardServiceImpl::new(repository))
    }

    fn names(players: &[Player]) -> Vec<&str> {
        players.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_rank_wins_second_page() {
        let rows: Vec<(String, u32)> = (0..25).map(|i| (format!("P{}", i), i as u32)).collect();
        let rows: Vec<(&str, u32, u32, u32)> = rows
            .iter()
            .map(|(name, wins)| (name.as_str(), *wins, 0, wins * 3 + 1))
            .collect();
        let (_, service) = seeded(&rows);

        let page = service
            .rank(LeaderboardMetric::Wins, 2, 10, &LeaderboardFilters::default())
            .unwrap();
        assert_eq!(page.total, 25);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next);
        assert!(page.has_prev);
        let wins: Vec<u32> = page.players.iter().map(|p| p.stats.games_won()).collect();
        assert_eq!(wins, (5..=14).rev().collect::<Vec<u32>>());

        let last = service
            .rank(LeaderboardMetric::Wins, 3, 10, &LeaderboardFilters::default())
            .unwrap();
        assert_eq!(last.players.len(), 5);
        assert!(!last.has_next);

        let beyond = service
            .rank(LeaderboardMetric::Wins, 4, 10, &LeaderboardFilters::default())
            .unwrap();
        assert!(beyond.players.is_empty());
    }

    #[test]
    fn test_rank_ties_keep_store_order() {
        let (_, service) = seeded(&[
            ("first", 1, 0, 4),
            ("second", 1, 0, 4),
            ("best", 3, 0, 9),
            ("third", 1, 0, 4),
        ]);
        let page = service
            .rank(LeaderboardMetric::Wins, 1, 10, &LeaderboardFilters::default())
            .unwrap();
        assert_eq!(names(&page.players), vec!["best", "first", "second", "third"]);

        let page = service
            .rank(LeaderboardMetric::Efficiency, 1, 10, &LeaderboardFilters::default())
            .unwrap();
        assert_eq!(names(&page.players), vec!["best", "first", "second", "third"]);
    }

    #[test]
    fn test_rank_efficiency() {
        let (_, service) = seeded(&[("slow", 3, 0, 30), ("quick", 1, 0, 3), ("none", 0, 2, 8)]);
        let page = service
            .rank(LeaderboardMetric::Efficiency, 1, 10, &LeaderboardFilters::default())
            .unwrap();
        assert_eq!(names(&page.players), vec!["quick", "slow", "none"]);
        assert_eq!(
            names(&service.top_players(LeaderboardMetric::Wins, 1).unwrap()),
            vec!["slow"]
        );
    }

    #[test]
    fn test_rank_filters() {
        let (repository, service) = seeded(&[
            ("Alice", 2, 1, 12),
            ("alfred", 0, 0, 0),
            ("Bob", 5, 5, 40),
            ("Malik", 1, 0, 3),
        ]);

        let filters = LeaderboardFilters {
            min_games: Some(1),
            name_contains: Some(" AL ".to_string()),
            ..Default::default()
        };
        let page = service.rank(LeaderboardMetric::Wins, 1, 10, &filters).unwrap();
        assert_eq!(names(&page.players), vec!["Alice", "Malik"]);
        assert_eq!(page.total, 2);

        let players = repository.get_players();
        let bob_created = players[2].created_at;
        let filters = LeaderboardFilters {
            date_from: Some(bob_created),
            date_to: Some(bob_created),
            ..Default::default()
        };
        let page = service.rank(LeaderboardMetric::Wins, 1, 10, &filters).unwrap();
        assert!(page.players.iter().any(|p| p.name == "Bob"));
        assert!(page.players.iter().all(|p| p.created_at == bob_created));

        let filters = LeaderboardFilters {
            date_from: Some(bob_created + Duration::days(1)),
            ..Default::default()
        };
        let page = service.rank(LeaderboardMetric::Wins, 1, 10, &filters).unwrap();
        assert_eq!(page.total, 0);
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next);
        assert!(!page.has_prev);
    }

    #[test]
    fn test_rank_rejects_invalid_arguments() {
        let (_, service) = seeded(&[("Alice", 1, 0, 3)]);
        let default = LeaderboardFilters::default();
        assert!(service.rank(LeaderboardMetric::Wins, 0, 10, &default).is_err());
        assert!(service.rank(LeaderboardMetric::Wins, 1, 0, &default).is_err());
        assert!(service.rank(LeaderboardMetric::Wins, 1, 101, &default).is_err());
        assert!(service.rank(LeaderboardMetric::Wins, 1, 100, &default).is_ok());

        let negative = LeaderboardFilters {
            min_games: Some(-1),
            ..Default::default()
        };
        assert!(service.rank(LeaderboardMetric::Wins, 1, 10, &negative).is_err());

        let blank_name = LeaderboardFilters {
            name_contains: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            service.rank(LeaderboardMetric::Wins, 1, 10, &blank_name),
            Err(ServiceError::InvalidInput { field, .. }) if field == "nameContains"
        ));

        let padded = format!(" {} ", "a".repeat(MAX_NAME_LENGTH));
        let padded_name = LeaderboardFilters {
            name_contains: Some(padded),
            ..Default::default()
        };
        assert!(matches!(
            service.rank(LeaderboardMetric::Wins, 1, 10, &padded_name),
            Err(ServiceError::InvalidInput { field, .. }) if field == "nameContains"
        ));
        let longest_name = LeaderboardFilters {
            name_contains: Some("a".repeat(MAX_NAME_LENGTH)),
            ..Default::default()
        };
        assert!(service.rank(LeaderboardMetric::Wins, 1, 10, &longest_name).is_ok());

        let now = Utc::now();
        let reversed = LeaderboardFilters {
            date_from: Some(now),
            date_to: Some(now - Duration::days(1)),
            ..Default::default()
        };
        assert!(service.rank(LeaderboardMetric::Efficiency, 1, 10, &reversed).is_err());
    }
}
