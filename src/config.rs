use std::{str::FromStr, time::Duration};

use thiserror::Error;

const DEFAULT_TARGET_TPS: u32 = 200;
const DEFAULT_DURATION_SECS: u64 = 30;
const DEFAULT_GAMES: usize = 2;
const DEFAULT_PLAYERS: usize = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },

    #[error("{key} must be at least {min}")]
    TooSmall { key: String, min: u64 },
}

#[derive(Clone, Debug, PartialEq)]
pub struct LogConfig {
    pub file_path: Option<String>,
    pub archive_pattern: String,
}

impl LogConfig {
    pub fn from_env() -> Self {
        let file_path = std::env::var("LOG_FILE_PATH").ok().filter(|p| !p.is_empty());
        let archive_pattern = std::env::var("LOG_ARCHIVE_PATTERN").unwrap_or_else(|_| {
            file_path
                .as_ref()
                .map(|p| format!("{}.{{}}.gz", p))
                .unwrap_or_default()
        });
        LogConfig {
            file_path,
            archive_pattern,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    pub target_tps: u32,
    pub duration: Duration,
    pub games: usize,
    pub players: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            target_tps: DEFAULT_TARGET_TPS,
            duration: Duration::from_secs(DEFAULT_DURATION_SECS),
            games: DEFAULT_GAMES,
            players: DEFAULT_PLAYERS,
        }
    }
}

impl SimulationConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SimulationConfig::default();
        let config = SimulationConfig {
            target_tps: parse_var(&lookup, "SIM_TARGET_TPS", defaults.target_tps)?,
            duration: Duration::from_secs(parse_var(
                &lookup,
                "SIM_DURATION_SECS",
                defaults.duration.as_secs(),
            )?),
            games: parse_var(&lookup, "SIM_GAMES", defaults.games)?,
            players: parse_var(&lookup, "SIM_PLAYERS", defaults.players)?,
        };
        if config.target_tps < 10 {
            return Err(ConfigError::TooSmall {
                key: "SIM_TARGET_TPS".to_string(),
                min: 10,
            });
        }
        if config.games == 0 {
            return Err(ConfigError::TooSmall {
                key: "SIM_GAMES".to_string(),
                min: 1,
            });
        }
        if config.players < 2 {
            return Err(ConfigError::TooSmall {
                key: "SIM_PLAYERS".to_string(),
                min: 2,
            });
        }
        Ok(config)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            key: key.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = SimulationConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.target_tps, 200);
        assert_eq!(config.duration, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = SimulationConfig::from_lookup(lookup(&[
            ("SIM_TARGET_TPS", "50"),
            ("SIM_DURATION_SECS", " 5 "),
            ("SIM_GAMES", "4"),
            ("SIM_PLAYERS", "6"),
        ]))
        .unwrap();
        assert_eq!(config.target_tps, 50);
        assert_eq!(config.duration, Duration::from_secs(5));
        assert_eq!(config.games, 4);
        assert_eq!(config.players, 6);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            SimulationConfig::from_lookup(lookup(&[("SIM_GAMES", "many")])),
            Err(ConfigError::Invalid { key, .. }) if key == "SIM_GAMES"
        ));
        assert!(matches!(
            SimulationConfig::from_lookup(lookup(&[("SIM_PLAYERS", "1")])),
            Err(ConfigError::TooSmall { min: 2, .. })
        ));
        assert!(SimulationConfig::from_lookup(lookup(&[("SIM_TARGET_TPS", "5")])).is_err());
    }
}
