use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

use crate::engine::LedgerParams;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub k_factor: i64,
    pub rating_floor: i64,
    pub undo_window_ms: i64,
    pub rating_history_limit: usize,
    pub starting_influence: i64,
    pub seed_default_competitors: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
    expected: &str,
) -> Result<T, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.trim())
        .unwrap_or(default)
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), format!("must be {}", expected)))
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    #[cfg_attr(not(test), allow(dead_code))]
    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or::<u16>(&env_map, "PORT", "8080", "a valid u16")?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let k_factor = parse_or::<i64>(&env_map, "K_FACTOR", "32", "a positive integer")?;
        if k_factor <= 0 {
            return Err(ConfigError::InvalidValue(
                "K_FACTOR".to_string(),
                "must be a positive integer".to_string(),
            ));
        }

        let rating_floor = parse_or::<i64>(&env_map, "RATING_FLOOR", "800", "a valid i64")?;

        let undo_window_ms =
            parse_or::<i64>(&env_map, "UNDO_WINDOW_MS", "5000", "a non-negative i64")?;
        if undo_window_ms < 0 {
            return Err(ConfigError::InvalidValue(
                "UNDO_WINDOW_MS".to_string(),
                "must be a non-negative i64".to_string(),
            ));
        }

        let rating_history_limit =
            parse_or::<usize>(&env_map, "RATING_HISTORY_LIMIT", "50", "a positive integer")?;
        if rating_history_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "RATING_HISTORY_LIMIT".to_string(),
                "must be a positive integer".to_string(),
            ));
        }

        let starting_influence =
            parse_or::<i64>(&env_map, "STARTING_INFLUENCE", "100", "a non-negative i64")?;
        if starting_influence < 0 {
            return Err(ConfigError::InvalidValue(
                "STARTING_INFLUENCE".to_string(),
                "must be a non-negative i64".to_string(),
            ));
        }

        let seed_default_competitors = match env_map
            .get("SEED_DEFAULT_COMPETITORS")
            .map(|s| s.trim().to_ascii_lowercase())
            .as_deref()
            .unwrap_or("true")
        {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            other => {
                return Err(ConfigError::InvalidValue(
                    "SEED_DEFAULT_COMPETITORS".to_string(),
                    format!("must be true or false, got {}", other),
                ))
            }
        };

        Ok(Config {
            port,
            database_path,
            k_factor,
            rating_floor,
            undo_window_ms,
            rating_history_limit,
            starting_influence,
            seed_default_competitors,
        })
    }

    pub fn ledger_params(&self) -> LedgerParams {
        LedgerParams {
            k_factor: self.k_factor,
            rating_floor: self.rating_floor,
            undo_window_ms: self.undo_window_ms,
            history_limit: self.rating_history_limit,
            starting_influence: self.starting_influence,
        }
    }
}
