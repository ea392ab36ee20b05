use serde::Deserialize;
use shared::{DEFAULT_MAX_BET, DEFAULT_MIN_BET};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api_port: u16,
    pub metrics_port: u16,
    /// `None` runs on the in-memory store
    pub database: Option<DatabaseConfig>,
    /// `None` disables the settled-game event stream
    pub redis: Option<RedisConfig>,
    pub betting: BettingConfig,
    pub house_edges: HouseEdgeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub events_stream: String,
    pub events_maxlen: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BettingConfig {
    pub min_bet: i64,
    pub max_bet: i64,
    pub user_lock_timeout_ms: u64,
}

/// Operator overrides as fractions; unset keys fall back to GLOBAL, then the game default
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HouseEdgeConfig {
    pub global: Option<f64>,
    pub coinflip: Option<f64>,
    pub mines: Option<f64>,
    pub crash: Option<f64>,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database = match env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => Some(DatabaseConfig {
                url,
                pool_size: env::var("DATABASE_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()?,
            }),
            _ => None,
        };

        let redis = match env::var("REDIS_URL") {
            Ok(url) if !url.is_empty() => Some(RedisConfig {
                url,
                events_stream: env::var("GAME_EVENTS_STREAM")
                    .unwrap_or_else(|_| "games:settled".to_string()),
                events_maxlen: env::var("GAME_EVENTS_MAXLEN")
                    .unwrap_or_else(|_| "10000".to_string())
                    .parse()?,
            }),
            _ => None,
        };

        let config = Config {
            api_port: env::var("API_PORT")
                .unwrap_or_else(|_| "3001".to_string())
                .parse()?,
            metrics_port: env::var("METRICS_PORT")
                .unwrap_or_else(|_| "9090".to_string())
                .parse()?,
            database,
            redis,
            betting: BettingConfig {
                min_bet: env::var("MIN_BET")
                    .unwrap_or_else(|_| DEFAULT_MIN_BET.to_string())
                    .parse()?,
                max_bet: env::var("MAX_BET")
                    .unwrap_or_else(|_| DEFAULT_MAX_BET.to_string())
                    .parse()?,
                user_lock_timeout_ms: env::var("USER_LOCK_TIMEOUT_MS")
                    .unwrap_or_else(|_| "2000".to_string())
                    .parse()?,
            },
            house_edges: HouseEdgeConfig {
                global: optional_env("HOUSE_EDGE_GLOBAL")?,
                coinflip: optional_env("HOUSE_EDGE_COINFLIP")?,
                mines: optional_env("HOUSE_EDGE_MINES")?,
                crash: optional_env("HOUSE_EDGE_CRASH")?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let betting = &self.betting;
        if betting.min_bet < 1 {
            anyhow::bail!("MIN_BET must be at least 1 minor unit, got {}", betting.min_bet);
        }
        if betting.max_bet < betting.min_bet {
            anyhow::bail!(
                "MAX_BET ({}) must not be below MIN_BET ({})",
                betting.max_bet,
                betting.min_bet
            );
        }
        if betting.user_lock_timeout_ms == 0 {
            anyhow::bail!("USER_LOCK_TIMEOUT_MS must be positive");
        }
        crate::services::house_edge::HouseEdgeTable::from_config(&self.house_edges)?;
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_port: 3001,
            metrics_port: 9090,
            database: None,
            redis: None,
            betting: BettingConfig {
                min_bet: DEFAULT_MIN_BET,
                max_bet: DEFAULT_MAX_BET,
                user_lock_timeout_ms: 2000,
            },
            house_edges: HouseEdgeConfig::default(),
        }
    }
}

fn optional_env<T>(key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => Ok(Some(raw.trim().parse()?)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_inverted_bet_limits() {
        let mut config = Config::default();
        config.betting.min_bet = 500;
        config.betting.max_bet = 100;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_edge() {
        let mut config = Config::default();
        config.house_edges.mines = Some(1.5);
        assert!(config.validate().is_err());
    }
}
