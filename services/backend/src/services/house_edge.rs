//! House-edge lookup and bet limits

use std::collections::HashMap;

use shared::{GameKind, HouseEdge, ValidationError, HOUSE_EDGE_GLOBAL_KEY};

use crate::config::{BettingConfig, HouseEdgeConfig};
use crate::errors::{AppError, Result};

/// Read-only key -> edge table, loaded once at start-up
///
/// Lookup order: the game's own key, then `GLOBAL`, then the built-in
/// default for the game. Games snapshot the edge they were played with.
#[derive(Debug, Clone, Default)]
pub struct HouseEdgeTable {
    entries: HashMap<String, HouseEdge>,
}

impl HouseEdgeTable {
    pub fn from_config(config: &HouseEdgeConfig) -> std::result::Result<Self, ValidationError> {
        let mut entries = HashMap::new();
        let configured = [
            (HOUSE_EDGE_GLOBAL_KEY, config.global),
            (GameKind::Coinflip.house_edge_key(), config.coinflip),
            (GameKind::Mines.house_edge_key(), config.mines),
            (GameKind::Crash.house_edge_key(), config.crash),
        ];
        for (key, value) in configured {
            if let Some(fraction) = value {
                entries.insert(key.to_string(), HouseEdge::from_fraction(fraction)?);
            }
        }
        Ok(Self { entries })
    }

    pub fn lookup(&self, game: GameKind) -> HouseEdge {
        self.entries
            .get(game.house_edge_key())
            .or_else(|| self.entries.get(HOUSE_EDGE_GLOBAL_KEY))
            .copied()
            .unwrap_or_else(|| default_edge(game))
    }
}

fn default_edge(game: GameKind) -> HouseEdge {
    // Defaults are compile-time constants inside [0, 1)
    HouseEdge::from_fraction(game.default_house_edge()).unwrap_or(HouseEdge::ZERO)
}

/// Inclusive bet bounds in minor units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BetLimits {
    pub min: i64,
    pub max: i64,
}

impl BetLimits {
    pub fn check(&self, amount: i64) -> Result<()> {
        if amount <= 0 {
            return Err(AppError::Validation(
                "Bet amount must be greater than zero".to_string(),
            ));
        }
        if amount < self.min {
            return Err(AppError::Validation(format!(
                "Bet amount {} is below the minimum of {}",
                amount, self.min
            )));
        }
        if amount > self.max {
            return Err(AppError::Validation(format!(
                "Bet amount {} exceeds the maximum of {}",
                amount, self.max
            )));
        }
        Ok(())
    }
}

impl From<&BettingConfig> for BetLimits {
    fn from(config: &BettingConfig) -> Self {
        Self {
            min: config.min_bet,
            max: config.max_bet,
        }
    }
}

impl Default for BetLimits {
    fn default() -> Self {
        Self {
            min: shared::DEFAULT_MIN_BET,
            max: shared::DEFAULT_MAX_BET,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_falls_back_to_defaults() {
        let table = HouseEdgeTable::default();
        assert_eq!(table.lookup(GameKind::Coinflip).ppm(), 20_000);
        assert_eq!(table.lookup(GameKind::Mines).ppm(), 15_000);
        assert_eq!(table.lookup(GameKind::Crash).ppm(), 40_000);
    }

    #[test]
    fn test_lookup_prefers_specific_then_global() {
        let table = HouseEdgeTable::from_config(&HouseEdgeConfig {
            global: Some(0.03),
            mines: Some(0.01),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(table.lookup(GameKind::Mines).ppm(), 10_000);
        assert_eq!(table.lookup(GameKind::Crash).ppm(), 30_000);
        assert_eq!(table.lookup(GameKind::Coinflip).ppm(), 30_000);
    }

    #[test]
    fn test_rejects_invalid_edge() {
        let result = HouseEdgeTable::from_config(&HouseEdgeConfig {
            crash: Some(1.0),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_bet_limits() {
        let limits = BetLimits { min: 10, max: 1_000 };
        assert!(limits.check(10).is_ok());
        assert!(limits.check(1_000).is_ok());
        assert!(matches!(limits.check(0), Err(AppError::Validation(_))));
        assert!(matches!(limits.check(-5), Err(AppError::Validation(_))));
        assert!(matches!(limits.check(9), Err(AppError::Validation(_))));
        assert!(matches!(limits.check(1_001), Err(AppError::Validation(_))));
    }
}
