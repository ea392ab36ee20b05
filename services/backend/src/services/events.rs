//! Settled-game notifications
//!
//! Published after the unit of work commits. Delivery is best-effort: a
//! failed publish is logged and counted but never fails the bet.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::GameKind;
use uuid::Uuid;

use crate::domain::{CoinflipGame, CrashGame, MinesGame};
use crate::errors::Result;
use crate::repository::status::{crash_status_to_string, mines_status_to_string};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettledGameEvent {
    pub game: GameKind,
    pub game_id: Uuid,
    pub user_id: String,
    pub bet_amount: i64,
    pub payout: i64,
    pub multiplier: f64,
    pub status: String,
    pub settled_at: DateTime<Utc>,
}

impl From<&CoinflipGame> for SettledGameEvent {
    fn from(game: &CoinflipGame) -> Self {
        Self {
            game: GameKind::Coinflip,
            game_id: game.id,
            user_id: game.user_id.clone(),
            bet_amount: game.bet_amount,
            payout: game.payout,
            multiplier: if game.won { game.multiplier } else { 0.0 },
            status: if game.won { "won" } else { "lost" }.to_string(),
            settled_at: game.created_at,
        }
    }
}

impl From<&MinesGame> for SettledGameEvent {
    fn from(game: &MinesGame) -> Self {
        Self {
            game: GameKind::Mines,
            game_id: game.id,
            user_id: game.user_id.clone(),
            bet_amount: game.bet_amount,
            payout: game.payout,
            multiplier: game.multiplier,
            status: mines_status_to_string(game.status).to_string(),
            settled_at: game.updated_at,
        }
    }
}

impl From<&CrashGame> for SettledGameEvent {
    fn from(game: &CrashGame) -> Self {
        Self {
            game: GameKind::Crash,
            game_id: game.id,
            user_id: game.user_id.clone(),
            bet_amount: game.bet_amount,
            payout: game.payout,
            multiplier: game.cashout_multiplier.map(|m| m.as_f64()).unwrap_or(0.0),
            status: crash_status_to_string(game.status).to_string(),
            settled_at: game.updated_at,
        }
    }
}

#[async_trait]
pub trait GameEventPublisher: Send + Sync {
    async fn publish(&self, event: &SettledGameEvent) -> Result<()>;

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &'static str;
}

/// Drops every event; used when no Redis is configured
pub struct NoopPublisher;

#[async_trait]
impl GameEventPublisher for NoopPublisher {
    async fn publish(&self, event: &SettledGameEvent) -> Result<()> {
        tracing::debug!(game_id = %event.game_id, "Event sink disabled, dropping settled-game event");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
