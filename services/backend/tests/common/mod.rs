/// Common test utilities and fixtures for integration tests
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use backend::config::{Config, HouseEdgeConfig};
use backend::domain::{EntryKind, MinesGame};
use backend::repository::{InMemoryStore, Store};
use backend::services::{BetLimits, GameEngine, HouseEdgeTable, NoopPublisher};
use backend::state::AppState;
use serde_json::Value;
use uuid::Uuid;

/// Engine wired to a fresh in-memory store and a no-op event sink
pub struct TestContext {
    pub store: Arc<InMemoryStore>,
    pub engine: Arc<GameEngine>,
}

impl TestContext {
    /// Default house edges and bet limits
    pub fn new() -> Self {
        Self::with_edges(HouseEdgeConfig::default())
    }

    pub fn with_edges(edges: HouseEdgeConfig) -> Self {
        let store = Arc::new(InMemoryStore::default());
        let edges = HouseEdgeTable::from_config(&edges).expect("valid house edges");
        let engine = GameEngine::new(
            store.clone() as Arc<dyn Store>,
            Arc::new(NoopPublisher),
            edges,
            BetLimits::default(),
        );
        Self {
            store,
            engine: Arc::new(engine),
        }
    }

    /// Credit `amount` minor units as a deposit
    pub async fn deposit(&self, user_id: &str, amount: i64) {
        let key = format!("deposit:{}:{}", user_id, Uuid::new_v4());
        self.engine
            .ledger()
            .credit(user_id, amount, &key, EntryKind::Deposit, "Test deposit")
            .await
            .expect("deposit succeeds");
    }

    pub async fn balance(&self, user_id: &str) -> i64 {
        self.engine.ledger().balance(user_id).await.expect("balance")
    }

    /// Full game row, including the mine positions the API hides
    pub async fn mines_row(&self, user_id: &str, game_id: Uuid) -> MinesGame {
        self.store
            .find_mines(user_id, game_id)
            .await
            .expect("store read")
            .expect("game exists")
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            config: Arc::new(Config::default()),
            engine: self.engine.clone(),
        }
    }

    pub fn router(&self) -> axum::Router {
        backend::build_router(self.app_state())
    }
}

/// First tile on the board that is not a mine
pub fn safe_tile(game: &MinesGame) -> u8 {
    (0..25u8)
        .find(|tile| !game.is_mine(*tile) && !game.revealed_tiles.contains(tile))
        .expect("board has a safe tile left")
}

pub fn user_header(user_id: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-user-id"),
        HeaderValue::from_static(user_id),
    )
}

/// Pull `(code, message, category)` out of a standard error body
pub fn parse_error(body: &Value) -> Option<(String, String, String)> {
    let error = body.get("error")?;
    Some((
        error.get("code")?.as_str()?.to_string(),
        error.get("message")?.as_str()?.to_string(),
        error.get("category")?.as_str()?.to_string(),
    ))
}
