//! Persistence layer
//!
//! [`Store`] exposes read-only queries plus [`Store::begin`], which opens a
//! per-user unit of work. Every money movement and game transition happens
//! inside a [`UserTx`]: the implementation serializes units of work for the
//! same user and applies all of their writes atomically on
//! [`UserTx::commit`]. Dropping a `UserTx` without committing rolls it back.

pub mod memory;
pub mod postgres;
pub mod redis_events;
pub mod status;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    CoinflipGame, CrashGame, LedgerEntry, MinesGame, SeedState, WalletTotals,
};
use crate::errors::Result;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use redis_events::RedisEventPublisher;

#[async_trait]
pub trait Store: Send + Sync {
    /// Open a unit of work holding the user's critical section
    async fn begin(&self, user_id: &str) -> Result<Box<dyn UserTx>>;

    async fn balance(&self, user_id: &str) -> Result<i64>;
    async fn wallet_totals(&self, user_id: &str) -> Result<WalletTotals>;
    /// Most recent first
    async fn ledger_entries(&self, user_id: &str, limit: i64) -> Result<Vec<LedgerEntry>>;
    async fn seed_state(&self, user_id: &str) -> Result<Option<SeedState>>;

    /// Lookups are scoped to the owner; another user's game reads as missing
    async fn find_coinflip(&self, user_id: &str, game_id: Uuid) -> Result<Option<CoinflipGame>>;
    async fn find_mines(&self, user_id: &str, game_id: Uuid) -> Result<Option<MinesGame>>;
    async fn find_crash(&self, user_id: &str, game_id: Uuid) -> Result<Option<CrashGame>>;
    async fn find_active_mines(&self, user_id: &str) -> Result<Option<MinesGame>>;

    /// Finished games, most recent first
    async fn recent_coinflips(&self, user_id: &str, limit: i64) -> Result<Vec<CoinflipGame>>;
    async fn recent_mines(&self, user_id: &str, limit: i64) -> Result<Vec<MinesGame>>;
    async fn recent_crashes(&self, user_id: &str, limit: i64) -> Result<Vec<CrashGame>>;

    async fn ping(&self) -> Result<()>;

    fn backend_name(&self) -> &'static str;
}

/// Per-user unit of work
#[async_trait]
pub trait UserTx: Send {
    fn user_id(&self) -> &str;

    // Ledger
    async fn balance(&mut self) -> Result<i64>;
    /// Global lookup: the key may belong to another user
    async fn entry_by_key(&mut self, idempotency_key: &str) -> Result<Option<LedgerEntry>>;
    /// Returns false when the idempotency key is already taken
    async fn append_entry(&mut self, entry: &LedgerEntry) -> Result<bool>;

    // Seeds
    async fn load_seed(&mut self) -> Result<Option<SeedState>>;
    async fn insert_seed(&mut self, seed: &SeedState) -> Result<()>;
    /// Atomic `nonce = nonce + 1`, returning the updated state
    async fn increment_nonce(&mut self) -> Result<Option<SeedState>>;
    async fn update_client_seed(&mut self, client_seed: &str) -> Result<Option<SeedState>>;
    /// Swap in a new server seed and reset the nonce to 0
    async fn replace_server_seed(
        &mut self,
        server_seed: &str,
        server_seed_hash: &str,
    ) -> Result<Option<SeedState>>;

    // Coinflip
    async fn coinflip_by_ref(&mut self, bet_ref: &str) -> Result<Option<CoinflipGame>>;
    async fn insert_coinflip(&mut self, game: &CoinflipGame) -> Result<()>;

    // Mines
    async fn mines_by_ref(&mut self, bet_ref: &str) -> Result<Option<MinesGame>>;
    async fn active_mines(&mut self) -> Result<Option<MinesGame>>;
    async fn load_mines(&mut self, game_id: Uuid) -> Result<Option<MinesGame>>;
    async fn insert_mines(&mut self, game: &MinesGame) -> Result<()>;
    /// Applies only while the stored row is still active
    async fn update_mines(&mut self, game: &MinesGame) -> Result<bool>;

    // Crash
    async fn crash_by_ref(&mut self, bet_ref: &str) -> Result<Option<CrashGame>>;
    /// Any round still waiting for a cashout
    async fn active_crash(&mut self) -> Result<Option<CrashGame>>;
    async fn load_crash(&mut self, game_id: Uuid) -> Result<Option<CrashGame>>;
    async fn insert_crash(&mut self, game: &CrashGame) -> Result<()>;
    /// Applies only while the stored row is still active
    async fn update_crash(&mut self, game: &CrashGame) -> Result<bool>;

    async fn commit(self: Box<Self>) -> Result<()>;
}
