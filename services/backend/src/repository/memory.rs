//! In-memory store for tests and local development
//!
//! Units of work for one user are serialized by a per-user async mutex taken
//! with a timeout. Writes are staged inside the [`MemoryTx`] and applied to
//! the shared state in one step on commit, so a failed or abandoned unit of
//! work leaves nothing behind.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{Store, UserTx};
use crate::domain::{
    CoinflipGame, CrashGame, EntryKind, LedgerEntry, MinesGame, SeedState, WalletTotals,
};
use crate::errors::{AppError, Result};

#[derive(Default)]
struct MemoryState {
    entries: Vec<LedgerEntry>,
    entry_keys: HashMap<String, usize>,
    seeds: HashMap<String, SeedState>,
    coinflips: HashMap<Uuid, CoinflipGame>,
    mines: HashMap<Uuid, MinesGame>,
    crashes: HashMap<Uuid, CrashGame>,
}

fn lock_state(state: &Mutex<MemoryState>) -> Result<MutexGuard<'_, MemoryState>> {
    state
        .lock()
        .map_err(|_| AppError::Persistence("in-memory store lock poisoned".to_string()))
}

fn newest_first<T>(mut items: Vec<T>, created_at: impl Fn(&T) -> chrono::DateTime<Utc>, limit: i64) -> Vec<T> {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
    items.truncate(usize::try_from(limit.max(0)).unwrap_or(0));
    items
}

pub struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
    user_locks: DashMap<String, Arc<AsyncMutex<()>>>,
    lock_timeout: Duration,
    fail_next_commit: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            user_locks: DashMap::new(),
            lock_timeout,
            fail_next_commit: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Make the next commit fail with a persistence error (fault injection)
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of ledger rows across all users
    pub fn entry_count(&self) -> Result<usize> {
        Ok(lock_state(&self.state)?.entries.len())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self, user_id: &str) -> Result<Box<dyn UserTx>> {
        let lock = self
            .user_locks
            .entry(user_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();

        let guard = tokio::time::timeout(self.lock_timeout, lock.lock_owned())
            .await
            .map_err(|_| {
                AppError::ConcurrencyConflict(format!(
                    "timed out after {:?} waiting for user lock",
                    self.lock_timeout
                ))
            })?;

        Ok(Box::new(MemoryTx {
            user_id: user_id.to_string(),
            state: Arc::clone(&self.state),
            fail_next_commit: Arc::clone(&self.fail_next_commit),
            staged: Staged::default(),
            _guard: guard,
        }))
    }

    async fn balance(&self, user_id: &str) -> Result<i64> {
        let state = lock_state(&self.state)?;
        Ok(state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .map(|e| e.amount)
            .sum())
    }

    async fn wallet_totals(&self, user_id: &str) -> Result<WalletTotals> {
        let state = lock_state(&self.state)?;
        let mut totals = WalletTotals::default();
        for entry in state.entries.iter().filter(|e| e.user_id == user_id) {
            match entry.kind {
                EntryKind::Bet => totals.total_wagered += entry.amount.abs(),
                EntryKind::Win => totals.total_won += entry.amount,
                EntryKind::Deposit | EntryKind::Withdrawal => {}
            }
        }
        Ok(totals)
    }

    async fn ledger_entries(&self, user_id: &str, limit: i64) -> Result<Vec<LedgerEntry>> {
        let state = lock_state(&self.state)?;
        // Insertion order breaks created_at ties
        let mut entries: Vec<LedgerEntry> = state
            .entries
            .iter()
            .rev()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| std::cmp::Reverse(e.created_at));
        entries.truncate(usize::try_from(limit.max(0)).unwrap_or(0));
        Ok(entries)
    }

    async fn seed_state(&self, user_id: &str) -> Result<Option<SeedState>> {
        Ok(lock_state(&self.state)?.seeds.get(user_id).cloned())
    }

    async fn find_coinflip(&self, user_id: &str, game_id: Uuid) -> Result<Option<CoinflipGame>> {
        let state = lock_state(&self.state)?;
        Ok(state
            .coinflips
            .get(&game_id)
            .filter(|g| g.user_id == user_id)
            .cloned())
    }

    async fn find_mines(&self, user_id: &str, game_id: Uuid) -> Result<Option<MinesGame>> {
        let state = lock_state(&self.state)?;
        Ok(state.mines.get(&game_id).filter(|g| g.user_id == user_id).cloned())
    }

    async fn find_crash(&self, user_id: &str, game_id: Uuid) -> Result<Option<CrashGame>> {
        let state = lock_state(&self.state)?;
        Ok(state.crashes.get(&game_id).filter(|g| g.user_id == user_id).cloned())
    }

    async fn find_active_mines(&self, user_id: &str) -> Result<Option<MinesGame>> {
        let state = lock_state(&self.state)?;
        Ok(state
            .mines
            .values()
            .find(|g| g.user_id == user_id && g.is_active())
            .cloned())
    }

    async fn recent_coinflips(&self, user_id: &str, limit: i64) -> Result<Vec<CoinflipGame>> {
        let state = lock_state(&self.state)?;
        let games = state
            .coinflips
            .values()
            .filter(|g| g.user_id == user_id)
            .cloned()
            .collect();
        Ok(newest_first(games, |g| g.created_at, limit))
    }

    async fn recent_mines(&self, user_id: &str, limit: i64) -> Result<Vec<MinesGame>> {
        let state = lock_state(&self.state)?;
        let games = state
            .mines
            .values()
            .filter(|g| g.user_id == user_id && !g.is_active())
            .cloned()
            .collect();
        Ok(newest_first(games, |g| g.created_at, limit))
    }

    async fn recent_crashes(&self, user_id: &str, limit: i64) -> Result<Vec<CrashGame>> {
        let state = lock_state(&self.state)?;
        let games = state
            .crashes
            .values()
            .filter(|g| g.user_id == user_id && !g.is_active())
            .cloned()
            .collect();
        Ok(newest_first(games, |g| g.created_at, limit))
    }

    async fn ping(&self) -> Result<()> {
        lock_state(&self.state).map(|_| ())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[derive(Default)]
struct Staged {
    entries: Vec<LedgerEntry>,
    seed: Option<SeedState>,
    coinflips: HashMap<Uuid, CoinflipGame>,
    mines: HashMap<Uuid, MinesGame>,
    crashes: HashMap<Uuid, CrashGame>,
}

pub struct MemoryTx {
    user_id: String,
    state: Arc<Mutex<MemoryState>>,
    fail_next_commit: Arc<AtomicBool>,
    staged: Staged,
    _guard: OwnedMutexGuard<()>,
}

impl MemoryTx {
    fn committed(&self) -> Result<MutexGuard<'_, MemoryState>> {
        lock_state(&self.state)
    }

    fn find_mines_where(&self, pred: impl Fn(&MinesGame) -> bool) -> Result<Option<MinesGame>> {
        if let Some(game) = self.staged.mines.values().find(|&g| pred(g)) {
            return Ok(Some(game.clone()));
        }
        let state = self.committed()?;
        Ok(state
            .mines
            .values()
            .find(|&g| !self.staged.mines.contains_key(&g.id) && pred(g))
            .cloned())
    }

    fn find_crash_where(&self, pred: impl Fn(&CrashGame) -> bool) -> Result<Option<CrashGame>> {
        if let Some(game) = self.staged.crashes.values().find(|&g| pred(g)) {
            return Ok(Some(game.clone()));
        }
        let state = self.committed()?;
        Ok(state
            .crashes
            .values()
            .find(|&g| !self.staged.crashes.contains_key(&g.id) && pred(g))
            .cloned())
    }

    fn stage_seed(&mut self, update: impl FnOnce(&mut SeedState)) -> Result<Option<SeedState>> {
        let current = match self.staged.seed.clone() {
            Some(seed) => Some(seed),
            None => self.committed()?.seeds.get(&self.user_id).cloned(),
        };
        Ok(current.map(|mut seed| {
            update(&mut seed);
            seed.updated_at = Utc::now();
            self.staged.seed = Some(seed.clone());
            seed
        }))
    }
}

#[async_trait]
impl UserTx for MemoryTx {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn balance(&mut self) -> Result<i64> {
        let committed: i64 = self
            .committed()?
            .entries
            .iter()
            .filter(|e| e.user_id == self.user_id)
            .map(|e| e.amount)
            .sum();
        let staged: i64 = self.staged.entries.iter().map(|e| e.amount).sum();
        Ok(committed + staged)
    }

    async fn entry_by_key(&mut self, idempotency_key: &str) -> Result<Option<LedgerEntry>> {
        if let Some(entry) = self
            .staged
            .entries
            .iter()
            .find(|e| e.idempotency_key == idempotency_key)
        {
            return Ok(Some(entry.clone()));
        }
        let state = self.committed()?;
        Ok(state
            .entry_keys
            .get(idempotency_key)
            .and_then(|index| state.entries.get(*index))
            .cloned())
    }

    async fn append_entry(&mut self, entry: &LedgerEntry) -> Result<bool> {
        if self.entry_by_key(&entry.idempotency_key).await?.is_some() {
            return Ok(false);
        }
        self.staged.entries.push(entry.clone());
        Ok(true)
    }

    async fn load_seed(&mut self) -> Result<Option<SeedState>> {
        if let Some(seed) = &self.staged.seed {
            return Ok(Some(seed.clone()));
        }
        Ok(self.committed()?.seeds.get(&self.user_id).cloned())
    }

    async fn insert_seed(&mut self, seed: &SeedState) -> Result<()> {
        if self.load_seed().await?.is_some() {
            return Err(AppError::Persistence(format!(
                "seed state for {} already exists",
                self.user_id
            )));
        }
        self.staged.seed = Some(seed.clone());
        Ok(())
    }

    async fn increment_nonce(&mut self) -> Result<Option<SeedState>> {
        self.stage_seed(|seed| seed.nonce += 1)
    }

    async fn update_client_seed(&mut self, client_seed: &str) -> Result<Option<SeedState>> {
        self.stage_seed(|seed| seed.client_seed = client_seed.to_string())
    }

    async fn replace_server_seed(
        &mut self,
        server_seed: &str,
        server_seed_hash: &str,
    ) -> Result<Option<SeedState>> {
        self.stage_seed(|seed| {
            seed.server_seed = server_seed.to_string();
            seed.server_seed_hash = server_seed_hash.to_string();
            seed.nonce = 0;
        })
    }

    async fn coinflip_by_ref(&mut self, bet_ref: &str) -> Result<Option<CoinflipGame>> {
        if let Some(game) = self.staged.coinflips.values().find(|g| g.bet_ref == bet_ref) {
            return Ok(Some(game.clone()));
        }
        let state = self.committed()?;
        Ok(state
            .coinflips
            .values()
            .find(|g| g.bet_ref == bet_ref && g.user_id == self.user_id)
            .cloned())
    }

    async fn insert_coinflip(&mut self, game: &CoinflipGame) -> Result<()> {
        if self.coinflip_by_ref(&game.bet_ref).await?.is_some() {
            return Err(AppError::Persistence(format!("duplicate bet_ref {}", game.bet_ref)));
        }
        self.staged.coinflips.insert(game.id, game.clone());
        Ok(())
    }

    async fn mines_by_ref(&mut self, bet_ref: &str) -> Result<Option<MinesGame>> {
        let user_id = self.user_id.clone();
        self.find_mines_where(|g| g.bet_ref == bet_ref && g.user_id == user_id)
    }

    async fn active_mines(&mut self) -> Result<Option<MinesGame>> {
        let user_id = self.user_id.clone();
        self.find_mines_where(|g| g.user_id == user_id && g.is_active())
    }

    async fn load_mines(&mut self, game_id: Uuid) -> Result<Option<MinesGame>> {
        let user_id = self.user_id.clone();
        self.find_mines_where(|g| g.id == game_id && g.user_id == user_id)
    }

    async fn insert_mines(&mut self, game: &MinesGame) -> Result<()> {
        if self.mines_by_ref(&game.bet_ref).await?.is_some() {
            return Err(AppError::Persistence(format!("duplicate bet_ref {}", game.bet_ref)));
        }
        if game.is_active() && self.active_mines().await?.is_some() {
            return Err(AppError::Persistence(format!(
                "user {} already has an active mines game",
                self.user_id
            )));
        }
        self.staged.mines.insert(game.id, game.clone());
        Ok(())
    }

    async fn update_mines(&mut self, game: &MinesGame) -> Result<bool> {
        match self.load_mines(game.id).await? {
            Some(current) if current.is_active() => {
                self.staged.mines.insert(game.id, game.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn crash_by_ref(&mut self, bet_ref: &str) -> Result<Option<CrashGame>> {
        let user_id = self.user_id.clone();
        self.find_crash_where(|g| g.bet_ref == bet_ref && g.user_id == user_id)
    }

    async fn active_crash(&mut self) -> Result<Option<CrashGame>> {
        let user_id = self.user_id.clone();
        self.find_crash_where(|g| g.user_id == user_id && g.is_active())
    }

    async fn load_crash(&mut self, game_id: Uuid) -> Result<Option<CrashGame>> {
        let user_id = self.user_id.clone();
        self.find_crash_where(|g| g.id == game_id && g.user_id == user_id)
    }

    async fn insert_crash(&mut self, game: &CrashGame) -> Result<()> {
        if self.crash_by_ref(&game.bet_ref).await?.is_some() {
            return Err(AppError::Persistence(format!("duplicate bet_ref {}", game.bet_ref)));
        }
        self.staged.crashes.insert(game.id, game.clone());
        Ok(())
    }

    async fn update_crash(&mut self, game: &CrashGame) -> Result<bool> {
        match self.load_crash(game.id).await? {
            Some(current) if current.is_active() => {
                self.staged.crashes.insert(game.id, game.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(AppError::Persistence("injected commit failure".to_string()));
        }

        let MemoryTx {
            user_id,
            state: shared,
            staged,
            _guard,
            ..
        } = *self;

        let mut state = lock_state(&shared)?;

        // Keys are global; another user's unit of work may have claimed one meanwhile
        if let Some(taken) = staged
            .entries
            .iter()
            .find(|e| state.entry_keys.contains_key(&e.idempotency_key))
        {
            return Err(AppError::ConcurrencyConflict(format!(
                "idempotency key {} committed concurrently",
                taken.idempotency_key
            )));
        }

        for entry in staged.entries {
            let index = state.entries.len();
            state.entry_keys.insert(entry.idempotency_key.clone(), index);
            state.entries.push(entry);
        }
        if let Some(seed) = staged.seed {
            state.seeds.insert(user_id, seed);
        }
        state.coinflips.extend(staged.coinflips);
        state.mines.extend(staged.mines);
        state.crashes.extend(staged.crashes);
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod memory_tests;
