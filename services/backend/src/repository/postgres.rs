//! Postgres store
//!
//! A unit of work is one transaction. It starts by setting a local
//! `lock_timeout` and taking `pg_advisory_xact_lock` on the user id, so
//! units of work for the same user run one at a time and the lock is released
//! by COMMIT or ROLLBACK. Lock timeouts, deadlocks and serialization failures
//! surface as `ConcurrencyConflict` through `From<sqlx::Error>`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::{CrashMultiplier, HouseEdge};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::status::{
    coin_side_from_string, crash_status_from_string, crash_status_to_string,
    entry_kind_from_string, entry_kind_to_string, mines_status_from_string,
    mines_status_to_string,
};
use super::{Store, UserTx};
use crate::domain::{
    CoinflipGame, CrashGame, LedgerEntry, MinesGame, SeedSnapshot, SeedState, WalletTotals,
};
use crate::errors::{AppError, Result};

const LEDGER_COLUMNS: &str =
    "id, user_id, kind, amount, idempotency_key, description, created_at";
const SEED_COLUMNS: &str =
    "user_id, server_seed, server_seed_hash, client_seed, nonce, created_at, updated_at";
const COINFLIP_COLUMNS: &str = "id, user_id, bet_ref, bet_amount, house_edge_ppm, \
     server_seed_hash, client_seed, nonce, chosen_side, result_side, won, multiplier, payout, created_at";
const MINES_COLUMNS: &str = "id, user_id, bet_ref, bet_amount, house_edge_ppm, mines_count, \
     server_seed_hash, client_seed, nonce, mine_positions, revealed_tiles, status, multiplier, payout, \
     created_at, updated_at";
const CRASH_COLUMNS: &str = "id, user_id, bet_ref, bet_amount, house_edge_ppm, \
     server_seed_hash, client_seed, nonce, crash_point_x100, cashout_x100, status, payout, \
     created_at, updated_at";

fn corrupt(what: &str, value: impl std::fmt::Display) -> AppError {
    AppError::Persistence(format!("unreadable {} in stored row: {}", what, value))
}

fn edge_from_ppm(ppm: i32) -> Result<HouseEdge> {
    u32::try_from(ppm)
        .ok()
        .and_then(|ppm| HouseEdge::from_ppm(ppm).ok())
        .ok_or_else(|| corrupt("house edge", ppm))
}

fn tiles_from_db(tiles: Vec<i16>) -> Result<Vec<u8>> {
    tiles
        .into_iter()
        .map(|tile| u8::try_from(tile).map_err(|_| corrupt("tile", tile)))
        .collect()
}

fn tiles_to_db(tiles: &[u8]) -> Vec<i16> {
    tiles.iter().map(|tile| i16::from(*tile)).collect()
}

fn multiplier_from_db(x100: i32) -> Result<CrashMultiplier> {
    u32::try_from(x100)
        .map(CrashMultiplier::from_hundredths)
        .map_err(|_| corrupt("multiplier", x100))
}

fn multiplier_to_db(multiplier: CrashMultiplier) -> i32 {
    i32::try_from(multiplier.hundredths()).unwrap_or(i32::MAX)
}

#[derive(sqlx::FromRow)]
struct LedgerRow {
    id: Uuid,
    user_id: String,
    kind: String,
    amount: i64,
    idempotency_key: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<LedgerRow> for LedgerEntry {
    type Error = AppError;

    fn try_from(row: LedgerRow) -> Result<Self> {
        Ok(LedgerEntry {
            id: row.id,
            user_id: row.user_id,
            kind: entry_kind_from_string(&row.kind).ok_or_else(|| corrupt("entry kind", &row.kind))?,
            amount: row.amount,
            idempotency_key: row.idempotency_key,
            description: row.description,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SeedRow {
    user_id: String,
    server_seed: String,
    server_seed_hash: String,
    client_seed: String,
    nonce: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SeedRow> for SeedState {
    fn from(row: SeedRow) -> Self {
        SeedState {
            user_id: row.user_id,
            server_seed: row.server_seed,
            server_seed_hash: row.server_seed_hash,
            client_seed: row.client_seed,
            nonce: row.nonce,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CoinflipRow {
    id: Uuid,
    user_id: String,
    bet_ref: String,
    bet_amount: i64,
    house_edge_ppm: i32,
    server_seed_hash: String,
    client_seed: String,
    nonce: i64,
    chosen_side: String,
    result_side: String,
    won: bool,
    multiplier: f64,
    payout: i64,
    created_at: DateTime<Utc>,
}

impl TryFrom<CoinflipRow> for CoinflipGame {
    type Error = AppError;

    fn try_from(row: CoinflipRow) -> Result<Self> {
        Ok(CoinflipGame {
            id: row.id,
            user_id: row.user_id,
            bet_ref: row.bet_ref,
            bet_amount: row.bet_amount,
            house_edge: edge_from_ppm(row.house_edge_ppm)?,
            seed: SeedSnapshot {
                server_seed_hash: row.server_seed_hash,
                client_seed: row.client_seed,
                nonce: row.nonce,
            },
            chosen_side: coin_side_from_string(&row.chosen_side)
                .ok_or_else(|| corrupt("coin side", &row.chosen_side))?,
            result_side: coin_side_from_string(&row.result_side)
                .ok_or_else(|| corrupt("coin side", &row.result_side))?,
            won: row.won,
            multiplier: row.multiplier,
            payout: row.payout,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MinesRow {
    id: Uuid,
    user_id: String,
    bet_ref: String,
    bet_amount: i64,
    house_edge_ppm: i32,
    mines_count: i16,
    server_seed_hash: String,
    client_seed: String,
    nonce: i64,
    mine_positions: Vec<i16>,
    revealed_tiles: Vec<i16>,
    status: String,
    multiplier: f64,
    payout: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<MinesRow> for MinesGame {
    type Error = AppError;

    fn try_from(row: MinesRow) -> Result<Self> {
        Ok(MinesGame {
            id: row.id,
            user_id: row.user_id,
            bet_ref: row.bet_ref,
            bet_amount: row.bet_amount,
            house_edge: edge_from_ppm(row.house_edge_ppm)?,
            mines_count: u8::try_from(row.mines_count)
                .map_err(|_| corrupt("mines count", row.mines_count))?,
            seed: SeedSnapshot {
                server_seed_hash: row.server_seed_hash,
                client_seed: row.client_seed,
                nonce: row.nonce,
            },
            mine_positions: tiles_from_db(row.mine_positions)?,
            revealed_tiles: tiles_from_db(row.revealed_tiles)?,
            status: mines_status_from_string(&row.status)
                .ok_or_else(|| corrupt("mines status", &row.status))?,
            multiplier: row.multiplier,
            payout: row.payout,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CrashRow {
    id: Uuid,
    user_id: String,
    bet_ref: String,
    bet_amount: i64,
    house_edge_ppm: i32,
    server_seed_hash: String,
    client_seed: String,
    nonce: i64,
    crash_point_x100: i32,
    cashout_x100: Option<i32>,
    status: String,
    payout: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CrashRow> for CrashGame {
    type Error = AppError;

    fn try_from(row: CrashRow) -> Result<Self> {
        Ok(CrashGame {
            id: row.id,
            user_id: row.user_id,
            bet_ref: row.bet_ref,
            bet_amount: row.bet_amount,
            house_edge: edge_from_ppm(row.house_edge_ppm)?,
            seed: SeedSnapshot {
                server_seed_hash: row.server_seed_hash,
                client_seed: row.client_seed,
                nonce: row.nonce,
            },
            crash_point: multiplier_from_db(row.crash_point_x100)?,
            cashout_multiplier: row.cashout_x100.map(multiplier_from_db).transpose()?,
            status: crash_status_from_string(&row.status)
                .ok_or_else(|| corrupt("crash status", &row.status))?,
            payout: row.payout,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = AppError>,
{
    rows.into_iter().map(T::try_from).collect()
}

pub struct PostgresStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresStore {
    pub fn new(pool: PgPool, lock_timeout: Duration) -> Self {
        Self { pool, lock_timeout }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self, user_id: &str) -> Result<Box<dyn UserTx>> {
        let mut tx = self.pool.begin().await?;

        // SET cannot take bind parameters; the value is an integer we control
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = '{}ms'",
            self.lock_timeout.as_millis()
        ))
        .execute(&mut *tx)
        .await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PostgresTx {
            user_id: user_id.to_string(),
            tx,
        }))
    }

    async fn balance(&self, user_id: &str) -> Result<i64> {
        let balance: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM ledger_entries WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(balance)
    }

    async fn wallet_totals(&self, user_id: &str) -> Result<WalletTotals> {
        let (total_wagered, total_won): (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(-amount) FILTER (WHERE kind = 'BET'), 0)::BIGINT,
                COALESCE(SUM(amount) FILTER (WHERE kind = 'WIN'), 0)::BIGINT
            FROM ledger_entries
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(WalletTotals {
            total_wagered,
            total_won,
        })
    }

    async fn ledger_entries(&self, user_id: &str, limit: i64) -> Result<Vec<LedgerEntry>> {
        let rows: Vec<LedgerRow> = sqlx::query_as(&format!(
            "SELECT {} FROM ledger_entries WHERE user_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2",
            LEDGER_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn seed_state(&self, user_id: &str) -> Result<Option<SeedState>> {
        let row: Option<SeedRow> = sqlx::query_as(&format!(
            "SELECT {} FROM seed_state WHERE user_id = $1",
            SEED_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(SeedState::from))
    }

    async fn find_coinflip(&self, user_id: &str, game_id: Uuid) -> Result<Option<CoinflipGame>> {
        let row: Option<CoinflipRow> = sqlx::query_as(&format!(
            "SELECT {} FROM coinflip_games WHERE id = $1 AND user_id = $2",
            COINFLIP_COLUMNS
        ))
        .bind(game_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CoinflipGame::try_from).transpose()
    }

    async fn find_mines(&self, user_id: &str, game_id: Uuid) -> Result<Option<MinesGame>> {
        let row: Option<MinesRow> = sqlx::query_as(&format!(
            "SELECT {} FROM mines_games WHERE id = $1 AND user_id = $2",
            MINES_COLUMNS
        ))
        .bind(game_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(MinesGame::try_from).transpose()
    }

    async fn find_crash(&self, user_id: &str, game_id: Uuid) -> Result<Option<CrashGame>> {
        let row: Option<CrashRow> = sqlx::query_as(&format!(
            "SELECT {} FROM crash_games WHERE id = $1 AND user_id = $2",
            CRASH_COLUMNS
        ))
        .bind(game_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(CrashGame::try_from).transpose()
    }

    async fn find_active_mines(&self, user_id: &str) -> Result<Option<MinesGame>> {
        let row: Option<MinesRow> = sqlx::query_as(&format!(
            "SELECT {} FROM mines_games WHERE user_id = $1 AND status = 'active'",
            MINES_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(MinesGame::try_from).transpose()
    }

    async fn recent_coinflips(&self, user_id: &str, limit: i64) -> Result<Vec<CoinflipGame>> {
        let rows: Vec<CoinflipRow> = sqlx::query_as(&format!(
            "SELECT {} FROM coinflip_games WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            COINFLIP_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn recent_mines(&self, user_id: &str, limit: i64) -> Result<Vec<MinesGame>> {
        let rows: Vec<MinesRow> = sqlx::query_as(&format!(
            "SELECT {} FROM mines_games WHERE user_id = $1 AND status <> 'active' \
             ORDER BY created_at DESC LIMIT $2",
            MINES_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn recent_crashes(&self, user_id: &str, limit: i64) -> Result<Vec<CrashGame>> {
        let rows: Vec<CrashRow> = sqlx::query_as(&format!(
            "SELECT {} FROM crash_games WHERE user_id = $1 AND status <> 'active' \
             ORDER BY created_at DESC LIMIT $2",
            CRASH_COLUMNS
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        convert_all(rows)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}

pub struct PostgresTx {
    user_id: String,
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UserTx for PostgresTx {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn balance(&mut self) -> Result<i64> {
        let balance: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0)::BIGINT FROM ledger_entries WHERE user_id = $1",
        )
        .bind(&self.user_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(balance)
    }

    async fn entry_by_key(&mut self, idempotency_key: &str) -> Result<Option<LedgerEntry>> {
        let row: Option<LedgerRow> = sqlx::query_as(&format!(
            "SELECT {} FROM ledger_entries WHERE idempotency_key = $1",
            LEDGER_COLUMNS
        ))
        .bind(idempotency_key)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(LedgerEntry::try_from).transpose()
    }

    async fn append_entry(&mut self, entry: &LedgerEntry) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO ledger_entries (id, user_id, kind, amount, idempotency_key, description, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(entry.id)
        .bind(&entry.user_id)
        .bind(entry_kind_to_string(entry.kind))
        .bind(entry.amount)
        .bind(&entry.idempotency_key)
        .bind(&entry.description)
        .bind(entry.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn load_seed(&mut self) -> Result<Option<SeedState>> {
        let row: Option<SeedRow> = sqlx::query_as(&format!(
            "SELECT {} FROM seed_state WHERE user_id = $1",
            SEED_COLUMNS
        ))
        .bind(&self.user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(SeedState::from))
    }

    async fn insert_seed(&mut self, seed: &SeedState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO seed_state (user_id, server_seed, server_seed_hash, client_seed, nonce, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&seed.user_id)
        .bind(&seed.server_seed)
        .bind(&seed.server_seed_hash)
        .bind(&seed.client_seed)
        .bind(seed.nonce)
        .bind(seed.created_at)
        .bind(seed.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn increment_nonce(&mut self) -> Result<Option<SeedState>> {
        let row: Option<SeedRow> = sqlx::query_as(&format!(
            "UPDATE seed_state SET nonce = nonce + 1, updated_at = NOW() \
             WHERE user_id = $1 RETURNING {}",
            SEED_COLUMNS
        ))
        .bind(&self.user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(SeedState::from))
    }

    async fn update_client_seed(&mut self, client_seed: &str) -> Result<Option<SeedState>> {
        let row: Option<SeedRow> = sqlx::query_as(&format!(
            "UPDATE seed_state SET client_seed = $2, updated_at = NOW() \
             WHERE user_id = $1 RETURNING {}",
            SEED_COLUMNS
        ))
        .bind(&self.user_id)
        .bind(client_seed)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(SeedState::from))
    }

    async fn replace_server_seed(
        &mut self,
        server_seed: &str,
        server_seed_hash: &str,
    ) -> Result<Option<SeedState>> {
        let row: Option<SeedRow> = sqlx::query_as(&format!(
            "UPDATE seed_state SET server_seed = $2, server_seed_hash = $3, nonce = 0, updated_at = NOW() \
             WHERE user_id = $1 RETURNING {}",
            SEED_COLUMNS
        ))
        .bind(&self.user_id)
        .bind(server_seed)
        .bind(server_seed_hash)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(SeedState::from))
    }

    async fn coinflip_by_ref(&mut self, bet_ref: &str) -> Result<Option<CoinflipGame>> {
        let row: Option<CoinflipRow> = sqlx::query_as(&format!(
            "SELECT {} FROM coinflip_games WHERE bet_ref = $1 AND user_id = $2",
            COINFLIP_COLUMNS
        ))
        .bind(bet_ref)
        .bind(&self.user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(CoinflipGame::try_from).transpose()
    }

    async fn insert_coinflip(&mut self, game: &CoinflipGame) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO coinflip_games ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            COINFLIP_COLUMNS
        ))
        .bind(game.id)
        .bind(&game.user_id)
        .bind(&game.bet_ref)
        .bind(game.bet_amount)
        .bind(game.house_edge.ppm() as i32)
        .bind(&game.seed.server_seed_hash)
        .bind(&game.seed.client_seed)
        .bind(game.seed.nonce)
        .bind(game.chosen_side.as_str())
        .bind(game.result_side.as_str())
        .bind(game.won)
        .bind(game.multiplier)
        .bind(game.payout)
        .bind(game.created_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn mines_by_ref(&mut self, bet_ref: &str) -> Result<Option<MinesGame>> {
        let row: Option<MinesRow> = sqlx::query_as(&format!(
            "SELECT {} FROM mines_games WHERE bet_ref = $1 AND user_id = $2",
            MINES_COLUMNS
        ))
        .bind(bet_ref)
        .bind(&self.user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(MinesGame::try_from).transpose()
    }

    async fn active_mines(&mut self) -> Result<Option<MinesGame>> {
        let row: Option<MinesRow> = sqlx::query_as(&format!(
            "SELECT {} FROM mines_games WHERE user_id = $1 AND status = 'active'",
            MINES_COLUMNS
        ))
        .bind(&self.user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(MinesGame::try_from).transpose()
    }

    async fn load_mines(&mut self, game_id: Uuid) -> Result<Option<MinesGame>> {
        let row: Option<MinesRow> = sqlx::query_as(&format!(
            "SELECT {} FROM mines_games WHERE id = $1 AND user_id = $2",
            MINES_COLUMNS
        ))
        .bind(game_id)
        .bind(&self.user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(MinesGame::try_from).transpose()
    }

    async fn insert_mines(&mut self, game: &MinesGame) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO mines_games ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)",
            MINES_COLUMNS
        ))
        .bind(game.id)
        .bind(&game.user_id)
        .bind(&game.bet_ref)
        .bind(game.bet_amount)
        .bind(game.house_edge.ppm() as i32)
        .bind(i16::from(game.mines_count))
        .bind(&game.seed.server_seed_hash)
        .bind(&game.seed.client_seed)
        .bind(game.seed.nonce)
        .bind(tiles_to_db(&game.mine_positions))
        .bind(tiles_to_db(&game.revealed_tiles))
        .bind(mines_status_to_string(game.status))
        .bind(game.multiplier)
        .bind(game.payout)
        .bind(game.created_at)
        .bind(game.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_mines(&mut self, game: &MinesGame) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE mines_games
            SET revealed_tiles = $3, status = $4, multiplier = $5, payout = $6, updated_at = $7
            WHERE id = $1 AND user_id = $2 AND status = 'active'
            "#,
        )
        .bind(game.id)
        .bind(&self.user_id)
        .bind(tiles_to_db(&game.revealed_tiles))
        .bind(mines_status_to_string(game.status))
        .bind(game.multiplier)
        .bind(game.payout)
        .bind(game.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn crash_by_ref(&mut self, bet_ref: &str) -> Result<Option<CrashGame>> {
        let row: Option<CrashRow> = sqlx::query_as(&format!(
            "SELECT {} FROM crash_games WHERE bet_ref = $1 AND user_id = $2",
            CRASH_COLUMNS
        ))
        .bind(bet_ref)
        .bind(&self.user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(CrashGame::try_from).transpose()
    }

    async fn active_crash(&mut self) -> Result<Option<CrashGame>> {
        let row: Option<CrashRow> = sqlx::query_as(&format!(
            "SELECT {} FROM crash_games WHERE user_id = $1 AND status = 'active' \
             ORDER BY created_at DESC LIMIT 1",
            CRASH_COLUMNS
        ))
        .bind(&self.user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(CrashGame::try_from).transpose()
    }

    async fn load_crash(&mut self, game_id: Uuid) -> Result<Option<CrashGame>> {
        let row: Option<CrashRow> = sqlx::query_as(&format!(
            "SELECT {} FROM crash_games WHERE id = $1 AND user_id = $2",
            CRASH_COLUMNS
        ))
        .bind(game_id)
        .bind(&self.user_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.map(CrashGame::try_from).transpose()
    }

    async fn insert_crash(&mut self, game: &CrashGame) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO crash_games ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
            CRASH_COLUMNS
        ))
        .bind(game.id)
        .bind(&game.user_id)
        .bind(&game.bet_ref)
        .bind(game.bet_amount)
        .bind(game.house_edge.ppm() as i32)
        .bind(&game.seed.server_seed_hash)
        .bind(&game.seed.client_seed)
        .bind(game.seed.nonce)
        .bind(multiplier_to_db(game.crash_point))
        .bind(game.cashout_multiplier.map(multiplier_to_db))
        .bind(crash_status_to_string(game.status))
        .bind(game.payout)
        .bind(game.created_at)
        .bind(game.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn update_crash(&mut self, game: &CrashGame) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE crash_games
            SET cashout_x100 = $3, status = $4, payout = $5, updated_at = $6
            WHERE id = $1 AND user_id = $2 AND status = 'active'
            "#,
        )
        .bind(game.id)
        .bind(&self.user_id)
        .bind(game.cashout_multiplier.map(multiplier_to_db))
        .bind(crash_status_to_string(game.status))
        .bind(game.payout)
        .bind(game.updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}
