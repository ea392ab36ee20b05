use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::{CoinSide, CrashMultiplier, HouseEdge, TILE_COUNT};
use uuid::Uuid;
use validator::Validate;

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    Bet,
    Win,
    Deposit,
    Withdrawal,
}

impl EntryKind {
    /// Kinds that remove money from the player balance
    pub fn is_debit(&self) -> bool {
        matches!(self, EntryKind::Bet | EntryKind::Withdrawal)
    }
}

/// Immutable ledger row; `amount` is signed minor units
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub user_id: String,
    pub kind: EntryKind,
    pub amount: i64,
    pub idempotency_key: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletTotals {
    pub total_wagered: i64,
    pub total_won: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletSummary {
    pub balance: i64,
    pub total_wagered: i64,
    pub total_won: i64,
    pub profit: i64,
}

// ---------------------------------------------------------------------------
// Seeds
// ---------------------------------------------------------------------------

/// Full seed state, including the secret server seed. Never serialized to players.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedState {
    pub user_id: String,
    pub server_seed: String,
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SeedState {
    pub fn view(&self) -> SeedView {
        SeedView {
            server_seed_hash: self.server_seed_hash.clone(),
            client_seed: self.client_seed.clone(),
            nonce: self.nonce,
        }
    }

    pub fn snapshot(&self) -> SeedSnapshot {
        SeedSnapshot {
            server_seed_hash: self.server_seed_hash.clone(),
            client_seed: self.client_seed.clone(),
            nonce: self.nonce,
        }
    }
}

/// Public seed view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedView {
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: i64,
}

/// Seed inputs a game was resolved with
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeedSnapshot {
    pub server_seed_hash: String,
    pub client_seed: String,
    pub nonce: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RotationReveal {
    pub previous_server_seed: String,
    pub previous_server_seed_hash: String,
    pub previous_nonce: i64,
    pub new_server_seed_hash: String,
}

// ---------------------------------------------------------------------------
// Games
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoinflipGame {
    pub id: Uuid,
    pub user_id: String,
    pub bet_ref: String,
    pub bet_amount: i64,
    pub house_edge: HouseEdge,
    #[serde(flatten)]
    pub seed: SeedSnapshot,
    pub chosen_side: CoinSide,
    pub result_side: CoinSide,
    pub won: bool,
    pub multiplier: f64,
    pub payout: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MinesStatus {
    Active,
    Won,
    Lost,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinesGame {
    pub id: Uuid,
    pub user_id: String,
    pub bet_ref: String,
    pub bet_amount: i64,
    pub house_edge: HouseEdge,
    pub mines_count: u8,
    pub seed: SeedSnapshot,
    pub mine_positions: Vec<u8>,
    pub revealed_tiles: Vec<u8>,
    pub status: MinesStatus,
    pub multiplier: f64,
    pub payout: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MinesGame {
    pub fn is_active(&self) -> bool {
        self.status == MinesStatus::Active
    }

    pub fn is_mine(&self, tile: u8) -> bool {
        self.mine_positions.contains(&tile)
    }

    pub fn safe_reveals(&self) -> u32 {
        self.revealed_tiles
            .iter()
            .filter(|tile| !self.is_mine(**tile))
            .count() as u32
    }

    pub fn safe_tile_count(&self) -> u32 {
        u32::from(TILE_COUNT - self.mines_count)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CrashStatus {
    Active,
    #[serde(rename = "cashedout")]
    CashedOut,
    Crashed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CrashGame {
    pub id: Uuid,
    pub user_id: String,
    pub bet_ref: String,
    pub bet_amount: i64,
    pub house_edge: HouseEdge,
    pub seed: SeedSnapshot,
    pub crash_point: CrashMultiplier,
    pub cashout_multiplier: Option<CrashMultiplier>,
    pub status: CrashStatus,
    pub payout: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CrashGame {
    pub fn is_active(&self) -> bool {
        self.status == CrashStatus::Active
    }
}

// ---------------------------------------------------------------------------
// Views (secrets hidden while a round is live)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MinesView {
    pub id: Uuid,
    pub bet_amount: i64,
    pub house_edge: HouseEdge,
    pub mines_count: u8,
    #[serde(flatten)]
    pub seed: SeedSnapshot,
    pub revealed_tiles: Vec<u8>,
    pub status: MinesStatus,
    pub multiplier: f64,
    pub payout: i64,
    /// Present only once the game is over
    pub mine_positions: Option<Vec<u8>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&MinesGame> for MinesView {
    fn from(game: &MinesGame) -> Self {
        Self {
            id: game.id,
            bet_amount: game.bet_amount,
            house_edge: game.house_edge,
            mines_count: game.mines_count,
            seed: game.seed.clone(),
            revealed_tiles: game.revealed_tiles.clone(),
            status: game.status,
            multiplier: game.multiplier,
            payout: game.payout,
            mine_positions: (!game.is_active()).then(|| game.mine_positions.clone()),
            created_at: game.created_at,
            updated_at: game.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CrashView {
    pub id: Uuid,
    pub bet_amount: i64,
    pub house_edge: HouseEdge,
    #[serde(flatten)]
    pub seed: SeedSnapshot,
    pub status: CrashStatus,
    pub cashout_multiplier: Option<CrashMultiplier>,
    pub payout: i64,
    /// Present only once the round is over
    pub crash_point: Option<CrashMultiplier>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&CrashGame> for CrashView {
    fn from(game: &CrashGame) -> Self {
        Self {
            id: game.id,
            bet_amount: game.bet_amount,
            house_edge: game.house_edge,
            seed: game.seed.clone(),
            status: game.status,
            cashout_multiplier: game.cashout_multiplier,
            payout: game.payout,
            crash_point: (!game.is_active()).then_some(game.crash_point),
            created_at: game.created_at,
            updated_at: game.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoinflipSettlement {
    pub game: CoinflipGame,
    pub balance: i64,
    /// True when a retried request returned the original game
    pub replayed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinesUpdate {
    /// Set on reveal only
    pub is_mine: Option<bool>,
    pub game: MinesView,
    pub balance: i64,
    pub replayed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashUpdate {
    pub game: CrashView,
    pub balance: i64,
    pub replayed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedHistory {
    pub coinflip: Vec<CoinflipGame>,
    pub mines: Vec<MinesView>,
    pub crash: Vec<CrashView>,
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CoinflipBetRequest {
    pub bet_amount: i64,
    pub chosen_side: CoinSide,
    /// Client retry token; the same token never places a second bet
    #[validate(length(min = 1, max = 128))]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartMinesRequest {
    pub bet_amount: i64,
    #[validate(range(min = 1, max = 24))]
    pub mines_count: u8,
    #[validate(length(min = 1, max = 128))]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RevealTileRequest {
    pub game_id: Uuid,
    #[validate(range(max = 24))]
    pub tile_index: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MinesCashoutRequest {
    pub game_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StartCrashRequest {
    pub bet_amount: i64,
    #[validate(length(min = 1, max = 128))]
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CrashCashoutRequest {
    pub game_id: Uuid,
    /// Multiplier the client displayed when the player cashed out
    pub multiplier: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SetClientSeedRequest {
    #[validate(length(min = 1, max = 64))]
    pub client_seed: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VerifyGame {
    Coinflip,
    Mines { mines_count: u8 },
    Crash { house_edge: Option<HouseEdge> },
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerifyRequest {
    #[validate(length(min = 1))]
    pub server_seed: String,
    /// Commitment published before play; checked against `server_seed` when present
    pub server_seed_hash: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub client_seed: String,
    pub nonce: i64,
    pub game: VerifyGame,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VerifiedOutcome {
    Coinflip { result: CoinSide, draw: f64 },
    Mines { mine_positions: Vec<u8> },
    Crash { crash_point: f64, draw: f64, house_edge: HouseEdge },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub server_seed_hash: String,
    pub commitment_matches: Option<bool>,
    pub outcome: VerifiedOutcome,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> SeedSnapshot {
        SeedSnapshot {
            server_seed_hash: "hash".to_string(),
            client_seed: "client".to_string(),
            nonce: 1,
        }
    }

    fn mines_game(status: MinesStatus) -> MinesGame {
        MinesGame {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            bet_ref: "mines:alice:1".to_string(),
            bet_amount: 100,
            house_edge: HouseEdge::from_fraction(0.015).unwrap(),
            mines_count: 3,
            seed: snapshot(),
            mine_positions: vec![2, 7, 19],
            revealed_tiles: vec![0, 1],
            status,
            multiplier: 1.0,
            payout: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_mines_view_hides_positions_while_active() {
        let view = MinesView::from(&mines_game(MinesStatus::Active));
        assert!(view.mine_positions.is_none());

        let json = serde_json::to_value(&view).unwrap();
        assert!(json["mine_positions"].is_null());
        assert_eq!(json["server_seed_hash"], "hash");

        let finished = MinesView::from(&mines_game(MinesStatus::Lost));
        assert_eq!(finished.mine_positions, Some(vec![2, 7, 19]));
    }

    #[test]
    fn test_crash_view_hides_crash_point_while_active() {
        let mut game = CrashGame {
            id: Uuid::new_v4(),
            user_id: "alice".to_string(),
            bet_ref: "crash:alice:1".to_string(),
            bet_amount: 100,
            house_edge: HouseEdge::from_fraction(0.04).unwrap(),
            seed: snapshot(),
            crash_point: CrashMultiplier::from_hundredths(250),
            cashout_multiplier: None,
            status: CrashStatus::Active,
            payout: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(CrashView::from(&game).crash_point.is_none());

        game.status = CrashStatus::Crashed;
        let json = serde_json::to_value(CrashView::from(&game)).unwrap();
        assert_eq!(json["crash_point"], 2.5);
        assert_eq!(json["status"], "crashed");
    }

    #[test]
    fn test_safe_reveals_ignores_mines() {
        let mut game = mines_game(MinesStatus::Lost);
        game.revealed_tiles.push(7);
        assert_eq!(game.safe_reveals(), 2);
        assert_eq!(game.safe_tile_count(), 22);
    }

    #[test]
    fn test_verify_request_shape() {
        let request: VerifyRequest = serde_json::from_value(serde_json::json!({
            "server_seed": "abc",
            "client_seed": "lucky",
            "nonce": 1,
            "game": { "type": "mines", "mines_count": 3 }
        }))
        .unwrap();
        assert!(matches!(request.game, VerifyGame::Mines { mines_count: 3 }));
        assert!(request.server_seed_hash.is_none());
    }
}
