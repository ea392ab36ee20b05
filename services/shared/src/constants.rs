/// Shared constants for the casino engine
///
/// This module centralizes the game geometry and default limits so that the
/// outcome generator, payout math and request validation agree on them.

/// Number of tiles on a Mines board (5x5 grid)
pub const TILE_COUNT: u8 = 25;

/// Minimum number of mines on a board
pub const MIN_MINES: u8 = 1;

/// Maximum number of mines on a board
///
/// At least one safe tile must remain, otherwise no reveal can ever pay.
pub const MAX_MINES: u8 = TILE_COUNT - 1;

/// Client seed length bounds (characters)
pub const CLIENT_SEED_MIN_LEN: usize = 1;
pub const CLIENT_SEED_MAX_LEN: usize = 64;

/// Upper bound applied to the crash draw before the crash point is derived.
///
/// Keeps `1 - r` away from zero.
pub const CRASH_DRAW_CEILING: f64 = 0.99;

/// Crash point bounds in hundredths (1.00x .. 100.00x)
pub const MIN_CRASH_POINT_X100: u32 = 100;
pub const MAX_CRASH_POINT_X100: u32 = 10_000;

/// House edge is carried as parts-per-million for exact payout arithmetic
pub const EDGE_SCALE: u32 = 1_000_000;

/// Default minimum bet in minor units (0.01)
pub const DEFAULT_MIN_BET: i64 = 1;

/// Default maximum bet in minor units (10,000.00)
pub const DEFAULT_MAX_BET: i64 = 1_000_000;

/// Default house edges per game
pub const DEFAULT_COINFLIP_EDGE: f64 = 0.02;
pub const DEFAULT_MINES_EDGE: f64 = 0.015;
pub const DEFAULT_CRASH_EDGE: f64 = 0.04;

/// House-edge configuration keys
pub const HOUSE_EDGE_GLOBAL_KEY: &str = "GLOBAL";

/// Maximum length of a client-supplied request id (idempotency key suffix)
pub const MAX_REQUEST_ID_LENGTH: usize = 128;

/// Maximum length of the caller identity forwarded by the gateway
pub const MAX_USER_ID_LENGTH: usize = 128;

/// Maximum page size for history listings
pub const MAX_HISTORY_LIMIT: i64 = 100;
