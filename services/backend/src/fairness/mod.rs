//! Provably-fair outcome generation
//!
//! Every outcome is a pure function of `(server_seed, client_seed, nonce)`
//! plus the game parameters. The server commits to `sha256(server_seed)`
//! before any bet and reveals the seed on rotation, so a player can recompute
//! each outcome with [`verify`].

pub mod outcome;
pub mod rng;
pub mod seed;

pub use outcome::{coinflip, crash_point, mine_positions, CoinflipDraw, CrashDraw};
pub use rng::DrawStream;
pub use seed::{commitment, generate_client_seed, generate_server_seed, verify_commitment};

use shared::{HouseEdge, GameKind, CLIENT_SEED_MAX_LEN, MAX_MINES, MIN_MINES};

use crate::domain::{VerifiedOutcome, VerifyGame, VerifyRequest, VerifyResponse};
use crate::errors::{AppError, Result};

/// Recompute an outcome from revealed seeds
///
/// Stateless: nothing is read from or written to the store.
pub fn verify(request: &VerifyRequest) -> Result<VerifyResponse> {
    if request.nonce < 0 {
        return Err(AppError::Validation("Nonce must not be negative".to_string()));
    }
    if request.client_seed.is_empty() || request.client_seed.chars().count() > CLIENT_SEED_MAX_LEN {
        return Err(AppError::Validation(format!(
            "Client seed must be 1-{} characters",
            CLIENT_SEED_MAX_LEN
        )));
    }

    let server_seed = request.server_seed.as_str();
    let client_seed = request.client_seed.as_str();
    let nonce = request.nonce;

    let outcome = match &request.game {
        VerifyGame::Coinflip => {
            let draw = coinflip(server_seed, client_seed, nonce);
            VerifiedOutcome::Coinflip {
                result: draw.side,
                draw: draw.draw,
            }
        }
        VerifyGame::Mines { mines_count } => {
            if !(MIN_MINES..=MAX_MINES).contains(mines_count) {
                return Err(AppError::Validation(format!(
                    "Mines count must be between {} and {}",
                    MIN_MINES, MAX_MINES
                )));
            }
            VerifiedOutcome::Mines {
                mine_positions: mine_positions(server_seed, client_seed, nonce, *mines_count),
            }
        }
        VerifyGame::Crash { house_edge } => {
            let edge = house_edge.unwrap_or_else(|| {
                HouseEdge::from_fraction(GameKind::Crash.default_house_edge()).unwrap_or(HouseEdge::ZERO)
            });
            let draw = crash_point(server_seed, client_seed, nonce, edge);
            VerifiedOutcome::Crash {
                crash_point: draw.crash_point.as_f64(),
                draw: draw.draw,
                house_edge: edge,
            }
        }
    };

    let server_seed_hash = commitment(server_seed);
    let commitment_matches = request
        .server_seed_hash
        .as_deref()
        .map(|expected| expected.eq_ignore_ascii_case(&server_seed_hash));

    Ok(VerifyResponse {
        server_seed_hash,
        commitment_matches,
        outcome,
    })
}
