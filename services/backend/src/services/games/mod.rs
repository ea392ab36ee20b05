//! Game state machines
//!
//! Coinflip resolves in one request. Mines and Crash are driven by command
//! enums; every command reloads the game row inside the user's unit of work,
//! checks ownership and status, and applies exactly one transition.

pub mod coinflip;
pub mod crash;
pub mod mines;

pub use crash::CrashCommand;
pub use mines::MinesCommand;

use shared::GameKind;
use uuid::Uuid;

/// Bet reference and BET ledger key for a start request
///
/// A client `request_id` makes the reference stable across retries; without
/// one every request is a fresh bet.
pub(crate) fn bet_ref(game: GameKind, user_id: &str, request_id: Option<&str>) -> String {
    match request_id {
        Some(request_id) => format!("{}:{}:{}", game.as_str(), user_id, request_id),
        None => format!("{}:{}:{}", game.as_str(), user_id, Uuid::new_v4()),
    }
}

/// WIN ledger key; one credit per game at most
pub(crate) fn win_key(game: GameKind, game_id: Uuid) -> String {
    format!("{}:win:{}", game.as_str(), game_id)
}

pub(crate) fn record_bet_placed(game: GameKind) {
    metrics::counter!("bets_placed_total", "game" => game.as_str()).increment(1);
}

pub(crate) fn record_settled(game: GameKind, status: &'static str) {
    metrics::counter!("games_settled_total", "game" => game.as_str(), "status" => status)
        .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bet_ref_is_stable_for_request_id() {
        let first = bet_ref(GameKind::Mines, "alice", Some("req-1"));
        let second = bet_ref(GameKind::Mines, "alice", Some("req-1"));
        assert_eq!(first, "mines:alice:req-1");
        assert_eq!(first, second);
        assert_ne!(first, bet_ref(GameKind::Mines, "bob", Some("req-1")));
    }

    #[test]
    fn test_bet_ref_without_request_id_is_unique() {
        let first = bet_ref(GameKind::Coinflip, "alice", None);
        let second = bet_ref(GameKind::Coinflip, "alice", None);
        assert!(first.starts_with("coinflip:alice:"));
        assert_ne!(first, second);
    }

    #[test]
    fn test_win_key_format() {
        let id = Uuid::nil();
        assert_eq!(
            win_key(GameKind::Crash, id),
            "crash:win:00000000-0000-0000-0000-000000000000"
        );
    }
}
