//! Status and enum column codecs
//!
//! Converts between domain enums and their stored text representations.

use shared::CoinSide;

use crate::domain::{CrashStatus, EntryKind, MinesStatus};

pub fn mines_status_to_string(status: MinesStatus) -> &'static str {
    match status {
        MinesStatus::Active => "active",
        MinesStatus::Won => "won",
        MinesStatus::Lost => "lost",
    }
}

pub fn mines_status_from_string(s: &str) -> Option<MinesStatus> {
    match s {
        "active" => Some(MinesStatus::Active),
        "won" => Some(MinesStatus::Won),
        "lost" => Some(MinesStatus::Lost),
        _ => None,
    }
}

pub fn crash_status_to_string(status: CrashStatus) -> &'static str {
    match status {
        CrashStatus::Active => "active",
        CrashStatus::CashedOut => "cashedout",
        CrashStatus::Crashed => "crashed",
    }
}

pub fn crash_status_from_string(s: &str) -> Option<CrashStatus> {
    match s {
        "active" => Some(CrashStatus::Active),
        "cashedout" => Some(CrashStatus::CashedOut),
        "crashed" => Some(CrashStatus::Crashed),
        _ => None,
    }
}

pub fn entry_kind_to_string(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Bet => "BET",
        EntryKind::Win => "WIN",
        EntryKind::Deposit => "DEPOSIT",
        EntryKind::Withdrawal => "WITHDRAWAL",
    }
}

pub fn entry_kind_from_string(s: &str) -> Option<EntryKind> {
    match s {
        "BET" => Some(EntryKind::Bet),
        "WIN" => Some(EntryKind::Win),
        "DEPOSIT" => Some(EntryKind::Deposit),
        "WITHDRAWAL" => Some(EntryKind::Withdrawal),
        _ => None,
    }
}

pub fn coin_side_from_string(s: &str) -> Option<CoinSide> {
    CoinSide::try_from(s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_strings_match_serde() {
        for status in [MinesStatus::Active, MinesStatus::Won, MinesStatus::Lost] {
            let stored = mines_status_to_string(status);
            assert_eq!(serde_json::to_value(status).unwrap(), stored);
            assert_eq!(mines_status_from_string(stored), Some(status));
        }
        for status in [CrashStatus::Active, CrashStatus::CashedOut, CrashStatus::Crashed] {
            let stored = crash_status_to_string(status);
            assert_eq!(serde_json::to_value(status).unwrap(), stored);
            assert_eq!(crash_status_from_string(stored), Some(status));
        }
        for kind in [EntryKind::Bet, EntryKind::Win, EntryKind::Deposit, EntryKind::Withdrawal] {
            let stored = entry_kind_to_string(kind);
            assert_eq!(serde_json::to_value(kind).unwrap(), stored);
            assert_eq!(entry_kind_from_string(stored), Some(kind));
        }
    }

    #[test]
    fn test_invalid_status_string() {
        assert_eq!(mines_status_from_string("pending"), None);
        assert_eq!(crash_status_from_string("cashed_out"), None);
        assert_eq!(entry_kind_from_string("bet"), None);
        assert_eq!(coin_side_from_string(""), None);
    }
}
