use super::*;
use crate::domain::{CrashStatus, SeedSnapshot, SeedState};
use shared::{CrashMultiplier, HouseEdge};

fn entry(user_id: &str, kind: EntryKind, amount: i64, key: &str) -> LedgerEntry {
    LedgerEntry {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        kind,
        amount,
        idempotency_key: key.to_string(),
        description: String::new(),
        created_at: Utc::now(),
    }
}

fn seed(user_id: &str) -> SeedState {
    SeedState {
        user_id: user_id.to_string(),
        server_seed: "server".to_string(),
        server_seed_hash: "hash".to_string(),
        client_seed: "client".to_string(),
        nonce: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn crash_round(user_id: &str) -> CrashGame {
    CrashGame {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        bet_ref: format!("crash:{}", Uuid::new_v4()),
        bet_amount: 100,
        house_edge: HouseEdge::from_ppm(40_000).unwrap(),
        seed: SeedSnapshot {
            server_seed_hash: "hash".to_string(),
            client_seed: "client".to_string(),
            nonce: 1,
        },
        crash_point: CrashMultiplier::from_hundredths(250),
        cashout_multiplier: None,
        status: CrashStatus::Active,
        payout: 0,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_staged_writes_invisible_until_commit() {
    let store = InMemoryStore::default();

    let mut tx = store.begin("alice").await.unwrap();
    assert!(tx.append_entry(&entry("alice", EntryKind::Deposit, 500, "dep-1")).await.unwrap());
    assert_eq!(tx.balance().await.unwrap(), 500);
    assert_eq!(store.balance("alice").await.unwrap(), 0);

    tx.commit().await.unwrap();
    assert_eq!(store.balance("alice").await.unwrap(), 500);
}

#[tokio::test]
async fn test_dropped_tx_rolls_back() {
    let store = InMemoryStore::default();
    {
        let mut tx = store.begin("alice").await.unwrap();
        tx.append_entry(&entry("alice", EntryKind::Deposit, 500, "dep-1")).await.unwrap();
        tx.insert_seed(&seed("alice")).await.unwrap();
    }
    assert_eq!(store.balance("alice").await.unwrap(), 0);
    assert!(store.seed_state("alice").await.unwrap().is_none());
    assert_eq!(store.entry_count().unwrap(), 0);
}

#[tokio::test]
async fn test_duplicate_key_not_appended() {
    let store = InMemoryStore::default();
    let mut tx = store.begin("alice").await.unwrap();
    assert!(tx.append_entry(&entry("alice", EntryKind::Deposit, 500, "dep-1")).await.unwrap());
    assert!(!tx.append_entry(&entry("alice", EntryKind::Deposit, 500, "dep-1")).await.unwrap());
    tx.commit().await.unwrap();

    // Keys are global: another user sees the same key as taken
    let mut tx = store.begin("bob").await.unwrap();
    let existing = tx.entry_by_key("dep-1").await.unwrap().unwrap();
    assert_eq!(existing.user_id, "alice");
    assert!(!tx.append_entry(&entry("bob", EntryKind::Deposit, 1, "dep-1")).await.unwrap());
}

#[tokio::test]
async fn test_injected_commit_failure_leaves_no_state() {
    let store = InMemoryStore::default();
    store.fail_next_commit();

    let mut tx = store.begin("alice").await.unwrap();
    tx.append_entry(&entry("alice", EntryKind::Deposit, 500, "dep-1")).await.unwrap();
    let err = tx.commit().await.unwrap_err();
    assert!(matches!(err, AppError::Persistence(_)));
    assert_eq!(store.balance("alice").await.unwrap(), 0);

    // Only the next commit fails
    let mut tx = store.begin("alice").await.unwrap();
    tx.append_entry(&entry("alice", EntryKind::Deposit, 500, "dep-1")).await.unwrap();
    tx.commit().await.unwrap();
    assert_eq!(store.balance("alice").await.unwrap(), 500);
}

#[tokio::test]
async fn test_user_lock_times_out_as_conflict() {
    let store = InMemoryStore::new(Duration::from_millis(50));
    let _held = store.begin("alice").await.unwrap();

    let err = store.begin("alice").await.err().expect("second begin should time out");
    assert!(matches!(err, AppError::ConcurrencyConflict(_)));

    // Other users are unaffected
    assert!(store.begin("bob").await.is_ok());
}

#[tokio::test]
async fn test_nonce_increment_and_rotation() {
    let store = InMemoryStore::default();
    let mut tx = store.begin("alice").await.unwrap();
    assert!(tx.increment_nonce().await.unwrap().is_none());

    tx.insert_seed(&seed("alice")).await.unwrap();
    assert_eq!(tx.increment_nonce().await.unwrap().unwrap().nonce, 1);
    assert_eq!(tx.increment_nonce().await.unwrap().unwrap().nonce, 2);

    let rotated = tx.replace_server_seed("next", "next-hash").await.unwrap().unwrap();
    assert_eq!(rotated.nonce, 0);
    assert_eq!(rotated.server_seed_hash, "next-hash");
    tx.commit().await.unwrap();

    assert_eq!(store.seed_state("alice").await.unwrap().unwrap().server_seed, "next");
}

#[tokio::test]
async fn test_active_crash_is_scoped_to_user_and_status() {
    let store = InMemoryStore::default();
    let round = crash_round("alice");

    let mut tx = store.begin("alice").await.unwrap();
    assert!(tx.active_crash().await.unwrap().is_none());
    tx.insert_crash(&round).await.unwrap();
    assert_eq!(tx.active_crash().await.unwrap().unwrap().id, round.id);
    tx.commit().await.unwrap();

    let mut tx = store.begin("bob").await.unwrap();
    assert!(tx.active_crash().await.unwrap().is_none());
    drop(tx);

    let mut tx = store.begin("alice").await.unwrap();
    let mut settled = round.clone();
    settled.status = CrashStatus::Crashed;
    assert!(tx.update_crash(&settled).await.unwrap());
    assert!(tx.active_crash().await.unwrap().is_none());
}
