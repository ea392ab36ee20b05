//! Append-only ledger
//!
//! Balances are never stored: `balance(user) = SUM(amount)` over the user's
//! entries, recomputed on every read. Every posting carries a globally unique
//! idempotency key; replaying a key returns the entry it created.

use std::sync::Arc;

use chrono::Utc;
use shared::MAX_HISTORY_LIMIT;
use uuid::Uuid;

use super::with_conflict_retry;
use crate::domain::{EntryKind, LedgerEntry, WalletSummary};
use crate::errors::{AppError, Result};
use crate::repository::{Store, UserTx};
use crate::repository::status::entry_kind_to_string;

/// One money movement request; `amount` is always positive
#[derive(Debug, Clone, Copy)]
pub struct Posting<'a> {
    pub kind: EntryKind,
    pub amount: i64,
    pub idempotency_key: &'a str,
    pub description: &'a str,
}

impl<'a> Posting<'a> {
    pub fn new(kind: EntryKind, amount: i64, idempotency_key: &'a str, description: &'a str) -> Self {
        Self {
            kind,
            amount,
            idempotency_key,
            description,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.amount <= 0 {
            return Err(AppError::Validation(format!(
                "Amount must be greater than zero, got {}",
                self.amount
            )));
        }
        if self.idempotency_key.trim().is_empty() {
            return Err(AppError::Validation("Idempotency key must not be empty".to_string()));
        }
        Ok(())
    }
}

pub struct Ledger {
    store: Arc<dyn Store>,
}

impl Ledger {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Debit inside an open unit of work
    pub async fn debit_in(tx: &mut dyn UserTx, posting: Posting<'_>) -> Result<LedgerEntry> {
        posting.validate()?;
        if !posting.kind.is_debit() {
            return Err(AppError::Validation(format!(
                "{} is not a debit kind",
                entry_kind_to_string(posting.kind)
            )));
        }

        if let Some(existing) = Self::replayed(tx, &posting).await? {
            return Ok(existing);
        }

        let available = tx.balance().await?;
        if available < posting.amount {
            return Err(AppError::InsufficientBalance {
                required: posting.amount,
                available,
            });
        }

        Self::append(tx, &posting, -posting.amount).await
    }

    /// Credit inside an open unit of work
    pub async fn credit_in(tx: &mut dyn UserTx, posting: Posting<'_>) -> Result<LedgerEntry> {
        posting.validate()?;
        if posting.kind.is_debit() {
            return Err(AppError::Validation(format!(
                "{} is not a credit kind",
                entry_kind_to_string(posting.kind)
            )));
        }

        if let Some(existing) = Self::replayed(tx, &posting).await? {
            return Ok(existing);
        }

        Self::append(tx, &posting, posting.amount).await
    }

    /// Standalone debit in its own unit of work
    #[tracing::instrument(skip(self, description))]
    pub async fn debit(
        &self,
        user_id: &str,
        amount: i64,
        idempotency_key: &str,
        kind: EntryKind,
        description: &str,
    ) -> Result<LedgerEntry> {
        let store = &self.store;
        with_conflict_retry("ledger.debit", move || async move {
            let mut tx = store.begin(user_id).await?;
            let entry = Self::debit_in(
                tx.as_mut(),
                Posting::new(kind, amount, idempotency_key, description),
            )
            .await?;
            tx.commit().await?;
            Ok(entry)
        })
        .await
    }

    /// Standalone credit in its own unit of work
    #[tracing::instrument(skip(self, description))]
    pub async fn credit(
        &self,
        user_id: &str,
        amount: i64,
        idempotency_key: &str,
        kind: EntryKind,
        description: &str,
    ) -> Result<LedgerEntry> {
        let store = &self.store;
        with_conflict_retry("ledger.credit", move || async move {
            let mut tx = store.begin(user_id).await?;
            let entry = Self::credit_in(
                tx.as_mut(),
                Posting::new(kind, amount, idempotency_key, description),
            )
            .await?;
            tx.commit().await?;
            Ok(entry)
        })
        .await
    }

    pub async fn balance(&self, user_id: &str) -> Result<i64> {
        self.store.balance(user_id).await
    }

    pub async fn summary(&self, user_id: &str) -> Result<WalletSummary> {
        let balance = self.store.balance(user_id).await?;
        let totals = self.store.wallet_totals(user_id).await?;
        Ok(WalletSummary {
            balance,
            total_wagered: totals.total_wagered,
            total_won: totals.total_won,
            profit: totals.total_won - totals.total_wagered,
        })
    }

    /// Most recent entries first; `limit` is clamped to `1..=100`
    pub async fn history(&self, user_id: &str, limit: i64) -> Result<Vec<LedgerEntry>> {
        self.store
            .ledger_entries(user_id, limit.clamp(1, MAX_HISTORY_LIMIT))
            .await
    }

    async fn replayed(tx: &mut dyn UserTx, posting: &Posting<'_>) -> Result<Option<LedgerEntry>> {
        let Some(existing) = tx.entry_by_key(posting.idempotency_key).await? else {
            return Ok(None);
        };

        if existing.user_id != tx.user_id() || existing.kind != posting.kind {
            tracing::warn!(
                idempotency_key = posting.idempotency_key,
                "Idempotency key reused for a different posting"
            );
            return Err(AppError::IdempotencyKeyReused(posting.idempotency_key.to_string()));
        }

        tracing::debug!(
            idempotency_key = posting.idempotency_key,
            entry_id = %existing.id,
            "Replaying existing ledger entry"
        );
        Ok(Some(existing))
    }

    async fn append(tx: &mut dyn UserTx, posting: &Posting<'_>, signed_amount: i64) -> Result<LedgerEntry> {
        let entry = LedgerEntry {
            id: Uuid::new_v4(),
            user_id: tx.user_id().to_string(),
            kind: posting.kind,
            amount: signed_amount,
            idempotency_key: posting.idempotency_key.to_string(),
            description: posting.description.to_string(),
            created_at: Utc::now(),
        };

        if !tx.append_entry(&entry).await? {
            // Another unit of work claimed the key first; a retry will replay it
            return Err(AppError::ConcurrencyConflict(format!(
                "idempotency key {} claimed concurrently",
                posting.idempotency_key
            )));
        }

        metrics::counter!("ledger_entries_total", "kind" => entry_kind_to_string(posting.kind))
            .increment(1);
        tracing::debug!(
            entry_id = %entry.id,
            amount = signed_amount,
            kind = entry_kind_to_string(posting.kind),
            "Ledger entry appended"
        );
        Ok(entry)
    }
}
