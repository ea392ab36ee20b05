//! Game engine
//!
//! [`GameEngine`] owns the store, the seed vault, the ledger and the
//! read-only house-edge table. Each game operation is one per-user unit of
//! work: debit, nonce reservation, outcome, game row and credit commit
//! together or not at all. Settled games are published after commit.

pub mod events;
pub mod games;
pub mod house_edge;
pub mod ledger;
pub mod seed_vault;

use std::future::Future;
use std::sync::Arc;

use shared::MAX_HISTORY_LIMIT;

use crate::domain::{CrashView, MinesView, SeedHistory};
use crate::errors::{AppError, Result};
use crate::repository::Store;

pub use events::{GameEventPublisher, NoopPublisher, SettledGameEvent};
pub use games::{CrashCommand, MinesCommand};
pub use house_edge::{BetLimits, HouseEdgeTable};
pub use ledger::{Ledger, Posting};
pub use seed_vault::SeedVault;

pub struct GameEngine {
    store: Arc<dyn Store>,
    seeds: SeedVault,
    ledger: Ledger,
    edges: HouseEdgeTable,
    limits: BetLimits,
    events: Arc<dyn GameEventPublisher>,
}

impl GameEngine {
    pub fn new(
        store: Arc<dyn Store>,
        events: Arc<dyn GameEventPublisher>,
        edges: HouseEdgeTable,
        limits: BetLimits,
    ) -> Self {
        Self {
            seeds: SeedVault::new(store.clone()),
            ledger: Ledger::new(store.clone()),
            store,
            edges,
            limits,
            events,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn seeds(&self) -> &SeedVault {
        &self.seeds
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn edges(&self) -> &HouseEdgeTable {
        &self.edges
    }

    pub fn limits(&self) -> BetLimits {
        self.limits
    }

    pub fn events(&self) -> &Arc<dyn GameEventPublisher> {
        &self.events
    }

    /// Recent finished games with the seed snapshot each was played with
    pub async fn seed_history(&self, user_id: &str, limit: i64) -> Result<SeedHistory> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        let coinflip = self.store.recent_coinflips(user_id, limit).await?;
        let mines = self.store.recent_mines(user_id, limit).await?;
        let crash = self.store.recent_crashes(user_id, limit).await?;

        Ok(SeedHistory {
            coinflip,
            mines: mines.iter().map(MinesView::from).collect(),
            crash: crash.iter().map(CrashView::from).collect(),
        })
    }

    /// Best-effort publish of a settled game; failures are only logged
    pub(crate) async fn publish_settled(&self, event: SettledGameEvent) {
        if let Err(e) = self.events.publish(&event).await {
            metrics::counter!("event_publish_failures_total", "sink" => self.events.name())
                .increment(1);
            tracing::warn!(
                game_id = %event.game_id,
                sink = self.events.name(),
                error = %e,
                "Failed to publish settled-game event"
            );
        }
    }
}

/// Run a unit of work, retrying it once on a concurrency conflict
///
/// `attempt` must rebuild the whole unit of work from scratch: the failed
/// attempt's transaction has already been rolled back.
pub(crate) async fn with_conflict_retry<T, F, Fut>(operation: &'static str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    match attempt().await {
        Err(AppError::ConcurrencyConflict(reason)) => {
            metrics::counter!("concurrency_conflicts_total", "operation" => operation).increment(1);
            tracing::warn!(operation, reason = %reason, "Concurrency conflict, retrying once");
            attempt().await
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_runs_once_more_on_conflict() {
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;
        let result = with_conflict_retry("test", move || async move {
            if calls_ref.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(AppError::ConcurrencyConflict("busy".to_string()))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_surfaces_second_conflict() {
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;
        let result: Result<()> = with_conflict_retry("test", move || async move {
            calls_ref.fetch_add(1, Ordering::SeqCst);
            Err(AppError::ConcurrencyConflict("busy".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::ConcurrencyConflict(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_does_not_repeat_other_errors() {
        let calls = AtomicU32::new(0);
        let calls_ref = &calls;
        let result: Result<()> = with_conflict_retry("test", move || async move {
            calls_ref.fetch_add(1, Ordering::SeqCst);
            Err(AppError::Validation("bad".to_string()))
        })
        .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
