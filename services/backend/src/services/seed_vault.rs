//! Commit-reveal seed custody
//!
//! The server seed stays secret until rotation; only its SHA-256 commitment
//! is shown. The nonce is bumped by one atomic increment per resolved bet,
//! so no `(server_seed, nonce)` pair is ever used twice.

use std::sync::Arc;

use chrono::Utc;
use shared::ClientSeed;

use super::with_conflict_retry;
use crate::domain::{RotationReveal, SeedState, SeedView};
use crate::errors::{AppError, Result};
use crate::fairness;
use crate::repository::{Store, UserTx};

pub struct SeedVault {
    store: Arc<dyn Store>,
}

impl SeedVault {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Existing seed state, or a freshly generated one staged in `tx`
    pub async fn get_or_init_in(tx: &mut dyn UserTx) -> Result<SeedState> {
        if let Some(seed) = tx.load_seed().await? {
            return Ok(seed);
        }

        let server_seed = fairness::generate_server_seed();
        let now = Utc::now();
        let seed = SeedState {
            user_id: tx.user_id().to_string(),
            server_seed_hash: fairness::commitment(&server_seed),
            server_seed,
            client_seed: fairness::generate_client_seed(),
            nonce: 0,
            created_at: now,
            updated_at: now,
        };
        tx.insert_seed(&seed).await?;

        tracing::info!(
            user_id = %seed.user_id,
            server_seed_hash = %seed.server_seed_hash,
            "Initialized seed state"
        );
        Ok(seed)
    }

    /// Claim the next nonce; the first bet of a seed epoch gets nonce 1
    pub async fn reserve_nonce_in(tx: &mut dyn UserTx) -> Result<SeedState> {
        Self::get_or_init_in(tx).await?;
        tx.increment_nonce()
            .await?
            .ok_or_else(|| AppError::not_found("Seed state disappeared during nonce reservation"))
    }

    pub async fn get_or_init(&self, user_id: &str) -> Result<SeedState> {
        let store = &self.store;
        with_conflict_retry("seeds.get_or_init", move || async move {
            let mut tx = store.begin(user_id).await?;
            let seed = Self::get_or_init_in(tx.as_mut()).await?;
            tx.commit().await?;
            Ok(seed)
        })
        .await
    }

    /// Standalone nonce reservation in its own unit of work
    pub async fn reserve_nonce(&self, user_id: &str) -> Result<SeedState> {
        let store = &self.store;
        with_conflict_retry("seeds.reserve_nonce", move || async move {
            let mut tx = store.begin(user_id).await?;
            let seed = Self::reserve_nonce_in(tx.as_mut()).await?;
            tx.commit().await?;
            Ok(seed)
        })
        .await
    }

    /// Public view; never exposes the server seed
    pub async fn current(&self, user_id: &str) -> Result<SeedView> {
        if let Some(seed) = self.store.seed_state(user_id).await? {
            return Ok(seed.view());
        }
        Ok(self.get_or_init(user_id).await?.view())
    }

    #[tracing::instrument(skip(self, client_seed))]
    pub async fn set_client_seed(&self, user_id: &str, client_seed: ClientSeed) -> Result<SeedView> {
        let store = &self.store;
        let client_seed = &client_seed;
        let seed = with_conflict_retry("seeds.set_client_seed", move || async move {
            let mut tx = store.begin(user_id).await?;
            Self::get_or_init_in(tx.as_mut()).await?;
            let seed = tx
                .update_client_seed(client_seed.as_str())
                .await?
                .ok_or_else(|| AppError::not_found("Seed state not found"))?;
            tx.commit().await?;
            Ok(seed)
        })
        .await?;

        tracing::info!(nonce = seed.nonce, "Client seed updated");
        Ok(seed.view())
    }

    /// Reveal the current server seed and commit to a new one
    #[tracing::instrument(skip(self))]
    pub async fn rotate(&self, user_id: &str) -> Result<RotationReveal> {
        let store = &self.store;
        let reveal = with_conflict_retry("seeds.rotate", move || async move {
            let mut tx = store.begin(user_id).await?;
            let previous = Self::get_or_init_in(tx.as_mut()).await?;

            // A live round was drawn from this seed; revealing it would expose the outcome
            if tx.active_mines().await?.is_some() || tx.active_crash().await?.is_some() {
                return Err(AppError::invalid_state(
                    "Finish active games before rotating the server seed",
                ));
            }

            let next_seed = fairness::generate_server_seed();
            let next_hash = fairness::commitment(&next_seed);
            tx.replace_server_seed(&next_seed, &next_hash)
                .await?
                .ok_or_else(|| AppError::not_found("Seed state not found"))?;
            tx.commit().await?;

            Ok(RotationReveal {
                previous_server_seed: previous.server_seed,
                previous_server_seed_hash: previous.server_seed_hash,
                previous_nonce: previous.nonce,
                new_server_seed_hash: next_hash,
            })
        })
        .await?;

        metrics::counter!("seed_rotations_total").increment(1);
        tracing::info!(
            previous_server_seed_hash = %reveal.previous_server_seed_hash,
            previous_nonce = reveal.previous_nonce,
            new_server_seed_hash = %reveal.new_server_seed_hash,
            "Server seed rotated"
        );
        Ok(reveal)
    }
}
