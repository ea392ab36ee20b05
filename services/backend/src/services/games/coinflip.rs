//! Coinflip: one request, one resolution

use chrono::Utc;
use shared::GameKind;
use uuid::Uuid;

use super::{bet_ref, record_bet_placed, record_settled, win_key};
use crate::domain::{CoinflipBetRequest, CoinflipGame, CoinflipSettlement, EntryKind};
use crate::errors::{AppError, Result};
use crate::fairness;
use crate::payout;
use crate::services::ledger::{Ledger, Posting};
use crate::services::seed_vault::SeedVault;
use crate::services::{with_conflict_retry, GameEngine, SettledGameEvent};

impl GameEngine {
    /// Debit, draw, settle and credit in a single unit of work
    #[tracing::instrument(
        skip(self, request),
        fields(bet_amount = request.bet_amount, chosen_side = %request.chosen_side)
    )]
    pub async fn play_coinflip(
        &self,
        user_id: &str,
        request: &CoinflipBetRequest,
    ) -> Result<CoinflipSettlement> {
        self.limits().check(request.bet_amount)?;

        let edge = self.edges().lookup(GameKind::Coinflip);
        let reference = bet_ref(GameKind::Coinflip, user_id, request.request_id.as_deref());
        let bet_ref = reference.as_str();
        let bet_amount = request.bet_amount;
        let chosen_side = request.chosen_side;
        let store = self.store();

        let settlement = with_conflict_retry("coinflip.play", move || async move {
            let mut tx = store.begin(user_id).await?;

            if let Some(game) = tx.coinflip_by_ref(bet_ref).await? {
                let balance = tx.balance().await?;
                return Ok(CoinflipSettlement {
                    game,
                    balance,
                    replayed: true,
                });
            }

            Ledger::debit_in(
                tx.as_mut(),
                Posting::new(EntryKind::Bet, bet_amount, bet_ref, "Coinflip bet"),
            )
            .await?;
            let seed = SeedVault::reserve_nonce_in(tx.as_mut()).await?;

            let draw = fairness::coinflip(&seed.server_seed, &seed.client_seed, seed.nonce);
            let won = draw.side == chosen_side;
            let payout = if won {
                payout::coinflip_payout(bet_amount, edge)
            } else {
                0
            };

            let game = CoinflipGame {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                bet_ref: bet_ref.to_string(),
                bet_amount,
                house_edge: edge,
                seed: seed.snapshot(),
                chosen_side,
                result_side: draw.side,
                won,
                multiplier: payout::coinflip_multiplier(edge),
                payout,
                created_at: Utc::now(),
            };
            tx.insert_coinflip(&game).await?;

            if payout > 0 {
                let key = win_key(GameKind::Coinflip, game.id);
                Ledger::credit_in(
                    tx.as_mut(),
                    Posting::new(EntryKind::Win, payout, &key, "Coinflip win"),
                )
                .await?;
            }

            let balance = tx.balance().await?;
            tx.commit().await?;

            Ok(CoinflipSettlement {
                game,
                balance,
                replayed: false,
            })
        })
        .await?;

        if settlement.replayed {
            tracing::info!(game_id = %settlement.game.id, "Replayed coinflip request");
            return Ok(settlement);
        }

        let game = &settlement.game;
        let status = if game.won { "won" } else { "lost" };
        record_bet_placed(GameKind::Coinflip);
        record_settled(GameKind::Coinflip, status);
        tracing::info!(
            game_id = %game.id,
            nonce = game.seed.nonce,
            result_side = %game.result_side,
            payout = game.payout,
            status,
            "Coinflip settled"
        );
        self.publish_settled(SettledGameEvent::from(game)).await;

        Ok(settlement)
    }

    pub async fn coinflip_game(&self, user_id: &str, game_id: Uuid) -> Result<CoinflipGame> {
        self.store()
            .find_coinflip(user_id, game_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Coinflip game {} not found", game_id)))
    }
}
