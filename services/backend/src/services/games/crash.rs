//! Crash: single-player round against a hidden crash point
//!
//! The crash point is drawn at start and stays server-side. On cashout the
//! server compares the claimed multiplier with the stored crash point; the
//! client's timing is never trusted for anything else.

use chrono::Utc;
use shared::{CrashMultiplier, GameKind};
use uuid::Uuid;

use super::{bet_ref, record_bet_placed, record_settled, win_key};
use crate::domain::{
    CrashCashoutRequest, CrashGame, CrashStatus, CrashUpdate, CrashView, EntryKind,
    StartCrashRequest,
};
use crate::errors::{AppError, Result};
use crate::fairness;
use crate::payout;
use crate::repository::status::crash_status_to_string;
use crate::services::ledger::{Ledger, Posting};
use crate::services::seed_vault::SeedVault;
use crate::services::{with_conflict_retry, GameEngine, SettledGameEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum CrashCommand {
    Start {
        bet_amount: i64,
        request_id: Option<String>,
    },
    Cashout {
        game_id: Uuid,
        multiplier: f64,
    },
}

impl From<StartCrashRequest> for CrashCommand {
    fn from(request: StartCrashRequest) -> Self {
        CrashCommand::Start {
            bet_amount: request.bet_amount,
            request_id: request.request_id,
        }
    }
}

impl From<CrashCashoutRequest> for CrashCommand {
    fn from(request: CrashCashoutRequest) -> Self {
        CrashCommand::Cashout {
            game_id: request.game_id,
            multiplier: request.multiplier,
        }
    }
}

impl GameEngine {
    #[tracing::instrument(skip(self))]
    pub async fn crash(&self, user_id: &str, command: CrashCommand) -> Result<CrashUpdate> {
        match command {
            CrashCommand::Start {
                bet_amount,
                request_id,
            } => self.start_crash(user_id, bet_amount, request_id.as_deref()).await,
            CrashCommand::Cashout {
                game_id,
                multiplier,
            } => self.cashout_crash(user_id, game_id, multiplier).await,
        }
    }

    pub async fn crash_game(&self, user_id: &str, game_id: Uuid) -> Result<CrashView> {
        self.store()
            .find_crash(user_id, game_id)
            .await?
            .as_ref()
            .map(CrashView::from)
            .ok_or_else(|| AppError::not_found(format!("Crash game {} not found", game_id)))
    }

    async fn start_crash(
        &self,
        user_id: &str,
        bet_amount: i64,
        request_id: Option<&str>,
    ) -> Result<CrashUpdate> {
        self.limits().check(bet_amount)?;

        let edge = self.edges().lookup(GameKind::Crash);
        let reference = bet_ref(GameKind::Crash, user_id, request_id);
        let bet_ref = reference.as_str();
        let store = self.store();

        let (update, game) = with_conflict_retry("crash.start", move || async move {
            let mut tx = store.begin(user_id).await?;

            if let Some(game) = tx.crash_by_ref(bet_ref).await? {
                let balance = tx.balance().await?;
                return Ok((view_update(&game, balance, true), game));
            }

            Ledger::debit_in(
                tx.as_mut(),
                Posting::new(EntryKind::Bet, bet_amount, bet_ref, "Crash bet"),
            )
            .await?;
            let seed = SeedVault::reserve_nonce_in(tx.as_mut()).await?;
            let draw = fairness::crash_point(&seed.server_seed, &seed.client_seed, seed.nonce, edge);

            let now = Utc::now();
            let game = CrashGame {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                bet_ref: bet_ref.to_string(),
                bet_amount,
                house_edge: edge,
                seed: seed.snapshot(),
                crash_point: draw.crash_point,
                cashout_multiplier: None,
                status: CrashStatus::Active,
                payout: 0,
                created_at: now,
                updated_at: now,
            };
            tx.insert_crash(&game).await?;

            let balance = tx.balance().await?;
            tx.commit().await?;
            Ok((view_update(&game, balance, false), game))
        })
        .await?;

        if !update.replayed {
            record_bet_placed(GameKind::Crash);
            tracing::info!(game_id = %game.id, nonce = game.seed.nonce, "Crash round started");
        }
        Ok(update)
    }

    async fn cashout_crash(&self, user_id: &str, game_id: Uuid, claimed: f64) -> Result<CrashUpdate> {
        let claim = CrashMultiplier::from_claim(claimed)?;
        let store = self.store();

        let (update, game) = with_conflict_retry("crash.cashout", move || async move {
            let mut tx = store.begin(user_id).await?;
            let mut game = tx
                .load_crash(game_id)
                .await?
                .ok_or_else(|| AppError::not_found(format!("Crash game {} not found", game_id)))?;

            if !game.is_active() {
                let balance = tx.balance().await?;
                return Ok((view_update(&game, balance, true), game));
            }

            game.updated_at = Utc::now();
            if claim <= game.crash_point {
                game.status = CrashStatus::CashedOut;
                game.cashout_multiplier = Some(claim);
                game.payout = payout::crash_payout(game.bet_amount, claim);
            } else {
                game.status = CrashStatus::Crashed;
                game.payout = 0;
            }

            if !tx.update_crash(&game).await? {
                return Err(AppError::ConcurrencyConflict(format!(
                    "crash game {} changed concurrently",
                    game.id
                )));
            }

            if game.payout > 0 {
                let key = win_key(GameKind::Crash, game.id);
                Ledger::credit_in(
                    tx.as_mut(),
                    Posting::new(EntryKind::Win, game.payout, &key, "Crash cashout"),
                )
                .await?;
            }

            let balance = tx.balance().await?;
            tx.commit().await?;
            Ok((view_update(&game, balance, false), game))
        })
        .await?;

        if !update.replayed {
            let status = crash_status_to_string(game.status);
            record_settled(GameKind::Crash, status);
            tracing::info!(
                game_id = %game.id,
                claimed = %claim,
                crash_point = %game.crash_point,
                payout = game.payout,
                status,
                "Crash round settled"
            );
            self.publish_settled(SettledGameEvent::from(&game)).await;
        }
        Ok(update)
    }
}

fn view_update(game: &CrashGame, balance: i64, replayed: bool) -> CrashUpdate {
    CrashUpdate {
        game: CrashView::from(game),
        balance,
        replayed,
    }
}
