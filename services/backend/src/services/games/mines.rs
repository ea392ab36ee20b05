//! Mines: 5x5 board, player-chosen mine count
//!
//! `active -> active` on a safe reveal, `active -> lost` on a mine,
//! `active -> won` on cashout or once every safe tile is revealed.
//! A player holds at most one active game.

use chrono::Utc;
use shared::{GameKind, MAX_MINES, MIN_MINES, TILE_COUNT};
use uuid::Uuid;

use super::{bet_ref, record_bet_placed, record_settled, win_key};
use crate::domain::{
    EntryKind, MinesCashoutRequest, MinesGame, MinesStatus, MinesUpdate, MinesView,
    RevealTileRequest, StartMinesRequest,
};
use crate::errors::{AppError, Result};
use crate::fairness;
use crate::payout;
use crate::repository::UserTx;
use crate::repository::status::mines_status_to_string;
use crate::services::ledger::{Ledger, Posting};
use crate::services::seed_vault::SeedVault;
use crate::services::{with_conflict_retry, GameEngine, SettledGameEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum MinesCommand {
    Start {
        bet_amount: i64,
        mines_count: u8,
        request_id: Option<String>,
    },
    Reveal {
        game_id: Uuid,
        tile_index: u8,
    },
    Cashout {
        game_id: Uuid,
    },
}

impl From<StartMinesRequest> for MinesCommand {
    fn from(request: StartMinesRequest) -> Self {
        MinesCommand::Start {
            bet_amount: request.bet_amount,
            mines_count: request.mines_count,
            request_id: request.request_id,
        }
    }
}

impl From<RevealTileRequest> for MinesCommand {
    fn from(request: RevealTileRequest) -> Self {
        MinesCommand::Reveal {
            game_id: request.game_id,
            tile_index: request.tile_index,
        }
    }
}

impl From<MinesCashoutRequest> for MinesCommand {
    fn from(request: MinesCashoutRequest) -> Self {
        MinesCommand::Cashout {
            game_id: request.game_id,
        }
    }
}

impl GameEngine {
    #[tracing::instrument(skip(self))]
    pub async fn mines(&self, user_id: &str, command: MinesCommand) -> Result<MinesUpdate> {
        let (update, game) = match command {
            MinesCommand::Start {
                bet_amount,
                mines_count,
                request_id,
            } => {
                self.start_mines(user_id, bet_amount, mines_count, request_id.as_deref())
                    .await?
            }
            MinesCommand::Reveal {
                game_id,
                tile_index,
            } => self.reveal_tile(user_id, game_id, tile_index).await?,
            MinesCommand::Cashout { game_id } => self.cashout_mines(user_id, game_id).await?,
        };

        if !update.replayed && !game.is_active() {
            let status = mines_status_to_string(game.status);
            record_settled(GameKind::Mines, status);
            tracing::info!(
                game_id = %game.id,
                nonce = game.seed.nonce,
                safe_reveals = game.safe_reveals(),
                payout = game.payout,
                status,
                "Mines game settled"
            );
            self.publish_settled(SettledGameEvent::from(&game)).await;
        }

        Ok(update)
    }

    /// The player's active game, if any; mine positions stay hidden
    pub async fn active_mines(&self, user_id: &str) -> Result<Option<MinesView>> {
        Ok(self
            .store()
            .find_active_mines(user_id)
            .await?
            .as_ref()
            .map(MinesView::from))
    }

    pub async fn mines_game(&self, user_id: &str, game_id: Uuid) -> Result<MinesView> {
        self.store()
            .find_mines(user_id, game_id)
            .await?
            .as_ref()
            .map(MinesView::from)
            .ok_or_else(|| AppError::not_found(format!("Mines game {} not found", game_id)))
    }

    async fn start_mines(
        &self,
        user_id: &str,
        bet_amount: i64,
        mines_count: u8,
        request_id: Option<&str>,
    ) -> Result<(MinesUpdate, MinesGame)> {
        self.limits().check(bet_amount)?;
        if !(MIN_MINES..=MAX_MINES).contains(&mines_count) {
            return Err(AppError::Validation(format!(
                "Mines count must be between {} and {}",
                MIN_MINES, MAX_MINES
            )));
        }

        let edge = self.edges().lookup(GameKind::Mines);
        let reference = bet_ref(GameKind::Mines, user_id, request_id);
        let bet_ref = reference.as_str();
        let store = self.store();

        let (update, game) = with_conflict_retry("mines.start", move || async move {
            let mut tx = store.begin(user_id).await?;

            if let Some(game) = tx.mines_by_ref(bet_ref).await? {
                let balance = tx.balance().await?;
                return Ok((view_update(&game, None, balance, true), game));
            }

            if let Some(active) = tx.active_mines().await? {
                tracing::warn!(active_game_id = %active.id, "Rejected second active mines game");
                return Err(AppError::invalid_state(
                    "Finish the active Mines game before starting a new one",
                ));
            }

            Ledger::debit_in(
                tx.as_mut(),
                Posting::new(EntryKind::Bet, bet_amount, bet_ref, "Mines bet"),
            )
            .await?;
            let seed = SeedVault::reserve_nonce_in(tx.as_mut()).await?;
            let mine_positions =
                fairness::mine_positions(&seed.server_seed, &seed.client_seed, seed.nonce, mines_count);

            let now = Utc::now();
            let game = MinesGame {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                bet_ref: bet_ref.to_string(),
                bet_amount,
                house_edge: edge,
                mines_count,
                seed: seed.snapshot(),
                mine_positions,
                revealed_tiles: Vec::new(),
                status: MinesStatus::Active,
                multiplier: 1.0,
                payout: 0,
                created_at: now,
                updated_at: now,
            };
            tx.insert_mines(&game).await?;

            let balance = tx.balance().await?;
            tx.commit().await?;
            Ok((view_update(&game, None, balance, false), game))
        })
        .await?;

        if !update.replayed {
            record_bet_placed(GameKind::Mines);
            tracing::info!(
                game_id = %game.id,
                nonce = game.seed.nonce,
                mines_count,
                "Mines game started"
            );
        }
        Ok((update, game))
    }

    async fn reveal_tile(
        &self,
        user_id: &str,
        game_id: Uuid,
        tile_index: u8,
    ) -> Result<(MinesUpdate, MinesGame)> {
        if tile_index >= TILE_COUNT {
            return Err(AppError::Validation(format!(
                "Tile index must be between 0 and {}",
                TILE_COUNT - 1
            )));
        }

        let store = self.store();
        with_conflict_retry("mines.reveal", move || async move {
            let mut tx = store.begin(user_id).await?;
            let mut game = load_owned(tx.as_mut(), game_id).await?;

            if !game.is_active() {
                return Err(AppError::invalid_state("Mines game is already finished"));
            }
            if game.revealed_tiles.contains(&tile_index) {
                return Err(AppError::invalid_state(format!(
                    "Tile {} is already revealed",
                    tile_index
                )));
            }

            game.revealed_tiles.push(tile_index);
            game.updated_at = Utc::now();
            let is_mine = game.is_mine(tile_index);

            if is_mine {
                game.status = MinesStatus::Lost;
                game.multiplier = 0.0;
                game.payout = 0;
            } else {
                let safe_reveals = game.safe_reveals();
                game.multiplier = payout::mines_multiplier(game.house_edge, game.mines_count, safe_reveals);
                if safe_reveals >= game.safe_tile_count() {
                    settle_win(&mut game);
                }
            }

            store_transition(tx.as_mut(), &game).await?;
            if game.status == MinesStatus::Won {
                credit_win(tx.as_mut(), &game).await?;
            }

            let balance = tx.balance().await?;
            tx.commit().await?;

            tracing::debug!(game_id = %game.id, tile_index, is_mine, "Tile revealed");
            Ok((view_update(&game, Some(is_mine), balance, false), game))
        })
        .await
    }

    async fn cashout_mines(&self, user_id: &str, game_id: Uuid) -> Result<(MinesUpdate, MinesGame)> {
        let store = self.store();
        with_conflict_retry("mines.cashout", move || async move {
            let mut tx = store.begin(user_id).await?;
            let mut game = load_owned(tx.as_mut(), game_id).await?;

            match game.status {
                MinesStatus::Won => {
                    let balance = tx.balance().await?;
                    return Ok((view_update(&game, None, balance, true), game));
                }
                MinesStatus::Lost => {
                    return Err(AppError::invalid_state("Cannot cash out a lost Mines game"));
                }
                MinesStatus::Active => {}
            }

            if game.safe_reveals() == 0 {
                return Err(AppError::invalid_state(
                    "Reveal at least one tile before cashing out",
                ));
            }

            game.updated_at = Utc::now();
            settle_win(&mut game);
            store_transition(tx.as_mut(), &game).await?;
            credit_win(tx.as_mut(), &game).await?;

            let balance = tx.balance().await?;
            tx.commit().await?;
            Ok((view_update(&game, None, balance, false), game))
        })
        .await
    }
}

async fn load_owned(tx: &mut dyn UserTx, game_id: Uuid) -> Result<MinesGame> {
    tx.load_mines(game_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Mines game {} not found", game_id)))
}

/// Optimistic `WHERE status = 'active'` update
async fn store_transition(tx: &mut dyn UserTx, game: &MinesGame) -> Result<()> {
    if !tx.update_mines(game).await? {
        return Err(AppError::ConcurrencyConflict(format!(
            "mines game {} changed concurrently",
            game.id
        )));
    }
    Ok(())
}

fn settle_win(game: &mut MinesGame) {
    let safe_reveals = game.safe_reveals();
    game.status = MinesStatus::Won;
    game.multiplier = payout::mines_multiplier(game.house_edge, game.mines_count, safe_reveals);
    game.payout = payout::mines_payout(game.bet_amount, game.house_edge, game.mines_count, safe_reveals);
}

async fn credit_win(tx: &mut dyn UserTx, game: &MinesGame) -> Result<()> {
    if game.payout <= 0 {
        return Ok(());
    }
    let key = win_key(GameKind::Mines, game.id);
    Ledger::credit_in(tx, Posting::new(EntryKind::Win, game.payout, &key, "Mines cashout")).await?;
    Ok(())
}

fn view_update(game: &MinesGame, is_mine: Option<bool>, balance: i64, replayed: bool) -> MinesUpdate {
    MinesUpdate {
        is_mine,
        game: MinesView::from(game),
        balance,
        replayed,
    }
}
