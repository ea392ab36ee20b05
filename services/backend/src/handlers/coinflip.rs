use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    domain::{CoinflipBetRequest, CoinflipGame, CoinflipSettlement},
    errors::Result,
    extractors::{AuthenticatedUser, ValidatedJson},
    state::AppState,
};

pub async fn play(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<CoinflipBetRequest>,
) -> Result<Json<CoinflipSettlement>> {
    let settlement = state.engine.play_coinflip(user.as_str(), &req).await?;
    Ok(Json(settlement))
}

pub async fn get_game(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(game_id): Path<Uuid>,
) -> Result<Json<CoinflipGame>> {
    let game = state.engine.coinflip_game(user.as_str(), game_id).await?;
    Ok(Json(game))
}
