use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    domain::{MinesCashoutRequest, MinesUpdate, MinesView, RevealTileRequest, StartMinesRequest},
    errors::Result,
    extractors::{AuthenticatedUser, ValidatedJson},
    services::MinesCommand,
    state::AppState,
};

#[derive(Debug, Serialize)]
pub struct ActiveGameResponse {
    pub game: Option<MinesView>,
}

pub async fn start(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<StartMinesRequest>,
) -> Result<Json<MinesUpdate>> {
    let update = state.engine.mines(user.as_str(), MinesCommand::from(req)).await?;
    Ok(Json(update))
}

pub async fn reveal(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<RevealTileRequest>,
) -> Result<Json<MinesUpdate>> {
    let update = state.engine.mines(user.as_str(), MinesCommand::from(req)).await?;
    Ok(Json(update))
}

pub async fn cashout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<MinesCashoutRequest>,
) -> Result<Json<MinesUpdate>> {
    let update = state.engine.mines(user.as_str(), MinesCommand::from(req)).await?;
    Ok(Json(update))
}

pub async fn active(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<ActiveGameResponse>> {
    let game = state.engine.active_mines(user.as_str()).await?;
    Ok(Json(ActiveGameResponse { game }))
}

pub async fn get_game(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(game_id): Path<Uuid>,
) -> Result<Json<MinesView>> {
    let game = state.engine.mines_game(user.as_str(), game_id).await?;
    Ok(Json(game))
}
