use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::{
    domain::{CrashCashoutRequest, CrashUpdate, CrashView, StartCrashRequest},
    errors::Result,
    extractors::{AuthenticatedUser, ValidatedJson},
    services::CrashCommand,
    state::AppState,
};

pub async fn start(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<StartCrashRequest>,
) -> Result<Json<CrashUpdate>> {
    let update = state.engine.crash(user.as_str(), CrashCommand::from(req)).await?;
    Ok(Json(update))
}

pub async fn cashout(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<CrashCashoutRequest>,
) -> Result<Json<CrashUpdate>> {
    let update = state.engine.crash(user.as_str(), CrashCommand::from(req)).await?;
    Ok(Json(update))
}

pub async fn get_game(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(game_id): Path<Uuid>,
) -> Result<Json<CrashView>> {
    let game = state.engine.crash_game(user.as_str(), game_id).await?;
    Ok(Json(game))
}
