use axum::{
    extract::{Query, State},
    Json,
};
use shared::ClientSeed;

use crate::{
    domain::{HistoryQuery, RotationReveal, SeedHistory, SeedView, SetClientSeedRequest},
    errors::Result,
    extractors::{AuthenticatedUser, ValidatedJson},
    state::AppState,
};

const DEFAULT_HISTORY_LIMIT: i64 = 20;

pub async fn current(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<SeedView>> {
    let view = state.engine.seeds().current(user.as_str()).await?;
    Ok(Json(view))
}

pub async fn set_client_seed(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<SetClientSeedRequest>,
) -> Result<Json<SeedView>> {
    let client_seed = ClientSeed::try_from(req.client_seed)?;
    let view = state
        .engine
        .seeds()
        .set_client_seed(user.as_str(), client_seed)
        .await?;
    Ok(Json(view))
}

pub async fn rotate(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<RotationReveal>> {
    let reveal = state.engine.seeds().rotate(user.as_str()).await?;
    Ok(Json(reveal))
}

pub async fn history(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<SeedHistory>> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let history = state.engine.seed_history(user.as_str(), limit).await?;
    tracing::debug!(
        coinflip = history.coinflip.len(),
        mines = history.mines.len(),
        crash = history.crash.len(),
        "Retrieved seed history"
    );
    Ok(Json(history))
}
