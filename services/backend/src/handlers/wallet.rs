use axum::{
    extract::{Query, State},
    Json,
};

use crate::{
    domain::{HistoryQuery, LedgerEntry, WalletSummary},
    errors::Result,
    extractors::AuthenticatedUser,
    state::AppState,
};

const DEFAULT_TRANSACTION_LIMIT: i64 = 20;

pub async fn balance(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<WalletSummary>> {
    let summary = state.engine.ledger().summary(user.as_str()).await?;
    Ok(Json(summary))
}

pub async fn transactions(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<LedgerEntry>>> {
    let limit = query.limit.unwrap_or(DEFAULT_TRANSACTION_LIMIT);
    let entries = state.engine.ledger().history(user.as_str(), limit).await?;
    tracing::debug!(entry_count = entries.len(), "Retrieved ledger entries");
    Ok(Json(entries))
}
