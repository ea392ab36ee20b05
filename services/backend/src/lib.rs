// Library interface for backend - exposes modules for testing

pub mod config;
pub mod domain;
pub mod errors;
pub mod extractors;
pub mod fairness;
pub mod handlers;
pub mod payout;
pub mod repository;
pub mod services;
pub mod state;

use axum::{
    routing::{get, post},
    Router,
};
use state::AppState;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health::health_check))
        .route("/health/detailed", get(handlers::health::detailed_health))
        // Coinflip
        .route("/api/coinflip/play", post(handlers::coinflip::play))
        .route("/api/coinflip/games/:game_id", get(handlers::coinflip::get_game))
        // Mines
        .route("/api/mines/start", post(handlers::mines::start))
        .route("/api/mines/reveal", post(handlers::mines::reveal))
        .route("/api/mines/cashout", post(handlers::mines::cashout))
        .route("/api/mines/active", get(handlers::mines::active))
        .route("/api/mines/games/:game_id", get(handlers::mines::get_game))
        // Crash
        .route("/api/crash/start", post(handlers::crash::start))
        .route("/api/crash/cashout", post(handlers::crash::cashout))
        .route("/api/crash/games/:game_id", get(handlers::crash::get_game))
        // Seeds
        .route("/api/seeds/current", get(handlers::seeds::current))
        .route("/api/seeds/client-seed", post(handlers::seeds::set_client_seed))
        .route("/api/seeds/rotate", post(handlers::seeds::rotate))
        .route("/api/seeds/history", get(handlers::seeds::history))
        // Fairness (public)
        .route("/api/fairness/verify", post(handlers::fairness::verify))
        // Wallet
        .route("/api/wallet/balance", get(handlers::wallet::balance))
        .route("/api/wallet/transactions", get(handlers::wallet::transactions))
        // State
        .with_state(state)
        // Middleware
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
