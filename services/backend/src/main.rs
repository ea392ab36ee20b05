use axum::{routing::get, Router};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use backend::config::Config;
use backend::repository::{InMemoryStore, PostgresStore, RedisEventPublisher, Store};
use backend::services::{BetLimits, GameEngine, GameEventPublisher, HouseEdgeTable, NoopPublisher};
use backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize structured logging with JSON formatting (configurable via env)
    let use_json = std::env::var("LOG_FORMAT")
        .unwrap_or_else(|_| "text".to_string())
        .eq_ignore_ascii_case("json");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "backend=info,tower_http=info".into());

    if use_json {
        // JSON structured logging for production
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        // Human-readable logging for development
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        service = "backend",
        version = env!("CARGO_PKG_VERSION"),
        log_format = if use_json { "json" } else { "text" },
        "Starting game service"
    );

    // Load configuration
    let config = Config::load()?;
    tracing::info!("Configuration loaded");

    let lock_timeout = Duration::from_millis(config.betting.user_lock_timeout_ms);

    // Persistent store
    let store: Arc<dyn Store> = match &config.database {
        Some(database) => {
            let pool = PgPoolOptions::new()
                .max_connections(database.pool_size)
                .connect(&database.url)
                .await?;
            let store = PostgresStore::new(pool, lock_timeout);
            store.migrate().await?;
            tracing::info!(pool_size = database.pool_size, "Postgres connected, migrations applied");
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; state is lost on restart");
            Arc::new(InMemoryStore::new(lock_timeout))
        }
    };

    // Settled-game event stream
    let events: Arc<dyn GameEventPublisher> = match &config.redis {
        Some(redis) => {
            let publisher = RedisEventPublisher::connect(
                &redis.url,
                redis.events_stream.clone(),
                redis.events_maxlen,
            )
            .await?;
            tracing::info!(stream = %publisher.stream(), "Redis connected");
            Arc::new(publisher)
        }
        None => {
            tracing::info!("REDIS_URL not set, settled-game events are disabled");
            Arc::new(NoopPublisher)
        }
    };

    let edges = HouseEdgeTable::from_config(&config.house_edges)?;
    let limits = BetLimits::from(&config.betting);
    let engine = GameEngine::new(store, events, edges, limits);

    // Initialize application state
    let app_state = AppState::new(config.clone(), engine);
    let app = backend::build_router(app_state);

    // Start metrics server
    let metrics_handle = tokio::spawn(start_metrics_server(config.metrics_port));

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.api_port));
    tracing::info!("Game API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    metrics_handle.await??;

    Ok(())
}

async fn start_metrics_server(port: u16) -> anyhow::Result<()> {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let handle = builder.install_recorder()?;

    let app = Router::new().route(
        "/metrics",
        get(|| async move { handle.render() }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Metrics server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
