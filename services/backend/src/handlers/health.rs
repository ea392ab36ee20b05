use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn detailed_health(State(state): State<AppState>) -> Json<Value> {
    let store = state.engine.store();
    let events = state.engine.events();

    let store_healthy = match store.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, backend = store.backend_name(), "Store health check failed");
            false
        }
    };

    let events_healthy = match events.ping().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, sink = events.name(), "Event sink health check failed");
            false
        }
    };

    Json(json!({
        "status": if store_healthy && events_healthy { "healthy" } else { "degraded" },
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "components": {
            "store": {
                "backend": store.backend_name(),
                "status": if store_healthy { "healthy" } else { "unhealthy" },
            },
            "events": {
                "sink": events.name(),
                "status": if events_healthy { "healthy" } else { "unhealthy" },
            },
        }
    }))
}
