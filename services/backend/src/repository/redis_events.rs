//! Redis stream sink for settled games
//!
//! Each event is one stream entry with a single `event` field holding the
//! JSON document. The stream is capped with an approximate MAXLEN.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::streams::StreamMaxlen;
use redis::AsyncCommands;

use crate::errors::{AppError, Result};
use crate::services::events::{GameEventPublisher, SettledGameEvent};

/// Field name carrying the JSON payload
pub const EVENT_FIELD: &str = "event";

/// Key read by the health check
const HEALTH_CHECK_KEY: &str = "_health_check";

pub struct RedisEventPublisher {
    redis: ConnectionManager,
    stream: String,
    maxlen: usize,
}

impl RedisEventPublisher {
    pub fn new(redis: ConnectionManager, stream: impl Into<String>, maxlen: usize) -> Self {
        Self {
            redis,
            stream: stream.into(),
            maxlen,
        }
    }

    pub async fn connect(url: &str, stream: impl Into<String>, maxlen: usize) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let redis = client.get_connection_manager().await?;
        Ok(Self::new(redis, stream, maxlen))
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }
}

#[async_trait]
impl GameEventPublisher for RedisEventPublisher {
    async fn publish(&self, event: &SettledGameEvent) -> Result<()> {
        let payload = serde_json::to_string(event)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("event encoding failed: {}", e)))?;

        let mut redis_conn = self.redis.clone();
        let _: String = redis_conn
            .xadd_maxlen(
                &self.stream,
                StreamMaxlen::Approx(self.maxlen),
                "*",
                &[(EVENT_FIELD, payload)],
            )
            .await?;

        tracing::debug!(
            stream = %self.stream,
            game_id = %event.game_id,
            "Published settled-game event"
        );
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        let mut redis_conn = self.redis.clone();
        let _: Option<String> = redis_conn.get(HEALTH_CHECK_KEY).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
