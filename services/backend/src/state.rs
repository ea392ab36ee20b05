use crate::config::Config;
use crate::services::GameEngine;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub engine: Arc<GameEngine>,
}

impl AppState {
    pub fn new(config: Config, engine: GameEngine) -> Self {
        Self {
            config: Arc::new(config),
            engine: Arc::new(engine),
        }
    }
}
