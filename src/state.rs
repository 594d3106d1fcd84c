use std::sync::Arc;

use crate::config::Config;
use crate::engine::ProgressionEngine;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ProgressionEngine>,
    pub config: Config,
}

impl FromRef<AppState> for Arc<ProgressionEngine> {
    fn from_ref(state: &AppState) -> Self {
        state.engine.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
