use std::sync::Arc;

use crate::{config::Config, store::DocumentStore};
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub config: Config,
}

impl FromRef<AppState> for Arc<DocumentStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
