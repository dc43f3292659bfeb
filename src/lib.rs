pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod feed;
pub mod gate;
pub mod models;
pub mod params;
pub mod policy;
pub mod routes;
pub mod store;

use crate::config::AppConfig;
use crate::store::RecordStore;
use axum::extract::FromRef;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: AppConfig,
}

impl FromRef<AppState> for Arc<dyn RecordStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
