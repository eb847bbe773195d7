pub mod appresult;
pub mod auth;
pub mod backend;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod friends;
pub mod index;
pub mod posts;
pub mod profiles;
pub mod res;
pub mod session;
pub mod validate;

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};

pub use appresult::{AppError, AppResult};
use backend::{MemoryBackend, RestBackend, SharedBackend};
use config::{BackendKind, Config};

#[derive(Clone)]
pub struct AppState {
    pub backend: SharedBackend,
}

impl AppState {
    pub fn new(backend: SharedBackend) -> Self {
        Self { backend }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let backend: SharedBackend = match config.backend {
            BackendKind::Supabase => Arc::new(RestBackend::new(
                &config.supabase_url,
                &config.supabase_key,
                config.tables.clone(),
            )?),
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
        };
        Ok(Self::new(backend))
    }
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index::index))
        .merge(auth::router())
        .merge(posts::router())
        .merge(events::router())
        .merge(friends::router())
        .merge(profiles::router())
}

pub fn app(state: AppState, session_layer: SessionManagerLayer<MemoryStore>) -> Router {
    router()
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}
