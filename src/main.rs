use socialsync::{app, config::Config, AppState};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("socialsync=debug,tower_http=debug")),
        )
        .init();

    let config = Config::load()?;
    let app_state = AppState::from_config(&config)?;

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(config.secure_cookie)
        .with_same_site(SameSite::Lax)
        .with_http_only(true)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(config.session_idle_minutes)));

    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!("listening on {} with the {:?} backend", config.bind, config.backend);
    axum::serve(listener, app(app_state, session_layer)).await?;
    Ok(())
}
