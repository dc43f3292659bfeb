use blogicum::{AppState, config::AppConfig, db, routes};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,sqlx=warn".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = AppConfig::load()?;

    let store = db::setup_store(&settings).await?;
    let state = AppState {
        store,
        config: settings.clone(),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    info!(addr = %settings.server_addr, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}
