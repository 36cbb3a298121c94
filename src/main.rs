use anyhow::Context;
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinema_booking::{
    config::{Config, LogFormat},
    controllers,
    services::seed,
    AppState,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env().context("invalid configuration")?;

    let registry = tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log));
    match config.app.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }

    info!(
        "Starting Cinema Booking API ({}, {:?} storage)",
        config.app.environment, config.storage
    );

    let state = AppState::new(config.clone())
        .await
        .context("failed to initialize application state")?;

    seed::load_sample_data(&state.store, config.features.sample_data, bcrypt::DEFAULT_COST)
        .await
        .context("failed to load sample data")?;

    let app = controllers::router(state);

    let addr: SocketAddr = format!("{}:{}", config.app.host, config.app.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.app.host, config.app.port))?;
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
