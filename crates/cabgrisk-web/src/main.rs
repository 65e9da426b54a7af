//! CABG Risk Web Server
//!
//! Run with: cargo run -p cabgrisk-web

use tracing::info;
use tracing_subscriber::EnvFilter;

use cabgrisk_common::AppConfig;
use cabgrisk_web::{router::build_router, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("cabgrisk=debug,info")),
        )
        .init();

    info!("Starting CABG risk server...");

    let config = AppConfig::load()?;
    let addr = config.bind_addr();

    // Models load once here; a bad model file stops start-up.
    let state = AppState::load(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
