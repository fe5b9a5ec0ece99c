use anyhow::{Context, Result};
use gemini_translator::{
    config::ServerSettings,
    server,
    state::{AppState, ModelState},
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored in production)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gemini_translator=info".parse()?),
        )
        .init();

    info!("Starting translation server");

    // Failures are logged inside; the server starts either way
    let model = ModelState::initialize();
    let settings = ServerSettings::from_env();

    let app = server::create_router(AppState::new(model), &settings.static_dir);

    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on http://{}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
