mod bridge;
mod configuration;
mod error;
#[cfg(test)]
mod mock;
mod negotiate;
mod routes;
mod state;

use configuration::Settings;
use relay::ollama::OllamaEngine;
use state::AppState;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    let settings = Settings::new()?;
    let addr = settings.server.socket_addr()?;

    let tools = settings.engine.tool_set()?;
    let engine_config = settings.engine.into_config();
    info!(
        host = %engine_config.host,
        model = %engine_config.model,
        tools = tools.tools().len(),
        "using ollama engine"
    );
    let engine = OllamaEngine::new(engine_config, tools)?;

    let state = AppState {
        engine: Arc::new(engine),
        stream_buffer: settings.server.stream_buffer,
    };
    let app = routes::configure(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
