use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use expensis_core::{Analyzer, ChatClient, CompletionClient, config_file};

mod app;
mod error;
mod handlers;
mod models;
mod state;
mod upload;

use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config_file::resolve_from_env();
    tracing::debug!(?config, "configuration resolved");

    let chat = ChatClient::from_config(&config, reqwest::Client::new())
        .context("set DEEPSEEK_API_URL and DEEPSEEK_API_KEY, or [completion] in .expensis.toml")?;
    tracing::info!(model = chat.model(), "completion client ready");
    let llm: Arc<dyn CompletionClient> = Arc::new(chat);

    let state = Arc::new(AppState {
        extractor: expensis_ingest::default_extractor(&config, llm.clone())?,
        analyzer: Analyzer::new(llm),
        max_upload_bytes: config.max_upload_bytes(),
    });

    let app = app::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("could not bind {addr}"))?;
    tracing::info!(%addr, max_upload_mb = config.max_upload_mb, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "could not install Ctrl-C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
