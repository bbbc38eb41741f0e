//! Web dashboard for homeboard that renders tram times, fixtures, and bin days on one page.

mod app;
mod config;
mod telemetry;
mod ui;

use std::sync::Arc;

use anyhow::Result;
use homeboard_core::fetch::HttpFetcher;
use reqwest::Client;
use tokio::net::TcpListener;

use crate::app::AppState;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();

    // Missing BIN_PROPERTY_ID stops the process here
    let config = Config::load()?;

    // HTTP + service setup
    let client = Client::builder().user_agent("homeboard/0.1").build()?;
    let fetcher = Arc::new(HttpFetcher::new(client));
    let service = Arc::new(config.service(fetcher));
    let state = AppState::new(service, config.page());

    let addr = config.addr();
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "dashboard listening");

    axum::serve(listener, app::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "could not listen for ctrl-c, running until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
