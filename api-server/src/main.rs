//! Sourcer API server
//!
//! Boots the REST facade, wires the source adapters and sinks into
//! shared state, and runs the agent scheduler in the background until
//! ctrl-c.

mod error;
mod routes;
mod state;

use anyhow::Result;
use tokio::sync::mpsc;
use tracing::{info, Level};

use common::AppConfig;
use scheduled_agents::Scheduler;
use state::AppContext;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let config_path =
        std::env::var("SOURCER_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
    let mut config = AppConfig::load(&config_path)?;

    // deploy platforms hand the port down as an env var
    if let Ok(port) = std::env::var("PORT") {
        config.server.port = port.parse()?;
    }

    info!("🚀 Starting Sourcer API");

    let ctx = AppContext::new(config);

    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let scheduler = Scheduler::new(
        ctx.store.clone(),
        ctx.runner.clone(),
        ctx.gate.clone(),
        ctx.config.agents.utc_offset_hours,
        ctx.config.agents.tick_interval_secs,
    );
    let scheduler_handle = tokio::spawn(scheduler.run(shutdown_rx));

    let addr = format!("{}:{}", ctx.config.server.host, ctx.config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("REST API listening on http://{}", addr);

    let router = routes::build_router(ctx);

    let shutdown = async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("👋 Shutting down gracefully...");
        let _ = shutdown_tx.send(()).await;
    };

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;
    let _ = scheduler_handle.await;

    Ok(())
}
