//! # gridcharged: gridcharge daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Initialise logging
//! - Initialise the `SQLite` connection pool and run migrations
//! - Construct the Modbus connector for the configured device profile
//! - Construct the automation engine and re-arm persisted jobs
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use gridcharge_adapter_http_axum::state::AppState;
use gridcharge_adapter_modbus_tcp::ModbusTcpConnector;
use gridcharge_adapter_storage_sqlite_sqlx::{Config as DbConfig, SqliteJobStore};
use gridcharge_app::automation_engine::AutomationEngine;
use gridcharge_app::command_executor::CommandExecutor;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("unable to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Database
    let db = DbConfig {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await
    .context("unable to open job database")?;
    let job_store = SqliteJobStore::new(db.pool().clone());

    // Device
    let profile = config.profile()?;
    let modbus = config.modbus()?;
    tracing::info!(
        profile = profile.name,
        host = %modbus.host,
        port = modbus.port,
        unit_id = modbus.unit_id,
        "using inverter"
    );
    let connector = ModbusTcpConnector::new(modbus);

    // Engine
    let executor = CommandExecutor::new(connector, profile, config.executor_options());
    let engine = Arc::new(AutomationEngine::new(
        job_store,
        executor,
        config.scheduler_options(),
    ));
    engine.start().await.context("unable to start scheduler")?;

    // HTTP
    let app = gridcharge_adapter_http_axum::router::build(AppState::new(Arc::clone(&engine)));

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("unable to bind {bind_addr}"))?;
    tracing::info!("gridcharged listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.shutdown();
    db.close().await;
    tracing::info!("gridcharged stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown requested");
}
