//! # hearthd: hearth daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (`hearth.toml` plus environment overrides)
//! - Install the `tracing` subscriber
//! - Open the `SQLite` pool, run migrations and upgrade legacy schedules
//! - Construct repositories, the agent bus and application services
//! - Spawn the cron scheduler loop and the batch flush loop
//! - Serve the axum router until SIGINT/SIGTERM, then stop both loops and
//!   flush whatever is still buffered
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer: no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use hearth_adapter_http_axum::state::AppState;
use hearth_adapter_storage_sqlite_sqlx::{
    Config as StorageConfig, SqliteActivityLog, SqliteAutomationRepository,
    SqliteTriageRuleRepository,
};
use hearth_app::agent_bus::InProcessAgentBus;
use hearth_app::batch::BatchAccumulator;
use hearth_app::ingest::EventIngest;
use hearth_app::scheduler::TriggerScheduler;
use hearth_app::services::automation_service::AutomationService;
use hearth_app::services::stats_service::StatsService;
use hearth_app::services::triage_rule_service::TriageRuleService;
use hearth_app::triage_engine::TriageEngine;

use crate::config::Config;

/// Capacity of the agent broadcast channel.
const AGENT_BUS_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_tracing(&config.logging.filter);
    let timezone = config.timezone()?;

    // Database
    let db = StorageConfig {
        database_url: config.database_url().to_string(),
        timezone,
    }
    .build()
    .await
    .context("failed to initialise database")?;
    let pool = db.pool().clone();

    // Repositories
    let automation_repo = Arc::new(SqliteAutomationRepository::new(pool.clone()));
    let rule_repo = Arc::new(SqliteTriageRuleRepository::new(pool.clone()));
    let activity_log = Arc::new(SqliteActivityLog::new(pool));

    // Agent bus
    let agent_bus = Arc::new(InProcessAgentBus::new(AGENT_BUS_CAPACITY));

    // Triage & scheduling
    let batch = Arc::new(BatchAccumulator::new(
        Arc::clone(&agent_bus),
        Arc::clone(&activity_log),
    ));
    let triage = TriageEngine::new(
        Arc::clone(&rule_repo),
        Arc::clone(&agent_bus),
        Arc::clone(&activity_log),
        Arc::clone(&batch),
    );
    let automation_service = Arc::new(AutomationService::new(automation_repo, timezone));
    let scheduler = Arc::new(TriggerScheduler::new(
        Arc::clone(&automation_service),
        Arc::clone(&agent_bus),
        Arc::clone(&activity_log),
    ));
    let ingest = Arc::new(EventIngest::new(triage, Arc::clone(&scheduler)));

    // Background loops
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = tokio::spawn({
        let scheduler = Arc::clone(&scheduler);
        let shutdown = shutdown_rx.clone();
        let interval = config.tick_interval();
        async move { scheduler.run(interval, shutdown).await }
    });
    let batch_task = tokio::spawn({
        let batch = Arc::clone(&batch);
        let interval = config.flush_interval();
        async move { batch.run(interval, shutdown_rx).await }
    });

    // HTTP
    let state = AppState::new(
        automation_service,
        Arc::new(TriageRuleService::new(rule_repo)),
        Arc::new(StatsService::new(Arc::clone(&activity_log))),
        Arc::new(activity_log),
        ingest,
        batch,
        agent_bus,
    );
    let app = hearth_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        %bind_addr,
        %timezone,
        "hearthd listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("stopping background loops");
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("background loops already stopped");
    }
    scheduler_task.await.context("scheduler task panicked")?;
    batch_task.await.context("batch task panicked")?;

    tracing::info!("hearthd shutdown complete");
    Ok(())
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .compact()
        .init();
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for SIGINT");
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
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down gracefully"),
        () = terminate => tracing::info!("received SIGTERM, shutting down gracefully"),
    }
}
