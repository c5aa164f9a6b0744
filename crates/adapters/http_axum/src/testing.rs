//! Fully wired state over an in-memory `SQLite` database, plus small
//! request/response helpers for `oneshot` tests.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono_tz::Tz;
use http_body_util::BodyExt;
use tower::ServiceExt;

use hearth_adapter_storage_sqlite_sqlx::{
    Config, SqliteActivityLog, SqliteAutomationRepository, SqliteTriageRuleRepository,
};
use hearth_app::agent_bus::InProcessAgentBus;
use hearth_app::batch::BatchAccumulator;
use hearth_app::ingest::EventIngest;
use hearth_app::scheduler::TriggerScheduler;
use hearth_app::services::automation_service::AutomationService;
use hearth_app::services::stats_service::StatsService;
use hearth_app::services::triage_rule_service::TriageRuleService;
use hearth_app::triage_engine::TriageEngine;

use crate::state::AppState;

pub(crate) type TestState = AppState<
    Arc<SqliteAutomationRepository>,
    Arc<SqliteTriageRuleRepository>,
    Arc<SqliteActivityLog>,
>;

pub(crate) async fn state() -> TestState {
    let db = Config {
        database_url: "sqlite::memory:".to_string(),
        timezone: Tz::UTC,
    }
    .build()
    .await
    .unwrap();
    let pool = db.pool().clone();

    let automations = Arc::new(SqliteAutomationRepository::new(pool.clone()));
    let rules = Arc::new(SqliteTriageRuleRepository::new(pool.clone()));
    let log = Arc::new(SqliteActivityLog::new(pool));
    let bus = Arc::new(InProcessAgentBus::new(16));

    let batch = Arc::new(BatchAccumulator::new(Arc::clone(&bus), Arc::clone(&log)));
    let triage = TriageEngine::new(
        Arc::clone(&rules),
        Arc::clone(&bus),
        Arc::clone(&log),
        Arc::clone(&batch),
    );
    let automation_service = Arc::new(AutomationService::new(automations, Tz::UTC));
    let scheduler = Arc::new(TriggerScheduler::new(
        Arc::clone(&automation_service),
        Arc::clone(&bus),
        Arc::clone(&log),
    ));

    AppState::new(
        automation_service,
        Arc::new(TriageRuleService::new(rules)),
        Arc::new(StatsService::new(Arc::clone(&log))),
        Arc::new(Arc::clone(&log)),
        Arc::new(EventIngest::new(triage, scheduler)),
        batch,
        bus,
    )
}

pub(crate) async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        // Extractor rejections come back as plain text.
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, json)
}
