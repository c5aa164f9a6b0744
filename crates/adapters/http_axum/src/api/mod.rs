//! JSON REST API handler modules.

#[allow(clippy::missing_errors_doc)]
pub mod activities;
#[allow(clippy::missing_errors_doc)]
pub mod automations;
#[allow(clippy::missing_errors_doc)]
pub mod device_events;
pub mod sse;
#[allow(clippy::missing_errors_doc)]
pub mod triage;
#[allow(clippy::missing_errors_doc)]
pub mod triage_rules;

use std::str::FromStr;

use axum::Router;
use axum::routing::{get, post, put};

use hearth_app::ports::{ActivityLog, AutomationRepository, TriageRuleRepository};
use hearth_domain::error::{HearthError, ValidationError};

use crate::error::ApiError;
use crate::state::AppState;

/// Build the `/api` sub-router.
pub fn routes<AR, RR, AL>() -> Router<AppState<AR, RR, AL>>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    Router::new()
        // Automations
        .route(
            "/automations",
            get(automations::list::<AR, RR, AL>).post(automations::create::<AR, RR, AL>),
        )
        .route(
            "/automations/{id}",
            get(automations::get::<AR, RR, AL>)
                .put(automations::update::<AR, RR, AL>)
                .delete(automations::delete::<AR, RR, AL>),
        )
        .route(
            "/automations/{id}/enabled",
            put(automations::set_enabled::<AR, RR, AL>),
        )
        // Triage rules
        .route(
            "/triage/rules",
            get(triage_rules::list::<AR, RR, AL>).post(triage_rules::create::<AR, RR, AL>),
        )
        .route(
            "/triage/rules/{id}",
            get(triage_rules::get::<AR, RR, AL>)
                .put(triage_rules::update::<AR, RR, AL>)
                .delete(triage_rules::delete::<AR, RR, AL>),
        )
        .route(
            "/triage/rules/{id}/enabled",
            put(triage_rules::set_enabled::<AR, RR, AL>),
        )
        // Triage pipeline
        .route("/device-events", post(device_events::ingest::<AR, RR, AL>))
        .route("/triage/flush", post(triage::flush::<AR, RR, AL>))
        .route("/triage/stats", get(triage::stats::<AR, RR, AL>))
        // Audit & agent
        .route("/activities", get(activities::list::<AR, RR, AL>))
        .route("/agent/stream", get(sse::stream::<AR, RR, AL>))
}

/// Parse a path segment into a typed id, rejecting malformed values with 400.
fn parse_id<T: FromStr>(raw: &str) -> Result<T, ApiError> {
    T::from_str(raw)
        .map_err(|_| HearthError::from(ValidationError::InvalidId(raw.to_string())).into())
}

/// Body of the `PUT …/{id}/enabled` toggle endpoints.
#[derive(Debug, serde::Deserialize)]
pub struct EnabledRequest {
    pub enabled: bool,
}
