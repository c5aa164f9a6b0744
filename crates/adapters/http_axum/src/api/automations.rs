//! JSON REST handlers for automations.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use hearth_app::ports::{ActivityLog, AutomationRepository, TriageRuleRepository};
use hearth_domain::automation::{Automation, AutomationPatch, Trigger};
use hearth_domain::id::AutomationId;
use hearth_domain::time::now;

use super::{EnabledRequest, parse_id};
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for creating an automation.
#[derive(Deserialize)]
pub struct CreateAutomationRequest {
    pub summary: String,
    pub instruction: String,
    pub trigger: Trigger,
    pub enabled: Option<bool>,
    pub channel: Option<String>,
}

/// Possible responses from the list endpoint.
pub enum ListResponse {
    Ok(Json<Vec<Automation>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the get, update and toggle endpoints.
pub enum GetResponse {
    Ok(Json<Automation>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// Possible responses from the create endpoint.
pub enum CreateResponse {
    Created(Json<Automation>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
        }
    }
}

/// Possible responses from the delete endpoint.
pub enum DeleteResponse {
    NoContent,
}

impl IntoResponse for DeleteResponse {
    fn into_response(self) -> Response {
        match self {
            Self::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

/// `GET /api/automations`: list all automations.
pub async fn list<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
) -> Result<ListResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let automations = state.automation_service.list().await?;
    Ok(ListResponse::Ok(Json(automations)))
}

/// `GET /api/automations/{id}`: get automation by ID.
pub async fn get<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    let automation = state.automation_service.get(automation_id).await?;
    Ok(GetResponse::Ok(Json(automation)))
}

/// `POST /api/automations`: create a new automation.
///
/// Cron automations come back with their first `next_fire_at` computed.
pub async fn create<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
    Json(req): Json<CreateAutomationRequest>,
) -> Result<CreateResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let mut builder = Automation::builder()
        .summary(req.summary)
        .instruction(req.instruction)
        .trigger(req.trigger);
    if let Some(enabled) = req.enabled {
        builder = builder.enabled(enabled);
    }
    if let Some(channel) = req.channel {
        builder = builder.channel(channel);
    }

    let automation = builder.build()?;
    let created = state.automation_service.create(automation, now()).await?;
    Ok(CreateResponse::Created(Json(created)))
}

/// `PUT /api/automations/{id}`: partially update an automation.
pub async fn update<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
    Path(id): Path<String>,
    Json(patch): Json<AutomationPatch>,
) -> Result<GetResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    state
        .automation_service
        .update(automation_id, patch, now())
        .await?
        .map(|automation| GetResponse::Ok(Json(automation)))
        .ok_or_else(|| ApiError::not_found("Automation", automation_id))
}

/// `PUT /api/automations/{id}/enabled`: enable or disable an automation.
pub async fn set_enabled<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
    Path(id): Path<String>,
    Json(req): Json<EnabledRequest>,
) -> Result<GetResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    state
        .automation_service
        .set_enabled(automation_id, req.enabled, now())
        .await?
        .map(|automation| GetResponse::Ok(Json(automation)))
        .ok_or_else(|| ApiError::not_found("Automation", automation_id))
}

/// `DELETE /api/automations/{id}`: delete an automation.
pub async fn delete<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let automation_id: AutomationId = parse_id(&id)?;
    if state.automation_service.remove(automation_id).await? {
        Ok(DeleteResponse::NoContent)
    } else {
        Err(ApiError::not_found("Automation", automation_id))
    }
}
