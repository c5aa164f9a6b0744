//! JSON REST handlers for triage rules.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use hearth_app::ports::{ActivityLog, AutomationRepository, TriageRuleRepository};
use hearth_domain::id::TriageRuleId;
use hearth_domain::triage::{Lane, RuleCondition, RulePatch, TriageRule};

use super::{EnabledRequest, parse_id};
use crate::error::ApiError;
use crate::state::AppState;

/// Request body for creating (or re-stating) a triage rule.
#[derive(Deserialize)]
pub struct CreateRuleRequest {
    #[serde(default)]
    pub condition: RuleCondition,
    pub lane: Lane,
    pub reason: String,
    pub enabled: Option<bool>,
    pub created_by: Option<String>,
    pub hold_minutes: Option<u32>,
}

pub enum ListResponse {
    Ok(Json<Vec<TriageRule>>),
}

impl IntoResponse for ListResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

pub enum GetResponse {
    Ok(Json<TriageRule>),
}

impl IntoResponse for GetResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Ok(json) => json.into_response(),
        }
    }
}

/// A rule with a new condition is created; one whose condition already
/// exists replaces that rule's settings.
pub enum CreateResponse {
    Created(Json<TriageRule>),
    Updated(Json<TriageRule>),
}

impl IntoResponse for CreateResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Created(json) => (StatusCode::CREATED, json).into_response(),
            Self::Updated(json) => json.into_response(),
        }
    }
}

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

/// `GET /api/triage/rules`: list all rules, newest first.
pub async fn list<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
) -> Result<ListResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let rules = state.rule_service.list().await?;
    Ok(ListResponse::Ok(Json(rules)))
}

/// `GET /api/triage/rules/{id}`
pub async fn get<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
    Path(id): Path<String>,
) -> Result<GetResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let rule_id: TriageRuleId = parse_id(&id)?;
    let rule = state.rule_service.get(rule_id).await?;
    Ok(GetResponse::Ok(Json(rule)))
}

/// `POST /api/triage/rules`: upsert keyed by condition.
pub async fn create<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
    Json(req): Json<CreateRuleRequest>,
) -> Result<CreateResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let mut builder = TriageRule::builder()
        .condition(req.condition)
        .lane(req.lane)
        .reason(req.reason);
    if let Some(enabled) = req.enabled {
        builder = builder.enabled(enabled);
    }
    if let Some(created_by) = req.created_by {
        builder = builder.created_by(created_by);
    }
    if let Some(hold) = req.hold_minutes {
        builder = builder.hold_minutes(hold);
    }

    let rule = builder.build()?;
    let requested_id = rule.id;
    let saved = state.rule_service.upsert(rule).await?;
    if saved.id == requested_id {
        Ok(CreateResponse::Created(Json(saved)))
    } else {
        Ok(CreateResponse::Updated(Json(saved)))
    }
}

/// `PUT /api/triage/rules/{id}`: partially update a rule.
pub async fn update<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
    Path(id): Path<String>,
    Json(patch): Json<RulePatch>,
) -> Result<GetResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let rule_id: TriageRuleId = parse_id(&id)?;
    state
        .rule_service
        .update(rule_id, patch)
        .await?
        .map(|rule| GetResponse::Ok(Json(rule)))
        .ok_or_else(|| ApiError::not_found("TriageRule", rule_id))
}

/// `PUT /api/triage/rules/{id}/enabled`
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
    let rule_id: TriageRuleId = parse_id(&id)?;
    state
        .rule_service
        .set_enabled(rule_id, req.enabled)
        .await?
        .map(|rule| GetResponse::Ok(Json(rule)))
        .ok_or_else(|| ApiError::not_found("TriageRule", rule_id))
}

/// `DELETE /api/triage/rules/{id}`
pub async fn delete<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
    Path(id): Path<String>,
) -> Result<DeleteResponse, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let rule_id: TriageRuleId = parse_id(&id)?;
    if state.rule_service.remove(rule_id).await? {
        Ok(DeleteResponse::NoContent)
    } else {
        Err(ApiError::not_found("TriageRule", rule_id))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::router;
    use crate::testing::{send, state};

    fn front_door(lane: &str) -> serde_json::Value {
        json!({
            "condition": { "device_id": "lock.front" },
            "lane": lane,
            "reason": "front door activity",
            "created_by": "agent",
        })
    }

    #[tokio::test]
    async fn should_create_rule_then_update_in_place_for_same_condition() {
        let app = router::build(state().await);

        let (status, first) = send(&app, "POST", "/api/triage/rules", Some(front_door("batched"))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, second) =
            send(&app, "POST", "/api/triage/rules", Some(front_door("immediate"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["id"], first["id"]);
        assert_eq!(second["lane"], "immediate");

        let (_, listed) = send(&app, "GET", "/api/triage/rules", None).await;
        assert_eq!(listed.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_reject_negative_delta_threshold() {
        let app = router::build(state().await);
        let request = json!({
            "condition": { "device_id": "sensor.hall", "state_key": "temperature", "delta_threshold": -1.0 },
            "lane": "immediate",
            "reason": "swing",
        });

        let (status, _) = send(&app, "POST", "/api/triage/rules", Some(request)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn should_reject_unknown_lane() {
        let app = router::build(state().await);

        let (status, body) =
            send(&app, "POST", "/api/triage/rules", Some(front_door("urgent"))).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.as_str().unwrap().contains("urgent"));
    }

    #[tokio::test]
    async fn should_patch_toggle_and_delete_rule() {
        let app = router::build(state().await);
        let (_, created) = send(&app, "POST", "/api/triage/rules", Some(front_door("batched"))).await;
        let uri = format!("/api/triage/rules/{}", created["id"].as_str().unwrap());

        let (status, patched) = send(&app, "PUT", &uri, Some(json!({ "hold_minutes": 15 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(patched["hold_minutes"], 15);

        let (status, toggled) = send(
            &app,
            "PUT",
            &format!("{uri}/enabled"),
            Some(json!({ "enabled": false })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(!toggled["enabled"].as_bool().unwrap());

        let (status, _) = send(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
