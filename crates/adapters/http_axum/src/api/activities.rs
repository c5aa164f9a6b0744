//! Activity feed endpoint.

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;

use hearth_app::ports::{ActivityLog, AutomationRepository, TriageRuleRepository};
use hearth_domain::activity::Activity;

use crate::error::ApiError;
use crate::state::AppState;

const DEFAULT_LIMIT: usize = 50;
const MAX_LIMIT: usize = 500;

#[derive(Debug, Deserialize)]
pub struct ActivitiesQuery {
    pub limit: Option<usize>,
}

/// `GET /api/activities?limit=`: most recent activities, newest first.
pub async fn list<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
    Query(params): Query<ActivitiesQuery>,
) -> Result<Json<Vec<Activity>>, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let activities = state.activity_log.recent(limit).await?;
    Ok(Json(activities))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::router;
    use crate::testing::{send, state};

    #[tokio::test]
    async fn should_list_newest_activity_first() {
        let app = router::build(state().await);
        for event_type in ["heartbeat", "ping"] {
            let event = json!({ "device_id": "sensor.hall", "event_type": event_type });
            send(&app, "POST", "/api/device-events", Some(event)).await;
        }

        let (status, body) = send(&app, "GET", "/api/activities?limit=1", None).await;

        assert_eq!(status, StatusCode::OK);
        let activities = body.as_array().unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0]["kind"], "triage_classify");
        assert_eq!(activities[0]["data"]["event_type"], "ping");
    }
}
