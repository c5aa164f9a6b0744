//! Batch flush and triage statistics endpoints.

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use hearth_app::ports::{ActivityLog, AutomationRepository, TriageRuleRepository};
use hearth_domain::time::now;
use hearth_domain::triage::stats::TriageStats;

use crate::error::ApiError;
use crate::state::AppState;

/// Default statistics window: the last 24 hours.
const DEFAULT_HOURS: u32 = 24;

/// Response of the flush endpoint.
#[derive(Debug, Serialize)]
pub struct FlushResponse {
    /// Number of events delivered; `0` when the buffer was empty.
    pub flushed: usize,
}

/// Query parameters for the stats endpoint.
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    pub hours: Option<u32>,
    pub device_id: Option<String>,
}

/// `POST /api/triage/flush`: deliver the batched lane now.
pub async fn flush<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
) -> Result<Json<FlushResponse>, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let flushed = state.batch.flush(now()).await?;
    Ok(Json(FlushResponse { flushed }))
}

/// `GET /api/triage/stats?hours=&device_id=`
pub async fn stats<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
    Query(params): Query<StatsQuery>,
) -> Result<Json<TriageStats>, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let hours = params.hours.filter(|h| *h > 0).unwrap_or(DEFAULT_HOURS);
    let stats = state
        .stats_service
        .triage_stats(hours, params.device_id.as_deref(), now())
        .await?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::router;
    use crate::testing::{send, state};

    async fn ingest(app: &axum::Router, device_id: &str, value: f64) {
        let event = json!({
            "device_id": device_id,
            "event_type": "state_changed",
            "state_key": "temperature",
            "value": value,
        });
        let (status, _) = send(app, "POST", "/api/device-events", Some(event)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn should_flush_buffered_events_once() {
        let app = router::build(state().await);
        ingest(&app, "sensor.kitchen", 20.0).await;
        ingest(&app, "sensor.kitchen", 21.0).await;

        let (status, body) = send(&app, "POST", "/api/triage/flush", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["flushed"], 2);

        let (_, body) = send(&app, "POST", "/api/triage/flush", None).await;
        assert_eq!(body["flushed"], 0);
    }

    #[tokio::test]
    async fn should_report_lane_counts_per_device() {
        let app = router::build(state().await);
        ingest(&app, "sensor.kitchen", 20.0).await;
        ingest(&app, "sensor.kitchen", 20.0).await;
        ingest(&app, "sensor.bedroom", 18.0).await;

        let (status, body) = send(&app, "GET", "/api/triage/stats?hours=1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["window_hours"], 1);
        assert_eq!(body["total"], 3);
        assert_eq!(body["devices"]["sensor.kitchen"]["batched"], 1);
        assert_eq!(body["devices"]["sensor.kitchen"]["silent"], 1);

        let (_, body) = send(
            &app,
            "GET",
            "/api/triage/stats?device_id=sensor.bedroom",
            None,
        )
        .await;
        assert_eq!(body["window_hours"], 24);
        assert_eq!(body["total"], 1);
    }
}
