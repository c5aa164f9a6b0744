//! Device event ingest endpoint.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;

use hearth_app::ingest::IngestOutcome;
use hearth_app::ports::{ActivityLog, AutomationRepository, TriageRuleRepository};
use hearth_domain::device_event::DeviceEvent;
use hearth_domain::time::{Timestamp, now};

use crate::error::ApiError;
use crate::state::AppState;

/// Wire form of a [`DeviceEvent`]. Adapters may omit the domain (derived
/// from the device id) and the timestamp (stamped on arrival).
#[derive(Deserialize)]
pub struct DeviceEventRequest {
    pub device_id: String,
    pub event_type: String,
    #[serde(default)]
    pub device_domain: Option<String>,
    #[serde(default, alias = "area")]
    pub room: Option<String>,
    #[serde(default)]
    pub state_key: Option<String>,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
}

impl DeviceEventRequest {
    fn into_event(self, received_at: Timestamp) -> DeviceEvent {
        let mut event = DeviceEvent::new(
            self.device_id,
            self.event_type,
            self.timestamp.unwrap_or(received_at),
        );
        if let Some(domain) = self.device_domain {
            event = event.with_domain(domain);
        }
        event.room = self.room;
        event.state_key = self.state_key;
        event.value = self.value;
        event
    }
}

/// `POST /api/device-events`: classify one event and run event automations.
pub async fn ingest<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
    Json(req): Json<DeviceEventRequest>,
) -> Result<Json<IngestOutcome>, ApiError>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let received_at = now();
    let outcome = state
        .ingest
        .ingest(req.into_event(received_at), received_at)
        .await?;
    Ok(Json(outcome))
}
