//! Event ingest: the single entry point for device events.
//!
//! Each event is classified by the [`TriageEngine`] and matched against
//! event-driven automations by the [`TriggerScheduler`], both against the
//! device's readings from *before* the event. The event's own reading is
//! recorded afterwards. Events are ingested one at a time, so the next event
//! always sees the previous one's reading.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use hearth_domain::device_event::DeviceEvent;
use hearth_domain::error::{HearthError, ValidationError};
use hearth_domain::id::AutomationId;
use hearth_domain::time::Timestamp;
use hearth_domain::triage::Classification;

use crate::device_state::DeviceStateTracker;
use crate::ports::{ActivityLog, AgentGateway, AutomationRepository, TriageRuleRepository};
use crate::scheduler::TriggerScheduler;
use crate::triage_engine::TriageEngine;

/// What happened to one ingested event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub classification: Classification,
    /// Automations fired by this event.
    pub fired: Vec<AutomationId>,
}

/// Routes device events to triage and to event-driven automations.
pub struct EventIngest<AR, RR, G, L> {
    states: DeviceStateTracker,
    triage: TriageEngine<RR, G, L>,
    scheduler: Arc<TriggerScheduler<AR, G, L>>,
    serial: Mutex<()>,
}

impl<AR, RR, G, L> EventIngest<AR, RR, G, L>
where
    AR: AutomationRepository,
    RR: TriageRuleRepository,
    G: AgentGateway,
    L: ActivityLog,
{
    pub fn new(triage: TriageEngine<RR, G, L>, scheduler: Arc<TriggerScheduler<AR, G, L>>) -> Self {
        Self {
            states: DeviceStateTracker::new(),
            triage,
            scheduler,
            serial: Mutex::new(()),
        }
    }

    /// Ingest one event.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] for an event without a device id,
    /// or the triage error. Event automations are evaluated and the reading is
    /// recorded even when triage fails. A failure to evaluate automations is
    /// logged and reported as no fires.
    pub async fn ingest(
        &self,
        event: DeviceEvent,
        now: Timestamp,
    ) -> Result<IngestOutcome, HearthError> {
        if event.device_id.trim().is_empty() {
            return Err(ValidationError::EmptyDeviceId.into());
        }
        let event = event.normalized();
        let _serial = self.serial.lock().await;
        let state = self.states.snapshot(&event.device_id);

        let triage = self.triage.process(&event, &state, now).await;
        if let Err(err) = &triage {
            tracing::error!(error = %err, device_id = %event.device_id, "triage failed");
        }
        let fired = match self.scheduler.handle_event(&event, &state, now).await {
            Ok(report) => report.fired,
            Err(err) => {
                tracing::error!(error = %err, "event automations could not be evaluated");
                Vec::new()
            }
        };

        self.states.record(&event);
        Ok(IngestOutcome {
            classification: triage?,
            fired,
        })
    }
}
