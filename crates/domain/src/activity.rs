//! Activity: append-only audit log of decisions and fires.
//!
//! Every classification, batch flush, immediate delivery and automation
//! fire is recorded as an [`Activity`]. Statistics are a read-side rollup of
//! the [`ActivityKind::TriageClassify`] entries.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::automation::Automation;
use crate::device_event::DeviceEvent;
use crate::id::{ActivityId, AutomationId, TriageRuleId};
use crate::time::Timestamp;
use crate::triage::{Classification, Lane};

/// What an [`Activity`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    /// One event was classified.
    TriageClassify,
    /// A batch of events was flushed to the agent.
    Triage,
    /// One event was delivered on the immediate lane.
    TriageImmediate,
    /// An automation was handed to the agent.
    AutomationFired,
}

impl ActivityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TriageClassify => "triage_classify",
            Self::Triage => "triage",
            Self::TriageImmediate => "triage_immediate",
            Self::AutomationFired => "automation_fired",
        }
    }
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown activity kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown activity kind {0:?}")]
pub struct ParseActivityKindError(pub String);

impl std::str::FromStr for ActivityKind {
    type Err = ParseActivityKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "triage_classify" => Ok(Self::TriageClassify),
            "triage" => Ok(Self::Triage),
            "triage_immediate" => Ok(Self::TriageImmediate),
            "automation_fired" => Ok(Self::AutomationFired),
            other => Err(ParseActivityKindError(other.to_string())),
        }
    }
}

/// One audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: ActivityId,
    pub kind: ActivityKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub automation_id: Option<AutomationId>,
    /// Kind-specific payload.
    pub data: serde_json::Value,
    pub timestamp: Timestamp,
}

/// Payload of a [`ActivityKind::TriageClassify`] entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifyRecord {
    pub event_type: String,
    pub lane: Lane,
    pub reason: String,
    pub rule_id: Option<TriageRuleId>,
    #[serde(default)]
    pub delta: Option<f64>,
    /// Delivery was skipped because a hold window was active.
    #[serde(default)]
    pub suppressed: bool,
}

impl Activity {
    fn new(kind: ActivityKind, data: serde_json::Value, timestamp: Timestamp) -> Self {
        Self {
            id: ActivityId::new(),
            kind,
            device_id: None,
            automation_id: None,
            data,
            timestamp,
        }
    }

    #[must_use]
    pub fn triage_classify(
        event: &DeviceEvent,
        classification: &Classification,
        suppressed: bool,
        timestamp: Timestamp,
    ) -> Self {
        let data = json!({
            "event_type": event.event_type,
            "lane": classification.lane,
            "reason": classification.reason,
            "rule_id": classification.rule_id,
            "delta": classification.delta,
            "suppressed": suppressed,
        });
        Self {
            device_id: Some(event.device_id.clone()),
            ..Self::new(ActivityKind::TriageClassify, data, timestamp)
        }
    }

    #[must_use]
    pub fn immediate_delivery(event: &DeviceEvent, reason: &str, timestamp: Timestamp) -> Self {
        let data = json!({
            "event_type": event.event_type,
            "reason": reason,
        });
        Self {
            device_id: Some(event.device_id.clone()),
            ..Self::new(ActivityKind::TriageImmediate, data, timestamp)
        }
    }

    /// A flushed batch. `event_count` is the number of events delivered.
    #[must_use]
    pub fn batch_flush(events: &[DeviceEvent], timestamp: Timestamp) -> Self {
        let mut devices: Vec<&str> = events.iter().map(|e| e.device_id.as_str()).collect();
        devices.sort_unstable();
        devices.dedup();
        let data = json!({
            "event_count": events.len(),
            "device_ids": devices,
        });
        Self::new(ActivityKind::Triage, data, timestamp)
    }

    #[must_use]
    pub fn automation_fired(automation: &Automation, timestamp: Timestamp) -> Self {
        let data = json!({
            "summary": automation.summary,
            "trigger": automation.trigger.to_string(),
        });
        Self {
            automation_id: Some(automation.id),
            ..Self::new(ActivityKind::AutomationFired, data, timestamp)
        }
    }

    /// Decode the payload of a classification entry.
    #[must_use]
    pub fn classify_record(&self) -> Option<ClassifyRecord> {
        if self.kind != ActivityKind::TriageClassify {
            return None;
        }
        serde_json::from_value(self.data.clone()).ok()
    }

    /// `event_count` of a batch flush entry.
    #[must_use]
    pub fn event_count(&self) -> Option<u64> {
        self.data.get("event_count").and_then(serde_json::Value::as_u64)
    }
}
