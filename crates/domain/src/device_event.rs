//! Device event: a single signal reported by a device adapter.
//!
//! Events are transient: the core consumes each one once and only the
//! outcome (classification, fired automations) is recorded.

use serde::{Deserialize, Serialize};

use crate::time::Timestamp;

/// A raw signal from a device adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceEvent {
    /// Device identifier, conventionally `<domain>.<name>` (e.g. `light.kitchen`).
    pub device_id: String,
    /// Device domain (`light`, `sensor`, `binary_sensor`, `lock`, …).
    #[serde(default)]
    pub device_domain: String,
    /// What happened (`state_changed`, `motion`, `heartbeat`, …).
    pub event_type: String,
    /// Room or area the device lives in.
    #[serde(default, alias = "area", skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    /// The state attribute this event reports on (e.g. `temperature`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    /// Reported value: number, boolean or string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    pub timestamp: Timestamp,
}

impl DeviceEvent {
    /// Create an event, deriving the domain from the `<domain>.<name>` id.
    #[must_use]
    pub fn new(
        device_id: impl Into<String>,
        event_type: impl Into<String>,
        timestamp: Timestamp,
    ) -> Self {
        let device_id = device_id.into();
        let device_domain = domain_of(&device_id).to_string();
        Self {
            device_id,
            device_domain,
            event_type: event_type.into(),
            room: None,
            state_key: None,
            value: None,
            timestamp,
        }
    }

    #[must_use]
    pub fn with_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.device_domain = domain.into();
        self
    }

    #[must_use]
    pub fn with_reading(mut self, state_key: impl Into<String>, value: serde_json::Value) -> Self {
        self.state_key = Some(state_key.into());
        self.value = Some(value);
        self
    }

    /// Fill in `device_domain` from the device id when the adapter left it blank.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if self.device_domain.is_empty() {
            self.device_domain = domain_of(&self.device_id).to_string();
        }
        self
    }

    /// The reported value when it is a finite number.
    #[must_use]
    pub fn numeric_value(&self) -> Option<f64> {
        self.value
            .as_ref()
            .and_then(serde_json::Value::as_f64)
            .filter(|v| v.is_finite())
    }

    /// Whether the reported value is a boolean.
    #[must_use]
    pub fn has_boolean_value(&self) -> bool {
        matches!(self.value, Some(serde_json::Value::Bool(_)))
    }
}

fn domain_of(device_id: &str) -> &str {
    device_id
        .split_once('.')
        .map_or("", |(domain, _)| domain)
}
