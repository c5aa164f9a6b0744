//! Trigger: what wakes an automation up.

use serde::{Deserialize, Serialize};

use crate::automation::recurrence::CronSchedule;
use crate::device_event::DeviceEvent;
use crate::error::ValidationError;

/// Describes when an automation should fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Fires on a cron schedule (e.g. `"0 22 * * *"`).
    Cron {
        expression: String,
        /// One-shot: the automation disables itself after its first fire.
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        once: bool,
    },
    /// Fires when a matching device event arrives. `None` fields match anything.
    DeviceEvent {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        device_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        event_type: Option<String>,
    },
    /// Fires when a device's numeric state crosses into the condition.
    StateThreshold {
        device_id: String,
        state_key: String,
        operator: ThresholdOperator,
        value: f64,
    },
}

/// Discriminant of [`Trigger`], used for store queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    Cron,
    DeviceEvent,
    StateThreshold,
}

impl TriggerKind {
    /// The serialized `type` tag of the matching [`Trigger`] variant.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cron => "cron",
            Self::DeviceEvent => "device_event",
            Self::StateThreshold => "state_threshold",
        }
    }
}

/// Comparison applied by [`Trigger::StateThreshold`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdOperator {
    Gt,
    Lt,
    Eq,
    Gte,
    Lte,
}

impl ThresholdOperator {
    /// Whether `observed <op> threshold` holds.
    #[must_use]
    pub fn holds(self, observed: f64, threshold: f64) -> bool {
        match self {
            Self::Gt => observed > threshold,
            Self::Lt => observed < threshold,
            Self::Eq => (observed - threshold).abs() < f64::EPSILON,
            Self::Gte => observed >= threshold,
            Self::Lte => observed <= threshold,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Eq => "==",
            Self::Gte => ">=",
            Self::Lte => "<=",
        }
    }
}

impl Trigger {
    /// Shorthand for a recurring cron trigger.
    #[must_use]
    pub fn cron(expression: impl Into<String>) -> Self {
        Self::Cron {
            expression: expression.into(),
            once: false,
        }
    }

    #[must_use]
    pub fn kind(&self) -> TriggerKind {
        match self {
            Self::Cron { .. } => TriggerKind::Cron,
            Self::DeviceEvent { .. } => TriggerKind::DeviceEvent,
            Self::StateThreshold { .. } => TriggerKind::StateThreshold,
        }
    }

    /// Check the trigger is well-formed.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidCron`] for a malformed expression and
    /// the matching empty/non-finite variant for device conditions.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::Cron { expression, .. } => CronSchedule::parse(expression).map(|_| ()),
            Self::DeviceEvent { device_id, .. } => {
                if device_id.as_deref().is_some_and(str::is_empty) {
                    return Err(ValidationError::EmptyDeviceId);
                }
                Ok(())
            }
            Self::StateThreshold {
                device_id,
                state_key,
                value,
                ..
            } => {
                if device_id.is_empty() {
                    return Err(ValidationError::EmptyDeviceId);
                }
                if state_key.is_empty() {
                    return Err(ValidationError::EmptyStateKey);
                }
                if !value.is_finite() {
                    return Err(ValidationError::NonFiniteNumber);
                }
                Ok(())
            }
        }
    }

    /// Check whether an incoming device event satisfies this trigger.
    ///
    /// `previous` is the last known numeric value of the reported state key.
    /// Threshold triggers are edge-triggered: they match when the new value
    /// satisfies the condition and the previous one did not (or is unknown).
    /// Cron triggers never match events.
    #[must_use]
    pub fn matches_event(&self, event: &DeviceEvent, previous: Option<f64>) -> bool {
        match self {
            Self::Cron { .. } => false,
            Self::DeviceEvent {
                device_id,
                event_type,
            } => {
                device_id.as_ref().is_none_or(|id| *id == event.device_id)
                    && event_type.as_ref().is_none_or(|t| *t == event.event_type)
            }
            Self::StateThreshold {
                device_id,
                state_key,
                operator,
                value,
            } => {
                if *device_id != event.device_id
                    || event.state_key.as_deref() != Some(state_key.as_str())
                {
                    return false;
                }
                let Some(current) = event.numeric_value() else {
                    return false;
                };
                operator.holds(current, *value)
                    && !previous.is_some_and(|before| operator.holds(before, *value))
            }
        }
    }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cron { expression, once } => {
                if *once {
                    write!(f, "cron_once({expression})")
                } else {
                    write!(f, "cron({expression})")
                }
            }
            Self::DeviceEvent {
                device_id,
                event_type,
            } => write!(
                f,
                "device_event({}, {})",
                device_id.as_deref().unwrap_or("*"),
                event_type.as_deref().unwrap_or("*")
            ),
            Self::StateThreshold {
                device_id,
                state_key,
                operator,
                value,
            } => write!(
                f,
                "state_threshold({device_id}.{state_key} {} {value})",
                operator.symbol()
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::now;

    fn reading(device_id: &str, key: &str, value: f64) -> DeviceEvent {
        DeviceEvent::new(device_id, "state_changed", now()).with_reading(key, value.into())
    }

    fn above_25() -> Trigger {
        Trigger::StateThreshold {
            device_id: "sensor.living_room".to_string(),
            state_key: "temperature".to_string(),
            operator: ThresholdOperator::Gt,
            value: 25.0,
        }
    }

    #[test]
    fn should_match_any_event_when_device_event_fields_are_absent() {
        let trigger = Trigger::DeviceEvent {
            device_id: None,
            event_type: None,
        };
        let event = DeviceEvent::new("lock.front", "unlocked", now());
        assert!(trigger.matches_event(&event, None));
    }

    #[test]
    fn should_match_device_event_when_id_and_type_match() {
        let trigger = Trigger::DeviceEvent {
            device_id: Some("lock.front".to_string()),
            event_type: Some("unlocked".to_string()),
        };
        assert!(trigger.matches_event(&DeviceEvent::new("lock.front", "unlocked", now()), None));
        assert!(!trigger.matches_event(&DeviceEvent::new("lock.front", "locked", now()), None));
        assert!(!trigger.matches_event(&DeviceEvent::new("lock.back", "unlocked", now()), None));
    }

    #[test]
    fn should_match_threshold_when_value_crosses_condition() {
        let event = reading("sensor.living_room", "temperature", 26.0);
        assert!(above_25().matches_event(&event, Some(24.0)));
    }

    #[test]
    fn should_match_threshold_when_previous_value_unknown() {
        let event = reading("sensor.living_room", "temperature", 26.0);
        assert!(above_25().matches_event(&event, None));
    }

    #[test]
    fn should_not_match_threshold_when_already_above() {
        let event = reading("sensor.living_room", "temperature", 27.0);
        assert!(!above_25().matches_event(&event, Some(26.0)));
    }

    #[test]
    fn should_not_match_threshold_for_other_state_key_or_device() {
        assert!(!above_25().matches_event(&reading("sensor.living_room", "humidity", 80.0), None));
        assert!(!above_25().matches_event(&reading("sensor.kitchen", "temperature", 30.0), None));
    }

    #[test]
    fn should_not_match_events_with_cron_trigger() {
        let event = DeviceEvent::new("light.kitchen", "state_changed", now());
        assert!(!Trigger::cron("0 22 * * *").matches_event(&event, None));
    }

    #[test]
    fn should_evaluate_each_operator() {
        assert!(ThresholdOperator::Gt.holds(2.0, 1.0));
        assert!(ThresholdOperator::Lt.holds(1.0, 2.0));
        assert!(ThresholdOperator::Eq.holds(2.0, 2.0));
        assert!(ThresholdOperator::Gte.holds(2.0, 2.0));
        assert!(ThresholdOperator::Lte.holds(2.0, 2.0));
        assert!(!ThresholdOperator::Gt.holds(2.0, 2.0));
    }

    #[test]
    fn should_reject_malformed_cron_expression() {
        assert!(matches!(
            Trigger::cron("not a cron").validate(),
            Err(ValidationError::InvalidCron { .. })
        ));
    }

    #[test]
    fn should_reject_threshold_without_state_key() {
        let trigger = Trigger::StateThreshold {
            device_id: "sensor.a".to_string(),
            state_key: String::new(),
            operator: ThresholdOperator::Lt,
            value: 1.0,
        };
        assert_eq!(trigger.validate(), Err(ValidationError::EmptyStateKey));
    }

    #[test]
    fn should_deserialize_tagged_json() {
        let json = serde_json::json!({
            "type": "state_threshold",
            "device_id": "sensor.a",
            "state_key": "temperature",
            "operator": "gte",
            "value": 30
        });
        let trigger: Trigger = serde_json::from_value(json).unwrap();
        assert_eq!(trigger.kind(), TriggerKind::StateThreshold);

        let cron: Trigger =
            serde_json::from_value(serde_json::json!({"type": "cron", "expression": "0 8 * * *"}))
                .unwrap();
        assert_eq!(cron, Trigger::cron("0 8 * * *"));
    }

    #[test]
    fn should_display_trigger_variants() {
        assert_eq!(Trigger::cron("0 22 * * *").to_string(), "cron(0 22 * * *)");
        assert_eq!(above_25().to_string(), "state_threshold(sensor.living_room.temperature > 25)");
        let any = Trigger::DeviceEvent {
            device_id: None,
            event_type: Some("motion".to_string()),
        };
        assert_eq!(any.to_string(), "device_event(*, motion)");
    }
}
