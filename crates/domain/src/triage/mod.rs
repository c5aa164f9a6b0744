//! Triage: routing device events into delivery lanes.
//!
//! A [`TriageRule`] pairs a [`RuleCondition`] with the [`Lane`] events
//! matching it should take. Rules are ranked by [`Specificity`]; the
//! [`classifier`] picks the most specific enabled match and falls back to
//! built-in heuristics when nothing matches.

pub mod classifier;
pub mod stats;

use serde::{Deserialize, Serialize};

use crate::device_event::DeviceEvent;
use crate::error::{HearthError, ValidationError};
use crate::id::TriageRuleId;
use crate::time::Timestamp;

pub use classifier::{Classification, DeviceState, classify};

/// Where a classified event is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Lane {
    /// Wake the agent now.
    Immediate,
    /// Accumulate and flush periodically.
    Batched,
    /// Record only.
    Silent,
}

impl Lane {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Batched => "batched",
            Self::Silent => "silent",
        }
    }
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown lane name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown lane {0:?}")]
pub struct ParseLaneError(pub String);

impl std::str::FromStr for Lane {
    type Err = ParseLaneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immediate" => Ok(Self::Immediate),
            "batched" => Ok(Self::Batched),
            "silent" => Ok(Self::Silent),
            other => Err(ParseLaneError(other.to_string())),
        }
    }
}

/// Specificity tiers, most exact first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specificity {
    DeviceId,
    Domain,
    Room,
    Wildcard,
}

impl Specificity {
    /// Every tier in evaluation order.
    pub const ALL: [Self; 4] = [Self::DeviceId, Self::Domain, Self::Room, Self::Wildcard];
}

/// Fields a rule matches on. Every field is optional; set fields must all
/// match the event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleCondition {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,
    #[serde(alias = "area", skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    /// Minimum `|value - previous|` for the rule to count as a match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_threshold: Option<f64>,
}

impl RuleCondition {
    /// The tier this condition ranks in.
    ///
    /// Ranked by the identifying field: `device_id`, then `device_domain`,
    /// then `room`. Conditions with none of them (including ones only
    /// narrowing by event type or state key) rank as wildcards.
    #[must_use]
    pub fn specificity(&self) -> Specificity {
        if self.device_id.is_some() {
            Specificity::DeviceId
        } else if self.device_domain.is_some() {
            Specificity::Domain
        } else if self.room.is_some() {
            Specificity::Room
        } else {
            Specificity::Wildcard
        }
    }

    /// Whether every set field agrees with the event. The delta threshold
    /// is checked separately by the classifier.
    #[must_use]
    pub fn matches(&self, event: &DeviceEvent) -> bool {
        fn agrees(expected: Option<&String>, actual: Option<&str>) -> bool {
            expected.is_none_or(|e| Some(e.as_str()) == actual)
        }

        agrees(self.device_id.as_ref(), Some(event.device_id.as_str()))
            && agrees(self.device_domain.as_ref(), Some(event.device_domain.as_str()))
            && agrees(self.event_type.as_ref(), Some(event.event_type.as_str()))
            && agrees(self.room.as_ref(), event.room.as_deref())
            && agrees(self.state_key.as_ref(), event.state_key.as_deref())
    }

    /// Check the condition is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NonFiniteNumber`] for a negative or
    /// non-finite delta threshold and [`ValidationError::EmptyStateKey`] when
    /// a threshold is given without the state key it applies to.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.device_id.as_deref().is_some_and(str::is_empty) {
            return Err(ValidationError::EmptyDeviceId);
        }
        if let Some(threshold) = self.delta_threshold {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(ValidationError::NonFiniteNumber);
            }
            if self.state_key.as_deref().is_none_or(str::is_empty) {
                return Err(ValidationError::EmptyStateKey);
            }
        }
        Ok(())
    }
}

/// A routing rule created by the agent or an operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriageRule {
    pub id: TriageRuleId,
    pub condition: RuleCondition,
    pub lane: Lane,
    /// Audit string explaining why the rule exists.
    pub reason: String,
    pub enabled: bool,
    pub created_by: String,
    /// Debounce window: repeats of the same decision for the same device and
    /// event type within this many minutes are not delivered.
    pub hold_minutes: Option<u32>,
    pub created_at: Timestamp,
}

/// Partial update of a [`TriageRule`]. A `hold_minutes` of `0` clears the window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulePatch {
    pub condition: Option<RuleCondition>,
    pub lane: Option<Lane>,
    pub reason: Option<String>,
    pub enabled: Option<bool>,
    pub hold_minutes: Option<u32>,
}

impl TriageRule {
    #[must_use]
    pub fn builder() -> TriageRuleBuilder {
        TriageRuleBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] for an empty reason or an invalid condition.
    pub fn validate(&self) -> Result<(), HearthError> {
        if self.reason.trim().is_empty() {
            return Err(ValidationError::EmptyReason.into());
        }
        self.condition.validate()?;
        Ok(())
    }

    /// Apply a partial update.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if the result violates invariants.
    pub fn apply(&mut self, patch: RulePatch) -> Result<(), HearthError> {
        if let Some(condition) = patch.condition {
            self.condition = condition;
        }
        if let Some(lane) = patch.lane {
            self.lane = lane;
        }
        if let Some(reason) = patch.reason {
            self.reason = reason;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(hold) = patch.hold_minutes {
            self.hold_minutes = (hold > 0).then_some(hold);
        }
        self.validate()
    }
}

/// Step-by-step builder for [`TriageRule`].
#[derive(Debug, Default)]
pub struct TriageRuleBuilder {
    id: Option<TriageRuleId>,
    condition: RuleCondition,
    lane: Option<Lane>,
    reason: Option<String>,
    enabled: Option<bool>,
    created_by: Option<String>,
    hold_minutes: Option<u32>,
    created_at: Option<Timestamp>,
}

impl TriageRuleBuilder {
    #[must_use]
    pub fn id(mut self, id: TriageRuleId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn condition(mut self, condition: RuleCondition) -> Self {
        self.condition = condition;
        self
    }

    #[must_use]
    pub fn device_id(mut self, device_id: impl Into<String>) -> Self {
        self.condition.device_id = Some(device_id.into());
        self
    }

    #[must_use]
    pub fn device_domain(mut self, domain: impl Into<String>) -> Self {
        self.condition.device_domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn room(mut self, room: impl Into<String>) -> Self {
        self.condition.room = Some(room.into());
        self
    }

    #[must_use]
    pub fn event_type(mut self, event_type: impl Into<String>) -> Self {
        self.condition.event_type = Some(event_type.into());
        self
    }

    #[must_use]
    pub fn delta(mut self, state_key: impl Into<String>, threshold: f64) -> Self {
        self.condition.state_key = Some(state_key.into());
        self.condition.delta_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn lane(mut self, lane: Lane) -> Self {
        self.lane = Some(lane);
        self
    }

    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    #[must_use]
    pub fn hold_minutes(mut self, minutes: u32) -> Self {
        self.hold_minutes = (minutes > 0).then_some(minutes);
        self
    }

    #[must_use]
    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    /// Consume the builder, validate, and return a [`TriageRule`].
    ///
    /// The lane defaults to [`Lane::Batched`] and the author to `"operator"`.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if invariants fail.
    pub fn build(self) -> Result<TriageRule, HearthError> {
        let rule = TriageRule {
            id: self.id.unwrap_or_default(),
            condition: self.condition,
            lane: self.lane.unwrap_or(Lane::Batched),
            reason: self.reason.unwrap_or_default(),
            enabled: self.enabled.unwrap_or(true),
            created_by: self.created_by.unwrap_or_else(|| "operator".to_string()),
            hold_minutes: self.hold_minutes,
            created_at: self.created_at.unwrap_or_else(crate::time::now),
        };
        rule.validate()?;
        Ok(rule)
    }
}
