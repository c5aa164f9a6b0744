//! Classifier: picks a lane for a device event.
//!
//! Rules are evaluated as an ordered pipeline of specificity tiers. Each tier
//! yields a [`TierOutcome`]; the first [`TierOutcome::Match`] wins. A rule
//! whose delta threshold is not met is skipped, so evaluation falls through
//! to the remaining candidates and then to less specific tiers. When no
//! tier matches, built-in defaults decide.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::device_event::DeviceEvent;
use crate::id::TriageRuleId;
use crate::triage::{Lane, Specificity, TriageRule};

const HEARTBEAT_EVENT_TYPES: &[&str] = &["heartbeat", "ping", "keepalive", "telemetry"];
const SECURITY_DOMAINS: &[&str] = &["binary_sensor", "lock", "alarm_control_panel", "siren"];
const SECURITY_EVENT_MARKERS: &[&str] = &[
    "motion", "occupancy", "lock", "door", "window", "smoke", "leak", "alarm", "tamper",
];

/// Last known numeric readings of one device, keyed by state key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceState {
    readings: HashMap<String, f64>,
}

impl DeviceState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_reading(mut self, state_key: impl Into<String>, value: f64) -> Self {
        self.readings.insert(state_key.into(), value);
        self
    }

    #[must_use]
    pub fn previous(&self, state_key: &str) -> Option<f64> {
        self.readings.get(state_key).copied()
    }

    /// Remember the event's numeric reading, if it carries one.
    pub fn record(&mut self, event: &DeviceEvent) {
        if let (Some(key), Some(value)) = (event.state_key.as_ref(), event.numeric_value()) {
            self.readings.insert(key.clone(), value);
        }
    }

    /// `|value - previous|` for the event's state key, when both are known.
    #[must_use]
    pub fn delta(&self, event: &DeviceEvent) -> Option<f64> {
        let key = event.state_key.as_deref()?;
        let current = event.numeric_value()?;
        self.previous(key).map(|before| (current - before).abs())
    }
}

/// The lane decision for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub lane: Lane,
    pub reason: String,
    /// The winning rule, or `None` when a built-in default decided.
    pub rule_id: Option<TriageRuleId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<f64>,
    /// Hold window of the winning rule.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hold_minutes: Option<u32>,
}

impl Classification {
    fn from_rule(rule: &TriageRule, delta: Option<f64>) -> Self {
        Self {
            lane: rule.lane,
            reason: rule.reason.clone(),
            rule_id: Some(rule.id),
            delta,
            hold_minutes: rule.hold_minutes,
        }
    }

    fn default_lane(lane: Lane, reason: &str, delta: Option<f64>) -> Self {
        Self {
            lane,
            reason: reason.to_string(),
            rule_id: None,
            delta,
            hold_minutes: None,
        }
    }
}

/// Result of evaluating a single specificity tier.
#[derive(Debug, Clone, PartialEq)]
pub enum TierOutcome<'a> {
    /// A rule in this tier decides the event.
    Match {
        rule: &'a TriageRule,
        delta: Option<f64>,
    },
    /// No enabled rule in this tier matches the event's fields.
    NoMatch,
    /// Rules matched but every one missed its delta threshold.
    FallThrough { skipped: usize },
}

/// Evaluate the enabled rules of one tier against an event.
///
/// Candidates are tried newest first. A rule with a delta threshold only
/// counts when the change since the previous reading reaches the threshold;
/// an unknown previous reading counts as a miss.
#[must_use]
pub fn evaluate_tier<'a>(
    tier: Specificity,
    event: &DeviceEvent,
    rules: &'a [TriageRule],
    state: &DeviceState,
) -> TierOutcome<'a> {
    let mut candidates: Vec<&TriageRule> = rules
        .iter()
        .filter(|r| r.enabled && r.condition.specificity() == tier && r.condition.matches(event))
        .collect();
    if candidates.is_empty() {
        return TierOutcome::NoMatch;
    }
    candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));

    let delta = state.delta(event);
    let mut skipped = 0;
    for rule in candidates {
        match rule.condition.delta_threshold {
            Some(threshold) if !delta.is_some_and(|d| d >= threshold) => skipped += 1,
            _ => return TierOutcome::Match { rule, delta },
        }
    }
    TierOutcome::FallThrough { skipped }
}

/// Classify an event against a snapshot of rules and the device's prior state.
///
/// Never fails: an event no rule or heuristic claims lands in [`Lane::Batched`].
#[must_use]
pub fn classify(event: &DeviceEvent, rules: &[TriageRule], state: &DeviceState) -> Classification {
    for tier in Specificity::ALL {
        match evaluate_tier(tier, event, rules, state) {
            TierOutcome::Match { rule, delta } => return Classification::from_rule(rule, delta),
            TierOutcome::NoMatch | TierOutcome::FallThrough { .. } => {}
        }
    }
    default_classification(event, state.delta(event))
}

fn default_classification(event: &DeviceEvent, delta: Option<f64>) -> Classification {
    let event_type = event.event_type.to_ascii_lowercase();

    if HEARTBEAT_EVENT_TYPES.contains(&event_type.as_str()) {
        return Classification::default_lane(Lane::Silent, "heartbeat telemetry", delta);
    }
    if delta.is_some_and(|d| d.abs() < f64::EPSILON) {
        return Classification::default_lane(Lane::Silent, "value unchanged", delta);
    }
    if is_security_relevant(event, &event_type) {
        return Classification::default_lane(Lane::Immediate, "security-relevant event", delta);
    }
    if event.numeric_value().is_none() {
        return Classification::default_lane(
            Lane::Batched,
            "state change without numeric payload",
            delta,
        );
    }
    Classification::default_lane(Lane::Batched, "default", delta)
}

fn is_security_relevant(event: &DeviceEvent, event_type: &str) -> bool {
    SECURITY_DOMAINS.contains(&event.device_domain.as_str())
        || SECURITY_EVENT_MARKERS.iter().any(|m| event_type.contains(m))
        || event.has_boolean_value()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::time::Timestamp;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap()
    }

    fn light(device_id: &str) -> DeviceEvent {
        DeviceEvent::new(device_id, "state_changed", t0()).with_reading("brightness", 80.into())
    }

    fn temperature(value: f64) -> DeviceEvent {
        DeviceEvent::new("sensor.living_room", "state_changed", t0())
            .with_room("living_room")
            .with_reading("temperature", value.into())
    }

    fn light_rules() -> Vec<TriageRule> {
        vec![
            TriageRule::builder()
                .device_domain("light")
                .lane(Lane::Batched)
                .reason("lights are routine")
                .build()
                .unwrap(),
            TriageRule::builder()
                .device_id("light.kitchen")
                .lane(Lane::Immediate)
                .reason("kitchen light matters")
                .build()
                .unwrap(),
        ]
    }

    #[test]
    fn should_prefer_device_id_rule_over_domain_rule() {
        let rules = light_rules();
        let state = DeviceState::new();

        let kitchen = classify(&light("light.kitchen"), &rules, &state);
        assert_eq!(kitchen.lane, Lane::Immediate);
        assert_eq!(kitchen.rule_id, Some(rules[1].id));

        let bedroom = classify(&light("light.bedroom"), &rules, &state);
        assert_eq!(bedroom.lane, Lane::Batched);
        assert_eq!(bedroom.rule_id, Some(rules[0].id));
    }

    #[test]
    fn should_fall_through_when_delta_below_threshold() {
        let rules = vec![
            TriageRule::builder()
                .device_id("sensor.living_room")
                .delta("temperature", 2.0)
                .lane(Lane::Immediate)
                .reason("big temperature swing")
                .build()
                .unwrap(),
            TriageRule::builder()
                .room("living_room")
                .lane(Lane::Silent)
                .reason("living room chatter")
                .build()
                .unwrap(),
        ];
        let state = DeviceState::new().with_reading("temperature", 20.0);

        let small = classify(&temperature(21.5), &rules, &state);
        assert_eq!(small.lane, Lane::Silent);
        assert_eq!(small.rule_id, Some(rules[1].id));
        assert_eq!(small.delta, Some(1.5));

        let big = classify(&temperature(23.0), &rules, &state);
        assert_eq!(big.lane, Lane::Immediate);
        assert_eq!(big.rule_id, Some(rules[0].id));
    }

    #[test]
    fn should_fall_through_to_default_when_no_previous_reading() {
        let rules = vec![
            TriageRule::builder()
                .device_id("sensor.living_room")
                .delta("temperature", 2.0)
                .lane(Lane::Immediate)
                .reason("big temperature swing")
                .build()
                .unwrap(),
        ];
        let result = classify(&temperature(30.0), &rules, &DeviceState::new());
        assert_eq!(result.rule_id, None);
        assert_eq!(result.lane, Lane::Batched);
    }

    #[test]
    fn should_report_fall_through_per_tier() {
        let rules = vec![
            TriageRule::builder()
                .device_id("sensor.living_room")
                .delta("temperature", 2.0)
                .reason("big temperature swing")
                .build()
                .unwrap(),
        ];
        let state = DeviceState::new().with_reading("temperature", 20.0);
        let event = temperature(20.5);

        assert_eq!(
            evaluate_tier(Specificity::DeviceId, &event, &rules, &state),
            TierOutcome::FallThrough { skipped: 1 }
        );
        assert_eq!(
            evaluate_tier(Specificity::Domain, &event, &rules, &state),
            TierOutcome::NoMatch
        );
    }

    #[test]
    fn should_ignore_disabled_rule() {
        let mut rules = light_rules();
        rules[1].enabled = false;
        let result = classify(&light("light.kitchen"), &rules, &DeviceState::new());
        assert_eq!(result.lane, Lane::Batched);
        assert_eq!(result.rule_id, Some(rules[0].id));
    }

    #[test]
    fn should_prefer_newest_rule_within_tier() {
        let older = TriageRule::builder()
            .device_domain("light")
            .lane(Lane::Silent)
            .reason("older")
            .created_at(t0())
            .build()
            .unwrap();
        let newer = TriageRule::builder()
            .device_domain("light")
            .lane(Lane::Immediate)
            .reason("newer")
            .created_at(t0() + Duration::minutes(5))
            .build()
            .unwrap();
        let rules = vec![older, newer.clone()];
        let result = classify(&light("light.hall"), &rules, &DeviceState::new());
        assert_eq!(result.rule_id, Some(newer.id));
    }

    #[test]
    fn should_apply_wildcard_rule_last() {
        let rules = vec![
            TriageRule::builder()
                .lane(Lane::Silent)
                .reason("everything else is noise")
                .build()
                .unwrap(),
        ];
        let result = classify(&light("light.hall"), &rules, &DeviceState::new());
        assert_eq!(result.lane, Lane::Silent);
    }

    #[test]
    fn should_default_security_events_to_immediate() {
        let state = DeviceState::new();
        let motion = DeviceEvent::new("sensor.hall", "motion_detected", t0());
        let lock = DeviceEvent::new("lock.front", "state_changed", t0());
        let door = DeviceEvent::new("contact.back", "state_changed", t0())
            .with_reading("open", true.into());
        for event in [motion, lock, door] {
            assert_eq!(classify(&event, &[], &state).lane, Lane::Immediate, "{event:?}");
        }
    }

    #[test]
    fn should_default_heartbeat_and_unchanged_values_to_silent() {
        let heartbeat = DeviceEvent::new("sensor.hall", "heartbeat", t0());
        assert_eq!(classify(&heartbeat, &[], &DeviceState::new()).lane, Lane::Silent);

        let state = DeviceState::new().with_reading("temperature", 21.0);
        let unchanged = classify(&temperature(21.0), &[], &state);
        assert_eq!(unchanged.lane, Lane::Silent);
        assert_eq!(unchanged.reason, "value unchanged");
    }

    #[test]
    fn should_default_state_change_without_numeric_payload_to_batched() {
        let event = DeviceEvent::new("media_player.tv", "state_changed", t0())
            .with_reading("source", "hdmi1".into());
        let result = classify(&event, &[], &DeviceState::new());
        assert_eq!(result.lane, Lane::Batched);
        assert_eq!(result.rule_id, None);
    }

    #[test]
    fn should_record_numeric_readings_only() {
        let mut state = DeviceState::new();
        state.record(&temperature(19.0));
        state.record(
            &DeviceEvent::new("sensor.living_room", "state_changed", t0())
                .with_reading("mode", "eco".into()),
        );
        assert_eq!(state.previous("temperature"), Some(19.0));
        assert_eq!(state.previous("mode"), None);
    }

    #[test]
    fn should_carry_hold_window_of_winning_rule() {
        let rules = vec![
            TriageRule::builder()
                .device_id("lock.front")
                .lane(Lane::Immediate)
                .reason("front door")
                .hold_minutes(15)
                .build()
                .unwrap(),
        ];
        let event = DeviceEvent::new("lock.front", "unlocked", t0());
        assert_eq!(classify(&event, &rules, &DeviceState::new()).hold_minutes, Some(15));
    }
}
