//! Triage engine: classifies device events and dispatches them by lane.
//!
//! Every classification is recorded as a `triage_classify` activity, whether
//! or not it is delivered. Hold windows debounce delivery only: a repeat of
//! the same lane decision for the same device and event type inside the
//! window is classified and logged, then skipped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::TimeDelta;

use hearth_domain::activity::Activity;
use hearth_domain::device_event::DeviceEvent;
use hearth_domain::error::HearthError;
use hearth_domain::time::Timestamp;
use hearth_domain::triage::{Classification, DeviceState, Lane, classify};

use crate::batch::BatchAccumulator;
use crate::ports::{ActivityLog, AgentGateway, TriageRuleRepository};

/// A delivery that opened a hold window.
#[derive(Debug, Clone, Copy)]
struct Hold {
    lane: Lane,
    until: Timestamp,
}

/// Open hold windows per `(device_id, event_type)`. Only decisions carrying
/// a hold window are remembered, and expired windows are dropped.
#[derive(Debug, Default)]
struct HoldTable {
    holds: HashMap<(String, String), Hold>,
}

impl HoldTable {
    /// Whether delivery must be skipped, opening a window otherwise.
    fn check_and_record(
        &mut self,
        event: &DeviceEvent,
        classification: &Classification,
        now: Timestamp,
    ) -> bool {
        self.holds.retain(|_, hold| hold.until > now);
        let Some(minutes) = classification.hold_minutes else {
            return false;
        };
        let key = (event.device_id.clone(), event.event_type.clone());
        if self
            .holds
            .get(&key)
            .is_some_and(|hold| hold.lane == classification.lane)
        {
            return true;
        }
        self.holds.insert(
            key,
            Hold {
                lane: classification.lane,
                until: now + TimeDelta::minutes(i64::from(minutes)),
            },
        );
        false
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.holds.len()
    }
}

/// Classify-and-dispatch use-case for incoming device events.
pub struct TriageEngine<R, G, L> {
    rules: R,
    gateway: G,
    log: L,
    batch: Arc<BatchAccumulator<G, L>>,
    holds: Mutex<HoldTable>,
}

impl<R, G, L> TriageEngine<R, G, L>
where
    R: TriageRuleRepository,
    G: AgentGateway,
    L: ActivityLog,
{
    pub fn new(rules: R, gateway: G, log: L, batch: Arc<BatchAccumulator<G, L>>) -> Self {
        Self {
            rules,
            gateway,
            log,
            batch,
            holds: Mutex::new(HoldTable::default()),
        }
    }

    /// Classify `event` against the current enabled rules and `state` (the
    /// device's readings *before* this event), record the decision and
    /// dispatch it.
    ///
    /// A failed immediate delivery is downgraded to the batch buffer so the
    /// event is not lost.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the rules cannot be loaded or the
    /// activity cannot be recorded.
    #[tracing::instrument(skip_all, fields(device_id = %event.device_id, event_type = %event.event_type))]
    pub async fn process(
        &self,
        event: &DeviceEvent,
        state: &DeviceState,
        now: Timestamp,
    ) -> Result<Classification, HearthError> {
        let rules = self.rules.get_enabled().await?;
        let classification = classify(event, &rules, state);
        let suppressed = self
            .holds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .check_and_record(event, &classification, now);

        self.log
            .record(Activity::triage_classify(event, &classification, suppressed, now))
            .await?;
        tracing::debug!(
            lane = %classification.lane,
            reason = %classification.reason,
            rule_id = ?classification.rule_id,
            delta = ?classification.delta,
            suppressed,
            "event classified"
        );

        if suppressed {
            return Ok(classification);
        }
        match classification.lane {
            Lane::Immediate => self.deliver_immediate(event, &classification.reason, now).await?,
            Lane::Batched => self.batch.push(event.clone()),
            Lane::Silent => {}
        }
        Ok(classification)
    }

    async fn deliver_immediate(
        &self,
        event: &DeviceEvent,
        reason: &str,
        now: Timestamp,
    ) -> Result<(), HearthError> {
        if let Err(err) = self.gateway.deliver_immediate(event, reason).await {
            tracing::warn!(error = %err, "immediate delivery failed, event queued for next batch");
            self.batch.push(event.clone());
            return Ok(());
        }
        self.log
            .record(Activity::immediate_delivery(event, reason, now))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::testing::{Delivered, InMemoryActivityLog, InMemoryRuleRepo, SpyGateway};
    use hearth_domain::activity::ActivityKind;
    use hearth_domain::triage::TriageRule;

    type Engine = TriageEngine<Arc<InMemoryRuleRepo>, Arc<SpyGateway>, Arc<InMemoryActivityLog>>;
    type Batch = Arc<BatchAccumulator<Arc<SpyGateway>, Arc<InMemoryActivityLog>>>;

    struct Harness {
        engine: Engine,
        rules: Arc<InMemoryRuleRepo>,
        gateway: Arc<SpyGateway>,
        log: Arc<InMemoryActivityLog>,
        batch: Batch,
    }

    fn harness() -> Harness {
        let rules = Arc::new(InMemoryRuleRepo::default());
        let gateway = Arc::new(SpyGateway::default());
        let log = Arc::new(InMemoryActivityLog::default());
        let batch = Arc::new(BatchAccumulator::new(Arc::clone(&gateway), Arc::clone(&log)));
        let engine = TriageEngine::new(
            Arc::clone(&rules),
            Arc::clone(&gateway),
            Arc::clone(&log),
            Arc::clone(&batch),
        );
        Harness {
            engine,
            rules,
            gateway,
            log,
            batch,
        }
    }

    fn t(minute: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 1, 5, 8, minute, 0).unwrap()
    }

    fn front_door(minute: u32) -> DeviceEvent {
        DeviceEvent::new("lock.front", "unlocked", t(minute))
    }

    async fn add_front_door_rule(h: &Harness, hold_minutes: u32) -> TriageRule {
        let rule = TriageRule::builder()
            .device_id("lock.front")
            .lane(Lane::Immediate)
            .reason("front door")
            .hold_minutes(hold_minutes)
            .build()
            .unwrap();
        h.rules.create(rule).await.unwrap()
    }

    #[tokio::test]
    async fn should_deliver_immediate_event_and_log_it() {
        let h = harness();
        add_front_door_rule(&h, 0).await;

        let result = h
            .engine
            .process(&front_door(0), &DeviceState::new(), t(0))
            .await
            .unwrap();

        assert_eq!(result.lane, Lane::Immediate);
        assert_eq!(
            h.gateway.delivered(),
            vec![Delivered::Immediate("lock.front".into(), "front door".into())]
        );
        assert_eq!(h.log.of_kind(ActivityKind::TriageClassify).len(), 1);
        assert_eq!(h.log.of_kind(ActivityKind::TriageImmediate).len(), 1);
    }

    #[tokio::test]
    async fn should_suppress_repeat_within_hold_window_but_still_log() {
        let h = harness();
        add_front_door_rule(&h, 10).await;
        let state = DeviceState::new();

        h.engine.process(&front_door(0), &state, t(0)).await.unwrap();
        h.engine.process(&front_door(5), &state, t(5)).await.unwrap();
        h.engine.process(&front_door(11), &state, t(11)).await.unwrap();

        assert_eq!(h.gateway.delivered().len(), 2);
        let classified = h.log.of_kind(ActivityKind::TriageClassify);
        assert_eq!(classified.len(), 3);
        let suppressed: Vec<bool> = classified
            .iter()
            .map(|a| a.classify_record().unwrap().suppressed)
            .collect();
        assert_eq!(suppressed, vec![false, true, false]);
    }

    #[tokio::test]
    async fn should_remember_only_open_hold_windows() {
        let h = harness();
        let hall = DeviceEvent::new("sensor.hall", "state_changed", t(0))
            .with_reading("temperature", 20.into());
        h.engine.process(&hall, &DeviceState::new(), t(0)).await.unwrap();
        assert_eq!(h.engine.holds.lock().unwrap().len(), 0);

        add_front_door_rule(&h, 10).await;
        h.engine.process(&front_door(1), &DeviceState::new(), t(1)).await.unwrap();
        assert_eq!(h.engine.holds.lock().unwrap().len(), 1);

        h.engine.process(&hall, &DeviceState::new(), t(12)).await.unwrap();
        assert_eq!(h.engine.holds.lock().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn should_push_batched_events_into_buffer() {
        let h = harness();
        let event = DeviceEvent::new("media_player.tv", "state_changed", t(0))
            .with_reading("source", "hdmi1".into());

        let result = h
            .engine
            .process(&event, &DeviceState::new(), t(0))
            .await
            .unwrap();

        assert_eq!(result.lane, Lane::Batched);
        assert_eq!(h.batch.len(), 1);
        assert!(h.gateway.delivered().is_empty());
    }

    #[tokio::test]
    async fn should_only_record_silent_events() {
        let h = harness();
        let event = DeviceEvent::new("sensor.hall", "heartbeat", t(0));
        h.engine
            .process(&event, &DeviceState::new(), t(0))
            .await
            .unwrap();
        assert!(h.batch.is_empty());
        assert!(h.gateway.delivered().is_empty());
        assert_eq!(h.log.of_kind(ActivityKind::TriageClassify).len(), 1);
    }

    #[tokio::test]
    async fn should_stop_matching_rule_once_disabled() {
        let h = harness();
        let rule = TriageRule::builder()
            .device_id("sensor.hall")
            .lane(Lane::Immediate)
            .reason("watch the hall")
            .build()
            .unwrap();
        let mut rule = h.rules.create(rule).await.unwrap();
        let event = DeviceEvent::new("sensor.hall", "state_changed", t(0))
            .with_reading("temperature", 20.into());

        let before = h.engine.process(&event, &DeviceState::new(), t(0)).await.unwrap();
        assert_eq!(before.rule_id, Some(rule.id));

        rule.enabled = false;
        h.rules.update(rule).await.unwrap();
        let after = h.engine.process(&event, &DeviceState::new(), t(1)).await.unwrap();
        assert_eq!(after.rule_id, None);
        assert_eq!(after.lane, Lane::Batched);
    }

    #[tokio::test]
    async fn should_queue_immediate_event_when_delivery_fails() {
        let h = harness();
        add_front_door_rule(&h, 0).await;
        h.gateway.fail(true);

        h.engine
            .process(&front_door(0), &DeviceState::new(), t(0))
            .await
            .unwrap();

        assert_eq!(h.batch.len(), 1);
        assert!(h.log.of_kind(ActivityKind::TriageImmediate).is_empty());
    }
}
