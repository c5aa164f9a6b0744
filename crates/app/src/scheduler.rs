//! Trigger scheduler: fires automations.
//!
//! Cron automations are polled on a fixed tick; event-driven automations are
//! evaluated per incoming device event. Each automation is fired, then marked
//! fired, in sequence: a crash between the two yields a duplicate fire on
//! restart, never a lost one. A failure on one automation never stops the
//! others from being evaluated.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use hearth_domain::activity::Activity;
use hearth_domain::automation::{Automation, Trigger};
use hearth_domain::device_event::DeviceEvent;
use hearth_domain::error::HearthError;
use hearth_domain::id::AutomationId;
use hearth_domain::time::{self, Timestamp};
use hearth_domain::triage::DeviceState;

use crate::ports::{ActivityLog, AgentGateway, AutomationRepository};
use crate::services::automation_service::AutomationService;

/// Outcome of one scheduler pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FireReport {
    pub fired: Vec<AutomationId>,
    pub failed: Vec<AutomationId>,
}

/// Polls for due cron automations and matches event-driven ones.
pub struct TriggerScheduler<R, G, L> {
    automations: Arc<AutomationService<R>>,
    gateway: G,
    log: L,
}

impl<R, G, L> TriggerScheduler<R, G, L>
where
    R: AutomationRepository,
    G: AgentGateway,
    L: ActivityLog,
{
    pub fn new(automations: Arc<AutomationService<R>>, gateway: G, log: L) -> Self {
        Self {
            automations,
            gateway,
            log,
        }
    }

    /// Fire every cron automation due at `now`.
    ///
    /// # Errors
    ///
    /// Returns a storage error only when the due set cannot be loaded;
    /// per-automation failures are reported in [`FireReport::failed`].
    #[tracing::instrument(skip(self))]
    pub async fn tick(&self, now: Timestamp) -> Result<FireReport, HearthError> {
        let due = self.automations.due_cron(now).await?;
        let mut report = FireReport::default();
        for automation in &due {
            self.fire_one(automation, now, &mut report).await;
        }
        if !report.fired.is_empty() || !report.failed.is_empty() {
            tracing::info!(
                fired = report.fired.len(),
                failed = report.failed.len(),
                "scheduler tick"
            );
        }
        Ok(report)
    }

    /// Fire every enabled event-driven automation matching `event`.
    ///
    /// `state` holds the device's readings *before* this event, so threshold
    /// triggers fire only when the value crosses into their condition.
    ///
    /// # Errors
    ///
    /// Returns a storage error only when the candidate automations cannot be
    /// loaded.
    #[tracing::instrument(skip_all, fields(device_id = %event.device_id, event_type = %event.event_type))]
    pub async fn handle_event(
        &self,
        event: &DeviceEvent,
        state: &DeviceState,
        now: Timestamp,
    ) -> Result<FireReport, HearthError> {
        let mut candidates = self.automations.device_event_automations().await?;
        candidates.extend(self.automations.state_threshold_automations().await?);

        let mut report = FireReport::default();
        for automation in &candidates {
            let previous = match &automation.trigger {
                Trigger::StateThreshold { state_key, .. } => state.previous(state_key),
                Trigger::Cron { .. } | Trigger::DeviceEvent { .. } => None,
            };
            if automation.trigger.matches_event(event, previous) {
                self.fire_one(automation, now, &mut report).await;
            }
        }
        Ok(report)
    }

    async fn fire_one(&self, automation: &Automation, now: Timestamp, report: &mut FireReport) {
        if let Err(err) = self.gateway.fire(automation).await {
            tracing::warn!(id = %automation.id, error = %err, "fire failed, will retry");
            report.failed.push(automation.id);
            return;
        }
        match self.automations.mark_fired(automation.id, now).await {
            Ok(Some(_)) => {}
            Ok(None) => tracing::debug!(id = %automation.id, "automation removed while firing"),
            Err(err) => {
                tracing::error!(id = %automation.id, error = %err, "mark fired failed");
                report.failed.push(automation.id);
                return;
            }
        }
        if let Err(err) = self.log.record(Activity::automation_fired(automation, now)).await {
            tracing::warn!(id = %automation.id, error = %err, "failed to record fire activity");
        }
        report.fired.push(automation.id);
    }

    /// Tick every `interval` until `shutdown` flips to `true`. Ticks never
    /// overlap: the next one starts after the previous one completes.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.tick(time::now()).await {
                        tracing::error!(error = %err, "scheduler tick failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("scheduler stopped");
    }
}
