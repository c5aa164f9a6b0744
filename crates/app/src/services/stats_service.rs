//! Stats service: triage statistics over a trailing time window.

use chrono::TimeDelta;

use hearth_domain::activity::ActivityKind;
use hearth_domain::error::HearthError;
use hearth_domain::time::Timestamp;
use hearth_domain::triage::stats::TriageStats;

use crate::ports::ActivityLog;

/// Read-side aggregation over the classification log.
pub struct StatsService<L> {
    log: L,
}

impl<L: ActivityLog> StatsService<L> {
    pub fn new(log: L) -> Self {
        Self { log }
    }

    /// Lane counts and delta aggregates for the last `window_hours` before
    /// `now`, optionally restricted to one device.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the activity log.
    pub async fn triage_stats(
        &self,
        window_hours: u32,
        device_id: Option<&str>,
        now: Timestamp,
    ) -> Result<TriageStats, HearthError> {
        let from = now - TimeDelta::hours(i64::from(window_hours));
        let mut activities = self
            .log
            .by_kind_in_range(ActivityKind::TriageClassify, from, now)
            .await?;
        if let Some(device_id) = device_id {
            activities.retain(|a| a.device_id.as_deref() == Some(device_id));
        }
        Ok(TriageStats::from_activities(&activities, window_hours))
    }
}
