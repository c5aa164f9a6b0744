//! Activity log port: the append-only audit trail.

use std::future::Future;

use hearth_domain::activity::{Activity, ActivityKind};
use hearth_domain::error::HearthError;
use hearth_domain::time::Timestamp;

/// Append and query [`Activity`] entries.
pub trait ActivityLog {
    /// Persist a new entry.
    fn record(&self, activity: Activity)
    -> impl Future<Output = Result<Activity, HearthError>> + Send;

    /// The most recent entries, newest first.
    fn recent(&self, limit: usize)
    -> impl Future<Output = Result<Vec<Activity>, HearthError>> + Send;

    /// Entries of one kind with `from <= timestamp < to`, oldest first.
    fn by_kind_in_range(
        &self,
        kind: ActivityKind,
        from: Timestamp,
        to: Timestamp,
    ) -> impl Future<Output = Result<Vec<Activity>, HearthError>> + Send;
}

impl<T: ActivityLog + Send + Sync> ActivityLog for std::sync::Arc<T> {
    fn record(
        &self,
        activity: Activity,
    ) -> impl Future<Output = Result<Activity, HearthError>> + Send {
        (**self).record(activity)
    }

    fn recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Activity>, HearthError>> + Send {
        (**self).recent(limit)
    }

    fn by_kind_in_range(
        &self,
        kind: ActivityKind,
        from: Timestamp,
        to: Timestamp,
    ) -> impl Future<Output = Result<Vec<Activity>, HearthError>> + Send {
        (**self).by_kind_in_range(kind, from, to)
    }
}
