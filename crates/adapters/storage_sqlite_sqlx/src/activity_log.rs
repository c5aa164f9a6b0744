//! `SQLite` implementation of [`ActivityLog`].

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use hearth_app::ports::ActivityLog;
use hearth_domain::activity::{Activity, ActivityKind};
use hearth_domain::error::HearthError;
use hearth_domain::id::{ActivityId, AutomationId};
use hearth_domain::time::Timestamp;

use crate::error::StorageError;
use crate::timestamp;

struct Wrapper(Activity);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let kind: String = row.try_get("kind")?;
        let automation_id: Option<String> = row.try_get("automation_id")?;
        let data: String = row.try_get("data")?;
        let ts: String = row.try_get("timestamp")?;

        let id = ActivityId::from_str(&id).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let kind =
            ActivityKind::from_str(&kind).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let automation_id = automation_id
            .map(|s| AutomationId::from_str(&s))
            .transpose()
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let data = serde_json::from_str(&data).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(Activity {
            id,
            kind,
            device_id: row.try_get("device_id")?,
            automation_id,
            data,
            timestamp: timestamp::decode(&ts)?,
        }))
    }
}

/// `SQLite`-backed activity log.
pub struct SqliteActivityLog {
    pool: SqlitePool,
}

impl SqliteActivityLog {
    /// Create a new log backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

impl ActivityLog for SqliteActivityLog {
    async fn record(&self, activity: Activity) -> Result<Activity, HearthError> {
        let data = serde_json::to_string(&activity.data).map_err(StorageError::from)?;

        sqlx::query(
            "INSERT INTO activities (id, kind, device_id, automation_id, data, timestamp) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(activity.id.to_string())
        .bind(activity.kind.as_str())
        .bind(&activity.device_id)
        .bind(activity.automation_id.map(|id| id.to_string()))
        .bind(&data)
        .bind(timestamp::encode(activity.timestamp))
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(activity)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Activity>, HearthError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows: Vec<Wrapper> =
            sqlx::query_as("SELECT * FROM activities ORDER BY timestamp DESC LIMIT ?")
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn by_kind_in_range(
        &self,
        kind: ActivityKind,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<Activity>, HearthError> {
        let rows: Vec<Wrapper> = sqlx::query_as(
            "SELECT * FROM activities WHERE kind = ? AND timestamp >= ? AND timestamp < ? ORDER BY timestamp",
        )
        .bind(kind.as_str())
        .bind(timestamp::encode(from))
        .bind(timestamp::encode(to))
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone, Utc};
    use chrono_tz::Tz;

    use super::*;
    use crate::pool::Config;
    use hearth_domain::device_event::DeviceEvent;
    use hearth_domain::triage::{Classification, Lane};

    async fn setup() -> SqliteActivityLog {
        let db = Config {
            database_url: "sqlite::memory:".to_string(),
            timezone: Tz::UTC,
        }
        .build()
        .await
        .unwrap();
        SqliteActivityLog::new(db.pool().clone())
    }

    fn classified(minute: i64) -> Activity {
        let ts = Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap() + TimeDelta::minutes(minute);
        let event = DeviceEvent::new("sensor.hall", "state_changed", ts);
        let classification = Classification {
            lane: Lane::Batched,
            reason: "default".to_string(),
            rule_id: None,
            delta: Some(0.5),
            hold_minutes: None,
        };
        Activity::triage_classify(&event, &classification, false, ts)
    }

    #[tokio::test]
    async fn should_preserve_payload_through_roundtrip() {
        let log = setup().await;
        let activity = classified(0);
        log.record(activity.clone()).await.unwrap();

        let recent = log.recent(10).await.unwrap();
        assert_eq!(recent, vec![activity]);
        assert_eq!(recent[0].classify_record().unwrap().delta, Some(0.5));
    }

    #[tokio::test]
    async fn should_return_recent_newest_first_with_limit() {
        let log = setup().await;
        for minute in 0..5 {
            log.record(classified(minute)).await.unwrap();
        }
        let recent = log.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert!(recent[0].timestamp > recent[1].timestamp);
    }

    #[tokio::test]
    async fn should_query_half_open_range_by_kind() {
        let log = setup().await;
        for minute in 0..5 {
            log.record(classified(minute)).await.unwrap();
        }
        log.record(Activity::batch_flush(&[], classified(2).timestamp))
            .await
            .unwrap();

        let from = Utc.with_ymd_and_hms(2026, 1, 5, 8, 1, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2026, 1, 5, 8, 3, 0).unwrap();
        let found = log
            .by_kind_in_range(ActivityKind::TriageClassify, from, to)
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|a| a.kind == ActivityKind::TriageClassify));
    }
}
