//! Upgrade of legacy schedule tuples to cron triggers.
//!
//! Migration `0002` moves every pre-cron row's `(hour, minute, recurrence,
//! day_of_week)` into the `legacy_schedule` JSON column and leaves
//! `trigger_json` empty. This step fills `trigger_json` with the equivalent
//! [`Trigger::Cron`](hearth_domain::automation::Trigger::Cron). Rows written
//! by an intermediate release that stored the tuple itself in `trigger_json`
//! (no `type` tag) are converted the same way.
//!
//! An existing `next_fire_at` is kept as is; a missing one is computed from
//! the tuple. Converted rows carry a tagged trigger and are not selected
//! again, so running this on every startup is a no-op once done.

use chrono::Datelike;
use chrono_tz::Tz;
use sqlx::SqlitePool;

use hearth_domain::automation::legacy::{LegacySchedule, Recurrence};
use hearth_domain::time::Timestamp;

use crate::error::StorageError;
use crate::timestamp;

/// Outcome of [`upgrade_legacy_automations`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub converted: usize,
}

type LegacyRow = (String, Option<String>, Option<String>, Option<String>, String);

/// Convert every automation row still lacking a tagged trigger.
///
/// All rows are converted in a single transaction.
///
/// # Errors
///
/// Returns [`StorageError::LegacyRecord`] when a tuple is out of range (for
/// instance hour 24); nothing is written in that case.
pub async fn upgrade_legacy_automations(
    pool: &SqlitePool,
    tz: &Tz,
    now: Timestamp,
) -> Result<MigrationReport, StorageError> {
    let rows: Vec<LegacyRow> = sqlx::query_as(
        "SELECT id, trigger_json, legacy_schedule, next_fire_at, created_at FROM automations \
         WHERE trigger_json IS NULL \
            OR CASE WHEN json_valid(trigger_json) \
                    THEN json_extract(trigger_json, '$.type') IS NULL \
                    ELSE 1 END",
    )
    .fetch_all(pool)
    .await?;

    if rows.is_empty() {
        return Ok(MigrationReport::default());
    }

    let mut tx = pool.begin().await?;
    for (id, trigger_json, legacy_json, next_fire_at, created_at) in &rows {
        let source = trigger_json
            .as_deref()
            .filter(|json| serde_json::from_str::<LegacySchedule>(json).is_ok())
            .or(legacy_json.as_deref())
            .unwrap_or("null");
        let mut legacy: LegacySchedule = serde_json::from_str(source)?;

        let next_fire_at = timestamp::decode_opt(next_fire_at.clone())?;
        if legacy.recurrence == Recurrence::Weekly && legacy.day_of_week.is_none() {
            let reference = match next_fire_at {
                Some(ts) => ts,
                None => timestamp::decode(created_at)?,
            };
            legacy.day_of_week = Some(reference.with_timezone(tz).weekday().num_days_from_sunday());
        }

        let invalid = |source| StorageError::LegacyRecord {
            id: id.clone(),
            source,
        };
        let trigger = legacy.to_trigger().map_err(invalid)?;
        let next_fire_at = match next_fire_at {
            Some(ts) => ts,
            None => legacy.next_fire_after(now, tz).map_err(invalid)?,
        };

        sqlx::query(
            "UPDATE automations SET trigger_json = ?, legacy_schedule = ?, next_fire_at = ? WHERE id = ?",
        )
        .bind(serde_json::to_string(&trigger)?)
        .bind(serde_json::to_string(&legacy)?)
        .bind(timestamp::encode(next_fire_at))
        .bind(id)
        .execute(&mut *tx)
        .await?;

        tracing::debug!(%id, %trigger, "legacy schedule converted");
    }
    tx.commit().await?;

    Ok(MigrationReport {
        converted: rows.len(),
    })
}
