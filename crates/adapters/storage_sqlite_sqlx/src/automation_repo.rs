//! `SQLite` implementation of [`AutomationRepository`].

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use hearth_app::ports::AutomationRepository;
use hearth_domain::automation::{Automation, Trigger, TriggerKind};
use hearth_domain::error::HearthError;
use hearth_domain::id::AutomationId;
use hearth_domain::time::Timestamp;

use crate::error::StorageError;
use crate::timestamp;

struct Wrapper(Automation);

impl Wrapper {
    fn maybe(value: Option<Self>) -> Option<Automation> {
        value.map(|w| w.0)
    }

    fn all(values: Vec<Self>) -> Vec<Automation> {
        values.into_iter().map(|w| w.0).collect()
    }
}

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let trigger_json: String = row.try_get("trigger_json")?;
        let created_at: String = row.try_get("created_at")?;

        let id = AutomationId::from_str(&id).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let trigger: Trigger = serde_json::from_str(&trigger_json)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(Automation {
            id,
            summary: row.try_get("summary")?,
            instruction: row.try_get("instruction")?,
            trigger,
            enabled: row.try_get("enabled")?,
            created_at: timestamp::decode(&created_at)?,
            last_fired_at: timestamp::decode_opt(row.try_get("last_fired_at")?)?,
            next_fire_at: timestamp::decode_opt(row.try_get("next_fire_at")?)?,
            channel: row.try_get("channel")?,
        }))
    }
}

const SELECT_COLUMNS: &str = "SELECT id, summary, instruction, trigger_json, enabled, created_at, \
     last_fired_at, next_fire_at, channel FROM automations";

/// `SQLite`-backed automation repository.
pub struct SqliteAutomationRepository {
    pool: SqlitePool,
}

impl SqliteAutomationRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl AutomationRepository for SqliteAutomationRepository {
    async fn create(&self, automation: Automation) -> Result<Automation, HearthError> {
        let trigger_json =
            serde_json::to_string(&automation.trigger).map_err(StorageError::from)?;

        sqlx::query(
            "INSERT INTO automations (id, summary, instruction, trigger_json, enabled, created_at, last_fired_at, next_fire_at, channel) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(automation.id.to_string())
        .bind(&automation.summary)
        .bind(&automation.instruction)
        .bind(&trigger_json)
        .bind(automation.enabled)
        .bind(timestamp::encode(automation.created_at))
        .bind(automation.last_fired_at.map(timestamp::encode))
        .bind(automation.next_fire_at.map(timestamp::encode))
        .bind(&automation.channel)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(automation)
    }

    async fn get_by_id(&self, id: AutomationId) -> Result<Option<Automation>, HearthError> {
        let row: Option<Wrapper> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::maybe(row))
    }

    async fn get_all(&self) -> Result<Vec<Automation>, HearthError> {
        let rows: Vec<Wrapper> = sqlx::query_as(&format!("{SELECT_COLUMNS} ORDER BY created_at"))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(Wrapper::all(rows))
    }

    async fn update(&self, automation: Automation) -> Result<Automation, HearthError> {
        let trigger_json =
            serde_json::to_string(&automation.trigger).map_err(StorageError::from)?;

        sqlx::query(
            "UPDATE automations SET summary = ?, instruction = ?, trigger_json = ?, enabled = ?, \
             last_fired_at = ?, next_fire_at = ?, channel = ? WHERE id = ?",
        )
        .bind(&automation.summary)
        .bind(&automation.instruction)
        .bind(&trigger_json)
        .bind(automation.enabled)
        .bind(automation.last_fired_at.map(timestamp::encode))
        .bind(automation.next_fire_at.map(timestamp::encode))
        .bind(&automation.channel)
        .bind(automation.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(automation)
    }

    async fn delete(&self, id: AutomationId) -> Result<bool, HearthError> {
        let result = sqlx::query("DELETE FROM automations WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_due_cron(&self, now: Timestamp) -> Result<Vec<Automation>, HearthError> {
        let rows: Vec<Wrapper> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE enabled = 1 \
             AND json_extract(trigger_json, '$.type') = 'cron' \
             AND next_fire_at IS NOT NULL AND next_fire_at <= ? \
             ORDER BY next_fire_at"
        ))
        .bind(timestamp::encode(now))
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(Wrapper::all(rows))
    }

    async fn find_enabled_by_kind(&self, kind: TriggerKind) -> Result<Vec<Automation>, HearthError> {
        let rows: Vec<Wrapper> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE enabled = 1 AND json_extract(trigger_json, '$.type') = ? \
             ORDER BY created_at"
        ))
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(Wrapper::all(rows))
    }
}
