//! `SQLite` implementation of [`TriageRuleRepository`].

use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use hearth_app::ports::TriageRuleRepository;
use hearth_domain::error::HearthError;
use hearth_domain::id::TriageRuleId;
use hearth_domain::triage::{Lane, RuleCondition, TriageRule};

use crate::error::StorageError;
use crate::timestamp;

struct Wrapper(TriageRule);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let id: String = row.try_get("id")?;
        let condition_json: String = row.try_get("condition_json")?;
        let lane: String = row.try_get("lane")?;
        let created_at: String = row.try_get("created_at")?;
        let hold_minutes: Option<i64> = row.try_get("hold_minutes")?;

        let id = TriageRuleId::from_str(&id).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let condition: RuleCondition = serde_json::from_str(&condition_json)
            .map_err(|err| sqlx::Error::Decode(Box::new(err)))?;
        let lane = Lane::from_str(&lane).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(TriageRule {
            id,
            condition,
            lane,
            reason: row.try_get("reason")?,
            enabled: row.try_get("enabled")?,
            created_by: row.try_get("created_by")?,
            hold_minutes: hold_minutes.and_then(|m| u32::try_from(m).ok()).filter(|m| *m > 0),
            created_at: timestamp::decode(&created_at)?,
        }))
    }
}

/// `SQLite`-backed triage rule repository.
pub struct SqliteTriageRuleRepository {
    pool: SqlitePool,
}

impl SqliteTriageRuleRepository {
    /// Create a new repository backed by the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<TriageRule>, HearthError> {
        let rows: Vec<Wrapper> = sqlx::query_as(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(|w| w.0).collect())
    }
}

impl TriageRuleRepository for SqliteTriageRuleRepository {
    async fn create(&self, rule: TriageRule) -> Result<TriageRule, HearthError> {
        let condition_json = serde_json::to_string(&rule.condition).map_err(StorageError::from)?;

        sqlx::query(
            "INSERT INTO triage_rules (id, condition_json, lane, reason, enabled, created_by, hold_minutes, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(rule.id.to_string())
        .bind(&condition_json)
        .bind(rule.lane.as_str())
        .bind(&rule.reason)
        .bind(rule.enabled)
        .bind(&rule.created_by)
        .bind(rule.hold_minutes)
        .bind(timestamp::encode(rule.created_at))
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(rule)
    }

    async fn get_by_id(&self, id: TriageRuleId) -> Result<Option<TriageRule>, HearthError> {
        let row: Option<Wrapper> = sqlx::query_as("SELECT * FROM triage_rules WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(row.map(|w| w.0))
    }

    async fn get_all(&self) -> Result<Vec<TriageRule>, HearthError> {
        self.fetch("SELECT * FROM triage_rules ORDER BY created_at DESC")
            .await
    }

    async fn get_enabled(&self) -> Result<Vec<TriageRule>, HearthError> {
        self.fetch("SELECT * FROM triage_rules WHERE enabled = 1 ORDER BY created_at DESC")
            .await
    }

    async fn update(&self, rule: TriageRule) -> Result<TriageRule, HearthError> {
        let condition_json = serde_json::to_string(&rule.condition).map_err(StorageError::from)?;

        sqlx::query(
            "UPDATE triage_rules SET condition_json = ?, lane = ?, reason = ?, enabled = ?, \
             created_by = ?, hold_minutes = ? WHERE id = ?",
        )
        .bind(&condition_json)
        .bind(rule.lane.as_str())
        .bind(&rule.reason)
        .bind(rule.enabled)
        .bind(&rule.created_by)
        .bind(rule.hold_minutes)
        .bind(rule.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        Ok(rule)
    }

    async fn delete(&self, id: TriageRuleId) -> Result<bool, HearthError> {
        let result = sqlx::query("DELETE FROM triage_rules WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(result.rows_affected() > 0)
    }
}
