//! Triage rule service: the rule store.
//!
//! Rules are unique by condition: creating a rule whose condition equals an
//! existing one updates that rule in place. Read-modify-write operations
//! hold one write lock so two concurrent upserts of the same condition
//! cannot both insert.

use tokio::sync::Mutex;

use hearth_domain::error::{HearthError, NotFoundError};
use hearth_domain::id::TriageRuleId;
use hearth_domain::triage::{RulePatch, TriageRule};

use crate::ports::TriageRuleRepository;

/// Application service for triage rule CRUD.
pub struct TriageRuleService<R> {
    repo: R,
    writes: Mutex<()>,
}

impl<R: TriageRuleRepository> TriageRuleService<R> {
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            writes: Mutex::new(()),
        }
    }

    /// Create a rule, or update the existing rule with the same condition.
    ///
    /// On update the existing id and creation time are kept; lane, reason,
    /// author, hold window and enabled flag come from `rule`.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if invariants fail, or a storage
    /// error from the repository.
    #[tracing::instrument(skip(self, rule), fields(lane = %rule.lane, specificity = ?rule.condition.specificity()))]
    pub async fn upsert(&self, rule: TriageRule) -> Result<TriageRule, HearthError> {
        rule.validate()?;
        let _guard = self.writes.lock().await;
        let existing = self
            .repo
            .get_all()
            .await?
            .into_iter()
            .find(|r| r.condition == rule.condition);

        match existing {
            Some(existing) => {
                let merged = TriageRule {
                    id: existing.id,
                    created_at: existing.created_at,
                    ..rule
                };
                tracing::info!(id = %merged.id, "triage rule updated in place");
                self.repo.update(merged).await
            }
            None => {
                let created = self.repo.create(rule).await?;
                tracing::info!(id = %created.id, "triage rule created");
                Ok(created)
            }
        }
    }

    /// Look up a rule by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::NotFound`] when no rule with `id` exists,
    /// or a storage error from the repository.
    pub async fn get(&self, id: TriageRuleId) -> Result<TriageRule, HearthError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "TriageRule",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all rules, newest first.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list(&self) -> Result<Vec<TriageRule>, HearthError> {
        self.repo.get_all().await
    }

    /// Snapshot of the enabled rules, as seen by the classifier.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list_enabled(&self) -> Result<Vec<TriageRule>, HearthError> {
        self.repo.get_enabled().await
    }

    /// Apply a partial update. Returns `None` when `id` is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if the result violates invariants,
    /// or a storage error from the repository.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: TriageRuleId,
        patch: RulePatch,
    ) -> Result<Option<TriageRule>, HearthError> {
        let _guard = self.writes.lock().await;
        let Some(mut rule) = self.repo.get_by_id(id).await? else {
            return Ok(None);
        };
        rule.apply(patch)?;
        self.repo.update(rule).await.map(Some)
    }

    /// Enable or disable a rule. Returns `None` when `id` is unknown.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn set_enabled(
        &self,
        id: TriageRuleId,
        enabled: bool,
    ) -> Result<Option<TriageRule>, HearthError> {
        self.update(
            id,
            RulePatch {
                enabled: Some(enabled),
                ..RulePatch::default()
            },
        )
        .await
    }

    /// Remove a rule. Returns `false` when `id` is unknown.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, id: TriageRuleId) -> Result<bool, HearthError> {
        self.repo.delete(id).await
    }
}
