//! Automation service: the trigger store.
//!
//! Owns every mutation of an [`Automation`]: `next_fire_at` is computed here
//! (in the configured time zone) on create, on trigger change, on
//! re-enable and on every fire. Read-modify-write operations hold one
//! write lock, so the scheduler marking a fire and an operator toggling the
//! same automation never overwrite each other.

use chrono_tz::Tz;
use tokio::sync::Mutex;

use hearth_domain::automation::{Automation, AutomationPatch, TriggerKind};
use hearth_domain::error::{HearthError, NotFoundError};
use hearth_domain::id::AutomationId;
use hearth_domain::time::Timestamp;

use crate::ports::AutomationRepository;

/// Application service for automation CRUD and lifecycle operations.
///
/// The scheduler and the HTTP adapter share one instance so they share the
/// write lock.
pub struct AutomationService<R> {
    repo: R,
    tz: Tz,
    writes: Mutex<()>,
}

impl<R: AutomationRepository> AutomationService<R> {
    /// Create a new service backed by the given repository. Cron expressions
    /// are evaluated in `tz`.
    pub fn new(repo: R, tz: Tz) -> Self {
        Self {
            repo,
            tz,
            writes: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Validate, schedule and persist a new automation.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if invariants fail (including a
    /// malformed cron expression), or a storage error from the repository.
    #[tracing::instrument(skip(self, automation), fields(summary = %automation.summary, trigger = %automation.trigger))]
    pub async fn create(
        &self,
        mut automation: Automation,
        now: Timestamp,
    ) -> Result<Automation, HearthError> {
        automation.validate()?;
        automation.reschedule(now, &self.tz)?;
        let created = self.repo.create(automation).await?;
        tracing::info!(id = %created.id, next_fire_at = ?created.next_fire_at, "automation created");
        Ok(created)
    }

    /// Look up an automation by id, returning an error if not found.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::NotFound`] when no automation with `id` exists,
    /// or a storage error from the repository.
    pub async fn get(&self, id: AutomationId) -> Result<Automation, HearthError> {
        self.repo.get_by_id(id).await?.ok_or_else(|| {
            NotFoundError {
                entity: "Automation",
                id: id.to_string(),
            }
            .into()
        })
    }

    /// List all automations.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn list(&self) -> Result<Vec<Automation>, HearthError> {
        let mut all = self.repo.get_all().await?;
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    /// Apply a partial update. Returns `None` when `id` is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if the result violates invariants,
    /// or a storage error from the repository. Nothing is persisted on error.
    #[tracing::instrument(skip(self, patch))]
    pub async fn update(
        &self,
        id: AutomationId,
        patch: AutomationPatch,
        now: Timestamp,
    ) -> Result<Option<Automation>, HearthError> {
        let _guard = self.writes.lock().await;
        let Some(mut automation) = self.repo.get_by_id(id).await? else {
            return Ok(None);
        };
        automation.apply(patch, now, &self.tz)?;
        self.repo.update(automation).await.map(Some)
    }

    /// Enable or disable. Returns `None` when `id` is unknown.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn set_enabled(
        &self,
        id: AutomationId,
        enabled: bool,
        now: Timestamp,
    ) -> Result<Option<Automation>, HearthError> {
        let _guard = self.writes.lock().await;
        let Some(mut automation) = self.repo.get_by_id(id).await? else {
            return Ok(None);
        };
        automation.set_enabled(enabled, now, &self.tz)?;
        self.repo.update(automation).await.map(Some)
    }

    /// Remove an automation. Returns `false` when `id` is unknown.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn remove(&self, id: AutomationId) -> Result<bool, HearthError> {
        let _guard = self.writes.lock().await;
        self.repo.delete(id).await
    }

    /// Enabled cron automations due at `now`.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn due_cron(&self, now: Timestamp) -> Result<Vec<Automation>, HearthError> {
        self.repo.find_due_cron(now).await
    }

    /// All enabled device-event automations.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn device_event_automations(&self) -> Result<Vec<Automation>, HearthError> {
        self.repo.find_enabled_by_kind(TriggerKind::DeviceEvent).await
    }

    /// All enabled state-threshold automations.
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    pub async fn state_threshold_automations(&self) -> Result<Vec<Automation>, HearthError> {
        self.repo
            .find_enabled_by_kind(TriggerKind::StateThreshold)
            .await
    }

    /// Record one fire at `now`. Returns `None` when `id` is unknown (for
    /// instance removed while it was being fired).
    ///
    /// # Errors
    ///
    /// Returns a storage error propagated from the repository.
    #[tracing::instrument(skip(self))]
    pub async fn mark_fired(
        &self,
        id: AutomationId,
        now: Timestamp,
    ) -> Result<Option<Automation>, HearthError> {
        let _guard = self.writes.lock().await;
        let Some(mut automation) = self.repo.get_by_id(id).await? else {
            return Ok(None);
        };
        automation.mark_fired(now, &self.tz)?;
        let saved = self.repo.update(automation).await?;
        tracing::debug!(
            enabled = saved.enabled,
            next_fire_at = ?saved.next_fire_at,
            "automation marked fired"
        );
        Ok(Some(saved))
    }
}
