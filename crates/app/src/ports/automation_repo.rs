//! Automation repository port: persistence for automations.

use std::future::Future;

use hearth_domain::automation::{Automation, TriggerKind};
use hearth_domain::error::HearthError;
use hearth_domain::id::AutomationId;
use hearth_domain::time::Timestamp;

/// Repository for persisting and querying [`Automation`]s.
pub trait AutomationRepository {
    /// Create a new automation in storage.
    fn create(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, HearthError>> + Send;

    /// Get an automation by its unique identifier.
    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, HearthError>> + Send;

    /// Get all automations.
    fn get_all(&self) -> impl Future<Output = Result<Vec<Automation>, HearthError>> + Send;

    /// Overwrite an existing automation.
    fn update(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, HearthError>> + Send;

    /// Delete an automation. Returns `false` if it did not exist.
    fn delete(&self, id: AutomationId) -> impl Future<Output = Result<bool, HearthError>> + Send;

    /// Enabled cron automations whose `next_fire_at` is at or before `now`.
    fn find_due_cron(
        &self,
        now: Timestamp,
    ) -> impl Future<Output = Result<Vec<Automation>, HearthError>> + Send;

    /// Enabled automations whose trigger is of the given kind.
    fn find_enabled_by_kind(
        &self,
        kind: TriggerKind,
    ) -> impl Future<Output = Result<Vec<Automation>, HearthError>> + Send;
}

impl<T: AutomationRepository + Send + Sync> AutomationRepository for std::sync::Arc<T> {
    fn create(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, HearthError>> + Send {
        (**self).create(automation)
    }

    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, HearthError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Automation>, HearthError>> + Send {
        (**self).get_all()
    }

    fn update(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, HearthError>> + Send {
        (**self).update(automation)
    }

    fn delete(&self, id: AutomationId) -> impl Future<Output = Result<bool, HearthError>> + Send {
        (**self).delete(id)
    }

    fn find_due_cron(
        &self,
        now: Timestamp,
    ) -> impl Future<Output = Result<Vec<Automation>, HearthError>> + Send {
        (**self).find_due_cron(now)
    }

    fn find_enabled_by_kind(
        &self,
        kind: TriggerKind,
    ) -> impl Future<Output = Result<Vec<Automation>, HearthError>> + Send {
        (**self).find_enabled_by_kind(kind)
    }
}
