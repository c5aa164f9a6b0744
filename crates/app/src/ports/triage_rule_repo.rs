//! Triage rule repository port: persistence for triage rules.

use std::future::Future;

use hearth_domain::error::HearthError;
use hearth_domain::id::TriageRuleId;
use hearth_domain::triage::TriageRule;

/// Repository for persisting and querying [`TriageRule`]s.
pub trait TriageRuleRepository {
    /// Create a new rule in storage.
    fn create(&self, rule: TriageRule)
    -> impl Future<Output = Result<TriageRule, HearthError>> + Send;

    /// Get a rule by its unique identifier.
    fn get_by_id(
        &self,
        id: TriageRuleId,
    ) -> impl Future<Output = Result<Option<TriageRule>, HearthError>> + Send;

    /// Get all rules, newest first.
    fn get_all(&self) -> impl Future<Output = Result<Vec<TriageRule>, HearthError>> + Send;

    /// Get enabled rules, newest first.
    fn get_enabled(&self) -> impl Future<Output = Result<Vec<TriageRule>, HearthError>> + Send;

    /// Overwrite an existing rule.
    fn update(&self, rule: TriageRule)
    -> impl Future<Output = Result<TriageRule, HearthError>> + Send;

    /// Delete a rule. Returns `false` if it did not exist.
    fn delete(&self, id: TriageRuleId) -> impl Future<Output = Result<bool, HearthError>> + Send;
}

impl<T: TriageRuleRepository + Send + Sync> TriageRuleRepository for std::sync::Arc<T> {
    fn create(
        &self,
        rule: TriageRule,
    ) -> impl Future<Output = Result<TriageRule, HearthError>> + Send {
        (**self).create(rule)
    }

    fn get_by_id(
        &self,
        id: TriageRuleId,
    ) -> impl Future<Output = Result<Option<TriageRule>, HearthError>> + Send {
        (**self).get_by_id(id)
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<TriageRule>, HearthError>> + Send {
        (**self).get_all()
    }

    fn get_enabled(&self) -> impl Future<Output = Result<Vec<TriageRule>, HearthError>> + Send {
        (**self).get_enabled()
    }

    fn update(
        &self,
        rule: TriageRule,
    ) -> impl Future<Output = Result<TriageRule, HearthError>> + Send {
        (**self).update(rule)
    }

    fn delete(&self, id: TriageRuleId) -> impl Future<Output = Result<bool, HearthError>> + Send {
        (**self).delete(id)
    }
}
