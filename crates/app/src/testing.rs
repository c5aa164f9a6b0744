//! In-memory port implementations shared by the unit tests.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use hearth_domain::activity::{Activity, ActivityKind};
use hearth_domain::automation::{Automation, TriggerKind};
use hearth_domain::device_event::DeviceEvent;
use hearth_domain::error::HearthError;
use hearth_domain::id::{AutomationId, TriageRuleId};
use hearth_domain::time::Timestamp;
use hearth_domain::triage::TriageRule;

use crate::ports::{ActivityLog, AgentGateway, AutomationRepository, TriageRuleRepository};

// ── Automations ────────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryAutomationRepo {
    store: Mutex<HashMap<AutomationId, Automation>>,
}

impl InMemoryAutomationRepo {
    pub fn with(automations: Vec<Automation>) -> Self {
        Self {
            store: Mutex::new(automations.into_iter().map(|a| (a.id, a)).collect()),
        }
    }

    pub fn snapshot(&self, id: AutomationId) -> Option<Automation> {
        self.store.lock().unwrap().get(&id).cloned()
    }
}

impl AutomationRepository for InMemoryAutomationRepo {
    fn create(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, HearthError>> + Send {
        self.store
            .lock()
            .unwrap()
            .insert(automation.id, automation.clone());
        async { Ok(automation) }
    }

    fn get_by_id(
        &self,
        id: AutomationId,
    ) -> impl Future<Output = Result<Option<Automation>, HearthError>> + Send {
        let r = self.store.lock().unwrap().get(&id).cloned();
        async {
            // Reads suspend like a real database round-trip would.
            tokio::task::yield_now().await;
            Ok(r)
        }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<Automation>, HearthError>> + Send {
        let r: Vec<_> = self.store.lock().unwrap().values().cloned().collect();
        async { Ok(r) }
    }

    fn update(
        &self,
        automation: Automation,
    ) -> impl Future<Output = Result<Automation, HearthError>> + Send {
        self.store
            .lock()
            .unwrap()
            .insert(automation.id, automation.clone());
        async { Ok(automation) }
    }

    fn delete(&self, id: AutomationId) -> impl Future<Output = Result<bool, HearthError>> + Send {
        let removed = self.store.lock().unwrap().remove(&id).is_some();
        async move { Ok(removed) }
    }

    fn find_due_cron(
        &self,
        now: Timestamp,
    ) -> impl Future<Output = Result<Vec<Automation>, HearthError>> + Send {
        let r: Vec<_> = self
            .store
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.is_due(now))
            .cloned()
            .collect();
        async { Ok(r) }
    }

    fn find_enabled_by_kind(
        &self,
        kind: TriggerKind,
    ) -> impl Future<Output = Result<Vec<Automation>, HearthError>> + Send {
        let r: Vec<_> = self
            .store
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.enabled && a.trigger.kind() == kind)
            .cloned()
            .collect();
        async { Ok(r) }
    }
}

// ── Triage rules ───────────────────────────────────────────────

#[derive(Default)]
pub struct InMemoryRuleRepo {
    store: Mutex<Vec<TriageRule>>,
}

impl InMemoryRuleRepo {
    fn sorted(&self, enabled_only: bool) -> Vec<TriageRule> {
        let mut rules: Vec<_> = self
            .store
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !enabled_only || r.enabled)
            .cloned()
            .collect();
        rules.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rules
    }
}

impl TriageRuleRepository for InMemoryRuleRepo {
    fn create(
        &self,
        rule: TriageRule,
    ) -> impl Future<Output = Result<TriageRule, HearthError>> + Send {
        self.store.lock().unwrap().push(rule.clone());
        async { Ok(rule) }
    }

    fn get_by_id(
        &self,
        id: TriageRuleId,
    ) -> impl Future<Output = Result<Option<TriageRule>, HearthError>> + Send {
        let r = self.store.lock().unwrap().iter().find(|r| r.id == id).cloned();
        async { Ok(r) }
    }

    fn get_all(&self) -> impl Future<Output = Result<Vec<TriageRule>, HearthError>> + Send {
        let r = self.sorted(false);
        async {
            tokio::task::yield_now().await;
            Ok(r)
        }
    }

    fn get_enabled(&self) -> impl Future<Output = Result<Vec<TriageRule>, HearthError>> + Send {
        let r = self.sorted(true);
        async { Ok(r) }
    }

    fn update(
        &self,
        rule: TriageRule,
    ) -> impl Future<Output = Result<TriageRule, HearthError>> + Send {
        let mut store = self.store.lock().unwrap();
        if let Some(existing) = store.iter_mut().find(|r| r.id == rule.id) {
            *existing = rule.clone();
        }
        async { Ok(rule) }
    }

    fn delete(&self, id: TriageRuleId) -> impl Future<Output = Result<bool, HearthError>> + Send {
        let mut store = self.store.lock().unwrap();
        let before = store.len();
        store.retain(|r| r.id != id);
        let removed = store.len() != before;
        async move { Ok(removed) }
    }
}

// ── Activity log ───────────────────────────────────────────────

/// Can be switched to reject writes.
#[derive(Default)]
pub struct InMemoryActivityLog {
    entries: Mutex<Vec<Activity>>,
    failing: AtomicBool,
}

impl InMemoryActivityLog {
    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn of_kind(&self, kind: ActivityKind) -> Vec<Activity> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.kind == kind)
            .cloned()
            .collect()
    }
}

impl ActivityLog for InMemoryActivityLog {
    fn record(
        &self,
        activity: Activity,
    ) -> impl Future<Output = Result<Activity, HearthError>> + Send {
        let r = if self.failing.load(Ordering::SeqCst) {
            Err(HearthError::Storage("activity log unavailable".into()))
        } else {
            self.entries.lock().unwrap().push(activity.clone());
            Ok(activity)
        };
        async { r }
    }

    fn recent(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Activity>, HearthError>> + Send {
        let r: Vec<_> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect();
        async { Ok(r) }
    }

    fn by_kind_in_range(
        &self,
        kind: ActivityKind,
        from: Timestamp,
        to: Timestamp,
    ) -> impl Future<Output = Result<Vec<Activity>, HearthError>> + Send {
        let r: Vec<_> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.kind == kind && a.timestamp >= from && a.timestamp < to)
            .cloned()
            .collect();
        async { Ok(r) }
    }
}

// ── Agent ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Delivered {
    Fired(AutomationId),
    Immediate(String, String),
    Batch(usize),
}

/// Records every hand-over; can be switched to fail.
#[derive(Default)]
pub struct SpyGateway {
    delivered: Mutex<Vec<Delivered>>,
    failing: AtomicBool,
}

impl SpyGateway {
    pub fn delivered(&self) -> Vec<Delivered> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn fail(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn push(&self, delivered: Delivered) -> Result<(), HearthError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(HearthError::Delivery("agent unavailable".into()));
        }
        self.delivered.lock().unwrap().push(delivered);
        Ok(())
    }
}

impl AgentGateway for SpyGateway {
    fn fire(&self, automation: &Automation) -> impl Future<Output = Result<(), HearthError>> + Send {
        let r = self.push(Delivered::Fired(automation.id));
        async {
            tokio::task::yield_now().await;
            r
        }
    }

    fn deliver_immediate(
        &self,
        event: &DeviceEvent,
        reason: &str,
    ) -> impl Future<Output = Result<(), HearthError>> + Send {
        let r = self.push(Delivered::Immediate(
            event.device_id.clone(),
            reason.to_string(),
        ));
        async { r }
    }

    fn deliver_batch(
        &self,
        events: &[DeviceEvent],
    ) -> impl Future<Output = Result<(), HearthError>> + Send {
        let r = self.push(Delivered::Batch(events.len()));
        async { r }
    }
}
