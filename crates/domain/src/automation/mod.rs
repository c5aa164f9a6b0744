//! Automation: a trigger plus a free-text instruction for the agent.
//!
//! The instruction is opaque here; this module only decides *when* an
//! automation is due. Cron automations carry a `next_fire_at`, computed by
//! [`recurrence`], that is always in the future at the moment it is written.
//! Event-driven automations have no such instant.
//!
//! Lifecycle: created enabled or disabled; a recurring cron automation stays
//! enabled across fires, a one-shot (`once`) cron automation disables itself
//! after its first fire, and re-enabling reschedules from the current instant.

pub mod legacy;
pub mod recurrence;
mod trigger;

pub use trigger::{ThresholdOperator, Trigger, TriggerKind};

use chrono::TimeZone;
use serde::{Deserialize, Serialize};

use crate::error::{HearthError, ValidationError};
use crate::id::AutomationId;
use crate::time::Timestamp;

/// An autonomous task the agent performs when its trigger fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Automation {
    pub id: AutomationId,
    /// Human label.
    pub summary: String,
    /// Directive handed to the agent when the automation fires.
    pub instruction: String,
    pub trigger: Trigger,
    pub enabled: bool,
    pub created_at: Timestamp,
    pub last_fired_at: Option<Timestamp>,
    /// Set iff the trigger is [`Trigger::Cron`].
    pub next_fire_at: Option<Timestamp>,
    /// Conversation the automation originated from.
    pub channel: Option<String>,
}

/// Partial update of an [`Automation`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomationPatch {
    pub summary: Option<String>,
    pub instruction: Option<String>,
    pub trigger: Option<Trigger>,
    pub enabled: Option<bool>,
    pub channel: Option<String>,
}

impl Automation {
    /// Create a builder for constructing an [`Automation`].
    #[must_use]
    pub fn builder() -> AutomationBuilder {
        AutomationBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] when the summary or instruction is
    /// empty or the trigger is malformed.
    pub fn validate(&self) -> Result<(), HearthError> {
        if self.summary.trim().is_empty() {
            return Err(ValidationError::EmptySummary.into());
        }
        if self.instruction.trim().is_empty() {
            return Err(ValidationError::EmptyInstruction.into());
        }
        self.trigger.validate()?;
        Ok(())
    }

    /// Whether this automation should fire at `now`.
    #[must_use]
    pub fn is_due(&self, now: Timestamp) -> bool {
        self.enabled
            && matches!(self.trigger, Trigger::Cron { .. })
            && self.next_fire_at.is_some_and(|at| at <= now)
    }

    /// Recompute `next_fire_at` from `after`: the next occurrence for cron
    /// triggers, `None` for anything else.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] for a malformed cron expression.
    pub fn reschedule<Z: TimeZone>(&mut self, after: Timestamp, tz: &Z) -> Result<(), HearthError> {
        self.next_fire_at = match &self.trigger {
            Trigger::Cron { expression, .. } => {
                Some(recurrence::next_fire_after(expression, after, tz)?)
            }
            Trigger::DeviceEvent { .. } | Trigger::StateThreshold { .. } => None,
        };
        Ok(())
    }

    /// Record one fire at `now`.
    ///
    /// Recurring cron triggers move `next_fire_at` to the first occurrence
    /// after `now` (missed occurrences are skipped, not replayed); one-shot
    /// cron triggers become disabled and keep their last `next_fire_at`;
    /// event-driven triggers only update `last_fired_at`.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] for a malformed cron expression.
    pub fn mark_fired<Z: TimeZone>(&mut self, now: Timestamp, tz: &Z) -> Result<(), HearthError> {
        self.last_fired_at = Some(now);
        match &self.trigger {
            Trigger::Cron { once: true, .. } => self.enabled = false,
            Trigger::Cron { once: false, .. } => self.reschedule(now, tz)?,
            Trigger::DeviceEvent { .. } | Trigger::StateThreshold { .. } => {}
        }
        Ok(())
    }

    /// Enable or disable. Enabling reschedules from `now` so an instant that
    /// went stale while disabled never fires.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] for a malformed cron expression.
    pub fn set_enabled<Z: TimeZone>(
        &mut self,
        enabled: bool,
        now: Timestamp,
        tz: &Z,
    ) -> Result<(), HearthError> {
        if enabled && !self.enabled {
            self.reschedule(now, tz)?;
        }
        self.enabled = enabled;
        Ok(())
    }

    /// Apply a partial update, recomputing `next_fire_at` whenever the
    /// trigger changes.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if the result violates invariants.
    pub fn apply<Z: TimeZone>(
        &mut self,
        patch: AutomationPatch,
        now: Timestamp,
        tz: &Z,
    ) -> Result<(), HearthError> {
        if let Some(summary) = patch.summary {
            self.summary = summary;
        }
        if let Some(instruction) = patch.instruction {
            self.instruction = instruction;
        }
        if let Some(channel) = patch.channel {
            self.channel = Some(channel);
        }
        if let Some(trigger) = patch.trigger
            && trigger != self.trigger
        {
            self.trigger = trigger;
            self.reschedule(now, tz)?;
        }
        if let Some(enabled) = patch.enabled {
            self.set_enabled(enabled, now, tz)?;
        }
        self.validate()
    }
}

/// Step-by-step builder for [`Automation`].
#[derive(Debug, Default)]
pub struct AutomationBuilder {
    id: Option<AutomationId>,
    summary: Option<String>,
    instruction: Option<String>,
    trigger: Option<Trigger>,
    enabled: Option<bool>,
    created_at: Option<Timestamp>,
    channel: Option<String>,
}

impl AutomationBuilder {
    #[must_use]
    pub fn id(mut self, id: AutomationId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    #[must_use]
    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn created_at(mut self, ts: Timestamp) -> Self {
        self.created_at = Some(ts);
        self
    }

    #[must_use]
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    /// Consume the builder, validate, and return an [`Automation`].
    ///
    /// `next_fire_at` is left unset; the store computes it on create.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::Validation`] if required fields are missing or invalid.
    pub fn build(self) -> Result<Automation, HearthError> {
        let trigger = self.trigger.ok_or(ValidationError::MissingTrigger)?;
        let automation = Automation {
            id: self.id.unwrap_or_default(),
            summary: self.summary.unwrap_or_default(),
            instruction: self.instruction.unwrap_or_default(),
            trigger,
            enabled: self.enabled.unwrap_or(true),
            created_at: self.created_at.unwrap_or_else(crate::time::now),
            last_fired_at: None,
            next_fire_at: None,
            channel: self.channel,
        };
        automation.validate()?;
        Ok(automation)
    }
}
