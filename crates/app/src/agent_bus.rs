//! In-process agent bus backed by a tokio broadcast channel.
//!
//! The agent (and the SSE stream in the HTTP adapter) subscribe here to
//! receive fired automations and triaged events as [`AgentMessage`]s.

use std::future::Future;

use serde::Serialize;
use tokio::sync::broadcast;

use hearth_domain::automation::Automation;
use hearth_domain::device_event::DeviceEvent;
use hearth_domain::error::HearthError;
use hearth_domain::id::AutomationId;

use crate::ports::AgentGateway;

/// Work handed to the agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentMessage {
    AutomationFired {
        automation_id: AutomationId,
        summary: String,
        instruction: String,
        trigger: String,
        channel: Option<String>,
    },
    Immediate {
        event: DeviceEvent,
        reason: String,
    },
    Batch {
        events: Vec<DeviceEvent>,
        count: usize,
    },
}

impl AgentMessage {
    /// SSE event name for this message.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AutomationFired { .. } => "automation_fired",
            Self::Immediate { .. } => "immediate",
            Self::Batch { .. } => "batch",
        }
    }
}

/// In-process agent bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when no agent is subscribed (the message is
/// dropped and logged).
pub struct InProcessAgentBus {
    sender: broadcast::Sender<AgentMessage>,
}

impl InProcessAgentBus {
    /// Create a new bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to messages published *after* this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AgentMessage> {
        self.sender.subscribe()
    }

    fn publish(&self, message: AgentMessage) {
        let name = message.name();
        if self.sender.send(message).is_err() {
            tracing::debug!(message = name, "no agent subscribed, message dropped");
        }
    }
}

impl AgentGateway for InProcessAgentBus {
    fn fire(&self, automation: &Automation) -> impl Future<Output = Result<(), HearthError>> + Send {
        tracing::info!(
            automation_id = %automation.id,
            summary = %automation.summary,
            trigger = %automation.trigger,
            "firing automation"
        );
        self.publish(AgentMessage::AutomationFired {
            automation_id: automation.id,
            summary: automation.summary.clone(),
            instruction: automation.instruction.clone(),
            trigger: automation.trigger.to_string(),
            channel: automation.channel.clone(),
        });
        async { Ok(()) }
    }

    fn deliver_immediate(
        &self,
        event: &DeviceEvent,
        reason: &str,
    ) -> impl Future<Output = Result<(), HearthError>> + Send {
        tracing::info!(device_id = %event.device_id, event_type = %event.event_type, reason, "immediate delivery");
        self.publish(AgentMessage::Immediate {
            event: event.clone(),
            reason: reason.to_string(),
        });
        async { Ok(()) }
    }

    fn deliver_batch(
        &self,
        events: &[DeviceEvent],
    ) -> impl Future<Output = Result<(), HearthError>> + Send {
        tracing::info!(count = events.len(), "batch delivery");
        self.publish(AgentMessage::Batch {
            events: events.to_vec(),
            count: events.len(),
        });
        async { Ok(()) }
    }
}
