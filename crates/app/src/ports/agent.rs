//! Agent gateway port: the boundary to the reasoning agent.
//!
//! The agent itself is out of scope: this port only hands work over.
//! Delivery is at-least-once; the agent deduplicates.

use std::future::Future;

use hearth_domain::automation::Automation;
use hearth_domain::device_event::DeviceEvent;
use hearth_domain::error::HearthError;

/// Hands automations and triaged events to the agent.
pub trait AgentGateway {
    /// Hand a due or triggered automation to the agent.
    fn fire(&self, automation: &Automation) -> impl Future<Output = Result<(), HearthError>> + Send;

    /// Deliver one event on the immediate lane.
    fn deliver_immediate(
        &self,
        event: &DeviceEvent,
        reason: &str,
    ) -> impl Future<Output = Result<(), HearthError>> + Send;

    /// Deliver a flushed batch of events.
    fn deliver_batch(
        &self,
        events: &[DeviceEvent],
    ) -> impl Future<Output = Result<(), HearthError>> + Send;
}

impl<T: AgentGateway + Send + Sync> AgentGateway for std::sync::Arc<T> {
    fn fire(&self, automation: &Automation) -> impl Future<Output = Result<(), HearthError>> + Send {
        (**self).fire(automation)
    }

    fn deliver_immediate(
        &self,
        event: &DeviceEvent,
        reason: &str,
    ) -> impl Future<Output = Result<(), HearthError>> + Send {
        (**self).deliver_immediate(event, reason)
    }

    fn deliver_batch(
        &self,
        events: &[DeviceEvent],
    ) -> impl Future<Output = Result<(), HearthError>> + Send {
        (**self).deliver_batch(events)
    }
}
