//! # hearth-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `AutomationRepository`: CRUD and due-queries for automations
//!   - `TriageRuleRepository`: CRUD for triage rules
//!   - `ActivityLog`: append & query the audit log
//!   - `AgentGateway`: hand automations and events to the agent
//! - Define **driving/inbound ports** as use-case structs:
//!   - `AutomationService`: the trigger store: create, update, toggle, mark fired
//!   - `TriageRuleService`: the rule store, with condition-keyed upserts
//!   - `StatsService`: triage statistics over a time window
//!   - `TriggerScheduler`: cron ticks and event-driven automations
//!   - `TriageEngine`: classify, debounce and dispatch device events
//!   - `BatchAccumulator`: buffer batched-lane events and flush them
//!   - `EventIngest`: the single entry point for device events
//! - Provide **in-process infrastructure** (agent bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `hearth-domain` only (plus `tokio::sync`/`tokio::time`).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod agent_bus;
pub mod batch;
pub mod device_state;
pub mod ingest;
pub mod ports;
pub mod scheduler;
pub mod services;
pub mod triage_engine;

#[cfg(test)]
pub(crate) mod testing;
