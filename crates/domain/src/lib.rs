//! # hearth-domain
//!
//! Pure domain model for the hearth home assistant: *when does the agent
//! wake up, and why*.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define **Automations** (a trigger plus a free-text instruction for the agent)
//!   and compute their next fire instant (cron and legacy tuple schedules)
//! - Define **Device events** as delivered by device adapters
//! - Define **Triage rules** and classify device events into delivery lanes
//! - Define **Activities** (the append-only audit log) and the statistics
//!   rolled up from it
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod activity;
pub mod automation;
pub mod device_event;
pub mod triage;
