//! # hearth-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve a small **JSON operator API**: automation and triage rule CRUD,
//!   device event ingest, batch flush, triage statistics and the activity feed
//! - Expose the agent bus as a **Server-Sent Events** stream
//!   (`/api/agent/stream`) so an agent process can follow fired automations
//!   and delivered events
//! - Map HTTP requests into application service calls (driving adapter)
//!
//! ## Dependency rule
//! Depends on `hearth-app` (for port traits and services) and `hearth-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod router;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;
