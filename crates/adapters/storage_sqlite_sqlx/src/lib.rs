//! # hearth-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement the repository port traits defined in `hearth-app::ports`
//! - Manage `SQLite` connection pool lifecycle
//! - Run database migrations (using sqlx embedded migrations), then upgrade
//!   legacy schedule records to cron triggers
//! - Map between domain types and database rows
//!
//! ## Dependency rule
//! Depends on `hearth-app` (for port traits) and `hearth-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

mod activity_log;
mod automation_repo;
mod error;
mod legacy_migration;
mod pool;
mod timestamp;
mod triage_rule_repo;

pub use activity_log::SqliteActivityLog;
pub use automation_repo::SqliteAutomationRepository;
pub use error::StorageError;
pub use legacy_migration::{MigrationReport, upgrade_legacy_automations};
pub use pool::{Config, Database};
pub use triage_rule_repo::SqliteTriageRuleRepository;
