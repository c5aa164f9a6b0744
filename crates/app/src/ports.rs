//! Port definitions: traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the use-case layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod activity_log;
pub mod agent;
pub mod automation_repo;
pub mod triage_rule_repo;

pub use activity_log::ActivityLog;
pub use agent::AgentGateway;
pub use automation_repo::AutomationRepository;
pub use triage_rule_repo::TriageRuleRepository;
