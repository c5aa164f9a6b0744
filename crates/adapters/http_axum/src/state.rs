//! Shared application state for axum handlers.

use std::sync::Arc;

use hearth_app::agent_bus::InProcessAgentBus;
use hearth_app::batch::BatchAccumulator;
use hearth_app::ingest::EventIngest;
use hearth_app::ports::{ActivityLog, AutomationRepository, TriageRuleRepository};
use hearth_app::services::automation_service::AutomationService;
use hearth_app::services::stats_service::StatsService;
use hearth_app::services::triage_rule_service::TriageRuleService;

/// Agent gateway shared by the ingest path, the batch loop and the SSE stream.
pub type AgentBus = Arc<InProcessAgentBus>;

/// Event ingest wired to the in-process agent bus.
pub type Ingest<AR, RR, AL> = EventIngest<AR, RR, AgentBus, AL>;

/// Batch buffer wired to the in-process agent bus.
pub type Batch<AL> = BatchAccumulator<AgentBus, AL>;

/// Application state shared across all axum handlers.
///
/// Generic over the automation repository, the triage rule repository and
/// the activity log to avoid dynamic dispatch. `Clone` is implemented
/// manually so only the `Arc` wrappers are cloned.
pub struct AppState<AR, RR, AL> {
    pub automation_service: Arc<AutomationService<AR>>,
    pub rule_service: Arc<TriageRuleService<RR>>,
    pub stats_service: Arc<StatsService<AL>>,
    /// Read access to the activity feed.
    pub activity_log: Arc<AL>,
    pub ingest: Arc<Ingest<AR, RR, AL>>,
    /// Same buffer the background flush loop drains.
    pub batch: Arc<Batch<AL>>,
    pub agent_bus: AgentBus,
}

impl<AR, RR, AL> Clone for AppState<AR, RR, AL> {
    fn clone(&self) -> Self {
        Self {
            automation_service: Arc::clone(&self.automation_service),
            rule_service: Arc::clone(&self.rule_service),
            stats_service: Arc::clone(&self.stats_service),
            activity_log: Arc::clone(&self.activity_log),
            ingest: Arc::clone(&self.ingest),
            batch: Arc::clone(&self.batch),
            agent_bus: Arc::clone(&self.agent_bus),
        }
    }
}

impl<AR, RR, AL> AppState<AR, RR, AL>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    /// Create the state from pre-wrapped services.
    ///
    /// The ingest pipeline and batch buffer are shared with the background
    /// loops started by the daemon, so everything is taken as `Arc`.
    pub fn new(
        automation_service: Arc<AutomationService<AR>>,
        rule_service: Arc<TriageRuleService<RR>>,
        stats_service: Arc<StatsService<AL>>,
        activity_log: Arc<AL>,
        ingest: Arc<Ingest<AR, RR, AL>>,
        batch: Arc<Batch<AL>>,
        agent_bus: AgentBus,
    ) -> Self {
        Self {
            automation_service,
            rule_service,
            stats_service,
            activity_log,
            ingest,
            batch,
            agent_bus,
        }
    }
}
