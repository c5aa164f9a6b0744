//! Server-Sent Events (SSE) stream of agent work.

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use hearth_app::agent_bus::AgentMessage;
use hearth_app::ports::{ActivityLog, AutomationRepository, TriageRuleRepository};

use crate::state::AppState;

/// `GET /api/agent/stream`: fired automations and delivered events.
///
/// Each [`AgentMessage`] is sent as a JSON `data:` frame whose SSE event
/// name is the message type (`automation_fired`, `immediate`, `batch`).
/// Only messages published after the client connects are sent.
pub async fn stream<AR, RR, AL>(
    State(state): State<AppState<AR, RR, AL>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, std::convert::Infallible>>>
where
    AR: AutomationRepository + Send + Sync + 'static,
    RR: TriageRuleRepository + Send + Sync + 'static,
    AL: ActivityLog + Send + Sync + 'static,
{
    let messages = BroadcastStream::new(state.agent_bus.subscribe()).filter_map(|result| {
        match result {
            Ok(message) => to_sse_event(&message).map(Ok),
            Err(BroadcastStreamRecvError::Lagged(n)) => {
                tracing::warn!(skipped = n, "agent stream subscriber lagged, messages dropped");
                None
            }
        }
    });

    Sse::new(messages).keep_alive(KeepAlive::default())
}

fn to_sse_event(message: &AgentMessage) -> Option<Event> {
    match serde_json::to_string(message) {
        Ok(json) => Some(Event::default().event(message.name()).data(json)),
        Err(err) => {
            tracing::warn!(%err, "failed to serialize agent message for SSE stream");
            None
        }
    }
}
