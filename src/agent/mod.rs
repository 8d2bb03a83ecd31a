//! Message orchestrator - implements the per-message protocol
//!
//! RECEIVED → CONTEXT_LOADED → REASONING → HISTORY_APPENDED → RESPONDED
//! (or FAILED at any point before anything is committed)

pub mod adapter;

use crate::error::AgentError;
use crate::models::ConversationTurn;
use crate::session::SessionStore;
use crate::tools::ToolRegistry;
use crate::Result;
use adapter::ReasoningAdapter;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_REASONING_TIMEOUT: Duration = Duration::from_secs(60);

/// Phase of one message's journey through the orchestrator. Logged on every
/// transition so a stuck or failed exchange can be located from the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessagePhase {
    Received,
    ContextLoaded,
    Reasoning,
    HistoryAppended,
    Responded,
    Failed,
}

impl fmt::Display for MessagePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessagePhase::Received => "RECEIVED",
            MessagePhase::ContextLoaded => "CONTEXT_LOADED",
            MessagePhase::Reasoning => "REASONING",
            MessagePhase::HistoryAppended => "HISTORY_APPENDED",
            MessagePhase::Responded => "RESPONDED",
            MessagePhase::Failed => "FAILED",
        };
        write!(f, "{}", s)
    }
}

/// The grounded answer for one message.
#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub response: String,
    pub session_id: String,
    pub tools_used: Vec<String>,
}

/// Coordinates one message at a time per session: loads the session context,
/// advances the reasoning loop under a timeout, and commits the exchange
/// atomically on success. A failed exchange leaves the session exactly as it
/// was.
pub struct Orchestrator {
    registry: Arc<ToolRegistry>,
    adapter: ReasoningAdapter,
    sessions: Arc<SessionStore>,
    reasoning_timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        registry: Arc<ToolRegistry>,
        adapter: ReasoningAdapter,
        sessions: Arc<SessionStore>,
    ) -> Self {
        Self {
            registry,
            adapter,
            sessions,
            reasoning_timeout: DEFAULT_REASONING_TIMEOUT,
        }
    }

    pub fn with_reasoning_timeout(mut self, timeout: Duration) -> Self {
        self.reasoning_timeout = timeout;
        self
    }

    /// Handle one inbound message for a session.
    pub async fn handle_message(&self, session_id: &str, message: &str) -> Result<ChatOutcome> {
        let mut phase = MessagePhase::Received;
        info!(session_id, phase = %phase, "Message received");

        // Lazy creation; the gate serializes exchanges within this session
        // while other sessions proceed in parallel.
        let session = self.sessions.get_or_create(session_id).await;
        let _gate = session.begin_exchange().await;

        phase = MessagePhase::ContextLoaded;
        // Awaiting inside the macro would hold its formatting temporaries
        // across the suspend point and cost the future its Send bound.
        let turns = session.turn_count().await;
        debug!(session_id, phase = %phase, turns, "Session context loaded");

        // Work on a copy of the checkpoint; it is only committed on success.
        let mut checkpoint = session.checkpoint().await;

        phase = MessagePhase::Reasoning;
        debug!(session_id, phase = %phase, "Advancing conversation");

        let advanced = tokio::time::timeout(
            self.reasoning_timeout,
            self.adapter.advance(&mut checkpoint, message, &self.registry),
        )
        .await;

        let outcome = match advanced {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(err)) => {
                phase = MessagePhase::Failed;
                warn!(session_id, phase = %phase, error = %err, "Reasoning failed; nothing committed");
                return Err(err);
            }
            Err(_) => {
                phase = MessagePhase::Failed;
                warn!(session_id, phase = %phase, "Reasoning timed out; nothing committed");
                return Err(AgentError::Reasoning(format!(
                    "reasoning timed out after {}s",
                    self.reasoning_timeout.as_secs()
                )));
            }
        };

        session
            .commit_exchange(
                ConversationTurn::user(message),
                ConversationTurn::assistant(
                    outcome.final_text.clone(),
                    outcome.tools_invoked.clone(),
                ),
                checkpoint,
            )
            .await;

        phase = MessagePhase::HistoryAppended;
        debug!(session_id, phase = %phase, "Exchange committed");

        phase = MessagePhase::Responded;
        info!(
            session_id,
            phase = %phase,
            tools = outcome.tools_invoked.len(),
            "Responding"
        );

        Ok(ChatOutcome {
            response: outcome.final_text,
            session_id: session_id.to_string(),
            tools_used: outcome.tools_invoked,
        })
    }
}
