//! Core data models for the financial analyst agent

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

//
// ================= Conversation Turns =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One recorded message in a session's visible history. Immutable once
/// appended to the session store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub turn_id: Uuid,
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools_invoked: Vec<String>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            turn_id: Uuid::new_v4(),
            role: TurnRole::User,
            content: content.into(),
            timestamp: Utc::now(),
            tools_invoked: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>, tools_invoked: Vec<String>) -> Self {
        Self {
            turn_id: Uuid::new_v4(),
            role: TurnRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            tools_invoked,
        }
    }
}

//
// ================= Tool I/O =================
//

/// A tool invocation requested by the reasoning model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCallRequest {
    pub name: String,
    pub arguments: Value,
}

/// Outcome of dispatching one tool call. Failures are carried as structured
/// payloads with `is_error` set, never as propagated errors, so the
/// reasoning model always receives evidence it can read back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocationResult {
    pub tool: String,
    pub arguments: Value,
    pub payload: Value,
    pub is_error: bool,
}

impl ToolInvocationResult {
    pub fn ok(tool: impl Into<String>, arguments: Value, payload: Value) -> Self {
        Self {
            tool: tool.into(),
            arguments,
            payload,
            is_error: false,
        }
    }

    pub fn error(tool: impl Into<String>, arguments: Value, payload: Value) -> Self {
        Self {
            tool: tool.into(),
            arguments,
            payload,
            is_error: true,
        }
    }
}

//
// ================= Reasoning Scratchpad =================
//

/// One entry in the reasoning scratchpad: richer than a visible turn because
/// it keeps tool calls and tool results the model needs to resume from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AgentMessage {
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCallRequest>,
    },
    Tool(ToolInvocationResult),
}

impl AgentMessage {
    /// Rough token estimate: ~4 characters per token.
    pub fn approx_tokens(&self) -> usize {
        let chars = match self {
            AgentMessage::User { content } => content.len(),
            AgentMessage::Assistant {
                content,
                tool_calls,
            } => {
                content.as_deref().map_or(0, str::len)
                    + tool_calls
                        .iter()
                        .map(|call| call.name.len() + call.arguments.to_string().len())
                        .sum::<usize>()
            }
            AgentMessage::Tool(result) => result.payload.to_string().len(),
        };
        (chars + 3) / 4
    }
}

/// Opaque reasoning checkpoint carried across the turns of one session.
/// Oldest entries are dropped once the approximate token budget overflows,
/// so a long-lived session never grows the model context without bound.
/// Trimming always re-anchors the window on a user message, keeping tool
/// calls next to their results.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    messages: Vec<AgentMessage>,
}

impl Checkpoint {
    pub const MAX_CONTEXT_TOKENS: usize = 12_000;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: AgentMessage) {
        self.messages.push(message);
        // Keep at least the newest message even if it alone busts the budget.
        while self.approx_tokens() > Self::MAX_CONTEXT_TOKENS && self.messages.len() > 1 {
            self.messages.remove(0);
        }
        // The window must restart at a user message: a tool result or a
        // tool-calling reply at the head has lost its pair, and the model
        // rejects transcripts that open mid-exchange.
        while self.messages.len() > 1
            && !matches!(self.messages[0], AgentMessage::User { .. })
        {
            self.messages.remove(0);
        }
    }

    pub fn messages(&self) -> &[AgentMessage] {
        &self.messages
    }

    pub fn approx_tokens(&self) -> usize {
        self.messages.iter().map(AgentMessage::approx_tokens).sum()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

//
// ================= Model Replies =================
//

/// What the reasoning model produced for one loop step: either final text,
/// or one or more tool calls to dispatch (or both, when the model narrates
/// while calling).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

impl ModelReply {
    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_calls(calls: Vec<ToolCallRequest>) -> Self {
        Self {
            text: None,
            tool_calls: calls,
        }
    }

    pub fn is_final(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        };
        write!(f, "{}", s)
    }
}
