//! Reasoning model boundary
//!
//! The orchestration layer only ever talks to `ReasoningModel`: one call
//! that takes the system prompt, the scratchpad transcript and the tool
//! specs, and returns either final text or tool calls. `GeminiModel` is the
//! production implementation; `ScriptedModel` replays canned replies for
//! tests and the offline demo.

use crate::error::AgentError;
use crate::models::{AgentMessage, ModelReply};
use crate::tools::ToolSpec;
use crate::Result;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

mod gemini;

pub use gemini::GeminiModel;

#[async_trait::async_trait]
pub trait ReasoningModel: Send + Sync {
    async fn converse(
        &self,
        system_prompt: &str,
        transcript: &[AgentMessage],
        tools: &[ToolSpec],
    ) -> Result<ModelReply>;
}

/// Replays a fixed sequence of replies, one per `converse` call. Running
/// past the script is an error so a runaway loop shows up in tests instead
/// of looping forever.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<ModelReply>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: Vec<ModelReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `converse` calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ReasoningModel for ScriptedModel {
    async fn converse(
        &self,
        _system_prompt: &str,
        _transcript: &[AgentMessage],
        _tools: &[ToolSpec],
    ) -> Result<ModelReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| AgentError::Reasoning("scripted replies exhausted".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ToolCallRequest;
    use serde_json::json;

    #[tokio::test]
    async fn scripted_model_replays_in_order() {
        let model = ScriptedModel::new(vec![
            ModelReply::tool_calls(vec![ToolCallRequest {
                name: "stock_quote".to_string(),
                arguments: json!({ "symbol": "PETR4" }),
            }]),
            ModelReply::final_text("done"),
        ]);

        let first = model.converse("sys", &[], &[]).await.unwrap();
        assert_eq!(first.tool_calls.len(), 1);

        let second = model.converse("sys", &[], &[]).await.unwrap();
        assert_eq!(second.text.as_deref(), Some("done"));
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn exhausted_script_is_an_error() {
        let model = ScriptedModel::new(vec![]);
        let err = model.converse("sys", &[], &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::Reasoning(_)));
    }
}
