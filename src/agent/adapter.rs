//! Reasoning engine adapter
//!
//! Wraps the reasoning model behind one bounded "advance the conversation"
//! operation. The model proposes tool calls; every call is dispatched through
//! the registry and its result, error or not, goes back into the scratchpad
//! as evidence. Only the iteration cap or a model failure can abort the loop.

use crate::error::AgentError;
use crate::models::{AgentMessage, Checkpoint, ToolCallRequest, ToolInvocationResult};
use crate::reasoner::ReasoningModel;
use crate::tools::ToolRegistry;
use crate::Result;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

const DEFAULT_MAX_TOOL_ITERATIONS: u32 = 8;

pub const SYSTEM_PROMPT: &str = r#"You are a financial analyst assistant for a Brazilian brokerage.

Guidelines:
- Answer in the user's language, clearly and objectively
- Use the available tools whenever the question involves stock quotes, client profiles, credit risk or currency conversion; never invent figures
- Ground every number you report in tool results from this conversation
- When a tool reports an error, explain the problem and point out the valid alternatives it lists
- For credit assessments, present the score, the classification and the factors behind them

Format: concise, structured answers suitable for financial decision-making."#;

/// What one advanced exchange produced: the final answer plus the ordered
/// names of every tool call dispatched along the way.
#[derive(Debug, Clone)]
pub struct AdvanceOutcome {
    pub final_text: String,
    pub tools_invoked: Vec<String>,
}

pub struct ReasoningAdapter {
    model: Arc<dyn ReasoningModel>,
    max_iterations: u32,
}

impl ReasoningAdapter {
    pub fn new(model: Arc<dyn ReasoningModel>) -> Self {
        Self {
            model,
            max_iterations: DEFAULT_MAX_TOOL_ITERATIONS,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations.max(1);
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Advance the conversation by one user message. The checkpoint is
    /// mutated in place; the caller decides whether to commit it.
    pub async fn advance(
        &self,
        checkpoint: &mut Checkpoint,
        user_message: &str,
        registry: &ToolRegistry,
    ) -> Result<AdvanceOutcome> {
        let specs = registry.specs();

        checkpoint.push(AgentMessage::User {
            content: user_message.to_string(),
        });

        let mut tools_invoked = Vec::new();

        for iteration in 0..self.max_iterations {
            let reply = self
                .model
                .converse(SYSTEM_PROMPT, checkpoint.messages(), &specs)
                .await?;

            if reply.is_final() {
                let final_text = reply.text.unwrap_or_default();
                checkpoint.push(AgentMessage::Assistant {
                    content: Some(final_text.clone()),
                    tool_calls: Vec::new(),
                });
                debug!(
                    iterations = iteration + 1,
                    tools = tools_invoked.len(),
                    "Reasoning complete"
                );
                return Ok(AdvanceOutcome {
                    final_text,
                    tools_invoked,
                });
            }

            checkpoint.push(AgentMessage::Assistant {
                content: reply.text.clone(),
                tool_calls: reply.tool_calls.clone(),
            });

            for call in reply.tool_calls {
                let result = self.dispatch(registry, call).await;
                tools_invoked.push(result.tool.clone());
                if result.is_error {
                    warn!(tool = %result.tool, "Tool call failed; error recorded as evidence");
                }
                checkpoint.push(AgentMessage::Tool(result));
            }
        }

        Err(AgentError::Reasoning(format!(
            "tool-call loop exceeded {} iterations without a final answer",
            self.max_iterations
        )))
    }

    /// Dispatch one tool call. Registry-level failures (unknown tool,
    /// invalid arguments) become error evidence like any computation
    /// failure; the loop itself never dies on a bad call.
    async fn dispatch(
        &self,
        registry: &ToolRegistry,
        call: ToolCallRequest,
    ) -> ToolInvocationResult {
        match registry.invoke(&call.name, call.arguments.clone()).await {
            Ok(result) => result,
            Err(AgentError::InvalidArguments { tool, issues }) => ToolInvocationResult::error(
                tool,
                call.arguments,
                json!({ "error": "invalid arguments", "issues": issues }),
            ),
            Err(err) => ToolInvocationResult::error(
                call.name,
                call.arguments,
                json!({ "error": err.to_string() }),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ModelReply;
    use crate::reasoner::ScriptedModel;
    use crate::tools::create_default_registry;

    fn call(name: &str, arguments: serde_json::Value) -> ToolCallRequest {
        ToolCallRequest {
            name: name.to_string(),
            arguments,
        }
    }

    #[tokio::test]
    async fn direct_answer_needs_no_tools() {
        let registry = create_default_registry().unwrap();
        let model = Arc::new(ScriptedModel::new(vec![ModelReply::final_text(
            "Diversification spreads risk across assets.",
        )]));
        let adapter = ReasoningAdapter::new(model.clone());

        let mut checkpoint = Checkpoint::new();
        let outcome = adapter
            .advance(&mut checkpoint, "what is diversification?", &registry)
            .await
            .unwrap();

        assert!(outcome.tools_invoked.is_empty());
        assert_eq!(outcome.final_text, "Diversification spreads risk across assets.");
        // user message + final assistant message
        assert_eq!(checkpoint.len(), 2);
        assert_eq!(model.calls(), 1);
    }

    #[tokio::test]
    async fn tool_results_feed_the_next_iteration() {
        let registry = create_default_registry().unwrap();
        let model = Arc::new(ScriptedModel::new(vec![
            ModelReply::tool_calls(vec![call("stock_quote", json!({ "symbol": "PETR4" }))]),
            ModelReply::final_text("PETR4 is trading around its base price."),
        ]));
        let adapter = ReasoningAdapter::new(model);

        let mut checkpoint = Checkpoint::new();
        let outcome = adapter
            .advance(&mut checkpoint, "how is PETR4 doing?", &registry)
            .await
            .unwrap();

        assert_eq!(outcome.tools_invoked, vec!["stock_quote"]);
        // user, assistant call, tool evidence, assistant final
        assert_eq!(checkpoint.len(), 4);

        match &checkpoint.messages()[2] {
            AgentMessage::Tool(result) => {
                assert!(!result.is_error);
                assert_eq!(result.payload["symbol"], "PETR4");
            }
            other => panic!("expected tool evidence, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn several_calls_in_one_reply_run_in_order() {
        let registry = create_default_registry().unwrap();
        let model = Arc::new(ScriptedModel::new(vec![
            ModelReply::tool_calls(vec![
                call("stock_quote", json!({ "symbol": "PETR4" })),
                call("stock_quote", json!({ "symbol": "VALE3" })),
            ]),
            ModelReply::final_text("Both quotes retrieved."),
        ]));
        let adapter = ReasoningAdapter::new(model);

        let mut checkpoint = Checkpoint::new();
        let outcome = adapter
            .advance(&mut checkpoint, "compare PETR4 and VALE3", &registry)
            .await
            .unwrap();

        assert_eq!(outcome.tools_invoked, vec!["stock_quote", "stock_quote"]);
        // user, assistant, two tool results, assistant final
        assert_eq!(checkpoint.len(), 5);
    }

    #[tokio::test]
    async fn tool_error_payload_does_not_kill_the_loop() {
        let registry = create_default_registry().unwrap();
        let model = Arc::new(ScriptedModel::new(vec![
            ModelReply::tool_calls(vec![call("stock_quote", json!({ "symbol": "XXXX9" }))]),
            ModelReply::final_text("That symbol does not exist; try PETR4 or VALE3."),
        ]));
        let adapter = ReasoningAdapter::new(model);

        let mut checkpoint = Checkpoint::new();
        let outcome = adapter
            .advance(&mut checkpoint, "quote XXXX9", &registry)
            .await
            .unwrap();

        assert_eq!(outcome.tools_invoked, vec!["stock_quote"]);
        match &checkpoint.messages()[2] {
            AgentMessage::Tool(result) => {
                assert!(result.is_error);
                assert!(result.payload["error"].as_str().unwrap().contains("XXXX9"));
            }
            other => panic!("expected tool evidence, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_tool_and_bad_arguments_become_evidence() {
        let registry = create_default_registry().unwrap();
        let model = Arc::new(ScriptedModel::new(vec![
            ModelReply::tool_calls(vec![call("crystal_ball", json!({}))]),
            ModelReply::tool_calls(vec![call("credit_risk", json!({ "operation_value": 1.0 }))]),
            ModelReply::final_text("I could not get the data I wanted."),
        ]));
        let adapter = ReasoningAdapter::new(model);

        let mut checkpoint = Checkpoint::new();
        let outcome = adapter
            .advance(&mut checkpoint, "read the future", &registry)
            .await
            .unwrap();

        assert_eq!(outcome.tools_invoked, vec!["crystal_ball", "credit_risk"]);

        match &checkpoint.messages()[2] {
            AgentMessage::Tool(result) => {
                assert!(result.is_error);
                assert!(result.payload["error"]
                    .as_str()
                    .unwrap()
                    .contains("crystal_ball"));
            }
            other => panic!("expected tool evidence, got {other:?}"),
        }
        match &checkpoint.messages()[4] {
            AgentMessage::Tool(result) => {
                assert!(result.is_error);
                let issues = result.payload["issues"].as_array().unwrap();
                assert!(issues
                    .iter()
                    .any(|issue| issue["field"] == "term_months"));
            }
            other => panic!("expected tool evidence, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn iteration_cap_surfaces_as_a_reasoning_error() {
        let registry = create_default_registry().unwrap();
        let model = Arc::new(ScriptedModel::new(vec![
            ModelReply::tool_calls(vec![call("stock_quote", json!({ "symbol": "PETR4" }))]),
            ModelReply::tool_calls(vec![call("stock_quote", json!({ "symbol": "VALE3" }))]),
            ModelReply::final_text("never reached"),
        ]));
        let adapter = ReasoningAdapter::new(model.clone()).with_max_iterations(2);

        let mut checkpoint = Checkpoint::new();
        let err = adapter
            .advance(&mut checkpoint, "loop forever", &registry)
            .await
            .unwrap_err();

        assert!(matches!(err, AgentError::Reasoning(msg) if msg.contains("2 iterations")));
        assert_eq!(model.calls(), 2);
    }

    #[test]
    fn iteration_cap_has_a_floor_of_one() {
        let model = Arc::new(ScriptedModel::new(vec![]));
        let adapter = ReasoningAdapter::new(model).with_max_iterations(0);
        assert_eq!(adapter.max_iterations(), 1);
    }
}
