use financial_analyst_agent::{
    agent::{adapter::ReasoningAdapter, Orchestrator},
    models::{ModelReply, ToolCallRequest},
    reasoner::ScriptedModel,
    session::SessionStore,
    tools::create_default_registry,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Financial Analyst Agent demo starting");

    let registry = Arc::new(create_default_registry()?);
    let sessions = Arc::new(SessionStore::new());

    // Scripted replies drive the whole run offline: a quote lookup and a
    // credit assessment, each followed by a grounded answer.
    let model = Arc::new(ScriptedModel::new(vec![
        ModelReply::tool_calls(vec![ToolCallRequest {
            name: "stock_quote".to_string(),
            arguments: json!({ "symbol": "PETR4" }),
        }]),
        ModelReply::final_text("PETR4 is trading near R$ 38.50 on the simulated book."),
        ModelReply::tool_calls(vec![ToolCallRequest {
            name: "credit_risk".to_string(),
            arguments: json!({
                "operation_value": 50000.0,
                "term_months": 24,
                "client_score": 820,
                "commitment_ratio": 0.25,
            }),
        }]),
        ModelReply::final_text(
            "Risk score 20 (LOW): approve at the suggested 1.2% monthly rate.",
        ),
    ]));

    let adapter = ReasoningAdapter::new(model);
    let orchestrator = Orchestrator::new(registry, adapter, sessions.clone());

    let questions = [
        "How is PETR4 trading today?",
        "Score a 50k loan over 24 months for a client with score 820 committing 25% of income.",
    ];

    for question in questions {
        info!(question, "Sending message");

        let outcome = orchestrator.handle_message("demo", question).await?;

        println!("\n=== EXCHANGE ===");
        println!("Q: {}", question);
        println!("A: {}", outcome.response);
        println!("Tools: {:?}", outcome.tools_used);
    }

    let history = sessions.history("demo").await?;
    println!("\n=== SESSION HISTORY ({} turns) ===", history.len());
    for (i, turn) in history.iter().enumerate() {
        println!("  {}: [{}] {}", i + 1, turn.role, turn.content);
    }

    Ok(())
}
