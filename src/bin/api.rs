use financial_analyst_agent::{
    agent::{adapter::ReasoningAdapter, Orchestrator},
    api::{start_server, AppState},
    reasoner::GeminiModel,
    session::SessionStore,
    tools::create_default_registry,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let gemini_api_key = std::env::var("GEMINI_API_KEY").unwrap_or_else(|_| {
        eprintln!("⚠️  GEMINI_API_KEY not set in .env");
        eprintln!("📌 Chat requests will fail until it is configured");
        String::new()
    });

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    let max_iterations: u32 = std::env::var("AGENT_MAX_TOOL_ITERATIONS")
        .unwrap_or_else(|_| "8".to_string())
        .parse()?;

    let reasoning_timeout_secs: u64 = std::env::var("AGENT_REASONING_TIMEOUT_SECS")
        .unwrap_or_else(|_| "60".to_string())
        .parse()?;

    info!("🚀 Financial Analyst Agent - API Server");
    info!("📍 Port: {}", api_port);

    // Create components
    let registry = Arc::new(create_default_registry()?);
    let sessions = Arc::new(SessionStore::new());
    let model = Arc::new(GeminiModel::new(gemini_api_key));
    let adapter = ReasoningAdapter::new(model).with_max_iterations(max_iterations);

    let orchestrator = Arc::new(
        Orchestrator::new(registry.clone(), adapter, sessions.clone())
            .with_reasoning_timeout(Duration::from_secs(reasoning_timeout_secs)),
    );

    info!("✅ Orchestrator initialized ({} tools)", registry.len());
    info!("📡 Starting API server...");

    let state = AppState {
        orchestrator,
        registry,
        sessions,
    };

    start_server(state, api_port).await?;

    Ok(())
}
