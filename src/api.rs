//! REST API server for the financial analyst agent
//!
//! Exposes the conversational orchestrator plus direct tool endpoints that
//! bypass the reasoning loop.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::agent::Orchestrator;
use crate::error::AgentError;
use crate::models::ConversationTurn;
use crate::risk::RiskAssessmentInput;
use crate::session::SessionStore;
use crate::tools::ToolRegistry;

/// =============================
/// Request / Response Models
/// =============================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default = "default_session_id")]
    pub session_id: String,
}

fn default_session_id() -> String {
    "default".to_string()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub session_id: String,
    pub tools_used: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub message_count: usize,
}

#[derive(Debug, Serialize)]
pub struct SessionHistory {
    pub session_id: String,
    pub messages: Vec<ConversationTurn>,
}

/// Fields stay optional strings so extraction never rejects: the tool
/// schema is what names a missing or non-numeric field, with the same
/// per-field detail the chat path produces.
#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub value: Option<String>,
    pub from_currency: Option<String>,
    pub to_currency: Option<String>,
}

impl ConvertQuery {
    /// Rebuilds the raw argument object. A numeric `value` becomes a JSON
    /// number; anything else keeps its string form so the schema check can
    /// report the mismatch. Absent fields are simply omitted.
    fn into_arguments(self) -> Value {
        let mut arguments = serde_json::Map::new();
        if let Some(value) = self.value {
            let parsed = value
                .parse::<f64>()
                .map(Value::from)
                .unwrap_or(Value::String(value));
            arguments.insert("value".to_string(), parsed);
        }
        if let Some(from_currency) = self.from_currency {
            arguments.insert("from_currency".to_string(), Value::String(from_currency));
        }
        if let Some(to_currency) = self.to_currency {
            arguments.insert("to_currency".to_string(), Value::String(to_currency));
        }
        Value::Object(arguments)
    }
}

/// =============================
/// Error Mapping
/// =============================

/// HTTP rendering of an `AgentError`: 422 for rejected tool arguments, 404
/// for the not-found family, 500 for reasoning and everything else.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::InvalidArguments { ref tool, ref issues } => Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                body: json!({
                    "error": format!("invalid arguments for tool '{}'", tool),
                    "issues": issues,
                }),
            },
            AgentError::SessionNotFound(_)
            | AgentError::UnknownSession(_)
            | AgentError::UnknownTool(_) => Self {
                status: StatusCode::NOT_FOUND,
                body: json!({ "error": err.to_string() }),
            },
            _ => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: json!({ "error": err.to_string() }),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// =============================
/// API State
/// =============================

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub registry: Arc<ToolRegistry>,
    pub sessions: Arc<SessionStore>,
}

/// =============================
/// Service Endpoints
/// =============================

async fn root() -> Json<Value> {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "chat": "POST /chat",
            "tools": "GET /tools",
            "sessions": "GET /sessions",
            "history": "GET /sessions/:session_id/history",
            "delete_session": "DELETE /sessions/:session_id",
            "quote": "GET /quote/:symbol",
            "client": "GET /client/:cpf",
            "risk": "POST /risk",
            "convert": "GET /convert",
        }
    }))
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// =============================
/// Chat Endpoint
/// =============================

async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    info!(session_id = %req.session_id, "Received chat message");

    let outcome = state
        .orchestrator
        .handle_message(&req.session_id, &req.message)
        .await?;

    Ok(Json(ChatResponse {
        response: outcome.response,
        session_id: outcome.session_id,
        tools_used: outcome.tools_used,
    }))
}

/// =============================
/// Tool & Session Inspection
/// =============================

async fn list_tools(State(state): State<AppState>) -> Json<Vec<ToolInfo>> {
    let tools = state
        .registry
        .specs()
        .into_iter()
        .map(|spec| ToolInfo {
            name: spec.name.to_string(),
            description: spec.description.to_string(),
        })
        .collect();
    Json(tools)
}

async fn list_sessions(State(state): State<AppState>) -> Json<Vec<SessionInfo>> {
    let sessions = state
        .sessions
        .list()
        .await
        .into_iter()
        .map(|(session_id, message_count)| SessionInfo {
            session_id,
            message_count,
        })
        .collect();
    Json(sessions)
}

async fn session_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionHistory>, ApiError> {
    let messages = state.sessions.history(&session_id).await?;
    Ok(Json(SessionHistory {
        session_id,
        messages,
    }))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.sessions.delete(&session_id).await?;
    info!(session_id = %session_id, "Session deleted");
    Ok(Json(json!({
        "message": format!("session '{}' deleted", session_id)
    })))
}

/// =============================
/// Direct Tool Endpoints
/// =============================
///
/// These bypass the reasoning loop. Tool-level error payloads (unknown
/// symbol, unsupported currency) come back as 200 with the payload,
/// exactly as the reasoning model would see them; only argument validation
/// rejects the request.

async fn direct_quote(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let result = state
        .registry
        .invoke("stock_quote", json!({ "symbol": symbol }))
        .await?;
    Ok(Json(result.payload))
}

async fn direct_client(
    State(state): State<AppState>,
    Path(cpf): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let result = state
        .registry
        .invoke("client_profile", json!({ "cpf": cpf }))
        .await?;
    Ok(Json(result.payload))
}

async fn direct_risk(
    State(state): State<AppState>,
    Json(input): Json<RiskAssessmentInput>,
) -> Result<Json<Value>, ApiError> {
    let arguments = serde_json::to_value(&input).map_err(AgentError::from)?;
    let result = state.registry.invoke("credit_risk", arguments).await?;
    Ok(Json(result.payload))
}

async fn direct_convert(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
) -> Result<Json<Value>, ApiError> {
    let result = state
        .registry
        .invoke("currency_convert", query.into_arguments())
        .await?;
    Ok(Json(result.payload))
}

/// =============================
/// Router
/// =============================

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/chat", post(chat))
        .route("/tools", get(list_tools))
        .route("/sessions", get(list_sessions))
        .route("/sessions/:session_id/history", get(session_history))
        .route("/sessions/:session_id", delete(delete_session))
        .route("/quote/:symbol", get(direct_quote))
        .route("/client/:cpf", get(direct_client))
        .route("/risk", post(direct_risk))
        .route("/convert", get(direct_convert))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// =============================
/// Server Startup
/// =============================

pub async fn start_server(
    state: AppState,
    port: u16,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!("API Server listening on http://0.0.0.0:{}", port);
    info!("Local: http://127.0.0.1:{}", port);

    axum::serve(listener, router).await?;

    Ok(())
}
