//! Gemini-backed reasoning model
//!
//! Uses a long-lived reqwest::Client for connection pooling. Tool specs are
//! declared to the API as function declarations; the model answers with
//! either text or functionCall parts, and tool results travel back as
//! functionResponse parts.

use super::ReasoningModel;
use crate::error::AgentError;
use crate::models::{AgentMessage, ModelReply, ToolCallRequest};
use crate::tools::ToolSpec;
use crate::Result;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info};

pub struct GeminiModel {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiModel {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            base_url: "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent".to_string(),
        }
    }

    fn build_request(
        system_prompt: &str,
        transcript: &[AgentMessage],
        tools: &[ToolSpec],
    ) -> GeminiRequest {
        GeminiRequest {
            contents: transcript.iter().map(content_for).collect(),
            tools: if tools.is_empty() {
                Vec::new()
            } else {
                vec![ToolDeclarations {
                    function_declarations: tools.iter().map(declaration_for).collect(),
                }]
            },
            system_instruction: SystemInstruction {
                parts: vec![Part::text(system_prompt)],
            },
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 1024,
            },
        }
    }

    fn parse_reply(response: GeminiResponse) -> Result<ModelReply> {
        let candidate = response
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Reasoning("no candidates in Gemini response".to_string()))?;

        let content = candidate.content.ok_or_else(|| {
            AgentError::Reasoning(format!(
                "Gemini returned no content (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            ))
        })?;

        let mut texts = Vec::new();
        let mut tool_calls = Vec::new();

        for part in content.parts {
            if let Some(text) = part.text {
                texts.push(text);
            }
            if let Some(call) = part.function_call {
                let arguments = if call.args.is_null() {
                    json!({})
                } else {
                    call.args
                };
                tool_calls.push(ToolCallRequest {
                    name: call.name,
                    arguments,
                });
            }
        }

        if texts.is_empty() && tool_calls.is_empty() {
            return Err(AgentError::Reasoning(
                "Gemini reply contained neither text nor function calls".to_string(),
            ));
        }

        Ok(ModelReply {
            text: if texts.is_empty() {
                None
            } else {
                Some(texts.join("\n"))
            },
            tool_calls,
        })
    }
}

#[async_trait::async_trait]
impl ReasoningModel for GeminiModel {
    async fn converse(
        &self,
        system_prompt: &str,
        transcript: &[AgentMessage],
        tools: &[ToolSpec],
    ) -> Result<ModelReply> {
        if self.api_key.is_empty() {
            return Err(AgentError::Reasoning(
                "GEMINI_API_KEY not configured".to_string(),
            ));
        }

        let url = format!("{}?key={}", self.base_url, self.api_key);
        let request = Self::build_request(system_prompt, transcript, tools);

        info!(turns = transcript.len(), "Calling Gemini API");

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response: {}", error_text);
            return Err(AgentError::Reasoning(format!(
                "Gemini API error: {}",
                error_text
            )));
        }

        let body: GeminiResponse = response.json().await?;
        Self::parse_reply(body)
    }
}

/// Map one scratchpad message to a wire content entry. Tool results travel
/// back with role "user" per the function-calling protocol.
fn content_for(message: &AgentMessage) -> Content {
    match message {
        AgentMessage::User { content } => Content {
            role: Some("user".to_string()),
            parts: vec![Part::text(content)],
        },
        AgentMessage::Assistant {
            content,
            tool_calls,
        } => {
            let mut parts = Vec::new();
            if let Some(text) = content {
                parts.push(Part::text(text));
            }
            for call in tool_calls {
                parts.push(Part::call(FunctionCall {
                    name: call.name.clone(),
                    args: call.arguments.clone(),
                }));
            }
            Content {
                role: Some("model".to_string()),
                parts,
            }
        }
        AgentMessage::Tool(result) => {
            // functionResponse.response must be an object.
            let response = if result.payload.is_object() {
                result.payload.clone()
            } else {
                json!({ "result": result.payload })
            };
            Content {
                role: Some("user".to_string()),
                parts: vec![Part::response(FunctionResponse {
                    name: result.tool.clone(),
                    response,
                })],
            }
        }
    }
}

fn declaration_for(spec: &ToolSpec) -> FunctionDeclaration {
    let mut properties = serde_json::Map::new();
    let mut required = Vec::new();

    for field in &spec.schema {
        properties.insert(
            field.name.to_string(),
            json!({
                "type": field.kind.to_string(),
                "description": field.description,
            }),
        );
        if field.required {
            required.push(field.name);
        }
    }

    FunctionDeclaration {
        name: spec.name.to_string(),
        description: spec.description.to_string(),
        parameters: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ToolDeclarations>,
    system_instruction: SystemInstruction,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolDeclarations {
    function_declarations: Vec<FunctionDeclaration>,
}

#[derive(Debug, Serialize)]
struct FunctionDeclaration {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_call: Option<FunctionCall>,
    #[serde(skip_serializing_if = "Option::is_none")]
    function_response: Option<FunctionResponse>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    fn call(call: FunctionCall) -> Self {
        Self {
            function_call: Some(call),
            ..Self::default()
        }
    }

    fn response(response: FunctionResponse) -> Self {
        Self {
            function_response: Some(response),
            ..Self::default()
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct FunctionResponse {
    name: String,
    response: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ToolInvocationResult;
    use crate::tools::{FieldKind, FieldSpec};

    fn quote_spec() -> ToolSpec {
        ToolSpec {
            name: "stock_quote",
            description: "Look up a quote",
            schema: vec![FieldSpec::required("symbol", FieldKind::String, "ticker")],
        }
    }

    #[test]
    fn request_declares_tools_with_required_fields() {
        let transcript = vec![AgentMessage::User {
            content: "quote PETR4".to_string(),
        }];
        let request = GeminiModel::build_request("be helpful", &transcript, &[quote_spec()]);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "be helpful");

        let declaration = &body["tools"][0]["functionDeclarations"][0];
        assert_eq!(declaration["name"], "stock_quote");
        assert_eq!(declaration["parameters"]["type"], "object");
        assert_eq!(
            declaration["parameters"]["properties"]["symbol"]["type"],
            "string"
        );
        assert_eq!(declaration["parameters"]["required"][0], "symbol");

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "quote PETR4");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn transcript_maps_calls_and_results_onto_wire_roles() {
        let transcript = vec![
            AgentMessage::User {
                content: "quote PETR4".to_string(),
            },
            AgentMessage::Assistant {
                content: None,
                tool_calls: vec![ToolCallRequest {
                    name: "stock_quote".to_string(),
                    arguments: json!({ "symbol": "PETR4" }),
                }],
            },
            AgentMessage::Tool(ToolInvocationResult::ok(
                "stock_quote",
                json!({ "symbol": "PETR4" }),
                json!({ "price": 38.5 }),
            )),
        ];

        let request = GeminiModel::build_request("sys", &transcript, &[]);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["contents"][1]["role"], "model");
        assert_eq!(
            body["contents"][1]["parts"][0]["functionCall"]["name"],
            "stock_quote"
        );
        assert_eq!(
            body["contents"][1]["parts"][0]["functionCall"]["args"]["symbol"],
            "PETR4"
        );

        assert_eq!(body["contents"][2]["role"], "user");
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["name"],
            "stock_quote"
        );
        assert_eq!(
            body["contents"][2]["parts"][0]["functionResponse"]["response"]["price"],
            38.5
        );
        // No declarations block when no tools are offered.
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn non_object_tool_payload_is_wrapped() {
        let transcript = vec![AgentMessage::Tool(ToolInvocationResult::ok(
            "stock_quote",
            json!({ "symbol": "PETR4" }),
            json!("plain string"),
        ))];
        let request = GeminiModel::build_request("sys", &transcript, &[]);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(
            body["contents"][0]["parts"][0]["functionResponse"]["response"]["result"],
            "plain string"
        );
    }

    #[test]
    fn function_call_reply_is_parsed_into_tool_calls() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [{
                        "functionCall": {
                            "name": "credit_risk",
                            "args": { "operation_value": 50000.0, "term_months": 24 }
                        }
                    }]
                },
                "finishReason": "STOP"
            }]
        });

        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let reply = GeminiModel::parse_reply(response).unwrap();

        assert!(reply.text.is_none());
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].name, "credit_risk");
        assert_eq!(reply.tool_calls[0].arguments["term_months"], 24);
    }

    #[test]
    fn text_reply_is_final() {
        let raw = json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "All done." }] },
                "finishReason": "STOP"
            }]
        });

        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let reply = GeminiModel::parse_reply(response).unwrap();

        assert!(reply.is_final());
        assert_eq!(reply.text.as_deref(), Some("All done."));
    }

    #[test]
    fn call_with_null_args_defaults_to_empty_object() {
        let raw = json!({
            "candidates": [{
                "content": {
                    "parts": [{ "functionCall": { "name": "stock_quote" } }]
                }
            }]
        });

        let response: GeminiResponse = serde_json::from_value(raw).unwrap();
        let reply = GeminiModel::parse_reply(response).unwrap();
        assert_eq!(reply.tool_calls[0].arguments, json!({}));
    }

    #[test]
    fn empty_candidates_are_a_reasoning_error() {
        let response: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        let err = GeminiModel::parse_reply(response).unwrap_err();
        assert!(matches!(err, AgentError::Reasoning(_)));
    }
}
