//! Tool trait and registry
//!
//! Tools are synchronous, side-effect-free computations over simulated
//! market and client data. Every tool declares an input schema; arguments
//! are validated against it before the computation runs, and computation
//! failures are absorbed into structured payloads so the reasoning model
//! always gets evidence back instead of an exception.

use crate::error::FieldIssue;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

mod client;
mod currency;
mod quote;
mod registry;
mod risk;

pub use client::ClientProfileTool;
pub use currency::CurrencyConvertTool;
pub use quote::StockQuoteTool;
pub use registry::ToolRegistry;
pub use risk::CreditRiskTool;

/// Outcome of one tool computation: a success payload, or a failure that
/// still carries a structured payload for the caller to read.
pub type ToolResult = std::result::Result<Value, ToolFailure>;

/// Trait for a single tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;
    async fn run(&self, arguments: Value) -> ToolResult;
}

//
// ================= Specs =================
//

/// Declared shape of a tool: its unique name, the description the reasoning
/// model uses to decide applicability, and the input schema.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub schema: Vec<FieldSpec>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub description: &'static str,
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: true,
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
            required: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    String,
    Number,
    Integer,
}

impl FieldKind {
    /// Integers are accepted where numbers are expected, never the reverse.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
            FieldKind::Integer => value.is_i64() || value.is_u64(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Integer => "integer",
        };
        write!(f, "{}", s)
    }
}

//
// ================= Failures =================
//

/// Computation-level failure. Carries the payload that gets embedded into
/// the invocation result with `is_error` set.
#[derive(Debug, Clone)]
pub struct ToolFailure {
    payload: Value,
}

impl ToolFailure {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            payload: json!({ "error": text.into() }),
        }
    }

    pub fn payload(payload: Value) -> Self {
        Self { payload }
    }

    pub fn into_payload(self) -> Value {
        self.payload
    }
}

impl From<serde_json::Error> for ToolFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::message(format!("argument deserialization failed: {}", err))
    }
}

//
// ================= Validation =================
//

/// Check arguments against a tool's declared schema. Missing required
/// fields, wrong kinds, and unexpected fields are all collected so the
/// caller sees every offending field at once.
pub fn validate_arguments(
    spec: &ToolSpec,
    arguments: &Value,
) -> std::result::Result<(), Vec<FieldIssue>> {
    let object = match arguments.as_object() {
        Some(object) => object,
        None => {
            return Err(vec![FieldIssue::new(
                "arguments",
                format!("expected a JSON object, got {}", json_type_name(arguments)),
            )]);
        }
    };

    let mut issues = Vec::new();

    for field in &spec.schema {
        match object.get(field.name) {
            None if field.required => {
                issues.push(FieldIssue::new(field.name, "missing required field"));
            }
            None => {}
            Some(value) if !field.kind.matches(value) => {
                issues.push(FieldIssue::new(
                    field.name,
                    format!("expected {}, got {}", field.kind, json_type_name(value)),
                ));
            }
            Some(_) => {}
        }
    }

    for key in object.keys() {
        if !spec.schema.iter().any(|field| field.name == key) {
            issues.push(FieldIssue::new(key.clone(), "unexpected field"));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Round half away from zero to a fixed number of decimals. The simulated
/// data tools quote prices to 2 decimals and rates to 4.
pub(crate) fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Create the default registry with the four simulated-data tools.
pub fn create_default_registry() -> crate::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();

    registry.register(Arc::new(StockQuoteTool))?;
    registry.register(Arc::new(ClientProfileTool))?;
    registry.register(Arc::new(CreditRiskTool))?;
    registry.register(Arc::new(CurrencyConvertTool))?;

    Ok(registry)
}
