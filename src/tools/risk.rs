//! Credit risk tool wrapping the scoring engine

use super::{FieldKind, FieldSpec, Tool, ToolResult, ToolSpec};
use crate::risk::{self, RiskAssessmentInput};
use serde_json::{json, Value};

pub struct CreditRiskTool;

#[async_trait::async_trait]
impl Tool for CreditRiskTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "credit_risk",
            description: "Score the credit risk of an operation from its value, term, client score and income commitment",
            schema: vec![
                FieldSpec::required(
                    "operation_value",
                    FieldKind::Number,
                    "operation value in BRL",
                ),
                FieldSpec::required("term_months", FieldKind::Integer, "term in months"),
                FieldSpec::required(
                    "client_score",
                    FieldKind::Integer,
                    "client credit score, 0 to 1000",
                ),
                FieldSpec::required(
                    "commitment_ratio",
                    FieldKind::Number,
                    "fraction of income already committed, 0.0 to 1.0",
                ),
            ],
        }
    }

    async fn run(&self, arguments: Value) -> ToolResult {
        let input: RiskAssessmentInput = serde_json::from_value(arguments)?;
        let assessment = risk::assess(&input);

        let mut payload = serde_json::to_value(&assessment)?;
        if let Value::Object(map) = &mut payload {
            // Echo the operation parameters so the answer stands on its own,
            // and attach the input fingerprint for audit references.
            map.insert("operation_value".to_string(), json!(input.operation_value));
            map.insert("term_months".to_string(), json!(input.term_months));
            map.insert("audit_ref".to_string(), json!(risk::input_fingerprint(&input)));
        }

        Ok(payload)
    }
}
