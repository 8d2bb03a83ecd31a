//! Simulated client profile lookup

use super::{FieldKind, FieldSpec, Tool, ToolFailure, ToolResult, ToolSpec};
use serde::Deserialize;
use serde_json::{json, Value};

struct ClientRecord {
    cpf: &'static str,
    name: &'static str,
    credit_score: i64,
    monthly_income: f64,
    income_commitment: f64,
    account_age_years: u32,
    late_payments: u32,
    investor_profile: &'static str,
}

const CLIENTS: &[ClientRecord] = &[
    ClientRecord {
        cpf: "12345678900",
        name: "Maria Silva",
        credit_score: 820,
        monthly_income: 15000.0,
        income_commitment: 0.25,
        account_age_years: 8,
        late_payments: 0,
        investor_profile: "Moderado",
    },
    ClientRecord {
        cpf: "98765432100",
        name: "João Santos",
        credit_score: 650,
        monthly_income: 5500.0,
        income_commitment: 0.45,
        account_age_years: 2,
        late_payments: 3,
        investor_profile: "Conservador",
    },
    ClientRecord {
        cpf: "11122233344",
        name: "Ana Oliveira",
        credit_score: 750,
        monthly_income: 25000.0,
        income_commitment: 0.15,
        account_age_years: 12,
        late_payments: 1,
        investor_profile: "Arrojado",
    },
];

#[derive(Deserialize)]
struct ClientArgs {
    cpf: String,
}

/// Strip the usual CPF formatting so "123.456.789-00" and "12345678900"
/// resolve to the same record.
fn normalize_cpf(cpf: &str) -> String {
    cpf.chars()
        .filter(|c| !matches!(c, '.' | '-' | ' '))
        .collect()
}

pub struct ClientProfileTool;

#[async_trait::async_trait]
impl Tool for ClientProfileTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "client_profile",
            description: "Look up a client's registration and credit profile by CPF",
            schema: vec![FieldSpec::required(
                "cpf",
                FieldKind::String,
                "client CPF, with or without formatting",
            )],
        }
    }

    async fn run(&self, arguments: Value) -> ToolResult {
        let args: ClientArgs = serde_json::from_value(arguments)?;
        let cpf = normalize_cpf(&args.cpf);

        let record = match CLIENTS.iter().find(|record| record.cpf == cpf) {
            Some(record) => record,
            None => {
                return Err(ToolFailure::payload(json!({
                    "error": format!("client with CPF '{}' not found", cpf),
                    "hint": "check that the CPF digits are correct",
                })));
            }
        };

        Ok(json!({
            "cpf": record.cpf,
            "name": record.name,
            "credit_score": record.credit_score,
            "monthly_income": record.monthly_income,
            "income_commitment": record.income_commitment,
            "account_age_years": record.account_age_years,
            "late_payments": record.late_payments,
            "investor_profile": record.investor_profile,
        }))
    }
}
