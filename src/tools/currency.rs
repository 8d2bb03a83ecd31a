//! Simulated currency conversion via BRL pivot

use super::{round_to, FieldKind, FieldSpec, Tool, ToolFailure, ToolResult, ToolSpec};
use chrono::Utc;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};

const SUPPORTED: &[&str] = &["BRL", "EUR", "USD"];

#[derive(Deserialize)]
struct ConvertArgs {
    value: f64,
    from_currency: String,
    to_currency: String,
}

pub struct CurrencyConvertTool;

#[async_trait::async_trait]
impl Tool for CurrencyConvertTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "currency_convert",
            description: "Convert an amount between BRL, USD and EUR at the current simulated rate",
            schema: vec![
                FieldSpec::required("value", FieldKind::Number, "amount to convert"),
                FieldSpec::required(
                    "from_currency",
                    FieldKind::String,
                    "source currency code: BRL, USD or EUR",
                ),
                FieldSpec::required(
                    "to_currency",
                    FieldKind::String,
                    "target currency code: BRL, USD or EUR",
                ),
            ],
        }
    }

    async fn run(&self, arguments: Value) -> ToolResult {
        let args: ConvertArgs = serde_json::from_value(arguments)?;
        let from = args.from_currency.trim().to_uppercase();
        let to = args.to_currency.trim().to_uppercase();

        for code in [&from, &to] {
            if !SUPPORTED.contains(&code.as_str()) {
                return Err(ToolFailure::payload(json!({
                    "error": format!("currency '{}' not supported", code),
                    "supported_currencies": SUPPORTED,
                })));
            }
        }

        // Rates drawn once per invocation; both legs of the conversion see
        // the same snapshot.
        let mut rng = rand::thread_rng();
        let usd_brl = 5.45 + rng.gen_range(-0.1..=0.1);
        let eur_brl = 5.95 + rng.gen_range(-0.1..=0.1);

        let to_brl = |code: &str| match code {
            "USD" => usd_brl,
            "EUR" => eur_brl,
            _ => 1.0,
        };

        let value_in_brl = args.value * to_brl(&from);
        let converted = value_in_brl / to_brl(&to);

        Ok(json!({
            "value": args.value,
            "from_currency": from,
            "to_currency": to,
            "converted_value": round_to(converted, 2),
            "conversion_rate": round_to(to_brl(&from) / to_brl(&to), 4),
            "usd_brl_rate": round_to(usd_brl, 4),
            "eur_brl_rate": round_to(eur_brl, 4),
            "quoted_at": Utc::now().to_rfc3339(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn usd_to_brl_stays_within_the_rate_band() {
        let result = CurrencyConvertTool
            .run(json!({ "value": 100.0, "from_currency": "usd", "to_currency": "brl" }))
            .await
            .unwrap();

        assert_eq!(result["from_currency"], "USD");
        assert_eq!(result["to_currency"], "BRL");

        let converted = result["converted_value"].as_f64().unwrap();
        assert!((535.0..=555.0).contains(&converted), "converted {converted}");

        let rate = result["conversion_rate"].as_f64().unwrap();
        assert!((5.35..=5.55).contains(&rate));
    }

    #[tokio::test]
    async fn same_currency_conversion_is_identity() {
        let result = CurrencyConvertTool
            .run(json!({ "value": 42.0, "from_currency": "BRL", "to_currency": "BRL" }))
            .await
            .unwrap();

        assert_eq!(result["converted_value"], 42.0);
        assert_eq!(result["conversion_rate"], 1.0);
    }

    #[tokio::test]
    async fn unsupported_currency_lists_the_supported_codes() {
        let failure = CurrencyConvertTool
            .run(json!({ "value": 10.0, "from_currency": "GBP", "to_currency": "BRL" }))
            .await
            .unwrap_err();
        let payload = failure.into_payload();

        assert!(payload["error"].as_str().unwrap().contains("GBP"));
        assert_eq!(payload["supported_currencies"], json!(["BRL", "EUR", "USD"]));
    }

    #[tokio::test]
    async fn both_reference_rates_are_reported() {
        let result = CurrencyConvertTool
            .run(json!({ "value": 1.0, "from_currency": "EUR", "to_currency": "USD" }))
            .await
            .unwrap();

        let usd = result["usd_brl_rate"].as_f64().unwrap();
        let eur = result["eur_brl_rate"].as_f64().unwrap();
        assert!((5.35..=5.55).contains(&usd));
        assert!((5.85..=6.05).contains(&eur));
    }
}
