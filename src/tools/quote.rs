//! Simulated B3 stock quote lookup

use super::{round_to, FieldKind, FieldSpec, Tool, ToolFailure, ToolResult, ToolSpec};
use chrono::{Local, Timelike, Utc};
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};

/// symbol, company name, base price, max daily move
const QUOTES: &[(&str, &str, f64, f64)] = &[
    ("PETR4", "Petrobras PN", 38.50, 2.0),
    ("VALE3", "Vale ON", 62.30, 3.0),
    ("ITUB4", "Itaú Unibanco PN", 32.80, 1.5),
    ("BBDC4", "Bradesco PN", 12.45, 0.8),
    ("ABEV3", "Ambev ON", 11.20, 0.5),
    ("WEGE3", "WEG ON", 52.60, 2.5),
    ("MGLU3", "Magazine Luiza ON", 2.15, 0.3),
    ("B3SA3", "B3 ON", 10.85, 0.6),
];

#[derive(Deserialize)]
struct QuoteArgs {
    symbol: String,
}

pub struct StockQuoteTool;

#[async_trait::async_trait]
impl Tool for StockQuoteTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: "stock_quote",
            description: "Look up the current quote of a B3-listed stock by ticker symbol",
            schema: vec![FieldSpec::required(
                "symbol",
                FieldKind::String,
                "B3 ticker symbol, e.g. PETR4 or VALE3",
            )],
        }
    }

    async fn run(&self, arguments: Value) -> ToolResult {
        let args: QuoteArgs = serde_json::from_value(arguments)?;
        let symbol = args.symbol.trim().to_uppercase();

        let (symbol, name, base_price, max_move) = match QUOTES
            .iter()
            .find(|(ticker, ..)| *ticker == symbol)
        {
            Some(entry) => *entry,
            None => {
                return Err(ToolFailure::payload(json!({
                    "error": format!("symbol '{}' not found", symbol),
                    "available_symbols": QUOTES.iter().map(|(ticker, ..)| *ticker).collect::<Vec<_>>(),
                })));
            }
        };

        // One draw drives both the price and the day change so they agree.
        let delta = rand::thread_rng().gen_range(-max_move..=max_move);

        Ok(json!({
            "symbol": symbol,
            "name": name,
            "price": round_to(base_price + delta, 2),
            "currency": "BRL",
            "day_change_pct": round_to(delta / base_price * 100.0, 2),
            "market_status": market_status(),
            "quoted_at": Utc::now().to_rfc3339(),
        }))
    }
}

/// B3 trading window, simplified to local wall-clock hours.
fn market_status() -> &'static str {
    let hour = Local::now().hour();
    if (10..17).contains(&hour) {
        "open"
    } else {
        "closed"
    }
}
