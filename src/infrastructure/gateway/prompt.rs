// src/infrastructure/gateway/prompt.rs
// Prompt and response schema for the remote compute service

use serde_json::{json, Value};

use crate::application::dto::{Content, GenerateContentRequest, GenerationConfig, Part};
use crate::domain::models::StrategyInput;

const STRATEGY_FIELDS: &[&str] = &[
    "vix_percent",
    "vix_timestamp",
    "vix_source",
    "nifty_price",
    "nifty_timestamp",
    "nifty_source",
    "anchor_price",
    "candle_data_source",
    "expected_move_percent",
    "expected_move_percent_sqrt",
    "expected_move_points",
    "expected_move_points_sqrt",
    "resistance",
    "support",
    "resistance_sqrt",
    "support_sqrt",
    "trade_recommendation",
    "staleness_warning",
    "check_timestamp",
    "notes",
];

const RECOMMENDATION_FIELDS: &[&str] = &[
    "side",
    "entry_price",
    "stop_loss",
    "target_1",
    "target_2",
    "risk_points",
    "risk_percent_of_nifty",
    "trade_confidence",
    "reasoning",
];

pub fn build_prompt(input: &StrategyInput) -> String {
    let vix = input.volatility_percent;
    let nifty = input.index_price;
    let base = input.level_base();
    let (base_line, anchor) = match input.anchor_price {
        Some(anchor) => (format!("- Level anchor price: {}\n", anchor), anchor.to_string()),
        None => (String::new(), "null".to_string()),
    };

    format!(
        r#"You compute the "India VIX based intraday range for NIFTY" strategy.
Return only the JSON object described by the response schema, with no prose or markdown.

Inputs:
- India VIX: {vix}%
- NIFTY 50 price: {nifty}
{base_line}
Calculations (B = {base}):
1. Method A: expected_move_percent = {vix} / 15; expected_move_points = round(expected_move_percent / 100 * B).
2. Method B: expected_move_percent_sqrt = {vix} / 5.477225575; expected_move_points_sqrt = round(expected_move_percent_sqrt / 100 * B).
3. Levels: resistance = round(B) + expected_move_points, support = round(B) - expected_move_points;
   resistance_sqrt and support_sqrt likewise with the Method B points.
4. Trade recommendation from the Method A levels, with daily range = resistance - support:
   - LONG when {nifty} is within 10% of the daily range of support, entry_price = support.
   - SHORT when {nifty} is within 10% of the daily range of resistance, entry_price = resistance.
   - Otherwise NO_TRADE, with entry_price, stop_loss, target_1, target_2, risk_points and risk_percent_of_nifty all null.
   - stop offset = max(min(0.25 * expected_move_points, 0.005 * {nifty}), 2); stop_loss = entry_price -/+ offset (LONG/SHORT), rounded.
   - target_1 = entry_price +/- round(0.5 * expected_move_points); target_2 = entry_price +/- expected_move_points.
   - risk_points = abs(entry_price - stop_loss); risk_percent_of_nifty = risk_points / {nifty} * 100, two decimals.
   - trade_confidence: distance to the level divided by the daily range; HIGH up to 3%, MEDIUM up to 6%, LOW otherwise. NO_TRADE is LOW.
   - reasoning: one sentence explaining the recommendation.
5. Metadata: vix_timestamp, nifty_timestamp and check_timestamp are the current RFC 3339 UTC time;
   vix_percent is {vix}; nifty_price is {nifty}; anchor_price is {anchor};
   vix_source and nifty_source are "{source}"; candle_data_source is "none"; staleness_warning is false;
   notes summarise how the figures were obtained.
"#,
        vix = vix,
        nifty = nifty,
        base = base,
        base_line = base_line,
        anchor = anchor,
        source = input.source,
    )
}

/// Strict structured-output schema of a strategy answer.
pub fn response_schema() -> Value {
    let nullable_integer = json!({ "type": "INTEGER", "nullable": true });

    json!({
        "type": "OBJECT",
        "properties": {
            "vix_percent": { "type": "NUMBER" },
            "vix_timestamp": { "type": "STRING" },
            "vix_source": { "type": "STRING" },
            "nifty_price": { "type": "NUMBER" },
            "nifty_timestamp": { "type": "STRING" },
            "nifty_source": { "type": "STRING" },
            "anchor_price": { "type": "NUMBER", "nullable": true },
            "candle_data_source": { "type": "STRING" },
            "expected_move_percent": { "type": "NUMBER" },
            "expected_move_percent_sqrt": { "type": "NUMBER" },
            "expected_move_points": { "type": "INTEGER" },
            "expected_move_points_sqrt": { "type": "INTEGER" },
            "resistance": { "type": "INTEGER" },
            "support": { "type": "INTEGER" },
            "resistance_sqrt": { "type": "INTEGER" },
            "support_sqrt": { "type": "INTEGER" },
            "trade_recommendation": {
                "type": "OBJECT",
                "properties": {
                    "side": { "type": "STRING", "enum": ["LONG", "SHORT", "NO_TRADE"] },
                    "entry_price": nullable_integer,
                    "stop_loss": nullable_integer,
                    "target_1": nullable_integer,
                    "target_2": nullable_integer,
                    "risk_points": nullable_integer,
                    "risk_percent_of_nifty": { "type": "NUMBER", "nullable": true },
                    "trade_confidence": { "type": "STRING", "enum": ["HIGH", "MEDIUM", "LOW"] },
                    "reasoning": { "type": "STRING" }
                },
                "required": RECOMMENDATION_FIELDS
            },
            "staleness_warning": { "type": "BOOLEAN" },
            "check_timestamp": { "type": "STRING" },
            "notes": { "type": "STRING" }
        },
        "required": STRATEGY_FIELDS
    })
}

pub fn build_request(input: &StrategyInput) -> GenerateContentRequest {
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part {
                text: Some(build_prompt(input)),
            }],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json".to_string(),
            response_schema: response_schema(),
        },
    }
}
