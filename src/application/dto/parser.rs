// src/application/dto/parser.rs
// Parsers for external service payloads

use super::{GenerateContentResponse, QuotePayload};
use crate::domain::errors::{FeedError, FeedResult, GatewayResult, StrategyError};
use crate::domain::models::{MarketSnapshot, StrategyInput, StrategyResult};

/// Finish reasons that mean the service refused to answer.
const BLOCKED_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

/// Parse a `generateContent` response body into a strategy result validated
/// against the input it was requested for.
pub fn parse_generate_content(body: &[u8], input: &StrategyInput) -> GatewayResult<StrategyResult> {
    let response: GenerateContentResponse = serde_json::from_slice(body)
        .map_err(|e| StrategyError::InvalidResponse(format!("Malformed response envelope: {}", e)))?;

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|feedback| feedback.block_reason.as_deref())
    {
        return Err(StrategyError::ComputationBlocked(reason.to_string()));
    }

    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| StrategyError::InvalidResponse("Response has no candidates".to_string()))?;

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if BLOCKED_FINISH_REASONS.contains(&reason) {
            return Err(StrategyError::ComputationBlocked(reason.to_string()));
        }
    }

    let text: String = candidate
        .content
        .as_ref()
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(StrategyError::InvalidResponse("Response carries no text".to_string()));
    }

    parse_strategy_text(&text, input)
}

/// Parse the JSON text of a strategy answer and check its arithmetic.
pub fn parse_strategy_text(text: &str, input: &StrategyInput) -> GatewayResult<StrategyResult> {
    let json = strip_code_fence(text);
    let mut result: StrategyResult = serde_json::from_str(json)
        .map_err(|e| StrategyError::InvalidResponse(format!("Unexpected strategy shape: {}", e)))?;

    result.validate_for(input)?;
    if result.anchor_price.is_none() {
        result.anchor_price = input.anchor_price;
    }
    Ok(result)
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.strip_suffix("```").unwrap_or(rest).trim()
        }
        None => trimmed,
    }
}

/// Parse a market-data endpoint body into a snapshot.
pub fn parse_quote(body: &[u8], source: &str) -> FeedResult<MarketSnapshot> {
    let payload: QuotePayload = serde_json::from_slice(body)
        .map_err(|e| FeedError::Fetch(format!("Malformed quote from {}: {}", source, e)))?;

    for (field, value) in [
        ("volatility_percent", payload.volatility_percent),
        ("index_price", payload.index_price),
    ] {
        if !value.is_finite() || value <= 0.0 {
            return Err(FeedError::Fetch(format!(
                "Quote from {} has invalid {}: {}",
                source, field, value
            )));
        }
    }

    let mut snapshot = MarketSnapshot::new(payload.volatility_percent, payload.index_price, source);
    if let Some(timestamp) = payload.timestamp {
        snapshot.timestamp = timestamp;
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{StrategyInput, TradeSide};
    use crate::infrastructure::strategy::LocalStrategyCalculator;
    use serde_json::json;

    fn reference_input() -> StrategyInput {
        StrategyInput::new(15.5, 23500.0).unwrap()
    }

    fn reference_result_json() -> String {
        let result = LocalStrategyCalculator::default().calculate(&reference_input());
        serde_json::to_string(&result).unwrap()
    }

    fn envelope(text: &str, finish_reason: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": finish_reason
            }]
        }))
        .unwrap()
    }

    #[test]
    fn parses_well_formed_answer() {
        let body = envelope(&reference_result_json(), "STOP");
        let result = parse_generate_content(&body, &reference_input()).unwrap();

        assert_eq!(result.resistance, 23743);
        assert_eq!(result.support_sqrt, 22835);
        assert_eq!(result.trade_recommendation.side(), TradeSide::NoTrade);
    }

    #[test]
    fn tolerates_markdown_fence() {
        let fenced = format!("```json\n{}\n```", reference_result_json());
        assert!(parse_strategy_text(&fenced, &reference_input()).is_ok());
    }

    #[test]
    fn prompt_block_is_reported_as_blocked() {
        let body = serde_json::to_vec(&json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();

        assert_eq!(
            parse_generate_content(&body, &reference_input()),
            Err(StrategyError::ComputationBlocked("SAFETY".to_string()))
        );
    }

    #[test]
    fn safety_finish_reason_is_reported_as_blocked() {
        let body = envelope("", "SAFETY");
        assert!(matches!(
            parse_generate_content(&body, &reference_input()),
            Err(StrategyError::ComputationBlocked(_))
        ));
    }

    #[test]
    fn non_json_text_is_invalid_response() {
        let body = envelope("The expected move is about 243 points.", "STOP");
        assert!(matches!(
            parse_generate_content(&body, &reference_input()),
            Err(StrategyError::InvalidResponse(_))
        ));
    }

    #[test]
    fn inconsistent_levels_are_invalid_response() {
        let mut value: serde_json::Value = serde_json::from_str(&reference_result_json()).unwrap();
        value["resistance"] = json!(23800);
        let body = envelope(&value.to_string(), "STOP");

        assert!(matches!(
            parse_generate_content(&body, &reference_input()),
            Err(StrategyError::InvalidResponse(_))
        ));
    }

    #[test]
    fn anchored_answer_without_anchor_field_is_accepted() {
        let input = StrategyInput::new(15.5, 23260.0).unwrap().with_anchor(23500.0).unwrap();
        let mut value = serde_json::to_value(LocalStrategyCalculator::default().calculate(&input)).unwrap();
        value.as_object_mut().unwrap().remove("anchor_price");

        let result = parse_strategy_text(&value.to_string(), &input).unwrap();
        assert_eq!(result.anchor_price, Some(23500.0));
        assert_eq!((result.support, result.resistance), (23257, 23743));
        assert_eq!(result.trade_recommendation.side(), TradeSide::Long);
    }

    #[test]
    fn answer_for_another_price_is_invalid_response() {
        let other = StrategyInput::new(15.5, 23600.0).unwrap();
        assert!(matches!(
            parse_strategy_text(&reference_result_json(), &other),
            Err(StrategyError::InvalidResponse(msg)) if msg.contains("nifty_price")
        ));
    }

    #[test]
    fn empty_candidates_are_invalid_response() {
        assert!(matches!(
            parse_generate_content(b"{\"candidates\": []}", &reference_input()),
            Err(StrategyError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_generate_content(b"not json", &reference_input()),
            Err(StrategyError::InvalidResponse(_))
        ));
    }

    #[test]
    fn quote_accepts_short_field_names() {
        let snapshot = parse_quote(br#"{"vix": 14.2, "nifty": 23410.5}"#, "feed").unwrap();
        assert_eq!(snapshot.volatility_percent, 14.2);
        assert_eq!(snapshot.index_price, 23410.5);
        assert_eq!(snapshot.source, "feed");
    }

    #[test]
    fn quote_keeps_upstream_timestamp() {
        let body = br#"{"volatility_percent": 14.2, "index_price": 23410.5, "timestamp": "2024-06-03T09:15:00Z"}"#;
        let snapshot = parse_quote(body, "feed").unwrap();
        assert_eq!(snapshot.timestamp.to_rfc3339(), "2024-06-03T09:15:00+00:00");
    }

    #[test]
    fn quote_rejects_non_positive_values() {
        assert!(matches!(
            parse_quote(br#"{"vix": 0, "nifty": 23410.5}"#, "feed"),
            Err(FeedError::Fetch(_))
        ));
        assert!(parse_quote(b"<html>", "feed").is_err());
    }
}
