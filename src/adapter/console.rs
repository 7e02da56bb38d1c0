// src/adapter/console.rs
// Terminal rendering of strategy results

use std::fmt::Write;

use crate::analysis::MoveMethod;
use crate::domain::models::{StrategyResult, TradeRecommendation, TradeSignal};

const RULE: &str = "------------------------------------------------------------";

/// Full text report: trade card, key metrics, levels and notes.
pub fn render_report(result: &StrategyResult) -> String {
    let mut out = String::new();

    out.push_str(&render_trade_card(&result.trade_recommendation));
    out.push('\n');
    out.push_str(&render_key_metrics(result));
    out.push('\n');
    out.push_str(&render_levels(result));
    out.push('\n');

    let _ = writeln!(out, "Note: {}", result.notes);
    let _ = writeln!(
        out,
        "Last Checked: {}",
        result.check_timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if result.staleness_warning {
        let _ = writeln!(out, "Warning: market data may be stale");
    }

    out
}

pub fn render_trade_card(recommendation: &TradeRecommendation) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(
        out,
        "{}    Confidence: {}",
        recommendation.side(),
        recommendation.confidence
    );

    match &recommendation.signal {
        TradeSignal::Long(plan) | TradeSignal::Short(plan) => {
            let _ = writeln!(out, "  Entry Price   {:>10}", plan.entry_price);
            let _ = writeln!(out, "  Stop Loss     {:>10}", plan.stop_loss);
            let _ = writeln!(out, "  Target 1      {:>10}", plan.target_1);
            let _ = writeln!(out, "  Target 2      {:>10}", plan.target_2);
            let _ = writeln!(
                out,
                "  Risk          {:>10} pts ({:.2}%)",
                plan.risk_points, plan.risk_percent
            );
        }
        TradeSignal::NoTrade => {}
    }

    let _ = writeln!(out, "  {}", recommendation.reasoning);
    let _ = writeln!(out, "{}", RULE);
    out
}

pub fn render_key_metrics(result: &StrategyResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Key Metrics");
    let _ = writeln!(out, "  NIFTY 50 Price          {:>12.2}", result.index_price);
    let _ = writeln!(out, "  India VIX               {:>12.2} %", result.volatility_percent);
    if let Some(anchor) = result.anchor_price {
        let _ = writeln!(out, "  Level Anchor            {:>12.2}", anchor);
    }
    let _ = writeln!(out, "  Expected Move (A)       {:>12} pts", result.expected_move_points);
    let _ = writeln!(out, "  Expected Move % (A)     {:>12.4} %", result.expected_move_percent);
    let _ = writeln!(out, "  Expected Move (B)       {:>12} pts", result.expected_move_points_sqrt);
    let _ = writeln!(
        out,
        "  Expected Move % (B)     {:>12.4} %",
        result.expected_move_percent_sqrt
    );
    out
}

pub fn render_levels(result: &StrategyResult) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Support & Resistance Levels");
    let _ = writeln!(
        out,
        "  {:<12}{:>18}{:>18}",
        "Level",
        MoveMethod::LinearRatio.label(),
        MoveMethod::SqrtTime.label()
    );
    let _ = writeln!(out, "  {:<12}{:>18}{:>18}", "Resistance", result.resistance, result.resistance_sqrt);
    let _ = writeln!(out, "  {:<12}{:>18}{:>18}", "Support", result.support, result.support_sqrt);
    out
}

/// One-line summary for live updates.
pub fn render_tick(result: &StrategyResult) -> String {
    let recommendation = &result.trade_recommendation;
    let mut line = format!(
        "[{}] NIFTY {:.2} VIX {:.2}% | A {}/{} | B {}/{} | {} ({})",
        result.index_timestamp.format("%H:%M:%S"),
        result.index_price,
        result.volatility_percent,
        result.support,
        result.resistance,
        result.support_sqrt,
        result.resistance_sqrt,
        recommendation.side(),
        recommendation.confidence
    );

    if let Some(plan) = recommendation.signal.plan() {
        let _ = write!(
            line,
            " entry {} stop {} targets {}/{}",
            plan.entry_price, plan.stop_loss, plan.target_1, plan.target_2
        );
    }
    line
}
