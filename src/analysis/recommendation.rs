// src/analysis/recommendation.rs
use crate::analysis::range::{round_dp, ExpectedMove, RangeLevels};
use crate::domain::models::{TradeConfidence, TradePlan, TradeRecommendation, TradeSide, TradeSignal};

/// Tunables of the level-proximity trade rules.
///
/// Bands are fractions of the daily range (resistance - support).
#[derive(Debug, Clone, PartialEq)]
pub struct SignalParams {
    pub proximity_band: f64,
    pub high_confidence_band: f64,
    pub medium_confidence_band: f64,
    pub stop_move_fraction: f64,
    pub stop_cap_fraction: f64,
    pub stop_floor_points: f64,
    pub target_1_fraction: f64,
    /// Below this the targets can no longer be strictly ordered.
    pub min_move_points: i64,
}

impl Default for SignalParams {
    fn default() -> Self {
        Self {
            proximity_band: 0.10,
            high_confidence_band: 0.03,
            medium_confidence_band: 0.06,
            stop_move_fraction: 0.25,
            stop_cap_fraction: 0.005,
            stop_floor_points: 2.0,
            target_1_fraction: 0.5,
            min_move_points: 2,
        }
    }
}

impl SignalParams {
    pub fn band_points(&self, levels: &RangeLevels) -> f64 {
        self.proximity_band * levels.width() as f64
    }
}

/// Where a price sits relative to the range levels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Proximity {
    Support { distance: f64 },
    Resistance { distance: f64 },
    Outside { to_support: f64, to_resistance: f64 },
}

pub fn classify(price: f64, levels: &RangeLevels, params: &SignalParams) -> Proximity {
    let band = params.band_points(levels);
    let to_support = (price - levels.support as f64).abs();
    let to_resistance = (price - levels.resistance as f64).abs();
    let near_support = to_support <= band;
    let near_resistance = to_resistance <= band;

    // Ties go to support.
    if near_support && (!near_resistance || to_support <= to_resistance) {
        Proximity::Support { distance: to_support }
    } else if near_resistance {
        Proximity::Resistance {
            distance: to_resistance,
        }
    } else {
        Proximity::Outside {
            to_support,
            to_resistance,
        }
    }
}

/// Closer to the level means higher confidence. Thresholds are inclusive.
pub fn confidence_for(distance: f64, levels: &RangeLevels, params: &SignalParams) -> TradeConfidence {
    let width = levels.width() as f64;
    if width <= 0.0 {
        return TradeConfidence::Low;
    }

    let ratio = distance / width;
    if ratio <= params.high_confidence_band {
        TradeConfidence::High
    } else if ratio <= params.medium_confidence_band {
        TradeConfidence::Medium
    } else {
        TradeConfidence::Low
    }
}

/// Derive the trade recommendation for `index_price` against `levels`.
pub fn recommend(
    index_price: f64,
    levels: &RangeLevels,
    expected_move: &ExpectedMove,
    params: &SignalParams,
) -> TradeRecommendation {
    if expected_move.points < params.min_move_points {
        return TradeRecommendation {
            signal: TradeSignal::NoTrade,
            confidence: TradeConfidence::Low,
            reasoning: format!(
                "Expected move of {} pts is too narrow to frame a trade.",
                expected_move.points
            ),
        };
    }

    let band = params.band_points(levels);
    match classify(index_price, levels, params) {
        Proximity::Support { distance } => {
            let plan = build_plan(TradeSide::Long, levels.support, index_price, expected_move.points, params);
            let reasoning = format!(
                "Nifty at {:.2} is {:.1} pts from Method A support {}, inside the {:.1}-pt proximity band; \
                 looking for a bounce toward {}.",
                index_price, distance, levels.support, band, plan.target_2
            );
            TradeRecommendation {
                signal: TradeSignal::Long(plan),
                confidence: confidence_for(distance, levels, params),
                reasoning,
            }
        }
        Proximity::Resistance { distance } => {
            let plan = build_plan(TradeSide::Short, levels.resistance, index_price, expected_move.points, params);
            let reasoning = format!(
                "Nifty at {:.2} is {:.1} pts from Method A resistance {}, inside the {:.1}-pt proximity band; \
                 looking for a pullback toward {}.",
                index_price, distance, levels.resistance, band, plan.target_2
            );
            TradeRecommendation {
                signal: TradeSignal::Short(plan),
                confidence: confidence_for(distance, levels, params),
                reasoning,
            }
        }
        Proximity::Outside {
            to_support,
            to_resistance,
        } => TradeRecommendation {
            signal: TradeSignal::NoTrade,
            confidence: TradeConfidence::Low,
            reasoning: format!(
                "Nifty at {:.2} is {:.1} pts from support {} and {:.1} pts from resistance {}; \
                 neither level is within the {:.1}-pt proximity band.",
                index_price, to_support, levels.support, to_resistance, levels.resistance, band
            ),
        },
    }
}

fn build_plan(side: TradeSide, entry_price: i64, index_price: f64, move_points: i64, params: &SignalParams) -> TradePlan {
    let direction: i64 = if side == TradeSide::Long { 1 } else { -1 };

    // The floor wins when it exceeds the cap.
    let stop_offset = (params.stop_move_fraction * move_points as f64)
        .min(params.stop_cap_fraction * index_price)
        .max(params.stop_floor_points);
    let stop_loss = (entry_price as f64 - direction as f64 * stop_offset).round() as i64;

    let first_leg = (params.target_1_fraction * move_points as f64).round() as i64;
    let target_1 = entry_price + direction * first_leg;
    let target_2 = entry_price + direction * move_points;

    let risk_points = (entry_price - stop_loss).abs();
    let risk_percent = round_dp(risk_points as f64 / index_price * 100.0, 2);

    TradePlan {
        entry_price,
        stop_loss,
        target_1,
        target_2,
        risk_points,
        risk_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::range::MoveMethod;

    fn setup(vol: f64, anchor: f64) -> (ExpectedMove, RangeLevels) {
        let mv = ExpectedMove::compute(MoveMethod::LinearRatio, vol, anchor);
        let levels = RangeLevels::around(anchor, &mv);
        (mv, levels)
    }

    #[test]
    fn price_at_pivot_is_no_trade() {
        let (mv, levels) = setup(15.5, 23500.0);
        let rec = recommend(23500.0, &levels, &mv, &SignalParams::default());

        assert_eq!(rec.signal, TradeSignal::NoTrade);
        assert_eq!(rec.confidence, TradeConfidence::Low);
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn price_near_support_goes_long() {
        let (mv, levels) = setup(15.5, 23500.0);
        let rec = recommend(23260.0, &levels, &mv, &SignalParams::default());

        let expected = TradePlan {
            entry_price: 23257,
            stop_loss: 23196,
            target_1: 23379,
            target_2: 23500,
            risk_points: 61,
            risk_percent: 0.26,
        };
        assert_eq!(rec.signal, TradeSignal::Long(expected));
        assert_eq!(rec.confidence, TradeConfidence::High);
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn price_near_resistance_goes_short() {
        let (mv, levels) = setup(15.5, 23500.0);
        let rec = recommend(23720.0, &levels, &mv, &SignalParams::default());

        let plan = rec.signal.plan().cloned().expect("short plan");
        assert_eq!(rec.side(), TradeSide::Short);
        assert_eq!(plan.entry_price, 23743);
        assert!(plan.stop_loss > plan.entry_price);
        assert!(plan.target_1 > plan.target_2);
        assert_eq!(plan.target_2, 23500);
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn long_entry_classifies_back_to_support() {
        let params = SignalParams::default();
        for price in [23212.0, 23240.5, 23257.0, 23300.0] {
            let (mv, levels) = setup(15.5, 23500.0);
            let rec = recommend(price, &levels, &mv, &params);
            if let TradeSignal::Long(plan) = &rec.signal {
                let proximity = classify(plan.entry_price as f64, &levels, &params);
                assert!(matches!(proximity, Proximity::Support { .. }));
            }
        }
    }

    #[test]
    fn stop_offset_floor_beats_cap() {
        // Move of 3 points: 0.25 * 3 = 0.75, cap 0.005 * 100 = 0.5, floor 2.
        let mv = ExpectedMove {
            method: MoveMethod::LinearRatio,
            percent: 3.0,
            points: 3,
        };
        let levels = RangeLevels::around(100.0, &mv);
        let rec = recommend(97.0, &levels, &mv, &SignalParams::default());

        let plan = rec.signal.plan().cloned().expect("long plan");
        assert_eq!(plan.entry_price, 97);
        assert_eq!(plan.stop_loss, 95);
        assert_eq!(plan.target_1, 99);
        assert_eq!(plan.target_2, 100);
        assert_eq!(plan.risk_points, 2);
    }

    #[test]
    fn stop_offset_is_capped_by_index_price() {
        // 0.25 * 1000 = 250 is above the cap of 0.005 * 20000 = 100.
        let mv = ExpectedMove {
            method: MoveMethod::LinearRatio,
            percent: 5.0,
            points: 1000,
        };
        let levels = RangeLevels::around(21000.0, &mv);
        let rec = recommend(20000.0, &levels, &mv, &SignalParams::default());

        let plan = rec.signal.plan().cloned().expect("long plan");
        assert_eq!(plan.stop_loss, 19900);
        assert_eq!(plan.risk_points, 100);
        assert_eq!(plan.risk_percent, 0.5);
    }

    #[test]
    fn narrow_move_never_trades() {
        let (mv, levels) = setup(0.01, 100.0);
        let rec = recommend(levels.support as f64, &levels, &mv, &SignalParams::default());
        assert_eq!(rec.side(), TradeSide::NoTrade);
        assert!(rec.validate().is_ok());
    }

    #[test]
    fn confidence_thresholds_are_inclusive_and_stable() {
        // 15 / 15 = 1% of 25000 -> 250 pt move, 500 pt range, support 24750.
        let (mv, levels) = setup(15.0, 25000.0);
        let params = SignalParams::default();
        assert_eq!(levels.support, 24750);

        // 15 pts is exactly 3% of the range.
        let at_threshold = recommend(24765.0, &levels, &mv, &params);
        assert_eq!(at_threshold.confidence, TradeConfidence::High);
        for _ in 0..10 {
            assert_eq!(recommend(24765.0, &levels, &mv, &params), at_threshold);
        }

        let just_past = recommend(24765.5, &levels, &mv, &params);
        assert_eq!(just_past.confidence, TradeConfidence::Medium);

        let far = recommend(24790.0, &levels, &mv, &params);
        assert_eq!(far.side(), TradeSide::Long);
        assert_eq!(far.confidence, TradeConfidence::Low);
    }

    #[test]
    fn confidence_is_monotonic_in_distance() {
        let (_, levels) = setup(15.0, 25000.0);
        let params = SignalParams::default();
        let mut previous = TradeConfidence::High;
        for distance in 0..=50 {
            let current = confidence_for(distance as f64, &levels, &params);
            assert!(current >= previous);
            previous = current;
        }
    }
}
