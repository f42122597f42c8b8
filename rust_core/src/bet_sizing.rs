//! Quarter-Kelly stake advisor.
//!
//! Pure function of the prediction: nothing here reads or writes state.

use crate::scoring::PredictionResult;
use crate::types::MAX_BET_DOLLARS;
use crate::utils::money::Money;
use serde::{Deserialize, Serialize};

/// Default bankroll unit the Kelly fraction is applied to.
pub const DEFAULT_BANKROLL_UNIT: f64 = 10_000.0;

/// Fraction of full Kelly actually staked.
pub const KELLY_MULTIPLIER: f64 = 0.25;

/// Stakes are rounded to the nearest multiple of this (whole dollars).
pub const STAKE_ROUNDING: i64 = 100;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetSizeRecommendation {
    pub amount: Money,
    pub explanation: String,
    /// Confidence minus implied probability.
    pub edge: f64,
    /// Full-Kelly fraction before the multiplier and agreement scaling.
    pub kelly_fraction: f64,
}

impl BetSizeRecommendation {
    fn no_bet(explanation: impl Into<String>, edge: f64) -> Self {
        Self {
            amount: Money::zero(),
            explanation: explanation.into(),
            edge,
            kelly_fraction: 0.0,
        }
    }
}

/// Recommend a stake.
///
/// `confidence` and `implied_probability` are 0-1. The stake is
/// `edge / (1 - confidence) × bankroll_unit × 0.25 × agreement`, clamped to
/// `[0, 10,000]` and rounded to the nearest 100.
pub fn calculate_bet_size(
    confidence: f64,
    implied_probability: f64,
    bankroll_unit: f64,
    skip_recommended: bool,
    signal_agreement: f64,
) -> BetSizeRecommendation {
    let edge = confidence - implied_probability;

    if skip_recommended {
        return BetSizeRecommendation::no_bet(
            "No value edge detected. Model recommends skipping this race.",
            edge,
        );
    }
    if !edge.is_finite() || edge <= 0.0 {
        return BetSizeRecommendation::no_bet(
            "No positive edge detected. Odds do not favor this bet.",
            edge,
        );
    }

    // confidence > implied >= 0 here, so only confidence == 1 can blow up
    let kelly_fraction = if confidence >= 1.0 {
        1.0
    } else {
        edge / (1.0 - confidence)
    };
    let agreement = signal_agreement.clamp(0.0, 1.0);
    let raw = kelly_fraction * bankroll_unit.max(0.0) * KELLY_MULTIPLIER * agreement;

    let amount = Money::from_dollars(raw)
        .clamp(Money::zero(), Money::from_dollars(MAX_BET_DOLLARS))
        .round_to_nearest(STAKE_ROUNDING);

    let pct = edge * 100.0;
    let mut explanation = if amount.is_zero() {
        "Edge is too small to justify a bet. Consider skipping.".to_string()
    } else if amount.as_dollars() < 1_000.0 {
        format!("Small edge detected ({:.1}%). Conservative bet recommended.", pct)
    } else if amount.as_dollars() < 5_000.0 {
        format!("Moderate edge detected ({:.1}%). Standard bet size.", pct)
    } else {
        format!("Strong edge detected ({:.1}%). Larger bet justified.", pct)
    };
    if agreement < 0.4 {
        explanation.push_str(" Bet reduced due to mixed signals.");
    }

    BetSizeRecommendation {
        amount,
        explanation,
        edge,
        kelly_fraction,
    }
}

/// Stake advice for a finished prediction.
pub fn advise(prediction: &PredictionResult, bankroll_unit: f64) -> BetSizeRecommendation {
    calculate_bet_size(
        prediction.confidence,
        prediction.winner_implied_probability(),
        bankroll_unit,
        prediction.skip_recommended,
        prediction.agreement.score,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_means_zero() {
        let rec = calculate_bet_size(0.6, 0.3, DEFAULT_BANKROLL_UNIT, true, 1.0);
        assert!(rec.amount.is_zero());
        assert!(rec.explanation.contains("skipping"));
    }

    #[test]
    fn test_no_edge_means_zero() {
        let rec = calculate_bet_size(0.3, 0.3, DEFAULT_BANKROLL_UNIT, false, 1.0);
        assert!(rec.amount.is_zero());
        assert!(rec.explanation.contains("No positive edge"));

        let rec = calculate_bet_size(0.2, 0.3, DEFAULT_BANKROLL_UNIT, false, 1.0);
        assert!(rec.amount.is_zero());
    }

    #[test]
    fn test_quarter_kelly_rounded_to_hundreds() {
        // edge 0.1, 1 - c = 0.5 → f = 0.2; 0.2 × 10000 × 0.25 × 1.0 = 500
        let rec = calculate_bet_size(0.5, 0.4, DEFAULT_BANKROLL_UNIT, false, 1.0);
        assert_eq!(rec.amount.as_dollars(), 500.0);
        assert!((rec.kelly_fraction - 0.2).abs() < 1e-12);

        // Same with 0.75 agreement → 375 → 400
        let rec = calculate_bet_size(0.5, 0.4, DEFAULT_BANKROLL_UNIT, false, 0.75);
        assert_eq!(rec.amount.as_dollars(), 400.0);
    }

    #[test]
    fn test_stake_is_multiple_of_hundred_and_capped() {
        for (c, p, agreement) in [
            (0.9, 0.2, 1.0),
            (0.55, 0.5, 0.6),
            (0.41, 0.4, 0.3),
            (0.99, 0.1, 1.0),
            (1.0, 0.5, 1.0),
        ] {
            let rec = calculate_bet_size(c, p, DEFAULT_BANKROLL_UNIT, false, agreement);
            assert_eq!(rec.amount.cents() % (STAKE_ROUNDING * 100), 0);
            assert!(rec.amount.as_dollars() >= 0.0);
            assert!(rec.amount.as_dollars() <= MAX_BET_DOLLARS);
            assert!(!rec.explanation.is_empty());
        }
    }

    #[test]
    fn test_tiny_edge_rounds_to_zero() {
        let rec = calculate_bet_size(0.401, 0.4, DEFAULT_BANKROLL_UNIT, false, 1.0);
        assert!(rec.amount.is_zero());
        assert!(rec.explanation.contains("too small"));
    }

    #[test]
    fn test_mixed_signals_note() {
        let rec = calculate_bet_size(0.8, 0.3, DEFAULT_BANKROLL_UNIT, false, 0.2);
        assert!(rec.explanation.ends_with("mixed signals."));
    }
}
