//! Performance metrics over the round history.
//!
//! This module provides:
//! - Accuracy (overall and over the last 10 rounds)
//! - Bankroll totals and ROI, overall and per strategy profile
//! - Brier score of the predicted probabilities
//! - Qualitative bands and a model mood for display

use crate::learned_state::LearnedState;
use crate::scoring::strategy::StrategyProfile;
use crate::types::RoundRecord;
use crate::utils::money::{roi_percentage, Money};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Rounds considered by recent accuracy and the model mood.
pub const RECENT_ACCURACY_WINDOW: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccuracyBand {
    VeryLow,
    Low,
    Medium,
    Good,
    VeryGood,
    Excellent,
}

impl AccuracyBand {
    pub fn from_pct(accuracy_pct: f64) -> Self {
        let a = accuracy_pct.clamp(0.0, 100.0);
        if a < 20.0 {
            AccuracyBand::VeryLow
        } else if a < 40.0 {
            AccuracyBand::Low
        } else if a < 60.0 {
            AccuracyBand::Medium
        } else if a < 80.0 {
            AccuracyBand::Good
        } else if a < 95.0 {
            AccuracyBand::VeryGood
        } else {
            AccuracyBand::Excellent
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AccuracyBand::VeryLow => "Very low accuracy",
            AccuracyBand::Low => "Low accuracy",
            AccuracyBand::Medium => "Medium accuracy",
            AccuracyBand::Good => "Good accuracy",
            AccuracyBand::VeryGood => "Very good accuracy",
            AccuracyBand::Excellent => "Excellent accuracy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoiBand {
    Poor,
    Negative,
    Neutral,
    Positive,
    Strong,
    Exceptional,
}

impl RoiBand {
    pub fn from_pct(roi_pct: f64) -> Self {
        if roi_pct >= 50.0 {
            RoiBand::Exceptional
        } else if roi_pct >= 20.0 {
            RoiBand::Strong
        } else if roi_pct >= 5.0 {
            RoiBand::Positive
        } else if roi_pct >= -5.0 {
            RoiBand::Neutral
        } else if roi_pct >= -20.0 {
            RoiBand::Negative
        } else {
            RoiBand::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RoiBand::Exceptional => "Exceptional ROI",
            RoiBand::Strong => "Strong positive ROI",
            RoiBand::Positive => "Positive ROI",
            RoiBand::Neutral => "Neutral ROI",
            RoiBand::Negative => "Negative ROI",
            RoiBand::Poor => "Poor ROI",
        }
    }
}

/// Band of the calibration score `1 - brier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CalibrationBand {
    VeryPoor,
    Poor,
    Fair,
    Good,
    VeryGood,
    Excellent,
}

impl CalibrationBand {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.95 {
            CalibrationBand::Excellent
        } else if score >= 0.85 {
            CalibrationBand::VeryGood
        } else if score >= 0.75 {
            CalibrationBand::Good
        } else if score >= 0.65 {
            CalibrationBand::Fair
        } else if score >= 0.50 {
            CalibrationBand::Poor
        } else {
            CalibrationBand::VeryPoor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CalibrationBand::Excellent => "Excellent calibration",
            CalibrationBand::VeryGood => "Very good calibration",
            CalibrationBand::Good => "Good calibration",
            CalibrationBand::Fair => "Fair calibration",
            CalibrationBand::Poor => "Poor calibration",
            CalibrationBand::VeryPoor => "Very poor calibration",
        }
    }
}

/// Coarse self-assessment from recent accuracy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelMood {
    High,
    Medium,
    Low,
}

impl ModelMood {
    pub fn from_recent_accuracy(recent_pct: f64) -> Self {
        if recent_pct >= 60.0 {
            ModelMood::High
        } else if recent_pct >= 40.0 {
            ModelMood::Medium
        } else {
            ModelMood::Low
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ModelMood::High => "High confidence - model is performing well",
            ModelMood::Medium => "Medium confidence - model is performing adequately",
            ModelMood::Low => "Low confidence - model is struggling",
        }
    }
}

impl fmt::Display for ModelMood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ModelMood::High => "High",
            ModelMood::Medium => "Medium",
            ModelMood::Low => "Low",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_rounds: usize,
    pub correct_predictions: usize,
    pub accuracy_pct: f64,
    pub recent_accuracy_pct: f64,
    pub overall_roi_pct: f64,
    pub total_bet_amount: Money,
    pub total_payout: Money,
    /// Mean squared error of predicted probabilities over every runner.
    pub brier_score: f64,
    /// ROI per profile, only for profiles that staked something.
    pub strategy_roi_pct: BTreeMap<StrategyProfile, f64>,
}

fn accuracy_pct(rounds: &[RoundRecord]) -> f64 {
    if rounds.is_empty() {
        return 0.0;
    }
    let correct = rounds.iter().filter(|r| r.prediction_correct()).count();
    correct as f64 / rounds.len() as f64 * 100.0
}

/// Brier score over every (round, runner) pair with a predicted probability.
pub fn brier_score(history: &[RoundRecord]) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for round in history {
        for (id, p) in &round.predicted_probabilities {
            let actual = if id == round.actual_winner() { 1.0 } else { 0.0 };
            total += (p - actual).powi(2);
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// ROI per strategy profile over the rounds that carried a bet.
pub fn strategy_roi(history: &[RoundRecord]) -> BTreeMap<StrategyProfile, f64> {
    let mut totals: BTreeMap<StrategyProfile, (Money, Money)> = BTreeMap::new();
    for round in history {
        if let Some(bet) = &round.bet {
            let entry = totals.entry(round.strategy_profile).or_default();
            entry.0 += bet.amount;
            entry.1 += bet.payout();
        }
    }
    totals
        .into_iter()
        .filter(|(_, (staked, _))| staked.is_positive())
        .map(|(profile, (staked, paid))| (profile, roi_percentage(paid, staked)))
        .collect()
}

impl PerformanceMetrics {
    pub fn from_history(history: &[RoundRecord], state: &LearnedState) -> Self {
        let recent = &history[history.len().saturating_sub(RECENT_ACCURACY_WINDOW)..];
        Self {
            total_rounds: history.len(),
            correct_predictions: history.iter().filter(|r| r.prediction_correct()).count(),
            accuracy_pct: accuracy_pct(history),
            recent_accuracy_pct: accuracy_pct(recent),
            overall_roi_pct: roi_percentage(state.total_payout, state.total_bet_amount),
            total_bet_amount: state.total_bet_amount,
            total_payout: state.total_payout,
            brier_score: brier_score(history),
            strategy_roi_pct: strategy_roi(history),
        }
    }

    pub fn accuracy_band(&self) -> AccuracyBand {
        AccuracyBand::from_pct(self.accuracy_pct)
    }

    pub fn roi_band(&self) -> RoiBand {
        RoiBand::from_pct(self.overall_roi_pct)
    }

    pub fn calibration_score(&self) -> f64 {
        1.0 - self.brier_score
    }

    pub fn calibration_band(&self) -> CalibrationBand {
        CalibrationBand::from_score(self.calibration_score())
    }

    pub fn mood(&self) -> ModelMood {
        ModelMood::from_recent_accuracy(self.recent_accuracy_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds::OddsValue;
    use crate::stats::test_support::round;
    use crate::types::{BetOutcome, BetRecord};

    const ODDS: [f64; 6] = [2.0, 3.0, 4.0, 5.0, 6.0, 8.0];

    #[test]
    fn test_empty_history() {
        let m = PerformanceMetrics::from_history(&[], &LearnedState::default());
        assert_eq!(m.total_rounds, 0);
        assert_eq!(m.accuracy_pct, 0.0);
        assert_eq!(m.overall_roi_pct, 0.0);
        assert_eq!(m.brier_score, 0.0);
        assert!(m.strategy_roi_pct.is_empty());
        assert_eq!(m.mood(), ModelMood::Low);
    }

    #[test]
    fn test_recent_accuracy_uses_last_ten() {
        // 5 early misses, then 10 hits
        let history: Vec<RoundRecord> = (0..15)
            .map(|i| round(i, ODDS, &[if i < 5 { "2" } else { "1" }]))
            .collect();
        let state = LearnedState::from_history(&history, 20);
        let m = PerformanceMetrics::from_history(&history, &state);
        assert_eq!(m.correct_predictions, 10);
        assert!((m.accuracy_pct - 66.666).abs() < 0.01);
        assert_eq!(m.recent_accuracy_pct, 100.0);
        assert_eq!(m.mood(), ModelMood::High);
        assert_eq!(m.accuracy_band(), AccuracyBand::Good);
    }

    #[test]
    fn test_brier_score_perfect_prediction() {
        let mut r = round(0, ODDS, &["1"]);
        r.predicted_probabilities = [("1".to_string(), 1.0), ("2".to_string(), 0.0)]
            .into_iter()
            .collect();
        assert_eq!(brier_score(&[r.clone()]), 0.0);

        r.first_place = "2".to_string();
        assert_eq!(brier_score(&[r]), 1.0);
    }

    #[test]
    fn test_roi_per_strategy() {
        let mut a = round(0, ODDS, &["1"]);
        a.bet = Some(BetRecord {
            staked_candidate_id: "1".to_string(),
            amount: Money::from_dollars(100.0),
            odds_at_stake: OddsValue::from_numerator(2.0).unwrap(),
            outcome: BetOutcome::Win,
        });
        let mut b = round(1, ODDS, &["2"]);
        b.strategy_profile = StrategyProfile::Aggressive;
        b.bet = Some(BetRecord {
            staked_candidate_id: "1".to_string(),
            amount: Money::from_dollars(100.0),
            odds_at_stake: OddsValue::from_numerator(2.0).unwrap(),
            outcome: BetOutcome::Loss,
        });
        let c = round(2, ODDS, &["1"]);
        let history = vec![a, b, c];

        let roi = strategy_roi(&history);
        assert_eq!(roi[&StrategyProfile::Balanced], 200.0);
        assert_eq!(roi[&StrategyProfile::Aggressive], -100.0);
        assert_eq!(roi.len(), 2);

        let state = LearnedState::from_history(&history, 20);
        let m = PerformanceMetrics::from_history(&history, &state);
        // staked 200, returned 300
        assert_eq!(m.overall_roi_pct, 50.0);
        assert_eq!(m.roi_band(), RoiBand::Exceptional);
    }

    #[test]
    fn test_bands() {
        assert_eq!(AccuracyBand::from_pct(19.9), AccuracyBand::VeryLow);
        assert_eq!(AccuracyBand::from_pct(95.0), AccuracyBand::Excellent);
        assert_eq!(RoiBand::from_pct(-5.0), RoiBand::Neutral);
        assert_eq!(RoiBand::from_pct(-20.1), RoiBand::Poor);
        assert_eq!(CalibrationBand::from_score(0.8), CalibrationBand::Good);
        assert_eq!(CalibrationBand::from_score(0.3), CalibrationBand::VeryPoor);
        assert_eq!(ModelMood::from_recent_accuracy(45.0), ModelMood::Medium);
    }
}
