//! Signal scoring engine.
//!
//! This module provides:
//! - Weighted multi-signal scores per candidate
//! - Hot-streak multiplicative boost
//! - Softmax probabilities and the predicted winner
//! - Signal agreement, damped confidence and the skip/edge advisory
//! - Odds-only fallback when no learned state exists yet

pub mod agreement;
pub mod signals;
pub mod strategy;
pub mod weights;

use crate::error::Result;
use crate::learned_state::LearnedState;
use crate::types::{CandidateId, RoundInput};
use crate::validation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub use agreement::{AgreementLabel, AgreementReport};
pub use signals::SignalContribution;
pub use strategy::{StrategyParams, StrategyProfile};
pub use weights::{SignalKind, SignalWeights};

/// Win streak at which the hot-streak boost applies.
pub const HOT_STREAK_THRESHOLD: u32 = 4;

/// Scores are divided by this before the softmax; lower is sharper.
pub const SOFTMAX_TEMPERATURE: f64 = 0.5;

/// Confidence = probability × (AGREEMENT_BASE + AGREEMENT_SPAN × agreement).
const AGREEMENT_BASE: f64 = 0.7;
const AGREEMENT_SPAN: f64 = 0.3;

/// How one candidate's score was assembled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateBreakdown {
    pub candidate_id: CandidateId,
    pub contributions: Vec<SignalContribution>,
    /// Weighted sum before any boost.
    pub base_score: f64,
    pub hot_streak_boosted: bool,
    /// Score fed into the softmax.
    pub score: f64,
    pub probability: f64,
}

/// A runner on a hot win streak.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotStreakNotice {
    pub candidate_id: CandidateId,
    pub win_streak: u32,
    pub boost: f64,
}

/// Outcome of scoring one round.
///
/// `confidence` is the number shown to the user and is what the calibration
/// error compares against accuracy. `probabilities` is a distribution over the
/// field summing to 1; it is what log-loss and the Brier score grade, and
/// `winner_probability` is always its entry for the predicted winner. With
/// learned state, confidence is that probability damped by agreement. In
/// odds-only mode confidence is the raw implied probability while
/// `probabilities` holds the market shares with the overround removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub predicted_winner: CandidateId,
    /// Winner probability damped by agreement, 0-1. Implied probability when odds-only.
    pub confidence: f64,
    /// `probabilities[predicted_winner]`.
    pub winner_probability: f64,
    pub probabilities: BTreeMap<CandidateId, f64>,
    pub implied_probabilities: BTreeMap<CandidateId, f64>,
    /// Winner probability minus its implied probability; zero when odds-only.
    pub edge: f64,
    pub agreement: AgreementReport,
    pub skip_recommended: bool,
    pub skip_reason: Option<String>,
    pub breakdown: Vec<CandidateBreakdown>,
    pub hot_streaks: Vec<HotStreakNotice>,
    pub strategy: StrategyProfile,
    /// True when no learned state was available.
    pub odds_only: bool,
}

impl PredictionResult {
    pub fn confidence_pct(&self) -> f64 {
        self.confidence * 100.0
    }

    pub fn winner_implied_probability(&self) -> f64 {
        self.implied_probabilities
            .get(&self.predicted_winner)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Numerically stable softmax (max subtracted before exponentiating).
///
/// Non-finite scores are treated as the lowest finite score. An empty input
/// returns an empty vector.
pub fn softmax(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }
    let finite_min = scores
        .iter()
        .copied()
        .filter(|s| s.is_finite())
        .fold(f64::INFINITY, f64::min);
    let floor = if finite_min.is_finite() { finite_min } else { 0.0 };
    let clean: Vec<f64> = scores
        .iter()
        .map(|s| if s.is_finite() { *s } else { floor })
        .collect();

    let max = clean.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = clean.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// Multiplicative hot-streak boost.
///
/// A positive score is multiplied by `boost`; a negative score is divided by
/// it, so the boost always moves the score upward.
fn apply_boost(score: f64, boost: f64) -> f64 {
    if score >= 0.0 {
        score * boost
    } else {
        score / boost
    }
}

/// Index of the largest value, first on ties.
fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, v) in values.iter().enumerate() {
        if *v > values[best] {
            best = i;
        }
    }
    best
}

/// Predict the winner of a round.
///
/// With `state == None` the market decides: the shortest-priced runner wins
/// with confidence equal to its implied probability and agreement 1.0.
pub fn predict_winner(
    input: &RoundInput,
    state: Option<&LearnedState>,
    strategy: StrategyProfile,
) -> Result<PredictionResult> {
    validation::validate_round_input(input)?;

    let params = strategy.params();
    let implied: Vec<f64> = input.candidates.iter().map(|c| c.implied_probability()).collect();
    let implied_total: f64 = implied.iter().sum();
    let market_share: Vec<f64> = implied.iter().map(|p| p / implied_total).collect();
    let implied_map: BTreeMap<CandidateId, f64> = input
        .candidates
        .iter()
        .zip(&implied)
        .map(|(c, p)| (c.candidate_id.clone(), *p))
        .collect();

    let Some(state) = state else {
        return Ok(odds_only_prediction(input, &implied, &market_share, implied_map, strategy, &params));
    };

    let weights = state.signal_weights.combine(&params.multipliers);
    let field_size = input.candidates.len();

    let mut breakdown: Vec<CandidateBreakdown> = Vec::with_capacity(field_size);
    let mut hot_streaks = Vec::new();
    for (candidate, share) in input.candidates.iter().zip(&market_share) {
        let stats = state.stats_for(&candidate.candidate_id);
        let values = signals::compute_signals(*share, field_size, stats);
        let (base_score, contributions) = values.weigh(&weights);

        let win_streak = stats.map_or(0, |s| s.win_streak);
        let hot = win_streak >= HOT_STREAK_THRESHOLD;
        let score = if hot {
            hot_streaks.push(HotStreakNotice {
                candidate_id: candidate.candidate_id.clone(),
                win_streak,
                boost: params.hot_streak_boost,
            });
            apply_boost(base_score, params.hot_streak_boost)
        } else {
            base_score
        };

        breakdown.push(CandidateBreakdown {
            candidate_id: candidate.candidate_id.clone(),
            contributions,
            base_score,
            hot_streak_boosted: hot,
            score,
            probability: 0.0,
        });
    }

    let scaled: Vec<f64> = breakdown.iter().map(|b| b.score / SOFTMAX_TEMPERATURE).collect();
    let probabilities = softmax(&scaled);
    for (b, p) in breakdown.iter_mut().zip(&probabilities) {
        b.probability = *p;
    }

    let winner_idx = argmax(&probabilities);
    let winner = &input.candidates[winner_idx];
    let winner_probability = probabilities[winner_idx];

    let picks = agreement::family_picks(
        &input.candidates,
        |id| state.stats_for(id),
        |id| state.variance_for(id),
    );
    let agreement = agreement::evaluate_agreement(picks, &winner.candidate_id);
    let confidence = winner_probability * (AGREEMENT_BASE + AGREEMENT_SPAN * agreement.score);

    let edge = winner_probability - implied[winner_idx];
    let skip_reason = skip_reason(edge, &agreement, &params);

    debug!(
        winner = %winner.candidate_id,
        probability = winner_probability,
        agreement = agreement.score,
        edge,
        strategy = %strategy,
        "Scored round"
    );

    Ok(PredictionResult {
        predicted_winner: winner.candidate_id.clone(),
        confidence,
        winner_probability,
        probabilities: input
            .candidates
            .iter()
            .zip(&probabilities)
            .map(|(c, p)| (c.candidate_id.clone(), *p))
            .collect(),
        implied_probabilities: implied_map,
        edge,
        skip_recommended: skip_reason.is_some(),
        skip_reason,
        agreement,
        breakdown,
        hot_streaks,
        strategy,
        odds_only: false,
    })
}

fn skip_reason(edge: f64, agreement: &AgreementReport, params: &StrategyParams) -> Option<String> {
    if edge < params.value_threshold {
        Some(format!(
            "Edge {:.1}% is below the {:.1}% value threshold",
            edge * 100.0,
            params.value_threshold * 100.0
        ))
    } else if agreement.label == AgreementLabel::MixedSignals {
        Some(format!(
            "Mixed signals: only {:.0}% of signal families agree",
            agreement.score * 100.0
        ))
    } else {
        None
    }
}

fn odds_only_prediction(
    input: &RoundInput,
    implied: &[f64],
    market_share: &[f64],
    implied_map: BTreeMap<CandidateId, f64>,
    strategy: StrategyProfile,
    params: &StrategyParams,
) -> PredictionResult {
    let winner_idx = argmax(implied);
    let winner = &input.candidates[winner_idx];
    let confidence = implied[winner_idx];
    let agreement = AgreementReport::unanimous(&winner.candidate_id);
    let edge = 0.0;
    let skip_reason = skip_reason(edge, &agreement, params);

    let breakdown = input
        .candidates
        .iter()
        .zip(market_share)
        .map(|(c, share)| {
            let values = signals::compute_signals(*share, market_share.len(), None);
            let (base_score, contributions) = values.weigh(&SignalWeights::uniform(1.0));
            CandidateBreakdown {
                candidate_id: c.candidate_id.clone(),
                contributions,
                base_score,
                hot_streak_boosted: false,
                score: base_score,
                probability: *share,
            }
        })
        .collect();

    PredictionResult {
        predicted_winner: winner.candidate_id.clone(),
        confidence,
        winner_probability: market_share[winner_idx],
        probabilities: input
            .candidates
            .iter()
            .zip(market_share)
            .map(|(c, p)| (c.candidate_id.clone(), *p))
            .collect(),
        implied_probabilities: implied_map,
        edge,
        skip_recommended: skip_reason.is_some(),
        skip_reason,
        agreement,
        breakdown,
        hot_streaks: Vec::new(),
        strategy,
        odds_only: true,
    }
}
