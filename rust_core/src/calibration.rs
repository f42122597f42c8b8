//! Calibration feedback loop.
//!
//! After each recorded round, compare stated confidence with realised accuracy
//! over a recent window and nudge the signal weights and learning rate.

use crate::error::PredictorError;
use crate::learned_state::{LearnedState, MAX_LEARNING_RATE, MIN_LEARNING_RATE};
use crate::scoring::weights::SignalKind;
use crate::types::RoundRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};
use uuid::Uuid;

pub const DEFAULT_CALIBRATION_WINDOW: usize = 10;
pub const MIN_CALIBRATION_WINDOW: usize = 10;
pub const MAX_CALIBRATION_WINDOW: usize = 20;

/// Calibration does not run until history has this many rounds.
pub const MIN_ROUNDS_FOR_CALIBRATION: usize = 5;

/// Probabilities are clamped into this range before taking the log.
pub const LOG_LOSS_CLAMP: (f64, f64) = (0.001, 0.999);

/// |calibration error| above this triggers a weight adjustment.
pub const CALIBRATION_TOLERANCE: f64 = 0.1;
pub const OVERCONFIDENT_FACTOR: f64 = 0.95;
pub const UNDERCONFIDENT_FACTOR: f64 = 1.05;

/// Rounds at or above this confidence (0-1) are attributed by `SignalAttribution`.
pub const HIGH_CONFIDENCE: f64 = 0.6;

const LOW_ACCURACY: f64 = 0.5;
const HIGH_ACCURACY: f64 = 0.7;
const LEARNING_RATE_UP: f64 = 1.2;
const LEARNING_RATE_DOWN: f64 = 0.8;

/// How a calibration pass turns its measurements into weight changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalibrationRule {
    /// Scale every weight by 0.95 when over-confident, 1.05 when under-confident.
    #[default]
    GlobalScaling,
    /// Credit or blame the odds or historical weight for each confident call.
    SignalAttribution,
}

impl fmt::Display for CalibrationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CalibrationRule::GlobalScaling => "global",
            CalibrationRule::SignalAttribution => "attribution",
        })
    }
}

impl FromStr for CalibrationRule {
    type Err = PredictorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "global" | "global_scaling" => Ok(CalibrationRule::GlobalScaling),
            "attribution" | "signal_attribution" => Ok(CalibrationRule::SignalAttribution),
            other => Err(PredictorError::InvalidRoundComposition(format!(
                "unknown calibration rule '{}'",
                other
            ))),
        }
    }
}

/// What a calibration pass did to the weights.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightAdjustment {
    Unchanged,
    /// Every weight multiplied by this factor.
    Scaled(f64),
    /// Net multipliers applied to the odds and historical weights.
    Attributed { odds: f64, historical: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub window_rounds: usize,
    /// Fraction correct in the window, 0-1.
    pub accuracy: f64,
    pub log_loss: f64,
    /// Mean confidence (0-1) minus accuracy; positive is over-confident.
    pub calibration_error: f64,
    pub adjustment: WeightAdjustment,
    pub learning_rate: f64,
}

/// Mean negative log-likelihood of the actual winners.
///
/// A round whose winner has no recorded probability counts at the lower clamp.
pub fn log_loss(rounds: &[RoundRecord]) -> f64 {
    if rounds.is_empty() {
        return 0.0;
    }
    let (lo, hi) = LOG_LOSS_CLAMP;
    let total: f64 = rounds
        .iter()
        .map(|r| {
            let p = r
                .predicted_probabilities
                .get(r.actual_winner())
                .copied()
                .filter(|p| p.is_finite())
                .unwrap_or(lo)
                .clamp(lo, hi);
            -p.ln()
        })
        .sum();
    total / rounds.len() as f64
}

pub fn accuracy(rounds: &[RoundRecord]) -> f64 {
    if rounds.is_empty() {
        return 0.0;
    }
    rounds.iter().filter(|r| r.prediction_correct()).count() as f64 / rounds.len() as f64
}

/// Mean stated confidence minus accuracy.
pub fn calibration_error(rounds: &[RoundRecord]) -> f64 {
    if rounds.is_empty() {
        return 0.0;
    }
    let mean_confidence =
        rounds.iter().map(|r| r.confidence / 100.0).sum::<f64>() / rounds.len() as f64;
    mean_confidence - accuracy(rounds)
}

/// Learning rate after seeing `accuracy`: faster when failing, slower when doing well.
pub fn adapt_learning_rate(learning_rate: f64, accuracy: f64) -> f64 {
    let next = if accuracy < LOW_ACCURACY {
        learning_rate * LEARNING_RATE_UP
    } else if accuracy > HIGH_ACCURACY {
        learning_rate * LEARNING_RATE_DOWN
    } else {
        learning_rate
    };
    next.clamp(MIN_LEARNING_RATE, MAX_LEARNING_RATE)
}

fn global_scaling(state: &mut LearnedState, error: f64) -> WeightAdjustment {
    if error.abs() <= CALIBRATION_TOLERANCE {
        return WeightAdjustment::Unchanged;
    }
    let factor = if error > 0.0 {
        OVERCONFIDENT_FACTOR
    } else {
        UNDERCONFIDENT_FACTOR
    };
    state.signal_weights.scale(factor);
    WeightAdjustment::Scaled(factor)
}

/// Rounds of `window` newer than the last calibrated one. Each round is
/// attributed once; with no marker in the window every round is new.
fn unattributed<'a>(window: &'a [RoundRecord], last_calibrated: Option<Uuid>) -> &'a [RoundRecord] {
    match last_calibrated.and_then(|id| window.iter().position(|r| r.id == id)) {
        Some(pos) => &window[pos + 1..],
        None => window,
    }
}

fn signal_attribution(state: &mut LearnedState, window: &[RoundRecord]) -> WeightAdjustment {
    let lr = state.learning_rate;
    let mut odds = 1.0;
    let mut historical = 1.0;

    let fresh = unattributed(window, state.last_calibrated_round);
    for round in fresh.iter().filter(|r| r.confidence / 100.0 >= HIGH_CONFIDENCE) {
        let backed_favourite = round.market_favourite() == Some(round.predicted_winner.as_str());
        let factor = if round.prediction_correct() {
            1.0 + lr / 2.0
        } else {
            1.0 - lr
        };
        if backed_favourite {
            odds *= factor;
        } else {
            historical *= factor;
        }
    }

    if odds == 1.0 && historical == 1.0 {
        return WeightAdjustment::Unchanged;
    }
    *state.signal_weights.get_mut(SignalKind::Odds) *= odds;
    *state.signal_weights.get_mut(SignalKind::HistoricalWinRate) *= historical;
    WeightAdjustment::Attributed { odds, historical }
}

/// Run one calibration pass over the newest `window` rounds of `history`.
///
/// Returns `None` when history is too short or when the newest round was
/// already calibrated against, so calling this twice on the same history
/// changes nothing the second time.
pub fn run_calibration(
    history: &[RoundRecord],
    state: &mut LearnedState,
    window: usize,
    rule: CalibrationRule,
) -> Option<CalibrationReport> {
    if history.len() < MIN_ROUNDS_FOR_CALIBRATION {
        debug!(rounds = history.len(), "Not enough history to calibrate");
        return None;
    }
    let newest = history.last()?;
    if state.last_calibrated_round == Some(newest.id) {
        debug!(round = %newest.id, "Round already calibrated, skipping");
        return None;
    }

    let window = window.clamp(MIN_CALIBRATION_WINDOW, MAX_CALIBRATION_WINDOW);
    let recent = &history[history.len().saturating_sub(window)..];

    let accuracy = accuracy(recent);
    let log_loss = log_loss(recent);
    let error = calibration_error(recent);

    let adjustment = match rule {
        CalibrationRule::GlobalScaling => global_scaling(state, error),
        CalibrationRule::SignalAttribution => signal_attribution(state, recent),
    };
    state.signal_weights.normalize();
    state.learning_rate = adapt_learning_rate(state.learning_rate, accuracy);
    state.current_log_loss = Some(log_loss);
    state.last_calibrated_round = Some(newest.id);

    info!(
        window = recent.len(),
        accuracy,
        log_loss,
        calibration_error = error,
        learning_rate = state.learning_rate,
        rule = %rule,
        "Calibration pass: {:?}",
        adjustment
    );

    Some(CalibrationReport {
        window_rounds: recent.len(),
        accuracy,
        log_loss,
        calibration_error: error,
        adjustment,
        learning_rate: state.learning_rate,
    })
}
