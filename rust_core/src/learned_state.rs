//! The process-wide learned snapshot.
//!
//! Stats, variance and bankroll totals are derived from history and rebuilt
//! wholesale by `refresh_from_history`. Signal weights, learning rate and
//! log-loss are carried forward and only changed by the calibration loop.

use crate::scoring::strategy::StrategyProfile;
use crate::scoring::weights::SignalWeights;
use crate::stats::{self, CandidateStats, VarianceEntry};
use crate::types::RoundRecord;
use crate::utils::money::Money;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub const DEFAULT_RECENT_WINDOW: usize = 20;
pub const MIN_RECENT_WINDOW: usize = 10;
pub const MAX_RECENT_WINDOW: usize = 50;

pub const DEFAULT_LEARNING_RATE: f64 = 0.05;
pub const MIN_LEARNING_RATE: f64 = 0.001;
pub const MAX_LEARNING_RATE: f64 = 0.1;

/// Fields missing from a stored blob load with their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnedState {
    pub contender_stats: BTreeMap<String, CandidateStats>,
    pub variance_data: BTreeMap<String, VarianceEntry>,
    pub signal_weights: SignalWeights,
    /// Mean log-loss of the last calibration window.
    pub current_log_loss: Option<f64>,
    pub learning_rate: f64,
    pub selected_strategy: StrategyProfile,
    pub total_bet_amount: Money,
    pub total_payout: Money,
    pub recent_window_size: usize,
    pub total_rounds: usize,
    pub correct_predictions: usize,
    /// Newest round already consumed by the calibration loop.
    pub last_calibrated_round: Option<Uuid>,
}

impl Default for LearnedState {
    fn default() -> Self {
        Self::with_window(DEFAULT_RECENT_WINDOW)
    }
}

impl LearnedState {
    pub fn with_window(recent_window_size: usize) -> Self {
        Self {
            contender_stats: BTreeMap::new(),
            variance_data: BTreeMap::new(),
            signal_weights: SignalWeights::default(),
            current_log_loss: None,
            learning_rate: DEFAULT_LEARNING_RATE,
            selected_strategy: StrategyProfile::default(),
            total_bet_amount: Money::zero(),
            total_payout: Money::zero(),
            recent_window_size: recent_window_size.clamp(MIN_RECENT_WINDOW, MAX_RECENT_WINDOW),
            total_rounds: 0,
            correct_predictions: 0,
            last_calibrated_round: None,
        }
    }

    /// Whether any round has been learned from.
    pub fn has_history(&self) -> bool {
        self.total_rounds > 0
    }

    pub fn stats_for(&self, candidate_id: &str) -> Option<&CandidateStats> {
        self.contender_stats.get(candidate_id)
    }

    pub fn variance_for(&self, candidate_id: &str) -> Option<&VarianceEntry> {
        self.variance_data.get(candidate_id)
    }

    /// Rebuild every history-derived field from the full history.
    pub fn refresh_from_history(&mut self, history: &[RoundRecord]) {
        let aggregated = stats::aggregate(history, self.recent_window_size);
        self.contender_stats = aggregated.contender_stats;
        self.variance_data = aggregated.variance_data;

        self.total_rounds = history.len();
        self.correct_predictions = history.iter().filter(|r| r.prediction_correct()).count();

        let bets = history.iter().filter_map(|r| r.bet.as_ref());
        let (staked, paid) = bets.fold((Money::zero(), Money::zero()), |(s, p), bet| {
            (s + bet.amount, p + bet.payout())
        });
        self.total_bet_amount = staked;
        self.total_payout = paid;
    }

    /// State rebuilt from history with default weights.
    pub fn from_history(history: &[RoundRecord], recent_window_size: usize) -> Self {
        let mut state = Self::with_window(recent_window_size);
        state.refresh_from_history(history);
        state
    }

    pub fn accuracy(&self) -> f64 {
        if self.total_rounds == 0 {
            0.0
        } else {
            self.correct_predictions as f64 / self.total_rounds as f64
        }
    }
}
