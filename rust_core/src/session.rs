//! Predictor session: owns the store, the round history and the learned state.
//!
//! One session per process. Every mutation goes through `record_round`,
//! `set_strategy` or `reset`, and each of them persists before returning.

use crate::bet_sizing::{self, BetSizeRecommendation};
use crate::calibration::{self, CalibrationReport};
use crate::config::PredictorConfig;
use crate::error::{PredictorError, Result};
use crate::learned_state::{LearnedState, MAX_RECENT_WINDOW, MIN_RECENT_WINDOW};
use crate::metrics::PerformanceMetrics;
use crate::persistence::{self, BlobStore};
use crate::scoring::{self, PredictionResult, StrategyProfile};
use crate::types::{BetOutcome, BetRecord, RoundInput, RoundOutcome, RoundRecord};
use crate::validation;
use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub struct PredictorSession<S: BlobStore> {
    store: S,
    config: PredictorConfig,
    history: Vec<RoundRecord>,
    state: LearnedState,
    last_calibration: Option<CalibrationReport>,
}

impl<S: BlobStore> PredictorSession<S> {
    /// Load history and learned state from `store`.
    ///
    /// Missing or unreadable blobs fall back to defaults. History-derived
    /// stats are always recomputed from the loaded history.
    pub fn open(store: S, config: PredictorConfig) -> Self {
        let history = persistence::load_history(&store);
        let mut state = persistence::load_learned_state(&store, fresh_state(&config));
        state.recent_window_size = config
            .recent_window_size
            .clamp(MIN_RECENT_WINDOW, MAX_RECENT_WINDOW);
        state.refresh_from_history(&history);

        info!(
            rounds = history.len(),
            strategy = %state.selected_strategy,
            accuracy = state.accuracy(),
            "Predictor session opened"
        );

        Self {
            store,
            config,
            history,
            state,
            last_calibration: None,
        }
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn history(&self) -> &[RoundRecord] {
        &self.history
    }

    pub fn learned_state(&self) -> &LearnedState {
        &self.state
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn selected_strategy(&self) -> StrategyProfile {
        self.state.selected_strategy
    }

    /// Report of the most recent calibration pass that ran, including passes
    /// that left the weights unchanged.
    pub fn last_calibration(&self) -> Option<&CalibrationReport> {
        self.last_calibration.as_ref()
    }

    /// Score a round. Before any round is recorded this ranks on odds alone.
    pub fn predict(&self, input: &RoundInput, strategy: StrategyProfile) -> Result<PredictionResult> {
        let state = self.state.has_history().then_some(&self.state);
        let prediction = scoring::predict_winner(input, state, strategy)?;
        debug!(
            winner = %prediction.predicted_winner,
            confidence = prediction.confidence_pct(),
            skip = prediction.skip_recommended,
            odds_only = prediction.odds_only,
            "Prediction ready"
        );
        Ok(prediction)
    }

    /// Predict with the session's selected strategy.
    pub fn predict_selected(&self, input: &RoundInput) -> Result<PredictionResult> {
        self.predict(input, self.state.selected_strategy)
    }

    pub fn advise_bet(&self, prediction: &PredictionResult) -> BetSizeRecommendation {
        bet_sizing::advise(prediction, self.config.bankroll_unit)
    }

    /// Record the outcome of a predicted round.
    ///
    /// Validates the outcome, appends an immutable record, recomputes every
    /// history-derived statistic, runs the calibration loop and persists both
    /// the history and the learned state.
    ///
    /// The update is built on copies and only becomes the session's state once
    /// the store has accepted it; on any error the session is unchanged.
    pub fn record_round(
        &mut self,
        input: &RoundInput,
        prediction: &PredictionResult,
        outcome: RoundOutcome,
    ) -> Result<RoundRecord> {
        validation::validate_round_input(input)?;
        validation::validate_outcome(input, &outcome)?;
        if input.candidate(&prediction.predicted_winner).is_none() {
            return Err(PredictorError::InvalidRoundComposition(format!(
                "predicted winner '{}' is not in this round",
                prediction.predicted_winner
            )));
        }

        let bet = match &outcome.bet {
            Some(bet) => {
                let candidate = input.candidate(&bet.candidate_id).ok_or_else(|| {
                    PredictorError::InvalidRoundComposition(format!(
                        "bet placed on unknown contender '{}'",
                        bet.candidate_id
                    ))
                })?;
                Some(BetRecord {
                    staked_candidate_id: bet.candidate_id.clone(),
                    amount: bet.amount,
                    odds_at_stake: candidate.odds,
                    outcome: if bet.candidate_id == outcome.first_place {
                        BetOutcome::Win
                    } else {
                        BetOutcome::Loss
                    },
                })
            }
            None => None,
        };

        let record = RoundRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            candidates: input.candidates.clone(),
            predicted_winner: prediction.predicted_winner.clone(),
            confidence: prediction.confidence_pct(),
            implied_probabilities: prediction.implied_probabilities.clone(),
            predicted_probabilities: prediction.probabilities.clone(),
            first_place: outcome.first_place,
            second_place: outcome.second_place,
            third_place: outcome.third_place,
            other_finishers: outcome.other_finishers,
            finish_margins: outcome.finish_margins,
            strategy_profile: prediction.strategy,
            bet,
        };

        let mut history = self.history.clone();
        history.push(record.clone());
        let mut state = self.state.clone();
        state.refresh_from_history(&history);
        let report = calibration::run_calibration(
            &history,
            &mut state,
            self.config.calibration_window,
            self.config.calibration_rule,
        );

        if let Err(e) = persist(&mut self.store, &history, &state) {
            warn!(round = %record.id, error = %e, "Failed to persist round, discarding update");
            return Err(e);
        }

        info!(
            round = %record.id,
            predicted = %record.predicted_winner,
            winner = %record.first_place,
            correct = record.prediction_correct(),
            total_rounds = state.total_rounds,
            "Recorded round"
        );

        self.history = history;
        self.state = state;
        if report.is_some() {
            self.last_calibration = report;
        }
        Ok(record)
    }

    pub fn set_strategy(&mut self, strategy: StrategyProfile) -> Result<()> {
        self.state.selected_strategy = strategy;
        info!(strategy = %strategy, "Strategy changed");
        persistence::save_learned_state(&mut self.store, &self.state)
    }

    pub fn metrics(&self) -> PerformanceMetrics {
        PerformanceMetrics::from_history(&self.history, &self.state)
    }

    /// Forget every round and learned weight, in memory and in the store.
    pub fn reset(&mut self) -> Result<()> {
        persistence::clear_all(&mut self.store)?;
        self.history.clear();
        self.state = fresh_state(&self.config);
        self.last_calibration = None;
        warn!("Predictor memory reset");
        Ok(())
    }

}

fn persist<S: BlobStore>(store: &mut S, history: &[RoundRecord], state: &LearnedState) -> Result<()> {
    persistence::save_history(store, history)?;
    persistence::save_learned_state(store, state)
}

fn fresh_state(config: &PredictorConfig) -> LearnedState {
    let mut state = LearnedState::with_window(config.recent_window_size);
    state.selected_strategy = config.default_strategy;
    state
}
