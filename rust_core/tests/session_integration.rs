//! End-to-end session tests: predict → record → calibrate → persist → reload.

use race_predictor_core::calibration::CalibrationRule;
use race_predictor_core::persistence::{self, ENTRIES_KEY, LEARNED_STATE_KEY};
use race_predictor_core::scoring::weights::{SignalKind, SignalWeights};
use race_predictor_core::{
    BetInput, BlobStore, FileBlobStore, MemoryBlobStore, Money, PredictorConfig, PredictorSession,
    RoundInput, RoundOutcome, StrategyProfile,
};

fn field() -> RoundInput {
    RoundInput::from_numerators(&[2.0, 3.0, 4.0, 5.0, 6.0, 8.0]).unwrap()
}

fn record(session: &mut PredictorSession<impl BlobStore>, finish: [&str; 3]) {
    let input = field();
    let prediction = session.predict(&input, StrategyProfile::Balanced).unwrap();
    session
        .record_round(&input, &prediction, RoundOutcome::podium(finish[0], finish[1], finish[2]))
        .unwrap();
}

#[test]
fn test_odds_only_scenario() {
    let session = PredictorSession::open(MemoryBlobStore::new(), PredictorConfig::default());
    let prediction = session.predict(&field(), StrategyProfile::Balanced).unwrap();
    assert_eq!(prediction.predicted_winner, "1");
    assert!((prediction.confidence_pct() - 33.33).abs() < 0.01);
    assert_eq!(prediction.agreement.label.to_string(), "High Agreement");
}

#[test]
fn test_five_win_streak_triggers_boost() {
    let mut session = PredictorSession::open(MemoryBlobStore::new(), PredictorConfig::default());
    for _ in 0..5 {
        record(&mut session, ["4", "1", "2"]);
    }

    let stats = session.learned_state().stats_for("4").unwrap();
    assert_eq!(stats.win_streak, 5);
    assert_eq!(stats.placer_streak, 0);
    assert_eq!(stats.lower_streak, 0);

    let prediction = session.predict(&field(), StrategyProfile::Balanced).unwrap();
    let boost = StrategyProfile::Balanced.params().hot_streak_boost;
    let hot = prediction
        .breakdown
        .iter()
        .find(|b| b.candidate_id == "4")
        .unwrap();
    assert!(hot.hot_streak_boosted);
    assert!((hot.score - hot.base_score * boost).abs() < 1e-12);
    assert_eq!(prediction.hot_streaks.len(), 1);
    assert_eq!(prediction.hot_streaks[0].candidate_id, "4");
}

#[test]
fn test_streaks_are_exclusive_after_every_round() {
    let mut session = PredictorSession::open(MemoryBlobStore::new(), PredictorConfig::default());
    let finishes = [
        ["1", "2", "3"],
        ["2", "3", "1"],
        ["5", "6", "4"],
        ["1", "4", "2"],
        ["3", "1", "5"],
        ["6", "5", "4"],
    ];
    for finish in finishes {
        record(&mut session, finish);
        for stats in session.learned_state().contender_stats.values() {
            let nonzero = [stats.win_streak, stats.placer_streak, stats.lower_streak]
                .iter()
                .filter(|s| **s > 0)
                .count();
            assert!(nonzero <= 1);
        }
    }
}

#[test]
fn test_weights_stay_bounded_over_many_rounds() {
    let config = PredictorConfig {
        calibration_rule: CalibrationRule::SignalAttribution,
        ..PredictorConfig::default()
    };
    let mut session = PredictorSession::open(MemoryBlobStore::new(), config);
    for i in 0..40 {
        let finish = match i % 4 {
            0 => ["6", "5", "4"],
            1 => ["1", "2", "3"],
            2 => ["3", "1", "2"],
            _ => ["5", "6", "1"],
        };
        record(&mut session, finish);
        let weights = &session.learned_state().signal_weights;
        assert!(weights.satisfies_bounds(), "round {}: {:?}", i, weights);
    }
    assert_eq!(session.history().len(), 40);
    assert!(session.learned_state().current_log_loss.is_some());
}

#[test]
fn test_calibration_runs_from_the_fifth_round() {
    let mut session = PredictorSession::open(MemoryBlobStore::new(), PredictorConfig::default());
    for _ in 0..4 {
        record(&mut session, ["6", "5", "4"]);
        assert!(session.last_calibration().is_none());
        assert_eq!(session.learned_state().signal_weights, SignalWeights::default());
    }
    record(&mut session, ["6", "5", "4"]);
    let report = session.last_calibration().unwrap();
    assert_eq!(report.window_rounds, 5);
    assert!(session.learned_state().signal_weights.satisfies_bounds());
    assert_eq!(
        session.learned_state().last_calibrated_round,
        session.history().last().map(|r| r.id)
    );
}

#[test]
fn test_state_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = PredictorConfig {
        data_dir: dir.path().to_path_buf(),
        ..PredictorConfig::default()
    };

    let (weights, history_len, odds_weight) = {
        let mut session = PredictorSession::open(FileBlobStore::new(dir.path()), config.clone());
        for _ in 0..6 {
            record(&mut session, ["3", "2", "1"]);
        }
        let input = field();
        let prediction = session.predict(&input, StrategyProfile::Value).unwrap();
        let mut outcome = RoundOutcome::winner("1");
        outcome.bet = Some(BetInput {
            candidate_id: "1".to_string(),
            amount: Money::from_dollars(200.0),
        });
        session.record_round(&input, &prediction, outcome).unwrap();
        session.set_strategy(StrategyProfile::Safe).unwrap();

        let state = session.learned_state();
        (
            state.signal_weights,
            session.history().len(),
            state.signal_weights.get(SignalKind::Odds),
        )
    };

    let reopened = PredictorSession::open(FileBlobStore::new(dir.path()), config);
    assert_eq!(reopened.history().len(), history_len);
    assert_eq!(reopened.learned_state().signal_weights, weights);
    assert_eq!(reopened.learned_state().signal_weights.odds, odds_weight);
    assert_eq!(reopened.selected_strategy(), StrategyProfile::Safe);
    assert_eq!(reopened.learned_state().total_bet_amount.as_dollars(), 200.0);
    assert_eq!(reopened.learned_state().contender_stats["3"].wins, 6);

    let metrics = reopened.metrics();
    assert_eq!(metrics.total_rounds, 7);
    assert_eq!(metrics.strategy_roi_pct[&StrategyProfile::Value], 200.0);
}

#[test]
fn test_version_mismatch_starts_fresh() {
    let mut store = MemoryBlobStore::new();
    store
        .save(ENTRIES_KEY, br#"{"version":5,"data":[{"legacy":true}]}"#)
        .unwrap();
    store
        .save(LEARNED_STATE_KEY, br#"{"version":5,"data":{}}"#)
        .unwrap();

    let mut session = PredictorSession::open(store, PredictorConfig::default());
    assert!(session.history().is_empty());
    assert!(!session.learned_state().has_history());

    // The next write replaces the stale blobs with current-version ones.
    record(&mut session, ["1", "2", "3"]);
    assert_eq!(persistence::load_history(session.store()).len(), 1);
}

#[test]
fn test_skip_advice_means_no_stake() {
    let session = PredictorSession::open(MemoryBlobStore::new(), PredictorConfig::default());
    let prediction = session.predict(&field(), StrategyProfile::Safe).unwrap();
    assert!(prediction.skip_recommended);
    let advice = session.advise_bet(&prediction);
    assert!(advice.amount.is_zero());
    assert!(!advice.explanation.is_empty());
}
