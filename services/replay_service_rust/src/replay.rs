//! Replay file format and the predict → advise → record loop.

use anyhow::{anyhow, Context, Result};
use race_predictor_core::{
    BetInput, BetSizeRecommendation, BlobStore, Candidate, Money, OddsValue, PredictionResult,
    PredictorError, PredictorSession, RoundInput, RoundOutcome, RoundRecord, StrategyProfile,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// One race as written in a replay file.
///
/// ```json
/// { "odds": ["2/1", "3/1", "4/1", "5/1", "6/1", "8/1"],
///   "strategy": "balanced",
///   "finish": ["1", "4", "2"],
///   "margins": { "4": 0.5, "2": 1.25 },
///   "stake": { "candidate_id": "1", "amount": 100.0 } }
/// ```
///
/// Runner ids default to the lane numbers "1".."6".
#[derive(Debug, Clone, Deserialize)]
pub struct ReplayRound {
    pub odds: Vec<String>,
    #[serde(default)]
    pub ids: Option<Vec<String>>,
    #[serde(default)]
    pub strategy: Option<String>,
    pub finish: Vec<String>,
    #[serde(default)]
    pub margins: BTreeMap<String, f64>,
    #[serde(default)]
    pub stake: Option<Stake>,
    /// Stake the advised amount on the predicted winner when no explicit stake is given.
    #[serde(default)]
    pub follow_advice: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Stake {
    pub candidate_id: String,
    pub amount: f64,
}

/// What happened to one replayed round.
#[derive(Debug, Clone)]
pub struct ReplayStep {
    pub prediction: PredictionResult,
    pub advice: BetSizeRecommendation,
    pub record: RoundRecord,
}

pub fn load_rounds(path: &Path) -> Result<Vec<ReplayRound>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read replay file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse replay file {}", path.display()))
}

impl ReplayRound {
    pub fn to_input(&self) -> Result<RoundInput> {
        let ids: Vec<String> = match &self.ids {
            Some(ids) if ids.len() == self.odds.len() => ids.clone(),
            Some(ids) => {
                return Err(anyhow!(
                    "{} ids given for {} odds",
                    ids.len(),
                    self.odds.len()
                ))
            }
            None => (1..=self.odds.len()).map(|i| i.to_string()).collect(),
        };

        let candidates = self
            .odds
            .iter()
            .zip(ids)
            .enumerate()
            .map(|(i, (text, id))| {
                let odds = OddsValue::parse(text)?;
                Ok(Candidate::new(id, (i + 1) as u8, odds))
            })
            .collect::<race_predictor_core::Result<Vec<_>>>()?;
        Ok(RoundInput::new(candidates))
    }

    pub fn strategy(&self, fallback: StrategyProfile) -> Result<StrategyProfile> {
        match &self.strategy {
            Some(name) => Ok(name.parse()?),
            None => Ok(fallback),
        }
    }

    pub fn to_outcome(&self, advised: Option<(&str, Money)>) -> Result<RoundOutcome> {
        let mut finish = self.finish.iter().cloned();
        let first_place = finish
            .next()
            .ok_or_else(|| anyhow!("finish order is empty"))?;

        let bet = match (&self.stake, advised) {
            (Some(stake), _) => Some(BetInput {
                candidate_id: stake.candidate_id.clone(),
                amount: Money::from_dollars(stake.amount),
            }),
            (None, Some((id, amount))) if self.follow_advice && amount.is_positive() => {
                Some(BetInput {
                    candidate_id: id.to_string(),
                    amount,
                })
            }
            _ => None,
        };

        Ok(RoundOutcome {
            first_place,
            second_place: finish.next(),
            third_place: finish.next(),
            other_finishers: finish.collect(),
            finish_margins: self.margins.clone(),
            bet,
        })
    }
}

fn replay_round<S: BlobStore>(
    session: &mut PredictorSession<S>,
    round: &ReplayRound,
    n: usize,
) -> Result<ReplayStep> {
    let input = round.to_input()?;
    let strategy = round.strategy(session.selected_strategy())?;
    let prediction = session.predict(&input, strategy)?;
    let advice = session.advise_bet(&prediction);

    info!(
        "Round {}: {} predicts {} ({:.1}% confidence, {}){}",
        n,
        strategy,
        prediction.predicted_winner,
        prediction.confidence_pct(),
        prediction.agreement.label,
        if prediction.skip_recommended { " [skip]" } else { "" }
    );
    for notice in &prediction.hot_streaks {
        info!(
            "Round {}: {} is on a {}-race win streak",
            n, notice.candidate_id, notice.win_streak
        );
    }
    info!("Round {}: advised stake {} - {}", n, advice.amount, advice.explanation);

    let outcome = round.to_outcome(Some((prediction.predicted_winner.as_str(), advice.amount)))?;
    let record = session.record_round(&input, &prediction, outcome)?;
    info!(
        "Round {}: winner {} ({})",
        n,
        record.first_place,
        if record.prediction_correct() { "correct" } else { "missed" }
    );

    Ok(ReplayStep {
        prediction,
        advice,
        record,
    })
}

/// Run every round through the session.
///
/// A round that fails validation is logged and skipped; storage failures abort.
pub fn replay<S: BlobStore>(
    session: &mut PredictorSession<S>,
    rounds: &[ReplayRound],
) -> Result<Vec<ReplayStep>> {
    let mut steps = Vec::with_capacity(rounds.len());

    for (i, round) in rounds.iter().enumerate() {
        let n = i + 1;
        match replay_round(session, round, n) {
            Ok(step) => steps.push(step),
            Err(e) => match e.downcast_ref::<PredictorError>() {
                Some(err) if err.is_validation() => warn!("Round {} skipped: {}", n, err),
                _ => return Err(e.context(format!("Round {} failed", n))),
            },
        }
    }

    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use race_predictor_core::{MemoryBlobStore, PredictorConfig};

    fn rounds() -> Vec<ReplayRound> {
        serde_json::from_str(
            r#"[
                { "odds": ["2/1", "3/1", "4/1", "5/1", "6/1", "8/1"],
                  "finish": ["1", "2", "3"],
                  "stake": { "candidate_id": "1", "amount": 100.0 } },
                { "odds": ["evens", "5-2", "4.0", "6/1", "10/1", "12/1"],
                  "strategy": "aggressive",
                  "finish": ["2", "1"],
                  "margins": { "1": 0.75 } },
                { "odds": ["2/1", "3/1"], "finish": ["1"] }
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_parse_round() {
        let all = rounds();
        let r = &all[1];
        let input = r.to_input().unwrap();
        assert_eq!(input.candidates.len(), 6);
        assert_eq!(input.candidates[1].odds.to_decimal(), 3.5);
        assert_eq!(r.strategy(StrategyProfile::Balanced).unwrap(), StrategyProfile::Aggressive);

        let outcome = r.to_outcome(None).unwrap();
        assert_eq!(outcome.first_place, "2");
        assert_eq!(outcome.second_place.as_deref(), Some("1"));
        assert_eq!(outcome.third_place, None);
    }

    #[test]
    fn test_replay_skips_invalid_rounds() {
        let mut session = PredictorSession::open(MemoryBlobStore::new(), PredictorConfig::default());
        let steps = replay(&mut session, &rounds()).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(session.history().len(), 2);
        assert!(steps[0].prediction.odds_only);
        assert!(!steps[1].prediction.odds_only);
        assert_eq!(session.metrics().total_bet_amount.as_dollars(), 100.0);
    }

    #[test]
    fn test_follow_advice() {
        let round: ReplayRound = serde_json::from_str(
            r#"{ "odds": ["2/1","3/1","4/1","5/1","6/1","8/1"], "finish": ["1"], "follow_advice": true }"#,
        )
        .unwrap();
        let outcome = round.to_outcome(Some(("1", Money::from_dollars(300.0)))).unwrap();
        assert_eq!(outcome.bet.unwrap().amount.as_dollars(), 300.0);

        let outcome = round.to_outcome(Some(("1", Money::zero()))).unwrap();
        assert!(outcome.bet.is_none());
    }

    #[test]
    fn test_load_rounds_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.json");
        fs::write(&path, r#"[{ "odds": ["2/1","3/1","4/1","5/1","6/1","8/1"], "finish": ["3"] }]"#)
            .unwrap();
        let loaded = load_rounds(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(load_rounds(&dir.path().join("missing.json")).is_err());
    }
}
