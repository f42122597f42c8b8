//! Round, candidate and bet types shared by every component.

use crate::odds::OddsValue;
use crate::scoring::strategy::StrategyProfile;
use crate::utils::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Number of runners in every round.
pub const FIELD_SIZE: usize = 6;

/// Largest stake a bet may record.
pub const MAX_BET_DOLLARS: f64 = 10_000.0;

pub type CandidateId = String;

/// One runner in a round.
///
/// `candidate_id` is stable across rounds; `lane_index` is the slot it ran
/// from this time (1-6) and may change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: CandidateId,
    pub lane_index: u8,
    pub odds: OddsValue,
}

impl Candidate {
    pub fn new(candidate_id: impl Into<String>, lane_index: u8, odds: OddsValue) -> Self {
        Self {
            candidate_id: candidate_id.into(),
            lane_index,
            odds,
        }
    }

    /// Runner whose id is its lane number, the usual race-card convention.
    pub fn in_lane(lane_index: u8, odds: OddsValue) -> Self {
        Self::new(lane_index.to_string(), lane_index, odds)
    }

    #[inline]
    pub fn implied_probability(&self) -> f64 {
        self.odds.implied_probability()
    }
}

/// The six candidates of a round awaiting a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundInput {
    pub candidates: Vec<Candidate>,
}

impl RoundInput {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    /// Field built from "N/1" numerators, runner ids "1".."6".
    pub fn from_numerators(numerators: &[f64]) -> crate::error::Result<Self> {
        let candidates = numerators
            .iter()
            .enumerate()
            .map(|(i, n)| Ok(Candidate::in_lane((i + 1) as u8, OddsValue::from_numerator(*n)?)))
            .collect::<crate::error::Result<Vec<_>>>()?;
        Ok(Self { candidates })
    }

    pub fn candidate(&self, candidate_id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.candidate_id == candidate_id)
    }
}

/// Stake placed on a round, as entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetInput {
    pub candidate_id: CandidateId,
    pub amount: Money,
}

/// Finishing result of a round, as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub first_place: CandidateId,
    #[serde(default)]
    pub second_place: Option<CandidateId>,
    #[serde(default)]
    pub third_place: Option<CandidateId>,
    /// Finishers from 4th place onward, in order, when known.
    #[serde(default)]
    pub other_finishers: Vec<CandidateId>,
    /// Distance behind the winner per candidate, when recorded.
    #[serde(default)]
    pub finish_margins: BTreeMap<CandidateId, f64>,
    #[serde(default)]
    pub bet: Option<BetInput>,
}

impl RoundOutcome {
    pub fn winner(first_place: impl Into<String>) -> Self {
        Self {
            first_place: first_place.into(),
            ..Default::default()
        }
    }

    pub fn podium(
        first: impl Into<String>,
        second: impl Into<String>,
        third: impl Into<String>,
    ) -> Self {
        Self {
            first_place: first.into(),
            second_place: Some(second.into()),
            third_place: Some(third.into()),
            ..Default::default()
        }
    }
}

/// Finish classification used by the statistics aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Placing {
    Win,
    Second,
    Third,
    /// Finished 4th-6th.
    Lower,
    /// Ran, but the finishing position was not recorded.
    Unplaced,
}

impl Placing {
    /// Streak family of this placing: 2nd and 3rd share the podium run.
    pub fn streak_class(&self) -> StreakClass {
        match self {
            Placing::Win => StreakClass::Win,
            Placing::Second | Placing::Third => StreakClass::Podium,
            Placing::Lower => StreakClass::Lower,
            Placing::Unplaced => StreakClass::Unplaced,
        }
    }

    /// Position value used by momentum and recent-form signals.
    pub fn value(&self) -> f64 {
        match self {
            Placing::Win => 1.0,
            Placing::Second => 0.7,
            Placing::Third => 0.5,
            Placing::Lower | Placing::Unplaced => 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreakClass {
    Win,
    Podium,
    Lower,
    Unplaced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BetOutcome {
    Win,
    Loss,
}

/// Stake recorded against a finished round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetRecord {
    pub staked_candidate_id: CandidateId,
    pub amount: Money,
    pub odds_at_stake: OddsValue,
    pub outcome: BetOutcome,
}

impl BetRecord {
    /// Total returned to the bettor: stake × decimal odds on a win, nothing otherwise.
    pub fn payout(&self) -> Money {
        match self.outcome {
            BetOutcome::Win => self.amount.payout_at_decimal_odds(self.odds_at_stake.to_decimal()),
            BetOutcome::Loss => Money::zero(),
        }
    }
}

/// One completed round. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub candidates: Vec<Candidate>,
    pub predicted_winner: CandidateId,
    /// Stated confidence, 0-100.
    pub confidence: f64,
    pub implied_probabilities: BTreeMap<CandidateId, f64>,
    pub predicted_probabilities: BTreeMap<CandidateId, f64>,
    pub first_place: CandidateId,
    #[serde(default)]
    pub second_place: Option<CandidateId>,
    #[serde(default)]
    pub third_place: Option<CandidateId>,
    #[serde(default)]
    pub other_finishers: Vec<CandidateId>,
    #[serde(default)]
    pub finish_margins: BTreeMap<CandidateId, f64>,
    pub strategy_profile: StrategyProfile,
    #[serde(default)]
    pub bet: Option<BetRecord>,
}

impl RoundRecord {
    pub fn actual_winner(&self) -> &str {
        &self.first_place
    }

    pub fn prediction_correct(&self) -> bool {
        self.predicted_winner == self.first_place
    }

    pub fn candidate(&self, candidate_id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.candidate_id == candidate_id)
    }

    fn podium_complete(&self) -> bool {
        self.second_place.is_some() && self.third_place.is_some()
    }

    /// Finishing position (1-based) if recorded.
    pub fn position_of(&self, candidate_id: &str) -> Option<u8> {
        if self.first_place == candidate_id {
            return Some(1);
        }
        if self.second_place.as_deref() == Some(candidate_id) {
            return Some(2);
        }
        if self.third_place.as_deref() == Some(candidate_id) {
            return Some(3);
        }
        self.other_finishers
            .iter()
            .position(|id| id == candidate_id)
            .map(|i| (i + 4) as u8)
    }

    /// Placing of a contender, or `None` if it did not run in this round.
    pub fn placing_of(&self, candidate_id: &str) -> Option<Placing> {
        self.candidate(candidate_id)?;
        let placing = match self.position_of(candidate_id) {
            Some(1) => Placing::Win,
            Some(2) => Placing::Second,
            Some(3) => Placing::Third,
            Some(_) => Placing::Lower,
            None if self.podium_complete() => Placing::Lower,
            None => Placing::Unplaced,
        };
        Some(placing)
    }

    pub fn margin_of(&self, candidate_id: &str) -> Option<f64> {
        self.finish_margins.get(candidate_id).copied()
    }

    /// Id of the market favourite (shortest odds, first listed on ties).
    pub fn market_favourite(&self) -> Option<&str> {
        let mut best: Option<&Candidate> = None;
        for c in &self.candidates {
            match best {
                Some(b) if c.implied_probability() <= b.implied_probability() => {}
                _ => best = Some(c),
            }
        }
        best.map(|c| c.candidate_id.as_str())
    }
}
