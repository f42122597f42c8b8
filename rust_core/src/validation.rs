//! Input validation for rounds and outcomes.
//!
//! Each check returns the first problem it finds as a `PredictorError` naming
//! the offending field.

use crate::error::{PredictorError, Result};
use crate::types::{BetInput, RoundInput, RoundOutcome, FIELD_SIZE, MAX_BET_DOLLARS};
use std::collections::HashSet;

fn composition(msg: impl Into<String>) -> PredictorError {
    PredictorError::InvalidRoundComposition(msg.into())
}

/// Exactly six runners, unique ids, unique lanes in 1-6.
pub fn validate_round_input(input: &RoundInput) -> Result<()> {
    if input.candidates.len() != FIELD_SIZE {
        return Err(composition(format!(
            "expected {} contenders, got {}",
            FIELD_SIZE,
            input.candidates.len()
        )));
    }

    let mut ids = HashSet::new();
    let mut lanes = HashSet::new();
    for c in &input.candidates {
        if c.candidate_id.trim().is_empty() {
            return Err(composition("contender id cannot be empty"));
        }
        if !ids.insert(c.candidate_id.as_str()) {
            return Err(composition(format!("duplicate contender '{}'", c.candidate_id)));
        }
        if !(1..=FIELD_SIZE as u8).contains(&c.lane_index) {
            return Err(composition(format!(
                "lane {} of contender '{}' is outside 1-{}",
                c.lane_index, c.candidate_id, FIELD_SIZE
            )));
        }
        if !lanes.insert(c.lane_index) {
            return Err(composition(format!("lane {} is used twice", c.lane_index)));
        }
    }
    Ok(())
}

/// Finishers are distinct contenders, margins are finite and non-negative,
/// and any bet is in range on a contender.
pub fn validate_outcome(input: &RoundInput, outcome: &RoundOutcome) -> Result<()> {
    let is_contender = |id: &str| input.candidate(id).is_some();

    if outcome.first_place.trim().is_empty() {
        return Err(composition("please select the actual winner"));
    }
    if outcome.third_place.is_some() && outcome.second_place.is_none() {
        return Err(composition("3rd place given without 2nd place"));
    }

    let podium = [
        ("1st", Some(outcome.first_place.as_str())),
        ("2nd", outcome.second_place.as_deref()),
        ("3rd", outcome.third_place.as_deref()),
    ];
    let finishers = podium
        .iter()
        .filter_map(|(label, id)| id.map(|id| (*label, id)))
        .chain(outcome.other_finishers.iter().map(|id| ("finisher", id.as_str())));

    let mut seen = HashSet::new();
    for (label, id) in finishers {
        if !is_contender(id) {
            return Err(composition(format!("{} place must be one of the contenders", label)));
        }
        if !seen.insert(id) {
            return Err(composition(format!("'{}' is recorded in more than one position", id)));
        }
    }

    validate_margins(input, outcome)?;
    if let Some(bet) = &outcome.bet {
        validate_bet(input, bet)?;
    }
    Ok(())
}

pub fn validate_margins(input: &RoundInput, outcome: &RoundOutcome) -> Result<()> {
    for (id, margin) in &outcome.finish_margins {
        if input.candidate(id).is_none() {
            return Err(composition(format!("margin recorded for unknown contender '{}'", id)));
        }
        if !margin.is_finite() {
            return Err(composition(format!("margin of '{}' must be a valid number", id)));
        }
        if *margin < 0.0 {
            return Err(composition(format!("margin of '{}' cannot be negative", id)));
        }
    }
    Ok(())
}

/// Stake must be in (0, 10,000] and placed on a contender.
pub fn validate_bet(input: &RoundInput, bet: &BetInput) -> Result<()> {
    let amount = bet.amount.as_dollars();
    if !bet.amount.is_positive() || amount > MAX_BET_DOLLARS {
        return Err(PredictorError::OutOfRangeBet {
            amount,
            max: MAX_BET_DOLLARS,
        });
    }
    if input.candidate(&bet.candidate_id).is_none() {
        return Err(composition(format!(
            "bet placed on unknown contender '{}'",
            bet.candidate_id
        )));
    }
    Ok(())
}
