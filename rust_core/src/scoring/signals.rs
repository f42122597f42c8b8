//! Per-candidate raw signal values.
//!
//! Every signal is computed independently and lands roughly in [-1, 1]
//! (the odds signal averages 1.0 across a field). Weights are applied by the
//! caller.

use super::weights::{SignalKind, SignalWeights};
use crate::stats::CandidateStats;
use serde::{Deserialize, Serialize};

/// Streak length at which a streak signal saturates.
pub const STREAK_SATURATION: u32 = 5;

/// Raw signal values for one candidate, indexed by `SignalKind`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalValues([f64; SignalKind::COUNT]);

impl SignalValues {
    pub fn get(&self, kind: SignalKind) -> f64 {
        self.0[kind as usize]
    }

    fn set(&mut self, kind: SignalKind, value: f64) {
        self.0[kind as usize] = value;
    }

    /// Weighted sum and the per-signal contributions that make it up.
    pub fn weigh(&self, weights: &SignalWeights) -> (f64, Vec<SignalContribution>) {
        let contributions: Vec<SignalContribution> = SignalKind::ALL
            .iter()
            .map(|kind| {
                let raw = self.get(*kind);
                let weight = weights.get(*kind);
                SignalContribution {
                    signal: *kind,
                    raw,
                    weight,
                    contribution: raw * weight,
                }
            })
            .collect();
        let total = contributions.iter().map(|c| c.contribution).sum();
        (total, contributions)
    }
}

/// One line of a candidate's score breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalContribution {
    pub signal: SignalKind,
    pub raw: f64,
    pub weight: f64,
    pub contribution: f64,
}

fn streak_signal(streak: u32) -> f64 {
    streak.min(STREAK_SATURATION) as f64 / STREAK_SATURATION as f64
}

/// Mean position value over the recent form entries.
pub fn recent_form_signal(stats: &CandidateStats) -> f64 {
    if stats.recent_form.is_empty() {
        return 0.0;
    }
    stats.recent_form.iter().map(|f| f.placing.value()).sum::<f64>() / stats.recent_form.len() as f64
}

/// Shortening odds are bullish: the signal is the negated, clamped movement.
pub fn odds_movement_signal(stats: &CandidateStats) -> f64 {
    stats
        .odds_movement
        .map(|m| (-m).clamp(-1.0, 1.0))
        .unwrap_or(0.0)
}

/// Raw signals for a candidate.
///
/// `market_share` is the candidate's implied probability divided by the
/// field total (overround removed), `field_size` rescales it so an average
/// runner scores 1.0. A candidate with no stats only carries the odds signal.
pub fn compute_signals(
    market_share: f64,
    field_size: usize,
    stats: Option<&CandidateStats>,
) -> SignalValues {
    let mut values = SignalValues::default();
    values.set(SignalKind::Odds, market_share * field_size as f64);

    if let Some(stats) = stats {
        values.set(SignalKind::HistoricalWinRate, stats.win_rate());
        values.set(SignalKind::RecentForm, recent_form_signal(stats));
        values.set(SignalKind::WinStreak, streak_signal(stats.win_streak));
        values.set(SignalKind::PlacerStreak, streak_signal(stats.placer_streak));
        values.set(SignalKind::LowerStreak, -streak_signal(stats.lower_streak));
        values.set(SignalKind::Momentum, stats.momentum_score);
        values.set(SignalKind::OddsMovement, odds_movement_signal(stats));
    }
    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::FormEntry;
    use crate::types::Placing;
    use chrono::Utc;

    fn form(placings: &[Placing]) -> Vec<FormEntry> {
        placings
            .iter()
            .map(|p| FormEntry {
                placing: *p,
                position: None,
                margin: None,
                timestamp: Utc::now(),
            })
            .collect()
    }

    #[test]
    fn test_odds_only_without_stats() {
        let v = compute_signals(0.25, 6, None);
        assert!((v.get(SignalKind::Odds) - 1.5).abs() < 1e-12);
        for kind in &SignalKind::ALL[1..] {
            assert_eq!(v.get(*kind), 0.0);
        }
    }

    #[test]
    fn test_lower_streak_is_negative() {
        let stats = CandidateStats {
            appearances: 3,
            lower_streak: 3,
            ..Default::default()
        };
        let v = compute_signals(0.1, 6, Some(&stats));
        assert!((v.get(SignalKind::LowerStreak) + 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_streak_saturates() {
        let stats = CandidateStats {
            appearances: 9,
            wins: 9,
            win_streak: 9,
            ..Default::default()
        };
        let v = compute_signals(0.1, 6, Some(&stats));
        assert_eq!(v.get(SignalKind::WinStreak), 1.0);
        assert_eq!(v.get(SignalKind::HistoricalWinRate), 1.0);
    }

    #[test]
    fn test_shortening_odds_is_positive() {
        let stats = CandidateStats {
            odds_movement: Some(-0.5),
            ..Default::default()
        };
        assert!((odds_movement_signal(&stats) - 0.5).abs() < 1e-12);

        let drifting = CandidateStats {
            odds_movement: Some(3.0),
            ..Default::default()
        };
        assert_eq!(odds_movement_signal(&drifting), -1.0);
    }

    #[test]
    fn test_recent_form_signal() {
        let stats = CandidateStats {
            recent_form: form(&[Placing::Win, Placing::Third]),
            ..Default::default()
        };
        assert!((recent_form_signal(&stats) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_weigh_sums_contributions() {
        let stats = CandidateStats {
            appearances: 2,
            wins: 1,
            momentum_score: 0.5,
            ..Default::default()
        };
        let v = compute_signals(1.0 / 6.0, 6, Some(&stats));
        let (total, parts) = v.weigh(&SignalWeights::uniform(1.0));
        assert_eq!(parts.len(), SignalKind::COUNT);
        // odds 1.0 + win rate 0.5 + momentum 0.5
        assert!((total - 2.0).abs() < 1e-12);
    }
}
