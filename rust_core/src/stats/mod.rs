//! Per-candidate statistics aggregated from round history.
//!
//! This module provides:
//! - Lifetime statistics over the full history
//! - Recent-window counts over the last N rounds a candidate ran in
//! - The blended stats persisted in `LearnedState`
//! - Margin variance / consistency per candidate
//!
//! History is always passed oldest-first (insertion order). Everything here is
//! recomputed from scratch on each call, so repeated aggregation never drifts.

pub mod streaks;
pub mod variance;

use crate::odds::OddsValue;
use crate::types::{Placing, RoundRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use streaks::{compute_momentum, compute_streaks, Streaks};
pub use variance::{compute_variance_entry, Consistency, VarianceEntry};

/// Entries kept in `recent_form`.
pub const RECENT_FORM_LEN: usize = 5;

/// Weight of the recent-window counts in the blend.
pub const RECENT_BLEND_WEIGHT: f64 = 0.6;
/// Weight of the lifetime counts in the blend.
pub const LIFETIME_BLEND_WEIGHT: f64 = 0.4;

/// One finish in a candidate's recent form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormEntry {
    pub placing: Placing,
    #[serde(default)]
    pub position: Option<u8>,
    #[serde(default)]
    pub margin: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Appearance and finish counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinishCounts {
    pub appearances: u32,
    pub wins: u32,
    /// Finished 2nd.
    pub places: u32,
    /// Finished 3rd.
    pub shows: u32,
}

impl FinishCounts {
    fn tally<'a>(placings: impl Iterator<Item = &'a Placing>) -> Self {
        let mut counts = FinishCounts::default();
        for placing in placings {
            counts.appearances += 1;
            match placing {
                Placing::Win => counts.wins += 1,
                Placing::Second => counts.places += 1,
                Placing::Third => counts.shows += 1,
                Placing::Lower | Placing::Unplaced => {}
            }
        }
        counts
    }

    /// `round(recent * 0.6 + lifetime * 0.4)` per field.
    pub fn blend(recent: &FinishCounts, lifetime: &FinishCounts) -> Self {
        let mix = |r: u32, l: u32| {
            (r as f64 * RECENT_BLEND_WEIGHT + l as f64 * LIFETIME_BLEND_WEIGHT).round() as u32
        };
        FinishCounts {
            appearances: mix(recent.appearances, lifetime.appearances),
            wins: mix(recent.wins, lifetime.wins),
            places: mix(recent.places, lifetime.places),
            shows: mix(recent.shows, lifetime.shows),
        }
    }
}

/// Aggregate form of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct CandidateStats {
    pub appearances: u32,
    pub wins: u32,
    pub places: u32,
    pub shows: u32,
    /// Last five finishes, newest first.
    pub recent_form: Vec<FormEntry>,
    pub win_streak: u32,
    pub placer_streak: u32,
    pub lower_streak: u32,
    pub momentum_score: f64,
    /// Fractional change between the two newest quotes; `None` with < 2 quotes.
    #[serde(default)]
    pub odds_movement: Option<f64>,
}

impl CandidateStats {
    pub fn counts(&self) -> FinishCounts {
        FinishCounts {
            appearances: self.appearances,
            wins: self.wins,
            places: self.places,
            shows: self.shows,
        }
    }

    fn with_counts(mut self, counts: FinishCounts) -> Self {
        self.appearances = counts.appearances;
        self.wins = counts.wins;
        self.places = counts.places;
        self.shows = counts.shows;
        self
    }

    pub fn win_rate(&self) -> f64 {
        if self.appearances == 0 {
            0.0
        } else {
            (self.wins as f64 / self.appearances as f64).min(1.0)
        }
    }
}

/// A candidate's appearances in the history, newest first.
struct Appearance<'a> {
    record: &'a RoundRecord,
    placing: Placing,
    odds: OddsValue,
}

fn appearances_newest_first<'a>(
    history: &'a [RoundRecord],
    candidate_id: &str,
) -> Vec<Appearance<'a>> {
    history
        .iter()
        .rev()
        .filter_map(|record| {
            let candidate = record.candidate(candidate_id)?;
            let placing = record.placing_of(candidate_id)?;
            Some(Appearance {
                record,
                placing,
                odds: candidate.odds,
            })
        })
        .collect()
}

/// `(current - previous) / previous` over the two newest fractional prices.
pub fn compute_odds_movement(quotes_newest_first: &[OddsValue]) -> Option<f64> {
    match quotes_newest_first {
        [current, previous, ..] => {
            let prev = previous.fractional();
            Some((current.fractional() - prev) / prev)
        }
        _ => None,
    }
}

/// Lifetime statistics for one candidate over the whole history.
///
/// A candidate that never ran yields zeroed counters, empty form, momentum 0
/// and no odds movement.
pub fn compute_candidate_stats(history: &[RoundRecord], candidate_id: &str) -> CandidateStats {
    let appearances = appearances_newest_first(history, candidate_id);
    lifetime_stats(candidate_id, &appearances)
}

fn lifetime_stats(candidate_id: &str, appearances: &[Appearance<'_>]) -> CandidateStats {
    let placings: Vec<Placing> = appearances.iter().map(|a| a.placing).collect();
    let quotes: Vec<OddsValue> = appearances.iter().take(2).map(|a| a.odds).collect();
    let streaks = compute_streaks(&placings);

    let recent_form = appearances
        .iter()
        .take(RECENT_FORM_LEN)
        .map(|a| FormEntry {
            placing: a.placing,
            position: a.record.position_of(candidate_id),
            margin: a.record.margin_of(candidate_id),
            timestamp: a.record.timestamp,
        })
        .collect();

    CandidateStats {
        recent_form,
        win_streak: streaks.win,
        placer_streak: streaks.placer,
        lower_streak: streaks.lower,
        momentum_score: compute_momentum(&placings),
        odds_movement: compute_odds_movement(&quotes),
        ..Default::default()
    }
    .with_counts(FinishCounts::tally(placings.iter()))
}

/// Counts over the newest `window` rounds the candidate ran in.
pub fn compute_recent_counts(
    history: &[RoundRecord],
    candidate_id: &str,
    window: usize,
) -> FinishCounts {
    let appearances = appearances_newest_first(history, candidate_id);
    FinishCounts::tally(appearances.iter().take(window).map(|a| &a.placing))
}

/// Stats as persisted: blended counts, lifetime form/streaks/momentum/movement.
pub fn compute_blended_stats(
    history: &[RoundRecord],
    candidate_id: &str,
    window: usize,
) -> CandidateStats {
    let appearances = appearances_newest_first(history, candidate_id);
    let lifetime = lifetime_stats(candidate_id, &appearances);
    let recent = FinishCounts::tally(appearances.iter().take(window).map(|a| &a.placing));
    let blended = FinishCounts::blend(&recent, &lifetime.counts());
    lifetime.with_counts(blended)
}

/// Margin consistency for one candidate over the whole history.
pub fn compute_candidate_variance(history: &[RoundRecord], candidate_id: &str) -> VarianceEntry {
    let margins: Vec<f64> = history
        .iter()
        .filter(|r| r.candidate(candidate_id).is_some())
        .filter_map(|r| r.margin_of(candidate_id))
        .collect();
    compute_variance_entry(&margins)
}

/// Everything the aggregator derives from a history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedStats {
    pub contender_stats: BTreeMap<String, CandidateStats>,
    pub variance_data: BTreeMap<String, VarianceEntry>,
}

/// Blended stats and variance for every candidate that appears in the history.
pub fn aggregate(history: &[RoundRecord], window: usize) -> AggregatedStats {
    let mut ids: Vec<&str> = history
        .iter()
        .flat_map(|r| r.candidates.iter().map(|c| c.candidate_id.as_str()))
        .collect();
    ids.sort_unstable();
    ids.dedup();

    let mut aggregated = AggregatedStats::default();
    for id in ids {
        aggregated
            .contender_stats
            .insert(id.to_string(), compute_blended_stats(history, id, window));
        aggregated
            .variance_data
            .insert(id.to_string(), compute_candidate_variance(history, id));
    }
    aggregated
}


#[cfg(test)]
mod tests {
    use super::test_support::round;
    use super::*;

    const ODDS: [f64; 6] = [2.0, 3.0, 4.0, 5.0, 6.0, 8.0];

    #[test]
    fn test_empty_history_yields_zeroed_stats() {
        let stats = compute_candidate_stats(&[], "1");
        assert_eq!(stats.appearances, 0);
        assert_eq!(stats.wins, 0);
        assert_eq!(stats.places, 0);
        assert_eq!(stats.shows, 0);
        assert_eq!(stats.win_streak, 0);
        assert_eq!(stats.placer_streak, 0);
        assert_eq!(stats.lower_streak, 0);
        assert!(stats.recent_form.is_empty());
        assert_eq!(stats.momentum_score, 0.0);
        assert_eq!(stats.odds_movement, None);
        assert_eq!(
            compute_candidate_variance(&[], "1").consistency,
            Consistency::Unknown
        );
    }

    #[test]
    fn test_lifetime_counts_and_form() {
        let history = vec![
            round(0, ODDS, &["1", "2", "3"]),
            round(1, ODDS, &["2", "1", "3"]),
            round(2, ODDS, &["3", "2", "1"]),
            round(3, ODDS, &["1", "3", "2"]),
        ];
        let stats = compute_candidate_stats(&history, "1");
        assert_eq!(stats.appearances, 4);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.places, 1);
        assert_eq!(stats.shows, 1);
        assert_eq!(stats.win_streak, 1);
        assert_eq!(stats.recent_form.len(), 4);
        assert_eq!(stats.recent_form[0].placing, Placing::Win);
        assert_eq!(stats.recent_form[1].position, Some(3));
    }

    #[test]
    fn test_recent_form_capped_at_five() {
        let history: Vec<_> = (0..8).map(|i| round(i, ODDS, &["2", "3", "4"])).collect();
        let stats = compute_candidate_stats(&history, "2");
        assert_eq!(stats.recent_form.len(), RECENT_FORM_LEN);
        assert_eq!(stats.win_streak, 8);
        assert!((stats.momentum_score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_five_consecutive_wins() {
        let mut history = vec![round(0, ODDS, &["2", "3", "4"])];
        history.extend((1..=5).map(|i| round(i, ODDS, &["4", "1", "2"])));
        let stats = compute_candidate_stats(&history, "4");
        assert_eq!(stats.win_streak, 5);
        assert_eq!(stats.placer_streak, 0);
        assert_eq!(stats.lower_streak, 0);
    }

    #[test]
    fn test_streak_exclusivity_across_candidates() {
        let history = vec![
            round(0, ODDS, &["1", "2", "3"]),
            round(1, ODDS, &["2", "3", "1"]),
            round(2, ODDS, &["2", "1", "6"]),
            round(3, ODDS, &["5", "1", "4"]),
        ];
        let aggregated = aggregate(&history, 10);
        assert_eq!(aggregated.contender_stats.len(), 6);
        for (id, s) in &aggregated.contender_stats {
            let nonzero = [s.win_streak, s.placer_streak, s.lower_streak]
                .iter()
                .filter(|v| **v > 0)
                .count();
            assert!(nonzero <= 1, "candidate {} has {:?}", id, s);
        }
        assert_eq!(aggregated.contender_stats["1"].placer_streak, 3);
        assert_eq!(aggregated.contender_stats["3"].lower_streak, 2);
        assert_eq!(aggregated.contender_stats["5"].win_streak, 1);
    }

    #[test]
    fn test_odds_movement_uses_two_newest_quotes() {
        let history = vec![
            round(0, [9.0, 3.0, 4.0, 5.0, 6.0, 8.0], &["1"]),
            round(1, [4.0, 3.0, 4.0, 5.0, 6.0, 8.0], &["2"]),
            round(2, [2.0, 3.0, 4.0, 5.0, 6.0, 8.0], &["3"]),
        ];
        let stats = compute_candidate_stats(&history, "1");
        // 4/1 -> 2/1 shortened by half
        assert!((stats.odds_movement.unwrap() + 0.5).abs() < 1e-12);

        let single = compute_candidate_stats(&history[..1], "1");
        assert_eq!(single.odds_movement, None);
    }

    #[test]
    fn test_blend_counts() {
        // Candidate "1" wins the first 10 rounds then loses the next 10.
        let mut history: Vec<_> = (0..10).map(|i| round(i, ODDS, &["1", "2", "3"])).collect();
        history.extend((10..20).map(|i| round(i, ODDS, &["2", "3", "4"])));

        let blended = compute_blended_stats(&history, "1", 10);
        // recent: 10 apps, 0 wins; lifetime: 20 apps, 10 wins
        assert_eq!(blended.appearances, 14);
        assert_eq!(blended.wins, 4);
        assert_eq!(blended.lower_streak, 10);

        let recent = compute_recent_counts(&history, "1", 10);
        assert_eq!(recent.wins, 0);
        assert_eq!(recent.appearances, 10);
    }

    #[test]
    fn test_blend_rounding() {
        let recent = FinishCounts { appearances: 3, wins: 1, places: 1, shows: 0 };
        let lifetime = FinishCounts { appearances: 7, wins: 2, places: 2, shows: 1 };
        let b = FinishCounts::blend(&recent, &lifetime);
        // 1.8 + 2.8 = 4.6 -> 5; 0.6 + 0.8 = 1.4 -> 1; shows 0.4 -> 0
        assert_eq!(b.appearances, 5);
        assert_eq!(b.wins, 1);
        assert_eq!(b.places, 1);
        assert_eq!(b.shows, 0);
    }

    #[test]
    fn test_variance_from_recorded_margins() {
        let mut history = vec![
            round(0, ODDS, &["1", "2", "3"]),
            round(1, ODDS, &["1", "2", "3"]),
            round(2, ODDS, &["1", "2", "3"]),
        ];
        history[0].finish_margins.insert("2".to_string(), 1.0);
        history[1].finish_margins.insert("2".to_string(), 1.5);
        history[2].finish_margins.insert("2".to_string(), 1.25);
        history[2].finish_margins.insert("3".to_string(), 4.0);

        let steady = compute_candidate_variance(&history, "2");
        assert_eq!(steady.sample_count, 3);
        assert_eq!(steady.consistency, Consistency::High);

        let sparse = compute_candidate_variance(&history, "3");
        assert_eq!(sparse.consistency, Consistency::Unknown);
    }
}
