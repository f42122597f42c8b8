//! Signal agreement: do the independent signal families pick the same runner?

use crate::stats::{CandidateStats, VarianceEntry};
use crate::types::Candidate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Agreement at or above this is "High Agreement".
pub const HIGH_AGREEMENT: f64 = 0.7;
/// Agreement below this is "Mixed Signals".
pub const MIXED_SIGNALS: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalFamily {
    Odds,
    WinStreak,
    Momentum,
    Consistency,
    OddsMovement,
}

impl SignalFamily {
    pub const ALL: [SignalFamily; 5] = [
        SignalFamily::Odds,
        SignalFamily::WinStreak,
        SignalFamily::Momentum,
        SignalFamily::Consistency,
        SignalFamily::OddsMovement,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgreementLabel {
    HighAgreement,
    Moderate,
    MixedSignals,
}

impl AgreementLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_AGREEMENT {
            AgreementLabel::HighAgreement
        } else if score < MIXED_SIGNALS {
            AgreementLabel::MixedSignals
        } else {
            AgreementLabel::Moderate
        }
    }
}

impl fmt::Display for AgreementLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgreementLabel::HighAgreement => "High Agreement",
            AgreementLabel::Moderate => "Moderate",
            AgreementLabel::MixedSignals => "Mixed Signals",
        })
    }
}

/// Which runner a family would pick on its own (`None` = abstained).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyPick {
    pub family: SignalFamily,
    pub candidate_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementReport {
    /// Fraction of voting families that back the majority pick.
    pub score: f64,
    pub label: AgreementLabel,
    pub majority_pick: Option<String>,
    pub picks: Vec<FamilyPick>,
}

impl AgreementReport {
    /// Report used when only the market has an opinion.
    pub fn unanimous(candidate_id: &str) -> Self {
        Self {
            score: 1.0,
            label: AgreementLabel::HighAgreement,
            majority_pick: Some(candidate_id.to_string()),
            picks: vec![FamilyPick {
                family: SignalFamily::Odds,
                candidate_id: Some(candidate_id.to_string()),
            }],
        }
    }
}

/// Index of the unique maximum above `floor`; ties or nothing above the floor abstain.
fn unique_argmax(values: &[f64], floor: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    let mut tied = false;
    for (i, v) in values.iter().enumerate() {
        if !v.is_finite() || *v <= floor {
            continue;
        }
        match best {
            None => best = Some((i, *v)),
            Some((_, b)) if *v > b => {
                best = Some((i, *v));
                tied = false;
            }
            Some((_, b)) if *v == b => tied = true,
            _ => {}
        }
    }
    if tied {
        None
    } else {
        best.map(|(i, _)| i)
    }
}

/// Per-family pick for each candidate in the field.
///
/// - Odds: highest implied probability
/// - Win streak: longest current win streak
/// - Momentum: highest momentum score
/// - Consistency: steadiest margin bucket
/// - Odds movement: most shortened price
pub fn family_picks<'a>(
    candidates: &[Candidate],
    stats_for: impl Fn(&str) -> Option<&'a CandidateStats>,
    variance_for: impl Fn(&str) -> Option<&'a VarianceEntry>,
) -> Vec<FamilyPick> {
    let column = |f: &dyn Fn(&Candidate) -> f64| candidates.iter().map(f).collect::<Vec<f64>>();

    SignalFamily::ALL
        .iter()
        .map(|family| {
            let values = match family {
                SignalFamily::Odds => column(&|c: &Candidate| c.implied_probability()),
                SignalFamily::WinStreak => column(&|c: &Candidate| {
                    stats_for(&c.candidate_id).map_or(0.0, |s| s.win_streak as f64)
                }),
                SignalFamily::Momentum => column(&|c: &Candidate| {
                    stats_for(&c.candidate_id).map_or(0.0, |s| s.momentum_score)
                }),
                SignalFamily::Consistency => column(&|c: &Candidate| {
                    variance_for(&c.candidate_id).map_or(0.0, |v| v.consistency.rank() as f64)
                }),
                SignalFamily::OddsMovement => column(&|c: &Candidate| {
                    stats_for(&c.candidate_id)
                        .and_then(|s| s.odds_movement)
                        .map_or(0.0, |m| -m)
                }),
            };
            FamilyPick {
                family: *family,
                candidate_id: unique_argmax(&values, 0.0).map(|i| candidates[i].candidate_id.clone()),
            }
        })
        .collect()
}

/// Fold family picks into an agreement score.
///
/// The majority pick is the most-voted runner; on a tie the predicted winner
/// wins if it is among the tied, otherwise the earliest-voted runner.
/// With no voting family the score is 1.0.
pub fn evaluate_agreement(picks: Vec<FamilyPick>, predicted_winner: &str) -> AgreementReport {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    for pick in &picks {
        if let Some(id) = pick.candidate_id.as_deref() {
            match tally.iter_mut().find(|(t, _)| *t == id) {
                Some(entry) => entry.1 += 1,
                None => tally.push((id, 1)),
            }
        }
    }

    let voters: usize = tally.iter().map(|(_, n)| n).sum();
    if voters == 0 {
        return AgreementReport {
            score: 1.0,
            label: AgreementLabel::HighAgreement,
            majority_pick: None,
            picks,
        };
    }

    let top = tally.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let majority = tally
        .iter()
        .find(|(id, n)| *n == top && *id == predicted_winner)
        .or_else(|| tally.iter().find(|(_, n)| *n == top))
        .map(|(id, _)| id.to_string());

    let score = top as f64 / voters as f64;
    AgreementReport {
        score,
        label: AgreementLabel::from_score(score),
        majority_pick: majority,
        picks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(family: SignalFamily, id: Option<&str>) -> FamilyPick {
        FamilyPick {
            family,
            candidate_id: id.map(String::from),
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(AgreementLabel::from_score(1.0), AgreementLabel::HighAgreement);
        assert_eq!(AgreementLabel::from_score(0.7), AgreementLabel::HighAgreement);
        assert_eq!(AgreementLabel::from_score(0.5), AgreementLabel::Moderate);
        assert_eq!(AgreementLabel::from_score(0.4), AgreementLabel::Moderate);
        assert_eq!(AgreementLabel::from_score(0.39), AgreementLabel::MixedSignals);
        assert_eq!(AgreementLabel::HighAgreement.to_string(), "High Agreement");
    }

    #[test]
    fn test_unique_argmax() {
        assert_eq!(unique_argmax(&[0.1, 0.5, 0.3], 0.0), Some(1));
        assert_eq!(unique_argmax(&[0.5, 0.5, 0.3], 0.0), None);
        assert_eq!(unique_argmax(&[0.0, 0.0], 0.0), None);
        assert_eq!(unique_argmax(&[0.5, 0.5, 0.9], 0.0), Some(2));
    }

    #[test]
    fn test_majority_and_abstentions() {
        let picks = vec![
            pick(SignalFamily::Odds, Some("1")),
            pick(SignalFamily::WinStreak, Some("1")),
            pick(SignalFamily::Momentum, Some("3")),
            pick(SignalFamily::Consistency, None),
            pick(SignalFamily::OddsMovement, Some("1")),
        ];
        let report = evaluate_agreement(picks, "1");
        assert_eq!(report.majority_pick.as_deref(), Some("1"));
        assert!((report.score - 0.75).abs() < 1e-12);
        assert_eq!(report.label, AgreementLabel::HighAgreement);
    }

    #[test]
    fn test_mixed_signals() {
        let picks = vec![
            pick(SignalFamily::Odds, Some("1")),
            pick(SignalFamily::WinStreak, Some("2")),
            pick(SignalFamily::Momentum, Some("3")),
            pick(SignalFamily::Consistency, Some("4")),
            pick(SignalFamily::OddsMovement, Some("5")),
        ];
        let report = evaluate_agreement(picks, "3");
        assert!((report.score - 0.2).abs() < 1e-12);
        assert_eq!(report.label, AgreementLabel::MixedSignals);
        assert_eq!(report.majority_pick.as_deref(), Some("3"));
    }

    #[test]
    fn test_no_voters() {
        let picks = vec![pick(SignalFamily::Odds, None)];
        let report = evaluate_agreement(picks, "1");
        assert_eq!(report.score, 1.0);
        assert_eq!(report.majority_pick, None);
    }
}
