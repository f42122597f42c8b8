//! Strategy profiles: named presets of signal multipliers and thresholds.
//!
//! Profiles only change the constants fed into the scoring formulas; every
//! profile runs through the same code path.

use super::weights::SignalWeights;
use crate::error::PredictorError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum StrategyProfile {
    /// Leans on the market favourite, demands a wide edge before betting.
    #[serde(alias = "Conservative")]
    Safe,
    /// Leans on form and price movement against the market.
    Value,
    #[default]
    Balanced,
    /// Chases streaks and momentum, bets on any positive edge.
    Aggressive,
}

impl StrategyProfile {
    pub const ALL: [StrategyProfile; 4] = [
        StrategyProfile::Safe,
        StrategyProfile::Value,
        StrategyProfile::Balanced,
        StrategyProfile::Aggressive,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyProfile::Safe => "Safe",
            StrategyProfile::Value => "Value",
            StrategyProfile::Balanced => "Balanced",
            StrategyProfile::Aggressive => "Aggressive",
        }
    }

    pub fn params(&self) -> StrategyParams {
        match self {
            StrategyProfile::Safe => StrategyParams {
                multipliers: SignalWeights {
                    odds: 1.3,
                    historical_win_rate: 1.1,
                    recent_form: 0.9,
                    win_streak: 0.8,
                    placer_streak: 1.0,
                    lower_streak: 1.2,
                    momentum: 0.8,
                    odds_movement: 0.8,
                },
                hot_streak_boost: 1.15,
                value_threshold: 0.05,
            },
            StrategyProfile::Value => StrategyParams {
                multipliers: SignalWeights {
                    odds: 0.8,
                    historical_win_rate: 1.2,
                    recent_form: 1.1,
                    win_streak: 1.0,
                    placer_streak: 1.1,
                    lower_streak: 1.0,
                    momentum: 1.0,
                    odds_movement: 1.3,
                },
                hot_streak_boost: 1.2,
                value_threshold: 0.03,
            },
            StrategyProfile::Balanced => StrategyParams {
                multipliers: SignalWeights::uniform(1.0),
                hot_streak_boost: 1.2,
                value_threshold: 0.02,
            },
            StrategyProfile::Aggressive => StrategyParams {
                multipliers: SignalWeights {
                    odds: 0.6,
                    historical_win_rate: 1.0,
                    recent_form: 1.3,
                    win_streak: 1.4,
                    placer_streak: 1.0,
                    lower_streak: 0.8,
                    momentum: 1.3,
                    odds_movement: 1.2,
                },
                hot_streak_boost: 1.3,
                value_threshold: 0.0,
            },
        }
    }
}

impl fmt::Display for StrategyProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StrategyProfile {
    type Err = PredictorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "safe" | "conservative" => Ok(StrategyProfile::Safe),
            "value" => Ok(StrategyProfile::Value),
            "balanced" => Ok(StrategyProfile::Balanced),
            "aggressive" => Ok(StrategyProfile::Aggressive),
            other => Err(PredictorError::InvalidRoundComposition(format!(
                "unknown strategy profile '{}'",
                other
            ))),
        }
    }
}

/// Constants a profile feeds into scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyParams {
    /// Multiplied element-wise into the learned weights.
    pub multipliers: SignalWeights,
    /// Score multiplier for a runner on a hot win streak.
    pub hot_streak_boost: f64,
    /// Minimum edge (model probability − implied) before a bet is advised.
    pub value_threshold: f64,
}
