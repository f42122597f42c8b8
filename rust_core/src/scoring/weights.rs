//! Learned signal weights and their bounds.

use serde::{Deserialize, Serialize};
use std::fmt;

/// No weight may drop below this after a feedback update.
pub const WEIGHT_FLOOR: f64 = 0.05;
/// Total mass above this triggers renormalization.
pub const MAX_TOTAL_WEIGHT: f64 = 3.0;
/// Total mass below this triggers renormalization.
pub const MIN_TOTAL_WEIGHT: f64 = 1.0;
/// Total mass restored by renormalization.
pub const TARGET_TOTAL_WEIGHT: f64 = 2.0;

/// The independently computed scoring signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    Odds,
    HistoricalWinRate,
    RecentForm,
    WinStreak,
    PlacerStreak,
    LowerStreak,
    Momentum,
    OddsMovement,
}

impl SignalKind {
    pub const COUNT: usize = 8;

    pub const ALL: [SignalKind; SignalKind::COUNT] = [
        SignalKind::Odds,
        SignalKind::HistoricalWinRate,
        SignalKind::RecentForm,
        SignalKind::WinStreak,
        SignalKind::PlacerStreak,
        SignalKind::LowerStreak,
        SignalKind::Momentum,
        SignalKind::OddsMovement,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SignalKind::Odds => "odds",
            SignalKind::HistoricalWinRate => "historical_win_rate",
            SignalKind::RecentForm => "recent_form",
            SignalKind::WinStreak => "win_streak",
            SignalKind::PlacerStreak => "placer_streak",
            SignalKind::LowerStreak => "lower_streak",
            SignalKind::Momentum => "momentum",
            SignalKind::OddsMovement => "odds_movement",
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Non-negative weight per signal.
///
/// Also used, unchanged in shape, for the per-strategy multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalWeights {
    pub odds: f64,
    pub historical_win_rate: f64,
    pub recent_form: f64,
    pub win_streak: f64,
    pub placer_streak: f64,
    pub lower_streak: f64,
    pub momentum: f64,
    pub odds_movement: f64,
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            odds: 0.6,
            historical_win_rate: 0.3,
            recent_form: 0.3,
            win_streak: 0.2,
            placer_streak: 0.1,
            lower_streak: 0.1,
            momentum: 0.25,
            odds_movement: 0.15,
        }
    }
}

impl SignalWeights {
    /// Every weight set to `value`.
    pub const fn uniform(value: f64) -> Self {
        Self {
            odds: value,
            historical_win_rate: value,
            recent_form: value,
            win_streak: value,
            placer_streak: value,
            lower_streak: value,
            momentum: value,
            odds_movement: value,
        }
    }

    pub fn get(&self, kind: SignalKind) -> f64 {
        match kind {
            SignalKind::Odds => self.odds,
            SignalKind::HistoricalWinRate => self.historical_win_rate,
            SignalKind::RecentForm => self.recent_form,
            SignalKind::WinStreak => self.win_streak,
            SignalKind::PlacerStreak => self.placer_streak,
            SignalKind::LowerStreak => self.lower_streak,
            SignalKind::Momentum => self.momentum,
            SignalKind::OddsMovement => self.odds_movement,
        }
    }

    pub fn get_mut(&mut self, kind: SignalKind) -> &mut f64 {
        match kind {
            SignalKind::Odds => &mut self.odds,
            SignalKind::HistoricalWinRate => &mut self.historical_win_rate,
            SignalKind::RecentForm => &mut self.recent_form,
            SignalKind::WinStreak => &mut self.win_streak,
            SignalKind::PlacerStreak => &mut self.placer_streak,
            SignalKind::LowerStreak => &mut self.lower_streak,
            SignalKind::Momentum => &mut self.momentum,
            SignalKind::OddsMovement => &mut self.odds_movement,
        }
    }

    pub fn total(&self) -> f64 {
        SignalKind::ALL.iter().map(|k| self.get(*k)).sum()
    }

    /// Element-wise product, used to apply a strategy's multipliers.
    pub fn combine(&self, multipliers: &SignalWeights) -> SignalWeights {
        let mut out = *self;
        for kind in SignalKind::ALL {
            *out.get_mut(kind) = self.get(kind) * multipliers.get(kind);
        }
        out
    }

    /// Multiply every weight by `factor`.
    pub fn scale(&mut self, factor: f64) {
        for kind in SignalKind::ALL {
            *self.get_mut(kind) *= factor;
        }
    }

    /// Restore the weight invariants after an update.
    ///
    /// Non-finite weights reset to their default, every weight is raised to
    /// `WEIGHT_FLOOR`, and a total outside `[1.0, 3.0]` is rescaled to 2.0.
    /// Afterwards every weight is >= the floor and the total is within bounds.
    pub fn normalize(&mut self) {
        let defaults = SignalWeights::default();
        for kind in SignalKind::ALL {
            let w = self.get_mut(kind);
            if !w.is_finite() {
                *w = defaults.get(kind);
            }
            *w = w.max(WEIGHT_FLOOR);
        }

        let total = self.total();
        if !(MIN_TOTAL_WEIGHT..=MAX_TOTAL_WEIGHT).contains(&total) {
            self.scale(TARGET_TOTAL_WEIGHT / total);
            for kind in SignalKind::ALL {
                let w = self.get_mut(kind);
                *w = w.max(WEIGHT_FLOOR);
            }
        }
    }

    pub fn satisfies_bounds(&self) -> bool {
        let total = self.total();
        SignalKind::ALL.iter().all(|k| self.get(*k) >= WEIGHT_FLOOR)
            && (MIN_TOTAL_WEIGHT..=MAX_TOTAL_WEIGHT).contains(&total)
    }
}
