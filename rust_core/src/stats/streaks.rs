//! Streak and momentum calculations over a newest-first list of placings.

use crate::types::{Placing, StreakClass};

/// How many results momentum looks back over.
pub const MOMENTUM_LOOKBACK: usize = 20;

/// Weight multiplier per step back in time.
pub const MOMENTUM_DECAY: f64 = 0.7;

/// Consecutive-run counters. At most one is nonzero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Streaks {
    pub win: u32,
    pub placer: u32,
    pub lower: u32,
}

/// Length of the run of the newest result's class, scanning newest to oldest.
///
/// The run breaks on the first result of a different class. An unplaced
/// newest result leaves every counter at zero.
pub fn compute_streaks(placings_newest_first: &[Placing]) -> Streaks {
    let Some(head) = placings_newest_first.first() else {
        return Streaks::default();
    };
    let class = head.streak_class();
    let run = placings_newest_first
        .iter()
        .take_while(|p| p.streak_class() == class)
        .count() as u32;

    match class {
        StreakClass::Win => Streaks {
            win: run,
            ..Default::default()
        },
        StreakClass::Podium => Streaks {
            placer: run,
            ..Default::default()
        },
        StreakClass::Lower => Streaks {
            lower: run,
            ..Default::default()
        },
        StreakClass::Unplaced => Streaks::default(),
    }
}

/// Exponentially decayed performance score in [0, 1].
///
/// Sum of `value(placing) * 0.7^i` over the newest 20 results, divided by the
/// same sum with every result a win.
pub fn compute_momentum(placings_newest_first: &[Placing]) -> f64 {
    let mut weighted = 0.0;
    let mut max_weighted = 0.0;
    let mut weight = 1.0;

    for placing in placings_newest_first.iter().take(MOMENTUM_LOOKBACK) {
        weighted += placing.value() * weight;
        max_weighted += weight;
        weight *= MOMENTUM_DECAY;
    }

    if max_weighted == 0.0 {
        0.0
    } else {
        (weighted / max_weighted).clamp(0.0, 1.0)
    }
}
