//! Fixed-precision money for stakes, payouts and bankroll totals.
//!
//! - All amounts are stored as i64 cents
//! - Conversion to/from f64 happens only at the boundary (sizing formulas, display)
//! - Running totals are summed in cents so a recomputation from history is exact
//! - Arithmetic saturates at the i64 bounds instead of overflowing
//!
//! # Usage
//!
//! ```rust
//! use race_predictor_core::utils::money::Money;
//!
//! let stake = Money::from_dollars(250.0);
//! let payout = stake.payout_at_decimal_odds(3.5);
//! assert_eq!(payout.cents(), 87_500);
//! assert_eq!(Money::from_dollars(1_249.0).round_to_nearest(100).as_dollars(), 1_200.0);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

/// Money value stored as cents.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money {
    cents: i64,
}

impl Money {
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Create from dollars (rounds to nearest cent)
    #[inline]
    pub fn from_dollars(dollars: f64) -> Self {
        Self {
            cents: (dollars * 100.0).round() as i64,
        }
    }

    #[inline]
    pub const fn zero() -> Self {
        Self { cents: 0 }
    }

    #[inline]
    pub const fn cents(&self) -> i64 {
        self.cents
    }

    /// Value as dollars (for sizing formulas and display)
    #[inline]
    pub fn as_dollars(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.cents == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.cents > 0
    }

    #[inline]
    pub fn clamp(self, min: Self, max: Self) -> Self {
        Self {
            cents: self.cents.clamp(min.cents, max.cents),
        }
    }

    /// Round to the nearest multiple of `whole_units` dollars (half rounds up).
    pub fn round_to_nearest(self, whole_units: i64) -> Self {
        if whole_units <= 0 {
            return self;
        }
        let step = whole_units * 100;
        let rounded = ((self.cents as f64 / step as f64).round() as i64) * step;
        Self { cents: rounded }
    }

    /// Total return (stake included) of a winning stake at the given decimal odds.
    pub fn payout_at_decimal_odds(self, decimal_odds: f64) -> Self {
        Self {
            cents: (self.cents as f64 * decimal_odds).round() as i64,
        }
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            cents: self.cents.saturating_add(other.cents),
        }
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.cents = self.cents.saturating_add(other.cents);
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            cents: self.cents.saturating_sub(other.cents),
        }
    }
}

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            cents: self.cents.saturating_neg(),
        }
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cents < 0 {
            write!(f, "-${:.2}", -(self.cents as f64) / 100.0)
        } else {
            write!(f, "${:.2}", self.cents as f64 / 100.0)
        }
    }
}

/// Return on investment as a percentage of the amount staked.
///
/// `roi_percentage(payout, staked)` is `(payout - staked) / staked * 100`, or 0
/// when nothing was staked.
pub fn roi_percentage(payout: Money, staked: Money) -> f64 {
    if staked.is_zero() {
        return 0.0;
    }
    (payout - staked).cents as f64 / staked.cents as f64 * 100.0
}
