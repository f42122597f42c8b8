//! Odds model: fractional/decimal odds parsing and implied probability.
//!
//! This module provides:
//! - `OddsValue`, a validated fractional quote ("5/2" = numerator 5, denominator 2)
//! - Parsing of fractional ("X/Y"), decimal ("D", D > 1) and "evens" text
//! - Decimal odds and implied probability conversions

use crate::error::{PredictorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Longest price accepted, as a fractional ratio (1000/1).
pub const MAX_FRACTIONAL_ODDS: f64 = 1000.0;
/// Shortest price accepted, as a fractional ratio (1/1000).
pub const MIN_FRACTIONAL_ODDS: f64 = 0.001;

/// A fractional odds quote. Immutable once captured for a round.
///
/// Invariant: `numerator > 0`, `denominator > 0`, both finite, and the ratio
/// within `[MIN_FRACTIONAL_ODDS, MAX_FRACTIONAL_ODDS]`. This keeps
/// `to_decimal() > 1` and `implied_probability()` inside `(0, 1)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "OddsParts", into = "OddsParts")]
pub struct OddsValue {
    numerator: f64,
    denominator: f64,
}

/// Wire shape of an `OddsValue`. `decimal` is written for readers of the
/// persisted JSON and ignored on load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct OddsParts {
    numerator: f64,
    denominator: f64,
    #[serde(default, skip_deserializing)]
    decimal: f64,
}

impl TryFrom<OddsParts> for OddsValue {
    type Error = PredictorError;

    fn try_from(parts: OddsParts) -> Result<Self> {
        OddsValue::new(parts.numerator, parts.denominator)
    }
}

impl From<OddsValue> for OddsParts {
    fn from(odds: OddsValue) -> Self {
        OddsParts {
            numerator: odds.numerator,
            denominator: odds.denominator,
            decimal: odds.to_decimal(),
        }
    }
}

impl OddsValue {
    /// Build a quote from its fractional parts.
    pub fn new(numerator: f64, denominator: f64) -> Result<Self> {
        if !numerator.is_finite() || !denominator.is_finite() {
            return Err(PredictorError::InvalidOddsFormat(format!(
                "odds must be finite, got {}/{}",
                numerator, denominator
            )));
        }
        if denominator <= 0.0 {
            return Err(PredictorError::InvalidOddsFormat(format!(
                "denominator must be positive, got {}",
                denominator
            )));
        }
        if numerator <= 0.0 {
            return Err(PredictorError::InvalidOddsFormat(format!(
                "numerator must be positive, got {}",
                numerator
            )));
        }
        let fractional = numerator / denominator;
        if !fractional.is_finite()
            || !(MIN_FRACTIONAL_ODDS..=MAX_FRACTIONAL_ODDS).contains(&fractional)
        {
            return Err(PredictorError::InvalidOddsFormat(format!(
                "price {}/{} is outside {}/1 to {}/1",
                numerator, denominator, MIN_FRACTIONAL_ODDS, MAX_FRACTIONAL_ODDS
            )));
        }
        Ok(Self {
            numerator,
            denominator,
        })
    }

    /// "N/1" odds, the form most race cards quote.
    pub fn from_numerator(numerator: f64) -> Result<Self> {
        Self::new(numerator, 1.0)
    }

    /// Convert decimal odds (total return per unit staked, > 1) to a quote.
    pub fn from_decimal(decimal: f64) -> Result<Self> {
        if !decimal.is_finite() || decimal <= 1.0 {
            return Err(PredictorError::InvalidOddsFormat(format!(
                "decimal odds must be greater than 1, got {}",
                decimal
            )));
        }
        Self::new(decimal - 1.0, 1.0)
    }

    /// Parse textual odds: "5/2", "5-2", "3.5", "evens"/"evs".
    pub fn parse(input: &str) -> Result<Self> {
        let text = input.trim();
        if text.is_empty() {
            return Err(PredictorError::InvalidOddsFormat(
                "odds are required".to_string(),
            ));
        }

        let lower = text.to_ascii_lowercase();
        if lower == "evens" || lower == "evs" || lower == "even" {
            return Self::new(1.0, 1.0);
        }

        if let Some((num, den)) = text.split_once(['/', '-']) {
            let numerator = parse_number(num, input)?;
            let denominator = parse_number(den, input)?;
            return Self::new(numerator, denominator);
        }

        Self::from_decimal(parse_number(text, input)?)
    }

    pub fn numerator(&self) -> f64 {
        self.numerator
    }

    pub fn denominator(&self) -> f64 {
        self.denominator
    }

    /// Fractional price as a single number (numerator / denominator).
    #[inline]
    pub fn fractional(&self) -> f64 {
        self.numerator / self.denominator
    }

    /// Decimal odds: fractional price + 1 stake returned.
    #[inline]
    pub fn to_decimal(&self) -> f64 {
        self.fractional() + 1.0
    }

    /// Probability the market assigns to this quote, ignoring overround.
    #[inline]
    pub fn implied_probability(&self) -> f64 {
        1.0 / self.to_decimal()
    }
}

fn parse_number(part: &str, input: &str) -> Result<f64> {
    part.trim()
        .parse::<f64>()
        .map_err(|_| PredictorError::InvalidOddsFormat(format!("cannot parse odds '{}'", input)))
}

impl FromStr for OddsValue {
    type Err = PredictorError;

    fn from_str(s: &str) -> Result<Self> {
        OddsValue::parse(s)
    }
}

impl fmt::Display for OddsValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            trim_float(self.numerator),
            trim_float(self.denominator)
        )
    }
}

fn trim_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        let text = format!("{:.3}", value);
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Free-function form of `OddsValue::parse`.
pub fn parse(input: &str) -> Result<OddsValue> {
    OddsValue::parse(input)
}

pub fn to_decimal(odds: &OddsValue) -> f64 {
    odds.to_decimal()
}

pub fn implied_probability(odds: &OddsValue) -> f64 {
    odds.implied_probability()
}
