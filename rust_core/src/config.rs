//! Runtime configuration and environment loading.
//!
//! This module manages:
//! - Recent-window and calibration-window sizes
//! - Bankroll unit for stake advice
//! - Default strategy profile and calibration rule
//! - Data directory of the file-backed store

use crate::bet_sizing::DEFAULT_BANKROLL_UNIT;
use crate::calibration::{
    CalibrationRule, DEFAULT_CALIBRATION_WINDOW, MAX_CALIBRATION_WINDOW, MIN_CALIBRATION_WINDOW,
};
use crate::learned_state::{DEFAULT_RECENT_WINDOW, MAX_RECENT_WINDOW, MIN_RECENT_WINDOW};
use crate::scoring::strategy::StrategyProfile;
use std::env;
use std::path::PathBuf;
use tracing::warn;

pub const MIN_BANKROLL_UNIT: f64 = 100.0;
pub const MAX_BANKROLL_UNIT: f64 = 10_000_000.0;

/// Default directory for the file-backed blob store
pub const DEFAULT_DATA_DIR: &str = "./predictor_data";

#[derive(Debug, Clone, PartialEq)]
pub struct PredictorConfig {
    pub recent_window_size: usize,
    pub calibration_window: usize,
    pub bankroll_unit: f64,
    pub default_strategy: StrategyProfile,
    pub calibration_rule: CalibrationRule,
    pub data_dir: PathBuf,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            recent_window_size: DEFAULT_RECENT_WINDOW,
            calibration_window: DEFAULT_CALIBRATION_WINDOW,
            bankroll_unit: DEFAULT_BANKROLL_UNIT,
            default_strategy: StrategyProfile::default(),
            calibration_rule: CalibrationRule::default(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
        }
    }
}

impl PredictorConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Unparseable values fall back to the default; numeric values are
    /// clamped into their allowed range.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let recent_window_size = lookup("RECENT_WINDOW_SIZE")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_RECENT_WINDOW)
            .clamp(MIN_RECENT_WINDOW, MAX_RECENT_WINDOW);

        let calibration_window = lookup("CALIBRATION_WINDOW")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_CALIBRATION_WINDOW)
            .clamp(MIN_CALIBRATION_WINDOW, MAX_CALIBRATION_WINDOW);

        let bankroll_unit = lookup("BANKROLL_UNIT")
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(DEFAULT_BANKROLL_UNIT)
            .clamp(MIN_BANKROLL_UNIT, MAX_BANKROLL_UNIT);

        let default_strategy = match lookup("DEFAULT_STRATEGY") {
            Some(v) => v.parse::<StrategyProfile>().unwrap_or_else(|e| {
                warn!("Ignoring DEFAULT_STRATEGY: {}", e);
                StrategyProfile::default()
            }),
            None => StrategyProfile::default(),
        };

        let calibration_rule = match lookup("CALIBRATION_RULE") {
            Some(v) => v.parse::<CalibrationRule>().unwrap_or_else(|e| {
                warn!("Ignoring CALIBRATION_RULE: {}", e);
                CalibrationRule::default()
            }),
            None => CalibrationRule::default(),
        };

        let data_dir = lookup("PREDICTOR_DATA_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        Self {
            recent_window_size,
            calibration_window,
            bankroll_unit,
            default_strategy,
            calibration_rule,
            data_dir,
        }
    }
}
