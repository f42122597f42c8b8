//! Error taxonomy for the prediction core.
//!
//! User-input problems (`InvalidOddsFormat`, `InvalidRoundComposition`,
//! `OutOfRangeBet`) are returned to the caller as values. `CorruptPersistedState`
//! is produced by the persistence layer and recovered there by falling back to
//! defaults.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("Invalid odds format: {0}")]
    InvalidOddsFormat(String),

    #[error("Invalid round composition: {0}")]
    InvalidRoundComposition(String),

    #[error("Corrupt persisted state ({key}): {reason}")]
    CorruptPersistedState { key: String, reason: String },

    #[error("Bet amount out of range: {amount:.2} (allowed: 0 < amount <= {max:.2})")]
    OutOfRangeBet { amount: f64, max: f64 },

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PredictorError {
    /// True for errors caused by user input rather than the environment.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            PredictorError::InvalidOddsFormat(_)
                | PredictorError::InvalidRoundComposition(_)
                | PredictorError::OutOfRangeBet { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PredictorError>;
