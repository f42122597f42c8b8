//! Race Predictor Core - adaptive winner prediction for six-runner races.
//!
//! This module provides:
//! - Fractional/decimal odds parsing and implied probability
//! - Per-candidate statistics: win/place/show counts, streaks, momentum,
//!   odds movement and margin consistency
//! - Weighted multi-signal scoring with strategy profiles, hot-streak boost,
//!   softmax probabilities and signal agreement
//! - A calibration loop that adapts signal weights and learning rate
//! - Quarter-Kelly stake advice
//! - Versioned persistence over a pluggable key-value blob store
//! - Performance metrics (accuracy, ROI, Brier score)
//!
//! `session::PredictorSession` ties these together: predict, advise, record
//! the outcome, learn, persist.

pub mod bet_sizing;
pub mod calibration;
pub mod config;
pub mod error;
pub mod learned_state;
pub mod metrics;
pub mod odds;
pub mod persistence;
pub mod scoring;
pub mod session;
pub mod stats;
pub mod types;
pub mod utils;
pub mod validation;

pub use bet_sizing::{calculate_bet_size, BetSizeRecommendation};
pub use calibration::{CalibrationReport, CalibrationRule};
pub use config::PredictorConfig;
pub use error::{PredictorError, Result};
pub use learned_state::LearnedState;
pub use metrics::PerformanceMetrics;
pub use odds::OddsValue;
pub use persistence::{BlobStore, FileBlobStore, MemoryBlobStore};
pub use scoring::{predict_winner, PredictionResult, StrategyProfile};
pub use session::PredictorSession;
pub use types::*;
pub use utils::money::Money;
