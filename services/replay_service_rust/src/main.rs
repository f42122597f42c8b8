//! Replay Service
//!
//! Feeds a file of recorded races through the race predictor core.
//!
//! This service:
//! - Loads configuration from the environment (and `.env`)
//! - Opens a predictor session over the file-backed blob store
//! - Runs predict → advise → record for every round in the replay file
//! - Logs each prediction, the stake advice and the final metrics

mod replay;

use anyhow::{Context, Result};
use dotenv::dotenv;
use race_predictor_core::{FileBlobStore, PredictorConfig, PredictorSession};
use std::env;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Replay Service...");

    let config = PredictorConfig::from_env();
    let rounds_file: PathBuf = env::args()
        .nth(1)
        .or_else(|| env::var("ROUNDS_FILE").ok())
        .map(PathBuf::from)
        .context("No replay file given (pass a path or set ROUNDS_FILE)")?;

    info!(
        "Config: data_dir={}, bankroll_unit={}, strategy={}, calibration={}",
        config.data_dir.display(),
        config.bankroll_unit,
        config.default_strategy,
        config.calibration_rule
    );

    let rounds = replay::load_rounds(&rounds_file)?;
    info!("Loaded {} rounds from {}", rounds.len(), rounds_file.display());

    let store = FileBlobStore::new(config.data_dir.clone());
    let mut session = PredictorSession::open(store, config);
    let steps = replay::replay(&mut session, &rounds)?;

    let metrics = session.metrics();
    info!(
        "Replayed {} of {} rounds: accuracy {:.1}% ({}), recent {:.1}%, mood {}",
        steps.len(),
        rounds.len(),
        metrics.accuracy_pct,
        metrics.accuracy_band().label(),
        metrics.recent_accuracy_pct,
        metrics.mood()
    );
    info!(
        "Bankroll: staked {}, returned {}, ROI {:.1}% ({}), calibration {:.3} ({})",
        metrics.total_bet_amount,
        metrics.total_payout,
        metrics.overall_roi_pct,
        metrics.roi_band().label(),
        metrics.calibration_score(),
        metrics.calibration_band().label()
    );
    for (strategy, roi) in &metrics.strategy_roi_pct {
        info!("Strategy {} ROI {:.1}%", strategy, roi);
    }
    if let Some(report) = session.last_calibration() {
        info!(
            "Last calibration: accuracy {:.2}, log-loss {:.3}, error {:+.3}, learning rate {:.4}",
            report.accuracy, report.log_loss, report.calibration_error, report.learning_rate
        );
    }

    Ok(())
}
