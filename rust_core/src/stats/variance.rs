//! Finish-margin variance and consistency buckets.

use serde::{Deserialize, Serialize};

/// Variance below this is a `High` consistency runner.
pub const HIGH_CONSISTENCY_MAX_VARIANCE: f64 = 1.0;
/// Variance below this (and at or above the high bound) is `Medium`.
pub const MEDIUM_CONSISTENCY_MAX_VARIANCE: f64 = 5.0;
/// Margins needed before a runner is classified.
pub const MIN_MARGIN_SAMPLES: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Consistency {
    High,
    Medium,
    Low,
    #[default]
    Unknown,
}

impl Consistency {
    pub fn from_variance(variance: Option<f64>) -> Self {
        match variance {
            None => Consistency::Unknown,
            Some(v) if v < HIGH_CONSISTENCY_MAX_VARIANCE => Consistency::High,
            Some(v) if v < MEDIUM_CONSISTENCY_MAX_VARIANCE => Consistency::Medium,
            Some(_) => Consistency::Low,
        }
    }

    /// Ordering used when comparing runners: higher is steadier.
    pub fn rank(&self) -> u8 {
        match self {
            Consistency::High => 3,
            Consistency::Medium => 2,
            Consistency::Low => 1,
            Consistency::Unknown => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VarianceEntry {
    pub sample_count: usize,
    #[serde(default)]
    pub margin_variance: Option<f64>,
    pub consistency: Consistency,
}

/// Population variance, or `None` with fewer than two samples.
pub fn population_variance(samples: &[f64]) -> Option<f64> {
    if samples.len() < MIN_MARGIN_SAMPLES {
        return None;
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    Some(samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n)
}

pub fn compute_variance_entry(margins: &[f64]) -> VarianceEntry {
    let margin_variance = population_variance(margins);
    VarianceEntry {
        sample_count: margins.len(),
        margin_variance,
        consistency: Consistency::from_variance(margin_variance),
    }
}
