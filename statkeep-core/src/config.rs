//! Construction parameters of keepers.

use serde::Deserialize;

use crate::percentile::{NoPercentiles, PercentileEstimator, RankedEstimator, SketchEstimator};

/// Parameters of a [`MetricsKeeper`](crate::MetricsKeeper).
///
/// ```
/// # use statkeep_core::KeeperConfig;
/// let config: KeeperConfig = toml::from_str(r#"
///     boundaries = [10, 100]
///     percentiles = [50.0, 99.0]
/// "#).unwrap();
///
/// assert_eq!(config.sample_capacity, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct KeeperConfig {
    /// Thresholds of the histogram.
    #[serde(default = "default_boundaries")]
    pub boundaries: Vec<i64>,
    /// Percentages (`0..=100`) to estimate.
    #[serde(default = "default_percentiles")]
    pub percentiles: Vec<f64>,
    /// Whether percentiles are estimated at all.
    #[serde(default = "default_percentiles_enabled")]
    pub percentiles_enabled: bool,
    /// The memory budget of the estimator, in samples or bins.
    #[serde(default = "default_sample_capacity")]
    pub sample_capacity: usize,
    /// Which estimator to use.
    #[serde(default)]
    pub estimator: EstimatorKind,
}

/// An algorithm of percentile estimation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum EstimatorKind {
    /// [`RankedEstimator`], exact for small streams.
    #[default]
    Ranked,
    /// [`SketchEstimator`], bounded relative error.
    Sketch,
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            boundaries: default_boundaries(),
            percentiles: default_percentiles(),
            percentiles_enabled: default_percentiles_enabled(),
            sample_capacity: default_sample_capacity(),
            estimator: EstimatorKind::default(),
        }
    }
}

impl KeeperConfig {
    /// Defaults for keepers of sizes in bytes.
    pub fn sizes() -> Self {
        Self {
            boundaries: vec![100_000, 1_000_000],
            ..Self::default()
        }
    }

    /// Builds a configured estimator.
    pub fn estimator(&self) -> Box<dyn PercentileEstimator> {
        if !self.percentiles_enabled {
            return Box::new(NoPercentiles);
        }

        let percentiles = self.percentiles.clone();
        let capacity = self.sample_capacity;
        match self.estimator {
            EstimatorKind::Ranked => Box::new(RankedEstimator::new(percentiles, capacity)),
            EstimatorKind::Sketch => Box::new(SketchEstimator::new(percentiles, capacity)),
        }
    }
}

fn default_boundaries() -> Vec<i64> {
    vec![100, 1000, 2000, 10000]
}

fn default_percentiles() -> Vec<f64> {
    vec![50., 90., 95., 98.]
}

fn default_percentiles_enabled() -> bool {
    true
}

fn default_sample_capacity() -> usize {
    100
}
