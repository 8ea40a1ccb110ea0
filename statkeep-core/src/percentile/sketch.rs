use std::fmt;

use sketches_ddsketch::{Config, DDSketch};

use super::{PercentileEstimator, Sample};

// The relative accuracy of estimations.
const ALPHA: f64 = 0.01;
// The smallest magnitude distinguished from zero.
const MIN_VALUE: f64 = 1e-9;

/// Estimates percentiles with DDSketch, a sketch with relative error
/// guarantees and bounded memory.
///
/// The sample capacity is used as the maximum number of bins. No samples are
/// kept, so diagnostics contain only the extrema.
pub struct SketchEstimator {
    percentages: Vec<f64>,
    config: Config,
    sketch: DDSketch,
}

impl SketchEstimator {
    /// Creates an estimator for the provided percentages.
    pub fn new(percentages: Vec<f64>, sample_capacity: usize) -> Self {
        let config = make_config(sample_capacity);

        Self {
            percentages,
            config,
            sketch: DDSketch::new(config),
        }
    }
}

fn make_config(sample_capacity: usize) -> Config {
    let max_bins = u32::try_from(sample_capacity.max(1)).unwrap_or(u32::MAX);
    Config::new(ALPHA, max_bins, MIN_VALUE)
}

impl fmt::Debug for SketchEstimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SketchEstimator")
            .field("percentages", &self.percentages)
            .field("count", &self.sketch.count())
            .finish()
    }
}

impl PercentileEstimator for SketchEstimator {
    fn configure(&mut self, percentages: Vec<f64>, sample_capacity: usize) {
        self.percentages = percentages;
        self.config = make_config(sample_capacity);
        self.sketch = DDSketch::new(self.config);
    }

    fn clear(&mut self) {
        self.sketch = DDSketch::new(self.config);
    }

    #[inline]
    fn add_value(&mut self, value: i64, _: u64, _: Option<i64>, _: Option<i64>) {
        self.sketch.add(value as f64);
    }

    fn num_percentiles(&self) -> usize {
        self.percentages.len()
    }

    fn percentage_at(&self, index: usize) -> f64 {
        self.percentages.get(index).copied().unwrap_or(f64::NAN)
    }

    fn estimate_at(&self, index: usize, count: u64, min: i64, max: i64) -> f64 {
        if count == 0 {
            return f64::NAN;
        }

        let quantile = (self.percentage_at(index) / 100.).clamp(0., 1.);
        match self.sketch.quantile(quantile) {
            // The sketch is only relatively accurate, extrema are exact.
            Ok(Some(estimate)) => estimate.clamp(min as f64, max as f64),
            _ => f64::NAN,
        }
    }

    fn sample_count(&self, count: u64, _min: i64, _max: i64) -> usize {
        if count == 0 {
            0
        } else {
            2
        }
    }

    fn sample_at(&self, index: usize, count: u64, min: i64, max: i64) -> Sample {
        if index == 0 {
            Sample {
                rank: 1,
                value: min,
            }
        } else {
            Sample {
                rank: count,
                value: max,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_accuracy() {
        let mut estimator = SketchEstimator::new(vec![50., 90., 100.], 1024);
        for value in 1..=1000 {
            estimator.add_value(value, value as u64, None, None);
        }

        for (index, expected) in [(0, 500.), (1, 900.)] {
            let actual = estimator.estimate_at(index, 1000, 1, 1000);
            assert!((actual - expected).abs() / expected < 0.03, "{actual}");
        }

        assert!(estimator.estimate_at(2, 1000, 1, 1000) <= 1000.);
        assert_eq!(estimator.sample_count(1000, 1, 1000), 2);
        assert_eq!(
            estimator.sample_at(1, 1000, 1, 1000),
            Sample {
                rank: 1000,
                value: 1000
            }
        );
    }

    #[test]
    fn clear() {
        let mut estimator = SketchEstimator::new(vec![50.], 100);
        estimator.add_value(5, 1, None, None);
        estimator.clear();

        assert!(estimator.estimate_at(0, 0, 0, 0).is_nan());
        assert_eq!(estimator.sample_count(0, 0, 0), 0);
    }
}
