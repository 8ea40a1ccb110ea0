//! Pluggable estimators of order statistics.

use std::fmt;

pub use self::{ranked::RankedEstimator, sketch::SketchEstimator};

mod ranked;
mod sketch;

/// Approximates percentiles of a stream of values.
///
/// The keeper owns the exact count and extrema and passes them in, so
/// estimators only have to track what's between the extrema.
pub trait PercentileEstimator: fmt::Debug + Send {
    /// Sets percentages to estimate (`0..=100`) and the memory budget.
    /// Drops all collected samples.
    fn configure(&mut self, percentages: Vec<f64>, sample_capacity: usize);

    /// Drops all collected samples.
    fn clear(&mut self);

    /// Adds an observation.
    ///
    /// `count` is the number of observations including this one, while
    /// `min_before` and `max_before` are extrema *before* this observation.
    fn add_value(
        &mut self,
        value: i64,
        count: u64,
        min_before: Option<i64>,
        max_before: Option<i64>,
    );

    /// The number of configured percentages.
    fn num_percentiles(&self) -> usize;

    /// The `index`-th configured percentage.
    fn percentage_at(&self, index: usize) -> f64;

    /// Estimates the `index`-th percentile given final totals.
    fn estimate_at(&self, index: usize, count: u64, min: i64, max: i64) -> f64;

    /// The number of diagnostic samples.
    fn sample_count(&self, count: u64, min: i64, max: i64) -> usize;

    /// The `index`-th diagnostic sample.
    fn sample_at(&self, index: usize, count: u64, min: i64, max: i64) -> Sample;
}

/// A diagnostic sample: a value with the estimated number of observations
/// not greater than it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// The estimated rank, `1` for the minimum and `count` for the maximum.
    pub rank: u64,
    /// The observed value.
    pub value: i64,
}

impl fmt::Display for Sample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}: {}", self.rank, self.value)
    }
}

/// The estimator used when percentiles are disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPercentiles;

impl PercentileEstimator for NoPercentiles {
    fn configure(&mut self, _percentages: Vec<f64>, _sample_capacity: usize) {}

    fn clear(&mut self) {}

    #[inline]
    fn add_value(&mut self, _: i64, _: u64, _: Option<i64>, _: Option<i64>) {}

    fn num_percentiles(&self) -> usize {
        0
    }

    fn percentage_at(&self, _index: usize) -> f64 {
        f64::NAN
    }

    fn estimate_at(&self, _: usize, _: u64, _: i64, _: i64) -> f64 {
        f64::NAN
    }

    fn sample_count(&self, _: u64, _: i64, _: i64) -> usize {
        0
    }

    fn sample_at(&self, _: usize, _: u64, min: i64, _: i64) -> Sample {
        Sample {
            rank: 1,
            value: min,
        }
    }
}

/// Linear interpolation of a value at `rank` between two known samples.
pub(crate) fn interpolate(rank: f64, lo: (f64, i64), hi: (f64, i64)) -> f64 {
    let (lo_rank, lo_value) = lo;
    let (hi_rank, hi_value) = hi;

    if hi_rank <= lo_rank {
        return lo_value as f64;
    }

    let ratio = ((rank - lo_rank) / (hi_rank - lo_rank)).clamp(0., 1.);
    lo_value as f64 + ratio * (hi_value as f64 - lo_value as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation() {
        assert_eq!(interpolate(1., (1., 10), (3., 30)), 10.);
        assert_eq!(interpolate(2., (1., 10), (3., 30)), 20.);
        assert_eq!(interpolate(3., (1., 10), (3., 30)), 30.);
        assert_eq!(interpolate(5., (1., 10), (3., 30)), 30.);
        assert_eq!(interpolate(5., (3., 10), (3., 30)), 10.);
    }

    #[test]
    fn disabled() {
        let mut estimator = NoPercentiles;
        estimator.add_value(5, 1, None, None);
        assert_eq!(estimator.num_percentiles(), 0);
        assert_eq!(estimator.sample_count(1, 5, 5), 0);
    }

    #[test]
    fn sample_display() {
        let sample = Sample { rank: 3, value: 42 };
        assert_eq!(sample.to_string(), "#3: 42");
    }
}
