use super::{interpolate, PercentileEstimator, Sample};

/// Keeps a bounded, sorted set of samples with their estimated ranks.
///
/// While the number of observations fits into the capacity, ranks are exact
/// and so are percentiles. Afterwards, every insertion evicts the sample whose
/// neighbours are closest by rank, keeping samples spread over the whole
/// range. The exact extrema are supplied by the keeper and act as virtual
/// samples with ranks `1` and `count`.
#[derive(Debug, Clone, Default)]
pub struct RankedEstimator {
    percentages: Vec<f64>,
    capacity: usize,
    values: Vec<i64>,
    ranks: Vec<u64>,
}

impl RankedEstimator {
    /// Creates an estimator for the provided percentages.
    pub fn new(percentages: Vec<f64>, sample_capacity: usize) -> Self {
        let mut estimator = Self::default();
        estimator.configure(percentages, sample_capacity);
        estimator
    }

    fn evict(&mut self, count: u64) {
        let len = self.values.len();

        let victim = (0..len).min_by_key(|&i| {
            let lo = if i == 0 { 1 } else { self.ranks[i - 1] };
            let hi = if i + 1 == len { count } else { self.ranks[i + 1] };
            hi.saturating_sub(lo)
        });

        if let Some(victim) = victim {
            self.values.remove(victim);
            self.ranks.remove(victim);
        }
    }
}

impl PercentileEstimator for RankedEstimator {
    fn configure(&mut self, percentages: Vec<f64>, sample_capacity: usize) {
        self.percentages = percentages;
        self.capacity = sample_capacity;
        self.values = Vec::with_capacity(sample_capacity + 1);
        self.ranks = Vec::with_capacity(sample_capacity + 1);
    }

    fn clear(&mut self) {
        self.values.clear();
        self.ranks.clear();
    }

    fn add_value(
        &mut self,
        value: i64,
        count: u64,
        min_before: Option<i64>,
        max_before: Option<i64>,
    ) {
        if self.capacity == 0 {
            return;
        }

        // Equal values are placed after the existing ones.
        let pos = self.values.partition_point(|v| *v <= value);
        for rank in &mut self.ranks[pos..] {
            *rank += 1;
        }

        // The closest known neighbours, falling back to the previous extrema.
        let lo = match pos {
            0 => min_before.filter(|min| *min <= value).map(|min| (min, 1)),
            _ => Some((self.values[pos - 1], self.ranks[pos - 1])),
        };
        let hi = match self.values.get(pos) {
            Some(succ) => Some((*succ, self.ranks[pos])),
            None => max_before.filter(|max| value <= *max).map(|max| (max, count)),
        };

        let rank = match (lo, hi) {
            (_, None) => count,
            (None, _) => 1,
            (Some((lo_value, lo_rank)), Some((hi_value, hi_rank))) => {
                // Observations between neighbours are assumed to be uniform.
                let span = hi_rank.saturating_sub(lo_rank);
                let ratio = if hi_value > lo_value {
                    (value as f64 - lo_value as f64) / (hi_value as f64 - lo_value as f64)
                } else {
                    0.
                };
                let offset = (span as f64 * ratio).round() as u64;
                lo_rank + offset.clamp(1, span.saturating_sub(1).max(1))
            }
        };

        self.values.insert(pos, value);
        self.ranks.insert(pos, rank.min(count));

        if self.values.len() > self.capacity {
            self.evict(count);
        }
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

        let target = self.percentage_at(index) / 100. * count as f64;
        let mut lo = (1., min);

        for (value, rank) in self.values.iter().zip(&self.ranks) {
            let knot = (*rank as f64, *value);
            if knot.0 >= target {
                return interpolate(target, lo, knot);
            }
            lo = knot;
        }

        interpolate(target, lo, (count as f64, max))
    }

    fn sample_count(&self, _count: u64, _min: i64, _max: i64) -> usize {
        self.values.len() + 2
    }

    fn sample_at(&self, index: usize, count: u64, min: i64, max: i64) -> Sample {
        match index.checked_sub(1).and_then(|i| self.values.get(i).zip(self.ranks.get(i))) {
            Some((value, rank)) => Sample {
                rank: *rank,
                value: *value,
            },
            None if index == 0 => Sample {
                rank: 1,
                value: min,
            },
            None => Sample {
                rank: count,
                value: max,
            },
        }
    }
}
