/// Counts of observations below each of fixed thresholds.
///
/// Unlike buckets, thresholds are independent: `counts[i]` is the number of
/// observed values strictly less than `boundaries[i]`, so a value counts
/// towards every threshold above it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    boundaries: Box<[i64]>,
    counts: Box<[u64]>,
}

impl Histogram {
    /// Creates a histogram with the provided thresholds.
    pub fn new(boundaries: Vec<i64>) -> Self {
        let counts = vec![0; boundaries.len()].into_boxed_slice();

        Self {
            boundaries: boundaries.into_boxed_slice(),
            counts,
        }
    }

    /// Counts a new observation.
    #[inline]
    pub fn observe(&mut self, value: i64) {
        for (boundary, count) in self.boundaries.iter().zip(self.counts.iter_mut()) {
            if value < *boundary {
                *count += 1;
            }
        }
    }

    /// Adds counts of a histogram with the same thresholds.
    pub fn merge(&mut self, other: &Histogram) {
        debug_assert_eq!(self.boundaries, other.boundaries);

        for (count, other) in self.counts.iter_mut().zip(other.counts.iter()) {
            *count += other;
        }
    }

    /// Forgets all observations.
    pub fn clear(&mut self) {
        self.counts.fill(0);
    }

    /// The number of thresholds.
    #[inline]
    pub fn len(&self) -> usize {
        self.boundaries.len()
    }

    /// Whether there are no thresholds.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty()
    }

    /// The thresholds.
    #[inline]
    pub fn boundaries(&self) -> &[i64] {
        &self.boundaries
    }

    /// Counts of observations below each threshold.
    #[inline]
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    /// The fraction of `total_count` observations below the `index`-th
    /// threshold, `None` if there are no observations or no such threshold.
    pub fn fraction(&self, index: usize, total_count: u64) -> Option<f64> {
        if total_count == 0 {
            return None;
        }

        let count = *self.counts.get(index)?;
        Some(count as f64 / total_count as f64)
    }
}
