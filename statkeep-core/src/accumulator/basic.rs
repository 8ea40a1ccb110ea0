use super::{accumulator_item, Accumulator, Extrema, ITEM_COUNT};
use crate::{
    errors::StatsError,
    item::{Item, ItemList},
};

/// An accumulator with plain 64-bit sums.
///
/// Sums wrap on overflow, so magnitudes must be bounded by the caller:
/// squares of values above `~3 * 10^9` overflow on the first observation.
/// Use [`ScaledAccumulator`](super::ScaledAccumulator) for such values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicAccumulator {
    count: u64,
    extrema: Extrema,
    sum: i64,
    sum_of_squares: i64,
}

impl BasicAccumulator {
    #[inline]
    fn add_sums(&mut self, value: i64) {
        self.sum = self.sum.wrapping_add(value);
        self.sum_of_squares = self
            .sum_of_squares
            .wrapping_add(value.wrapping_mul(value));
    }
}

impl Accumulator for BasicAccumulator {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn mark(&mut self, source: &Self) {
        self.count = source.count;
        self.sum = source.sum;
        self.sum_of_squares = source.sum_of_squares;
        self.extrema = Extrema::default();
    }

    #[inline]
    fn add_value(&mut self, value: i64) {
        self.count += 1;
        self.check_min_max(value);
        self.add_sums(value);
    }

    #[inline]
    fn check_min_max(&mut self, value: i64) {
        self.extrema.check(value);
    }

    fn add_record(&mut self, other: &Self) {
        self.count += other.count;
        self.extrema.merge(&other.extrema);
        self.sum = self.sum.wrapping_add(other.sum);
        self.sum_of_squares = self.sum_of_squares.wrapping_add(other.sum_of_squares);
    }

    #[inline]
    fn count(&self) -> u64 {
        self.count
    }

    #[inline]
    fn min(&self) -> Option<i64> {
        self.extrema.min
    }

    #[inline]
    fn max(&self) -> Option<i64> {
        self.extrema.max
    }

    #[inline]
    fn sum(&self) -> i64 {
        self.sum
    }

    #[inline]
    fn sum_of_squares(&self) -> i64 {
        self.sum_of_squares
    }
}

impl ItemList for BasicAccumulator {
    fn item_count(&self) -> usize {
        ITEM_COUNT
    }

    fn item(&self, index: usize) -> Result<Item<'_>, StatsError> {
        accumulator_item(self, index)
    }
}
