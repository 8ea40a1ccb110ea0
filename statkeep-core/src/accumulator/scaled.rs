use super::{accumulator_item, shr, Accumulator, Extrema, ITEM_COUNT};
use crate::{
    errors::StatsError,
    item::{Item, ItemList},
};

/// The threshold above which sums are rescaled before merging.
const MERGE_THRESHOLD: i64 = i64::MAX / 2;

/// An accumulator that never overflows.
///
/// Whenever the next addition would overflow a sum, both sums are halved
/// and the shift is incremented. Thus, `sum` holds `true_sum / 2^shift`
/// and `sum_of_squares` holds `true_sum_of_squares / 2^(2 * shift)`.
///
/// Only non-negative values are supported, which is always the case for
/// durations and sizes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaledAccumulator {
    count: u64,
    extrema: Extrema,
    sum: i64,
    sum_of_squares: i64,
    shift: u32,
}

impl ScaledAccumulator {
    fn shift_right(&mut self) {
        self.shift += 1;
        self.sum >>= 1;
        self.sum_of_squares >>= 2;
    }

    /// Rescales if sums are already close to overflowing.
    fn check_sizes(&mut self) {
        while self.sum > MERGE_THRESHOLD || self.sum_of_squares > MERGE_THRESHOLD {
            self.shift_right();
        }
    }

    fn add_sums(&mut self, value: i64) {
        debug_assert!(value >= 0, "negative values are not supported");

        let mut scaled = shr(value, self.shift);
        while self.sum.checked_add(scaled).is_none() {
            self.shift_right();
            scaled >>= 1;
        }
        self.sum += scaled;

        let mut square = if value <= i64::from(i32::MAX) {
            shr(value * value, 2 * self.shift)
        } else {
            // Halve until the square fits into 64 bits.
            while scaled > i64::from(i32::MAX) {
                self.shift_right();
                scaled >>= 1;
            }
            scaled * scaled
        };

        while self.sum_of_squares.checked_add(square).is_none() {
            self.shift_right();
            square >>= 2;
        }
        self.sum_of_squares += square;

        self.check_sizes();
    }

    /// Adds sums that are already aligned to `self.shift`.
    fn add_aligned(&mut self, mut sum: i64, mut sum_of_squares: i64) {
        while self.sum.checked_add(sum).is_none() {
            self.shift_right();
            sum >>= 1;
            sum_of_squares >>= 2;
        }
        self.sum += sum;

        while self.sum_of_squares.checked_add(sum_of_squares).is_none() {
            self.shift_right();
            sum_of_squares >>= 2;
        }
        self.sum_of_squares += sum_of_squares;

        self.check_sizes();
    }
}

impl Accumulator for ScaledAccumulator {
    fn reset(&mut self) {
        *self = Self::default();
    }

    fn mark(&mut self, source: &Self) {
        self.count = source.count;
        self.sum = source.sum;
        self.sum_of_squares = source.sum_of_squares;
        self.shift = source.shift;
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

        let mut other = other.clone();
        self.check_sizes();
        other.check_sizes();

        while self.shift < other.shift {
            self.shift_right();
        }

        let delta = self.shift - other.shift;
        self.add_aligned(
            shr(other.sum, delta),
            shr(other.sum_of_squares, 2 * delta),
        );
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

    #[inline]
    fn shift(&self) -> u32 {
        self.shift
    }
}

impl ItemList for ScaledAccumulator {
    fn item_count(&self) -> usize {
        ITEM_COUNT
    }

    fn item(&self, index: usize) -> Result<Item<'_>, StatsError> {
        accumulator_item(self, index)
    }
}
