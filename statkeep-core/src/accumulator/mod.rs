//! Running count/min/max/sum/sum-of-squares over a stream of values.
//!
//! Two strategies are provided:
//! * [`BasicAccumulator`] uses plain 64-bit sums. It's exact and fast, but
//!   the caller must bound magnitudes, because squares overflow quickly.
//! * [`ScaledAccumulator`] halves its sums (tracking a shift) whenever the
//!   next addition would overflow. It's suitable for large magnitudes like
//!   message sizes and loses only the lowest bits of precision.

use std::fmt;

use crate::{
    errors::StatsError,
    item::{out_of_range, Item, ItemType, ItemValue},
};

pub use self::{basic::BasicAccumulator, scaled::ScaledAccumulator};

mod basic;
mod scaled;

/// A running accumulator of statistics.
///
/// `min()` and `max()` are `None` until the first observation after a reset
/// or a mark. Sums may be rescaled, see [`Accumulator::shift()`].
pub trait Accumulator: Default + Clone + fmt::Debug + Send + Sync + 'static {
    /// Zeroes all fields.
    fn reset(&mut self);

    /// Freezes count and sums of `source` and starts tracking extrema anew.
    fn mark(&mut self, source: &Self);

    /// Adds a new observation.
    fn add_value(&mut self, value: i64);

    /// Updates only extrema.
    fn check_min_max(&mut self, value: i64);

    /// Merges statistics of another partition of the same stream.
    fn add_record(&mut self, other: &Self);

    /// The number of observations since the last reset.
    fn count(&self) -> u64;

    /// The smallest observed value.
    fn min(&self) -> Option<i64>;

    /// The largest observed value.
    fn max(&self) -> Option<i64>;

    /// The (possibly rescaled) sum of observations.
    fn sum(&self) -> i64;

    /// The (possibly rescaled) sum of squares of observations.
    fn sum_of_squares(&self) -> i64;

    /// The number of halvings applied to the sums.
    ///
    /// The true sum is `sum() * 2^shift` and the true sum of squares is
    /// `sum_of_squares() * 2^(2 * shift)`.
    #[inline]
    fn shift(&self) -> u32 {
        0
    }

    /// The mean of observations, `0` if there are none.
    fn average(&self) -> f64 {
        if self.count() == 0 {
            return 0.;
        }

        self.sum() as f64 / self.count() as f64 * scale(self.shift())
    }

    /// The sample variance, `NaN` if there are less than two observations.
    fn variance(&self) -> f64 {
        variance(self.count(), self.sum(), self.sum_of_squares()) * scale(2 * self.shift())
    }

    /// The sample standard deviation.
    fn stddev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// The number of observations since `mark` was taken.
    fn interval_count(&self, mark: &Self) -> u64 {
        self.count().saturating_sub(mark.count())
    }

    /// The sum of observations since `mark` was taken, scaled by `shift()`.
    fn interval_sum(&self, mark: &Self) -> Result<i64, StatsError> {
        let delta = shift_delta(self, mark)?;
        Ok(self.sum().wrapping_sub(shr(mark.sum(), delta)))
    }

    /// The sum of squares since `mark` was taken, scaled by `2 * shift()`.
    fn interval_sum_of_squares(&self, mark: &Self) -> Result<i64, StatsError> {
        let delta = shift_delta(self, mark)?;
        Ok(self
            .sum_of_squares()
            .wrapping_sub(shr(mark.sum_of_squares(), 2 * delta)))
    }
}

fn shift_delta<A: Accumulator>(live: &A, mark: &A) -> Result<u32, StatsError> {
    live.shift().checked_sub(mark.shift()).ok_or_else(|| {
        StatsError::InvariantViolation(format!(
            "mark shift {} exceeds accumulator shift {}",
            mark.shift(),
            live.shift()
        ))
    })
}

/// `2^bits` as a float.
#[inline]
pub(crate) fn scale(bits: u32) -> f64 {
    2f64.powi(bits as i32)
}

/// Arithmetic right shift that saturates for wide shifts.
#[inline]
pub(crate) fn shr(value: i64, bits: u32) -> i64 {
    if bits >= i64::BITS {
        if value < 0 {
            -1
        } else {
            0
        }
    } else {
        value >> bits
    }
}

pub(crate) fn variance(count: u64, sum: i64, sum_of_squares: i64) -> f64 {
    if count <= 1 {
        return f64::NAN;
    }

    let count_f = count as f64;

    // `sum * sum` is computed exactly while it fits into 64 bits.
    let sum_squared_per_count = if sum.unsigned_abs() > i32::MAX as u64 {
        sum as f64 * sum as f64 / count_f
    } else {
        (sum * sum) as f64 / count_f
    };

    (sum_of_squares as f64 - sum_squared_per_count) / (count_f - 1.)
}

// === Extrema ===

/// Exact extrema, never rescaled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Extrema {
    pub(crate) min: Option<i64>,
    pub(crate) max: Option<i64>,
}

impl Extrema {
    #[inline]
    pub(crate) fn check(&mut self, value: i64) {
        self.min = Some(self.min.map_or(value, |min| min.min(value)));
        self.max = Some(self.max.map_or(value, |max| max.max(value)));
    }

    pub(crate) fn merge(&mut self, other: &Extrema) {
        if let Some(min) = other.min {
            self.check(min);
        }
        if let Some(max) = other.max {
            self.check(max);
        }
    }
}

// === Items ===

pub(crate) const ITEM_COUNT: usize = 6;

/// The six-item view of an accumulator: count, min, max, avg, stdDev, sum.
pub(crate) fn accumulator_item<A>(acc: &A, index: usize) -> Result<Item<'static>, StatsError>
where
    A: Accumulator,
{
    let has_data = acc.count() > 0;
    let when = |value: ItemValue| has_data.then_some(value);

    Ok(match index {
        0 => Item::new("count", ItemType::Integer, Some(acc.count().into())),
        1 => Item::new("min", ItemType::Time, acc.min().map(ItemValue::Integer)),
        2 => Item::new("max", ItemType::Time, acc.max().map(ItemValue::Integer)),
        3 => Item::new("avg", ItemType::Time, when(acc.average().into())),
        4 => Item::new("stdDev", ItemType::Time, when(acc.stddev().into())),
        5 => Item::new("sum", ItemType::Time, when(scaled_value(acc.sum(), acc.shift()))),
        _ => return Err(out_of_range(index, ITEM_COUNT)),
    })
}

/// Restores the magnitude of a rescaled sum, keeping exact integers exact.
pub(crate) fn scaled_value(raw: i64, shift: u32) -> ItemValue {
    if shift == 0 {
        ItemValue::Integer(raw)
    } else {
        ItemValue::Float(raw as f64 * scale(shift))
    }
}
