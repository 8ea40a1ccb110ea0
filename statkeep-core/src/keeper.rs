use tracing::debug;

use crate::{
    accumulator::{
        accumulator_item, scale, scaled_value, Accumulator, BasicAccumulator, ScaledAccumulator,
        ITEM_COUNT,
    },
    action::StatisticsAction,
    config::KeeperConfig,
    errors::StatsError,
    histogram::Histogram,
    item::{out_of_range, Item, ItemList, ItemType, ItemValue},
    percentile::{PercentileEstimator, Sample},
};

const FIRST: usize = ITEM_COUNT;
const LAST: usize = ITEM_COUNT + 1;
const HISTOGRAM_START: usize = ITEM_COUNT + 2;

/// A keeper of sizes in bytes, rescaling its sums to never overflow.
pub type SizeKeeper = MetricsKeeper<ScaledAccumulator>;

// === Keeper ===

/// An object-safe view of a keeper, consumed by export sinks.
pub trait Keeper: ItemList + Send {
    /// The name of the measured quantity.
    fn name(&self) -> &str;

    /// Units of values, used in names of histogram items.
    fn units(&self) -> &str;

    /// Statistics of observations since the last mark.
    fn interval(&self) -> Result<IntervalStats, StatsError>;

    /// Diagnostic samples of the percentile estimator.
    fn samples(&self) -> Vec<Sample>;

    /// Applies the action after an export.
    fn perform_action(&mut self, action: StatisticsAction);

    /// Applies the action by its numeric code. Unknown codes are ignored.
    fn perform_action_code(&mut self, code: i32) {
        if let Some(action) = StatisticsAction::from_code(code) {
            self.perform_action(action);
        }
    }
}

// === MetricsKeeper ===

/// Statistics of a single measured quantity.
///
/// Combines the all-time accumulator, the mark used to derive interval
/// statistics, a histogram and a percentile estimator into one item list:
///
/// | index              | items                                      |
/// |--------------------|--------------------------------------------|
/// | `0..6`             | count, min, max, avg, stdDev, sum          |
/// | `6`, `7`           | first, last                                |
/// | `8..8+B`           | `"< {boundary}{units}"` fractions          |
/// | `8+B..8+B+P`       | `"p{percentage}"` estimations              |
///
/// The keeper isn't synchronized, wrap it into a mutex to share it between
/// producers and exporters.
#[derive(Debug)]
pub struct MetricsKeeper<A = BasicAccumulator> {
    name: String,
    units: String,
    cumulative: A,
    mark: A,
    first: Option<i64>,
    last: Option<i64>,
    histogram: Histogram,
    estimator: Box<dyn PercentileEstimator>,
}

impl MetricsKeeper<BasicAccumulator> {
    /// Creates a keeper of durations in milliseconds with default settings.
    pub fn durations(name: impl Into<String>) -> Self {
        Self::new(name, "ms", &KeeperConfig::default())
    }
}

impl MetricsKeeper<ScaledAccumulator> {
    /// Creates a keeper of sizes in bytes with default settings.
    pub fn sizes(name: impl Into<String>) -> Self {
        Self::new(name, "B", &KeeperConfig::sizes())
    }
}

impl<A: Accumulator> MetricsKeeper<A> {
    /// Creates an empty keeper.
    pub fn new(
        name: impl Into<String>,
        units: impl Into<String>,
        config: &KeeperConfig,
    ) -> Self {
        Self {
            name: name.into(),
            units: units.into(),
            cumulative: A::default(),
            mark: A::default(),
            first: None,
            last: None,
            histogram: Histogram::new(config.boundaries.clone()),
            estimator: config.estimator(),
        }
    }

    /// Records a new observation.
    pub fn add_value(&mut self, value: i64) {
        self.first.get_or_insert(value);
        self.last = Some(value);

        // The estimator expects extrema before this observation.
        let min_before = self.cumulative.min();
        let max_before = self.cumulative.max();

        self.cumulative.add_value(value);
        self.mark.check_min_max(value);
        self.estimator
            .add_value(value, self.cumulative.count(), min_before, max_before);
        self.histogram.observe(value);
    }

    /// Forgets all observations.
    ///
    /// `first` and `last` become unset (not `0`), so the next observation
    /// is reported as `first` again. The histogram is cleared as well.
    pub fn clear(&mut self) {
        self.cumulative.reset();
        self.mark.reset();
        self.first = None;
        self.last = None;
        self.histogram.clear();
        self.estimator.clear();
    }

    /// Merges accumulated statistics of another partition of the same
    /// stream. Percentile samples aren't merged.
    pub fn add_record(&mut self, other: &Self) -> Result<(), StatsError> {
        if self.histogram.boundaries() != other.histogram.boundaries() {
            return Err(StatsError::InvariantViolation(format!(
                "cannot merge keeper {} into {} with other boundaries",
                other.name, self.name
            )));
        }

        self.cumulative.add_record(&other.cumulative);
        self.mark.add_record(&other.mark);
        self.histogram.merge(&other.histogram);
        self.first = self.first.or(other.first);
        self.last = other.last.or(self.last);
        Ok(())
    }

    /// The all-time accumulator.
    #[inline]
    pub fn cumulative(&self) -> &A {
        &self.cumulative
    }

    /// The accumulator frozen at the last mark.
    #[inline]
    pub fn mark(&self) -> &A {
        &self.mark
    }

    /// The number of observations since the last reset.
    #[inline]
    pub fn count(&self) -> u64 {
        self.cumulative.count()
    }

    /// The first observed value since the last reset.
    #[inline]
    pub fn first(&self) -> Option<i64> {
        self.first
    }

    /// The most recent observed value.
    #[inline]
    pub fn last(&self) -> Option<i64> {
        self.last
    }

    /// The threshold histogram.
    #[inline]
    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    fn percentile_start(&self) -> usize {
        HISTOGRAM_START + self.histogram.len()
    }
}

impl<A: Accumulator> ItemList for MetricsKeeper<A> {
    fn item_count(&self) -> usize {
        self.percentile_start() + self.estimator.num_percentiles()
    }

    fn item(&self, index: usize) -> Result<Item<'_>, StatsError> {
        let count = self.cumulative.count();
        let has_data = count > 0;
        let percentile_start = self.percentile_start();
        let raw = |value: Option<i64>| value.filter(|_| has_data).map(ItemValue::Integer);

        Ok(match index {
            _ if index < ITEM_COUNT => accumulator_item(&self.cumulative, index)?,
            FIRST => Item::new("first", ItemType::Time, raw(self.first)),
            LAST => Item::new("last", ItemType::Time, raw(self.last)),
            _ if index < percentile_start => {
                let i = index - HISTOGRAM_START;
                let boundary = self.histogram.boundaries()[i];
                let name = format!("< {boundary}{}", self.units);
                let value = self.histogram.fraction(i, count).map(ItemValue::Float);
                Item::new(name, ItemType::Fraction, value)
            }
            _ if index < self.item_count() => {
                let i = index - percentile_start;
                let name = format!("p{}", self.estimator.percentage_at(i));
                let value = match (self.cumulative.min(), self.cumulative.max()) {
                    (Some(min), Some(max)) if has_data => {
                        let estimate = self.estimator.estimate_at(i, count, min, max);
                        Some(ItemValue::Float(estimate))
                    }
                    _ => None,
                };
                Item::new(name, ItemType::Time, value)
            }
            _ => return Err(out_of_range(index, self.item_count())),
        })
    }
}

impl<A: Accumulator> Keeper for MetricsKeeper<A> {
    fn name(&self) -> &str {
        &self.name
    }

    fn units(&self) -> &str {
        &self.units
    }

    fn interval(&self) -> Result<IntervalStats, StatsError> {
        Ok(IntervalStats {
            count: self.cumulative.interval_count(&self.mark),
            min: self.mark.min(),
            max: self.mark.max(),
            sum: self.cumulative.interval_sum(&self.mark)?,
            sum_of_squares: self.cumulative.interval_sum_of_squares(&self.mark)?,
            shift: self.cumulative.shift(),
        })
    }

    fn samples(&self) -> Vec<Sample> {
        let count = self.cumulative.count();
        let (Some(min), Some(max)) = (self.cumulative.min(), self.cumulative.max()) else {
            return Vec::new();
        };

        (0..self.estimator.sample_count(count, min, max))
            .map(|i| self.estimator.sample_at(i, count, min, max))
            .collect()
    }

    fn perform_action(&mut self, action: StatisticsAction) {
        match action {
            StatisticsAction::Reset => {
                debug!(keeper = %self.name, count = self.cumulative.count(), "reset");
                self.clear();
            }
            StatisticsAction::MarkMain | StatisticsAction::MarkFull => {
                debug!(keeper = %self.name, count = self.cumulative.count(), "marked");
                self.mark.mark(&self.cumulative);
            }
            StatisticsAction::Summary | StatisticsAction::Full => {}
        }
    }
}

// === IntervalStats ===

/// Statistics of observations since the last mark.
///
/// Sums are scaled the same way as the live accumulator's ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalStats {
    /// The number of observations.
    pub count: u64,
    /// The smallest observation.
    pub min: Option<i64>,
    /// The largest observation.
    pub max: Option<i64>,
    /// The raw sum, see `shift`.
    pub sum: i64,
    /// The raw sum of squares, see `shift`.
    pub sum_of_squares: i64,
    /// The number of halvings applied to sums.
    pub shift: u32,
}

impl IntervalStats {
    const ITEM_COUNT: usize = 6;

    /// The mean of observations, `None` if there are none.
    pub fn average(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum as f64 / self.count as f64 * scale(self.shift))
    }
}

impl ItemList for IntervalStats {
    fn item_count(&self) -> usize {
        Self::ITEM_COUNT
    }

    fn item(&self, index: usize) -> Result<Item<'_>, StatsError> {
        let has_data = self.count > 0;
        let when = |value: ItemValue| has_data.then_some(value);
        let raw = |value: Option<i64>| value.filter(|_| has_data).map(ItemValue::Integer);

        Ok(match index {
            0 => Item::new("count", ItemType::Integer, Some(self.count.into())),
            1 => Item::new("min", ItemType::Time, raw(self.min)),
            2 => Item::new("max", ItemType::Time, raw(self.max)),
            3 => Item::new("avg", ItemType::Time, self.average().map(ItemValue::Float)),
            4 => Item::new("sum", ItemType::Time, when(scaled_value(self.sum, self.shift))),
            5 => Item::new(
                "sumsq",
                ItemType::Time,
                when(scaled_value(self.sum_of_squares, 2 * self.shift)),
            ),
            _ => return Err(out_of_range(index, Self::ITEM_COUNT)),
        })
    }
}
