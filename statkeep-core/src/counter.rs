use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::action::StatisticsAction;

/// A monotonically increasing counter with interval support.
///
/// Unlike keepers, counters are lock-free and can be shared between
/// producers directly.
#[derive(Debug, Default)]
pub struct CounterStatistic {
    name: String,
    value: AtomicU64,
    mark: AtomicU64,
}

impl CounterStatistic {
    /// Creates a zeroed counter.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// The name of the counter.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Increments the counter by one.
    #[inline]
    pub fn increment(&self) {
        self.add(1);
    }

    /// Increments the counter by `delta`.
    #[inline]
    pub fn add(&self, delta: u64) {
        self.value.fetch_add(delta, Ordering::Relaxed);
    }

    /// The total value since the last reset.
    #[inline]
    pub fn value(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// The value accumulated since the last mark.
    #[inline]
    pub fn interval_value(&self) -> u64 {
        self.value().saturating_sub(self.mark.load(Ordering::Relaxed))
    }

    /// Applies the action after an export.
    pub fn perform_action(&self, action: StatisticsAction) {
        match action {
            StatisticsAction::Reset => {
                debug!(counter = %self.name, value = self.value(), "reset");
                self.value.store(0, Ordering::Relaxed);
                self.mark.store(0, Ordering::Relaxed);
            }
            StatisticsAction::MarkMain | StatisticsAction::MarkFull => {
                self.mark.store(self.value(), Ordering::Relaxed);
            }
            StatisticsAction::Summary | StatisticsAction::Full => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn interval() {
        let counter = CounterStatistic::new("messages");
        counter.add(5);
        assert_eq!(counter.interval_value(), 5);

        counter.perform_action(StatisticsAction::Full);
        assert_eq!(counter.interval_value(), 5);

        counter.perform_action(StatisticsAction::MarkMain);
        assert_eq!(counter.interval_value(), 0);

        counter.increment();
        counter.increment();
        assert_eq!(counter.value(), 7);
        assert_eq!(counter.interval_value(), 2);

        counter.perform_action(StatisticsAction::Reset);
        assert_eq!(counter.value(), 0);
        assert_eq!(counter.interval_value(), 0);
    }

    #[test]
    fn concurrent_increments() {
        let counter = Arc::new(CounterStatistic::new("messages"));

        let handles = (0..4)
            .map(|_| {
                let counter = counter.clone();
                thread::spawn(move || (0..1000).for_each(|_| counter.increment()))
            })
            .collect::<Vec<_>>();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.value(), 4000);
    }
}
