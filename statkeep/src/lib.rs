//! Online statistics with hierarchical export.
//!
//! Keepers accumulate observations (durations, sizes) into counts, sums,
//! extrema, histograms and percentile estimates. Keepers, counters and
//! scalars are organized into [`StatisticsGroup`] trees, which are exported
//! by passes into sinks implementing [`StatisticsVisitor`].
//!
//! ```
//! use std::time::SystemTime;
//!
//! use statkeep::{prelude::*, export::TextSink};
//!
//! # fn main() -> eyre::Result<()> {
//! let duration = statkeep::shared(MetricsKeeper::durations("duration"));
//! let root = StatisticsGroup::new("adapter1", "adapter").with_keeper(duration.clone());
//!
//! duration.lock().add_value(15);
//!
//! let mut sink = TextSink::new(Vec::new());
//! let now = SystemTime::now();
//! root.for_each_statistics_keeper(&mut sink, now, now, None, StatisticsAction::MarkMain)?;
//!
//! let text = String::from_utf8(sink.into_inner())?;
//! assert!(text.contains("adapter1 duration count=1"));
//! # Ok(())
//! # }
//! ```

pub use statkeep_core::*;

#[cfg(feature = "export")]
pub use statkeep_export as export;

/// Frequently used types.
pub mod prelude {
    pub use super::{
        CounterStatistic, Keeper, MetricsKeeper, Scalar, SizeKeeper, StatisticsAction,
        StatisticsGroup, StatisticsVisitor,
    };
}
