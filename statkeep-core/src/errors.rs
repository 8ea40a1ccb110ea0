//! Errors of the numeric core and of export passes.

use std::io;

use derive_more::{Display, Error};

/// Errors produced by the numeric core.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[non_exhaustive]
pub enum StatsError {
    /// An item was requested by an index outside of `0..item_count()`.
    #[display("item index {index} is out of range (item count is {count})")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of items in the list.
        count: usize,
    },
    /// Internal invariants are broken, usually because a mark was taken
    /// from an accumulator of a different lineage.
    #[display("invariant violation: {_0}")]
    InvariantViolation(#[error(not(source))] String),
}

/// Errors produced during an export pass.
///
/// Shared by every [`StatisticsVisitor`](crate::StatisticsVisitor)
/// implementation, so that sinks can be combined by [`FanOut`](crate::FanOut).
#[derive(Debug, Display, Error)]
#[non_exhaustive]
pub enum ExportError {
    /// Items of a keeper cannot be read.
    #[display("cannot read statistics: {_0}")]
    Stats(StatsError),
    /// A sink failed to write its output.
    #[display("i/o error: {_0}")]
    Io(io::Error),
    /// A sink failed for its own reasons.
    #[display("sink {sink} failed: {reason}")]
    Sink {
        /// The name of the failed sink.
        sink: String,
        /// A human readable reason.
        reason: String,
    },
    /// Handlers cannot be registered between `start` and `end`.
    #[display("handlers cannot be changed while an export pass is in progress")]
    PassInProgress,
    /// A context doesn't belong to the current export pass.
    #[display("context doesn't belong to the current export pass")]
    ForeignContext,
    /// The protocol is misused, e.g. `end` is called with unclosed groups.
    #[display("unbalanced export protocol: {_0}")]
    Unbalanced(#[error(not(source))] String),
}

impl ExportError {
    /// Creates [`ExportError::Sink`].
    pub fn sink(sink: impl Into<String>, reason: impl ToString) -> Self {
        Self::Sink {
            sink: sink.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<StatsError> for ExportError {
    fn from(err: StatsError) -> Self {
        Self::Stats(err)
    }
}

impl From<io::Error> for ExportError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}
