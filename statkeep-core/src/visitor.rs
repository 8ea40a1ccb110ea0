use std::{fmt, sync::Arc, time::SystemTime};

use parking_lot::Mutex;

use crate::{errors::ExportError, keeper::Keeper};

/// A value of a scalar statistic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    /// A plain number, e.g. a counter.
    Integer(i64),
    /// A point in time, `None` if it hasn't happened yet.
    Timestamp(Option<SystemTime>),
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u64> for Scalar {
    fn from(value: u64) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<SystemTime> for Scalar {
    fn from(value: SystemTime) -> Self {
        Self::Timestamp(Some(value))
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{value}"),
            Self::Timestamp(Some(time)) => write!(f, "{}", humantime::format_rfc3339_millis(*time)),
            Self::Timestamp(None) => f.write_str(crate::item::NO_DATA),
        }
    }
}

/// A sink of an export pass.
///
/// A pass is a sequence of calls:
/// * exactly one [`start()`](Self::start) and one [`end()`](Self::end);
/// * properly nested [`open_group()`](Self::open_group) and
///   [`close_group()`](Self::close_group) pairs in between;
/// * [`handle_scalar()`](Self::handle_scalar) and
///   [`handle_keeper()`](Self::handle_keeper) inside groups.
///
/// Contexts are opaque to callers. The session context returned by `start`
/// is the root of the context tree, every `open_group` returns a context of
/// the new group, and `close_group` and `end` consume them back.
pub trait StatisticsVisitor {
    /// Per-pass and per-group state of the sink.
    type Context;

    /// Starts a pass.
    ///
    /// `main_mark` is the time of the last main mark, `detail_mark` is the
    /// time of the last full mark if details are exported.
    fn start(
        &mut self,
        now: SystemTime,
        main_mark: SystemTime,
        detail_mark: Option<SystemTime>,
    ) -> Result<Self::Context, ExportError>;

    /// Opens a group inside `parent`, returning its context.
    fn open_group(
        &mut self,
        parent: &mut Self::Context,
        name: Option<&str>,
        kind: &str,
    ) -> Result<Self::Context, ExportError>;

    /// Exports a scalar of the current group.
    fn handle_scalar(
        &mut self,
        ctx: &mut Self::Context,
        name: &str,
        value: Scalar,
    ) -> Result<(), ExportError>;

    /// Exports a keeper of the current group.
    fn handle_keeper(
        &mut self,
        ctx: &mut Self::Context,
        keeper: &dyn Keeper,
    ) -> Result<(), ExportError>;

    /// Closes the group.
    fn close_group(&mut self, ctx: Self::Context) -> Result<(), ExportError>;

    /// Finishes the pass.
    fn end(&mut self, ctx: Self::Context) -> Result<(), ExportError>;
}

/// A shared sink, so that the owner can inspect it while it's registered
/// in a [`FanOut`](crate::FanOut).
impl<V: StatisticsVisitor + ?Sized> StatisticsVisitor for Arc<Mutex<V>> {
    type Context = V::Context;

    fn start(
        &mut self,
        now: SystemTime,
        main_mark: SystemTime,
        detail_mark: Option<SystemTime>,
    ) -> Result<Self::Context, ExportError> {
        self.lock().start(now, main_mark, detail_mark)
    }

    fn open_group(
        &mut self,
        parent: &mut Self::Context,
        name: Option<&str>,
        kind: &str,
    ) -> Result<Self::Context, ExportError> {
        self.lock().open_group(parent, name, kind)
    }

    fn handle_scalar(
        &mut self,
        ctx: &mut Self::Context,
        name: &str,
        value: Scalar,
    ) -> Result<(), ExportError> {
        self.lock().handle_scalar(ctx, name, value)
    }

    fn handle_keeper(
        &mut self,
        ctx: &mut Self::Context,
        keeper: &dyn Keeper,
    ) -> Result<(), ExportError> {
        self.lock().handle_keeper(ctx, keeper)
    }

    fn close_group(&mut self, ctx: Self::Context) -> Result<(), ExportError> {
        self.lock().close_group(ctx)
    }

    fn end(&mut self, ctx: Self::Context) -> Result<(), ExportError> {
        self.lock().end(ctx)
    }
}
