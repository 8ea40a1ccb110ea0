//! A tree of named groups of statistics and its traversal.

use std::{fmt, sync::Arc, time::SystemTime};

use parking_lot::Mutex;
use tracing::debug;

use crate::{
    action::StatisticsAction,
    counter::CounterStatistic,
    errors::ExportError,
    keeper::Keeper,
    visitor::{Scalar, StatisticsVisitor},
};

/// A keeper shared between producers and exporters.
pub type SharedKeeper = Arc<Mutex<dyn Keeper>>;

/// Wraps a keeper to share it.
pub fn shared<K: Keeper + 'static>(keeper: K) -> Arc<Mutex<K>> {
    Arc::new(Mutex::new(keeper))
}

type ScalarFn = Box<dyn Fn() -> Scalar + Send + Sync>;

/// A named group of statistics with nested groups.
///
/// Nested groups are split into two kinds: children are visited on every
/// pass, while details are visited only if the action
/// [shows details](StatisticsAction::shows_details).
pub struct StatisticsGroup {
    name: Option<String>,
    kind: String,
    scalars: Vec<(String, ScalarFn)>,
    counters: Vec<Arc<CounterStatistic>>,
    keepers: Vec<SharedKeeper>,
    children: Vec<StatisticsGroup>,
    details: Vec<StatisticsGroup>,
}

impl StatisticsGroup {
    /// Creates an empty group.
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::build(Some(name.into()), kind.into())
    }

    /// Creates an empty group without a name, e.g. the root one.
    pub fn anonymous(kind: impl Into<String>) -> Self {
        Self::build(None, kind.into())
    }

    fn build(name: Option<String>, kind: String) -> Self {
        Self {
            name,
            kind,
            scalars: Vec::new(),
            counters: Vec::new(),
            keepers: Vec::new(),
            children: Vec::new(),
            details: Vec::new(),
        }
    }

    /// Adds a scalar evaluated on every pass.
    pub fn with_scalar(
        mut self,
        name: impl Into<String>,
        value: impl Fn() -> Scalar + Send + Sync + 'static,
    ) -> Self {
        self.scalars.push((name.into(), Box::new(value)));
        self
    }

    /// Adds a counter, exported as two scalars: the total value and the
    /// value since the last mark (with the `ThisInterval` suffix).
    pub fn with_counter(mut self, counter: Arc<CounterStatistic>) -> Self {
        self.counters.push(counter);
        self
    }

    /// Adds a keeper.
    pub fn with_keeper(mut self, keeper: SharedKeeper) -> Self {
        self.keepers.push(keeper);
        self
    }

    /// Adds a group visited on every pass.
    pub fn with_child(mut self, group: StatisticsGroup) -> Self {
        self.children.push(group);
        self
    }

    /// Adds a group visited only if details are requested.
    pub fn with_details(mut self, group: StatisticsGroup) -> Self {
        self.details.push(group);
        self
    }

    /// The name of the group.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The kind of the group.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Runs a whole pass over the tree: `start`, the tree, `end`.
    ///
    /// `end` is called even if the traversal fails, the first error wins.
    pub fn for_each_statistics_keeper<V>(
        &self,
        visitor: &mut V,
        now: SystemTime,
        main_mark: SystemTime,
        detail_mark: Option<SystemTime>,
        action: StatisticsAction,
    ) -> Result<(), ExportError>
    where
        V: StatisticsVisitor + ?Sized,
    {
        debug!(?action, group = ?self.name, "export pass started");

        let mut ctx = visitor.start(now, main_mark, detail_mark)?;
        let result = self.iterate_over_statistics(visitor, &mut ctx, action);
        let ended = visitor.end(ctx);

        if let Err(err) = &result {
            debug!(error = %err, "export pass failed");
        }

        result.and(ended)
    }

    /// Visits the group and its subgroups, applying the action to each
    /// statistic right after it has been exported.
    pub fn iterate_over_statistics<V>(
        &self,
        visitor: &mut V,
        parent: &mut V::Context,
        action: StatisticsAction,
    ) -> Result<(), ExportError>
    where
        V: StatisticsVisitor + ?Sized,
    {
        let mut ctx = visitor.open_group(parent, self.name(), &self.kind)?;

        for (name, value) in &self.scalars {
            visitor.handle_scalar(&mut ctx, name, value())?;
        }

        for counter in &self.counters {
            let name = counter.name();
            visitor.handle_scalar(&mut ctx, name, counter.value().into())?;

            let interval_name = format!("{name}ThisInterval");
            visitor.handle_scalar(&mut ctx, &interval_name, counter.interval_value().into())?;
        }

        for keeper in &self.keepers {
            let mut keeper = keeper.lock();
            visitor.handle_keeper(&mut ctx, &*keeper)?;
            keeper.perform_action(action);
        }

        for counter in &self.counters {
            counter.perform_action(action);
        }

        for child in &self.children {
            child.iterate_over_statistics(visitor, &mut ctx, action)?;
        }

        if action.shows_details() {
            for group in &self.details {
                group.iterate_over_statistics(visitor, &mut ctx, action)?;
            }
        }

        visitor.close_group(ctx)
    }
}

impl fmt::Debug for StatisticsGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatisticsGroup")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("scalars", &self.scalars.len())
            .field("counters", &self.counters.len())
            .field("keepers", &self.keepers.len())
            .field("children", &self.children)
            .field("details", &self.details)
            .finish()
    }
}
