//! Online statistics of measured quantities and the protocol to export them.
//!
//! Producers record values into [`MetricsKeeper`]s and increment
//! [`CounterStatistic`]s. Periodically, a tree of [`StatisticsGroup`]s is
//! walked by a [`StatisticsVisitor`], which is usually a [`FanOut`] of
//! several sinks. After a statistic is exported, a [`StatisticsAction`] is
//! applied to it: nothing, a mark starting a new interval, or a reset.

pub use crate::{
    accumulator::{Accumulator, BasicAccumulator, ScaledAccumulator},
    action::StatisticsAction,
    config::{EstimatorKind, KeeperConfig},
    counter::CounterStatistic,
    errors::{ExportError, StatsError},
    fan_out::{FanOut, FanOutContext},
    hierarchy::{shared, SharedKeeper, StatisticsGroup},
    histogram::Histogram,
    item::{Item, ItemList, ItemType, ItemValue, NO_DATA},
    keeper::{IntervalStats, Keeper, MetricsKeeper, SizeKeeper},
    visitor::{Scalar, StatisticsVisitor},
};

pub mod accumulator;
pub mod errors;
pub mod percentile;

mod action;
mod config;
mod counter;
mod fan_out;
mod hierarchy;
mod histogram;
mod item;
mod keeper;
mod visitor;
