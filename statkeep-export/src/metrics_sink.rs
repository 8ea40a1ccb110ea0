use std::time::{SystemTime, UNIX_EPOCH};

use metrics::{gauge, register_gauge, Label, Unit};

use statkeep_core::{ExportError, ItemList, Keeper, Scalar, StatisticsVisitor};

use crate::format;

/// Publishes an export pass as gauges through the `metrics` facade.
///
/// * scalars as `statkeep_scalar{group, name}`, timestamps in seconds;
/// * cumulative items as `statkeep_keeper{group, keeper, item}`;
/// * interval items as `statkeep_keeper_interval{group, keeper, item}`.
///
/// Items without data aren't published.
#[derive(Debug)]
pub struct MetricsSink {
    _private: (),
}

/// A context of [`MetricsSink`], the path of the group.
#[derive(Debug, Clone, Default)]
pub struct MetricsContext {
    path: String,
}

impl MetricsSink {
    /// Creates a sink and describes its gauges to the installed recorder.
    pub fn new() -> Self {
        register_gauge!("statkeep_scalar", Unit::Count, "Scalar statistics");
        register_gauge!("statkeep_keeper", "Cumulative statistics of keepers");
        register_gauge!(
            "statkeep_keeper_interval",
            "Statistics of keepers since the last mark"
        );

        Self { _private: () }
    }
}

impl Default for MetricsSink {
    fn default() -> Self {
        Self::new()
    }
}

fn publish<L>(list: &L, path: &str, keeper: &str, interval: bool) -> Result<(), ExportError>
where
    L: ItemList + ?Sized,
{
    for index in 0..list.item_count() {
        let item = list.item(index)?;
        let Some(value) = item.value.map(|v| v.as_f64()).filter(|v| !v.is_nan()) else {
            continue;
        };

        let labels = vec![
            Label::new("group", path.to_owned()),
            Label::new("keeper", keeper.to_owned()),
            Label::new("item", item.name.into_owned()),
        ];

        if interval {
            gauge!("statkeep_keeper_interval", value, labels);
        } else {
            gauge!("statkeep_keeper", value, labels);
        }
    }

    Ok(())
}

impl StatisticsVisitor for MetricsSink {
    type Context = MetricsContext;

    fn start(
        &mut self,
        _now: SystemTime,
        _main_mark: SystemTime,
        _detail_mark: Option<SystemTime>,
    ) -> Result<MetricsContext, ExportError> {
        Ok(MetricsContext::default())
    }

    fn open_group(
        &mut self,
        parent: &mut MetricsContext,
        name: Option<&str>,
        kind: &str,
    ) -> Result<MetricsContext, ExportError> {
        Ok(MetricsContext {
            path: format::child_path(&parent.path, name, kind),
        })
    }

    fn handle_scalar(
        &mut self,
        ctx: &mut MetricsContext,
        name: &str,
        value: Scalar,
    ) -> Result<(), ExportError> {
        let value = match value {
            Scalar::Integer(value) => value as f64,
            Scalar::Timestamp(Some(time)) => time
                .duration_since(UNIX_EPOCH)
                .map_or(0., |since| since.as_secs_f64()),
            Scalar::Timestamp(None) => return Ok(()),
        };

        let labels = vec![
            Label::new("group", ctx.path.clone()),
            Label::new("name", name.to_owned()),
        ];
        gauge!("statkeep_scalar", value, labels);
        Ok(())
    }

    fn handle_keeper(
        &mut self,
        ctx: &mut MetricsContext,
        keeper: &dyn Keeper,
    ) -> Result<(), ExportError> {
        let interval = keeper.interval()?;
        publish(keeper, &ctx.path, keeper.name(), false)?;
        publish(&interval, &ctx.path, keeper.name(), true)
    }

    fn close_group(&mut self, _ctx: MetricsContext) -> Result<(), ExportError> {
        Ok(())
    }

    fn end(&mut self, _ctx: MetricsContext) -> Result<(), ExportError> {
        Ok(())
    }
}
