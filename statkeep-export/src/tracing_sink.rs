use std::time::SystemTime;

use tracing::info;

use statkeep_core::{ExportError, ItemList, Keeper, Scalar, StatisticsVisitor};

use crate::format;

/// Emits an export pass as `tracing` events.
///
/// Every scalar and keeper becomes an `INFO` event with the `group` field
/// holding the dotted path of the group.
#[derive(Debug, Default)]
pub struct TracingSink {
    _private: (),
}

/// A context of [`TracingSink`], the path of the group.
#[derive(Debug, Clone, Default)]
pub struct TracingContext {
    path: String,
}

impl TracingSink {
    /// Creates a sink.
    pub fn new() -> Self {
        Self::default()
    }
}

fn render<L: ItemList + ?Sized>(list: &L) -> Result<String, ExportError> {
    let mut out = String::new();

    for index in 0..list.item_count() {
        let item = list.item(index)?;
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(&item.name);
        out.push('=');
        item.kind.format_to(&mut out, item.value);
    }

    Ok(out)
}

impl StatisticsVisitor for TracingSink {
    type Context = TracingContext;

    fn start(
        &mut self,
        now: SystemTime,
        main_mark: SystemTime,
        detail_mark: Option<SystemTime>,
    ) -> Result<TracingContext, ExportError> {
        info!(
            now = %format::timestamp(now),
            since = %format::timestamp(main_mark),
            details = detail_mark.is_some(),
            "statistics"
        );
        Ok(TracingContext::default())
    }

    fn open_group(
        &mut self,
        parent: &mut TracingContext,
        name: Option<&str>,
        kind: &str,
    ) -> Result<TracingContext, ExportError> {
        Ok(TracingContext {
            path: format::child_path(&parent.path, name, kind),
        })
    }

    fn handle_scalar(
        &mut self,
        ctx: &mut TracingContext,
        name: &str,
        value: Scalar,
    ) -> Result<(), ExportError> {
        info!(group = %ctx.path, name, value = %format::scalar(value), "scalar");
        Ok(())
    }

    fn handle_keeper(
        &mut self,
        ctx: &mut TracingContext,
        keeper: &dyn Keeper,
    ) -> Result<(), ExportError> {
        let cumulative = render(keeper)?;
        let interval = render(&keeper.interval()?)?;

        info!(
            group = %ctx.path,
            keeper = keeper.name(),
            %cumulative,
            %interval,
            "keeper"
        );
        Ok(())
    }

    fn close_group(&mut self, _ctx: TracingContext) -> Result<(), ExportError> {
        Ok(())
    }

    fn end(&mut self, _ctx: TracingContext) -> Result<(), ExportError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use statkeep_core::{IntervalStats, MetricsKeeper};

    use super::*;

    #[test]
    fn rendering() {
        let interval = IntervalStats {
            count: 0,
            min: None,
            max: None,
            sum: 0,
            sum_of_squares: 0,
            shift: 0,
        };
        assert_eq!(
            render(&interval).unwrap(),
            "count=0 min=- max=- avg=- sum=- sumsq=-"
        );

        let mut keeper = MetricsKeeper::durations("duration");
        keeper.add_value(5);
        let rendered = render(&keeper).unwrap();
        assert!(rendered.starts_with("count=1 min=5.0 max=5.0 avg=5.0 stdDev=- sum=5.0 first=5.0"));
    }

    #[test]
    fn pass_without_subscriber() {
        let mut sink = TracingSink::new();
        let keeper = MetricsKeeper::durations("duration");
        let now = SystemTime::now();

        let mut root = sink.start(now, now, None).unwrap();
        let mut group = sink.open_group(&mut root, Some("adapter"), "adapter").unwrap();
        sink.handle_scalar(&mut group, "up", Scalar::Integer(1)).unwrap();
        sink.handle_keeper(&mut group, &keeper).unwrap();
        sink.close_group(group).unwrap();
        sink.end(root).unwrap();
    }
}
