use std::{
    collections::BTreeMap,
    sync::Arc,
    time::{Duration, UNIX_EPOCH},
};

use eyre::Result;
use metrics::{GaugeValue, Key, Unit};
use parking_lot::Mutex;

use statkeep_core::{shared, MetricsKeeper, Scalar, StatisticsAction, StatisticsGroup};
use statkeep_export::MetricsSink;

#[derive(Default)]
struct Captured {
    descriptions: BTreeMap<String, &'static str>,
    gauges: BTreeMap<String, f64>,
}

/// Keeps the last absolute value of every gauge, keyed by `name{k=v,...}`.
#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Captured>>);

fn render_key(key: &Key) -> String {
    let labels = key
        .labels()
        .map(|label| format!("{}={}", label.key(), label.value()))
        .collect::<Vec<_>>();
    format!("{}{{{}}}", key.name(), labels.join(","))
}

impl metrics::Recorder for Capture {
    fn register_counter(
        &self,
        _key: &Key,
        _unit: Option<Unit>,
        _description: Option<&'static str>,
    ) {
    }

    fn register_gauge(&self, key: &Key, _unit: Option<Unit>, description: Option<&'static str>) {
        if let Some(description) = description {
            let name = key.name().to_string();
            self.0.lock().descriptions.insert(name, description);
        }
    }

    fn register_histogram(
        &self,
        _key: &Key,
        _unit: Option<Unit>,
        _description: Option<&'static str>,
    ) {
    }

    fn increment_counter(&self, _key: &Key, _value: u64) {}

    fn update_gauge(&self, key: &Key, value: GaugeValue) {
        if let GaugeValue::Absolute(value) = value {
            self.0.lock().gauges.insert(render_key(key), value);
        }
    }

    fn record_histogram(&self, _key: &Key, _value: f64) {}
}

// The recorder is global, so everything is checked in one test.
#[test]
fn gauges() -> Result<()> {
    let capture = Capture::default();
    metrics::set_boxed_recorder(Box::new(capture.clone()))?;

    let duration = shared(MetricsKeeper::durations("duration"));
    let idle = shared(MetricsKeeper::durations("idle"));
    let started = UNIX_EPOCH + Duration::from_secs(1_000);

    let adapter = StatisticsGroup::new("adapter1", "adapter")
        .with_scalar("started", move || Scalar::from(started))
        .with_scalar("stopped", || Scalar::Timestamp(None))
        .with_keeper(duration.clone())
        .with_keeper(idle);
    let root = StatisticsGroup::anonymous("process")
        .with_scalar("uptime", || Scalar::Integer(42))
        .with_child(adapter);

    duration.lock().add_value(10);
    duration.lock().add_value(20);

    let mut sink = MetricsSink::new();
    let now = UNIX_EPOCH + Duration::from_secs(2_000);
    root.for_each_statistics_keeper(&mut sink, now, started, None, StatisticsAction::MarkMain)?;

    let captured = capture.0.lock();
    assert_eq!(
        captured.descriptions.get("statkeep_scalar"),
        Some(&"Scalar statistics")
    );

    let gauge = |key: &str| captured.gauges.get(key).copied();
    assert_eq!(gauge("statkeep_scalar{group=process,name=uptime}"), Some(42.));
    assert_eq!(
        gauge("statkeep_scalar{group=process.adapter1,name=started}"),
        Some(1_000.)
    );
    assert_eq!(gauge("statkeep_scalar{group=process.adapter1,name=stopped}"), None);

    let keeper = "group=process.adapter1,keeper=duration";
    assert_eq!(gauge(&format!("statkeep_keeper{{{keeper},item=count}}")), Some(2.));
    assert_eq!(gauge(&format!("statkeep_keeper{{{keeper},item=max}}")), Some(20.));
    assert_eq!(gauge(&format!("statkeep_keeper{{{keeper},item=first}}")), Some(10.));
    assert_eq!(
        gauge(&format!("statkeep_keeper_interval{{{keeper},item=sum}}")),
        Some(30.)
    );

    // Items without data are skipped.
    let idle = "group=process.adapter1,keeper=idle";
    assert_eq!(gauge(&format!("statkeep_keeper{{{idle},item=count}}")), Some(0.));
    assert_eq!(gauge(&format!("statkeep_keeper{{{idle},item=min}}")), None);
    assert_eq!(gauge(&format!("statkeep_keeper{{{idle},item=p50}}")), None);

    Ok(())
}
