//! Sinks of export passes.
//!
//! Every sink implements [`StatisticsVisitor`](statkeep_core::StatisticsVisitor),
//! so they can be combined by [`FanOut`](statkeep_core::FanOut):
//! * [`XmlSink`] builds an XML document per pass;
//! * [`TextSink`] writes plain text lines into any [`std::io::Write`];
//! * [`TracingSink`] emits `tracing` events;
//! * [`MetricsSink`] publishes gauges through the `metrics` facade.

pub use self::{
    config::{PeriodWindows, XmlConfig},
    metrics_sink::{MetricsContext, MetricsSink},
    text::{TextContext, TextSink},
    tracing_sink::{TracingContext, TracingSink},
    xml::{ProcessInfo, XmlContext, XmlSink},
};

mod config;
mod format;
mod metrics_sink;
mod text;
mod tracing_sink;
mod xml;
