//! Renders an export pass into an XML document.
//!
//! The document looks like:
//! ```xml
//! <statisticsCollection version="1.0" ... hour="2021-05-17 20">
//!   <group name="adapter1" type="adapter">
//!     <item name="messagesReceived" value="5"/>
//!     <stat name="duration">
//!       <cumulative>
//!         <item name="count" value="3"/>
//!         ...
//!       </cumulative>
//!       <interval>
//!         <item name="count" value="1"/>
//!         ...
//!       </interval>
//!     </stat>
//!   </group>
//! </statisticsCollection>
//! ```

use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use statkeep_core::{ExportError, ItemList, Keeper, Scalar, StatisticsVisitor, NO_DATA};

use crate::{
    config::{PeriodWindows, XmlConfig},
    format,
};

/// Information about the process, rendered as attributes of the root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessInfo {
    /// The version of the application.
    pub version: Option<String>,
    /// The host name.
    pub host: Option<String>,
    /// The name of the instance.
    pub instance: Option<String>,
    /// The used heap, in bytes.
    pub heap_size: Option<u64>,
    /// The total available memory, in bytes.
    pub total_memory: Option<u64>,
}

/// A context of [`XmlSink`], the element of the group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlContext {
    element: usize,
}

/// Builds an XML document per export pass.
///
/// The document is available via [`XmlSink::take_document()`] after `end`.
#[derive(Debug, Default)]
pub struct XmlSink {
    config: XmlConfig,
    process: ProcessInfo,
    elements: Vec<Element>,
    open_groups: usize,
    document: Option<String>,
}

#[derive(Debug)]
struct Element {
    tag: &'static str,
    attrs: Vec<(&'static str, String)>,
    children: Vec<usize>,
}

const ROOT: usize = 0;

impl XmlSink {
    /// Creates a sink.
    pub fn new(config: XmlConfig, process: ProcessInfo) -> Self {
        Self {
            config,
            process,
            ..Self::default()
        }
    }

    /// Information about the process used for next passes.
    pub fn process_mut(&mut self) -> &mut ProcessInfo {
        &mut self.process
    }

    /// Takes the document of the last finished pass.
    pub fn take_document(&mut self) -> Option<String> {
        self.document.take()
    }

    fn add(
        &mut self,
        parent: XmlContext,
        tag: &'static str,
        attrs: Vec<(&'static str, String)>,
    ) -> Result<XmlContext, ExportError> {
        let element = self.elements.len();
        self.elements
            .get_mut(parent.element)
            .ok_or(ExportError::ForeignContext)?
            .children
            .push(element);

        self.elements.push(Element {
            tag,
            attrs,
            children: Vec::new(),
        });

        Ok(XmlContext { element })
    }

    fn add_items<L>(&mut self, parent: XmlContext, list: &L) -> Result<(), ExportError>
    where
        L: ItemList + ?Sized,
    {
        for index in 0..list.item_count() {
            let item = list.item(index)?;
            let value = item.kind.format(item.value);
            self.add(parent, "item", vec![("name", item.name.into_owned()), ("value", value)])?;
        }
        Ok(())
    }

    fn render(&self) -> String {
        let mut out = String::new();
        self.render_element(&mut out, ROOT, 0);
        out
    }

    fn render_element(&self, out: &mut String, element: usize, depth: usize) {
        let Element {
            tag,
            attrs,
            children,
        } = &self.elements[element];
        let indent = self.config.indent;

        if indent > 0 {
            out.extend(std::iter::repeat(' ').take(depth * indent));
        }

        out.push('<');
        out.push_str(tag);
        for (name, value) in attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_to(out, value);
            out.push('"');
        }

        if children.is_empty() {
            out.push_str("/>");
        } else {
            out.push('>');
            if indent > 0 {
                out.push('\n');
            }

            for child in children {
                self.render_element(out, *child, depth + 1);
            }

            if indent > 0 {
                out.extend(std::iter::repeat(' ').take(depth * indent));
            }
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }

        if indent > 0 {
            out.push('\n');
        }
    }

    fn reset(&mut self) {
        self.elements.clear();
        self.open_groups = 0;
    }
}

impl StatisticsVisitor for XmlSink {
    type Context = XmlContext;

    fn start(
        &mut self,
        now: SystemTime,
        main_mark: SystemTime,
        _detail_mark: Option<SystemTime>,
    ) -> Result<XmlContext, ExportError> {
        // A pass aborted by another sink of a fan-out never reaches `end`.
        if !self.elements.is_empty() {
            warn!(
                elements = self.elements.len(),
                open_groups = self.open_groups,
                "unfinished xml document is dropped"
            );
            self.reset();
        }

        let known = |value: &Option<String>| value.clone().unwrap_or_else(|| NO_DATA.into());
        let number = |value: Option<u64>| value.map_or_else(|| NO_DATA.into(), |v| v.to_string());

        let mut attrs = vec![
            ("version", known(&self.process.version)),
            ("heapSize", number(self.process.heap_size)),
            ("totalMemory", number(self.process.total_memory)),
            ("timestamp", format::timestamp(now)),
            ("intervalStart", format::timestamp(main_mark)),
            ("host", known(&self.process.host)),
            ("instance", known(&self.process.instance)),
        ];
        attrs.extend(period_labels(now, main_mark, &self.config.periods));

        self.document = None;
        self.elements.push(Element {
            tag: "statisticsCollection",
            attrs,
            children: Vec::new(),
        });

        Ok(XmlContext { element: ROOT })
    }

    fn open_group(
        &mut self,
        parent: &mut XmlContext,
        name: Option<&str>,
        kind: &str,
    ) -> Result<XmlContext, ExportError> {
        let mut attrs = Vec::with_capacity(2);
        if let Some(name) = name {
            attrs.push(("name", name.to_owned()));
        }
        attrs.push(("type", kind.to_owned()));

        let ctx = self.add(*parent, "group", attrs)?;
        self.open_groups += 1;
        Ok(ctx)
    }

    fn handle_scalar(
        &mut self,
        ctx: &mut XmlContext,
        name: &str,
        value: Scalar,
    ) -> Result<(), ExportError> {
        let attrs = vec![("name", name.to_owned()), ("value", format::scalar(value))];
        self.add(*ctx, "item", attrs).map(drop)
    }

    fn handle_keeper(
        &mut self,
        ctx: &mut XmlContext,
        keeper: &dyn Keeper,
    ) -> Result<(), ExportError> {
        let interval = keeper.interval()?;

        let stat = self.add(*ctx, "stat", vec![("name", keeper.name().to_owned())])?;
        let cumulative = self.add(stat, "cumulative", Vec::new())?;
        self.add_items(cumulative, keeper)?;
        let interval_element = self.add(stat, "interval", Vec::new())?;
        self.add_items(interval_element, &interval)
    }

    fn close_group(&mut self, ctx: XmlContext) -> Result<(), ExportError> {
        if ctx.element == ROOT || self.open_groups == 0 {
            return Err(ExportError::Unbalanced("no group to close".into()));
        }

        self.open_groups -= 1;
        Ok(())
    }

    fn end(&mut self, ctx: XmlContext) -> Result<(), ExportError> {
        let open_groups = self.open_groups;

        if ctx.element != ROOT || open_groups > 0 {
            self.reset();
            return Err(ExportError::Unbalanced(format!(
                "{open_groups} groups are still open"
            )));
        }

        let document = self.render();
        debug!(elements = self.elements.len(), size = document.len(), "xml document is built");
        self.document = Some(document);
        self.reset();
        Ok(())
    }
}

/// Labels of calendar periods covered by the interval, only for periods
/// whose windows fit the interval.
fn period_labels(
    now: SystemTime,
    mark: SystemTime,
    windows: &PeriodWindows,
) -> Vec<(&'static str, String)> {
    let elapsed = now.duration_since(mark).unwrap_or_default();
    // Periods are determined by the middle of the interval, so that small
    // delays of the scheduler don't shift labels to the next period.
    let middle = DateTime::<Utc>::from(now - elapsed / 2);

    [
        ("hour", windows.hour, "%Y-%m-%d %H"),
        ("day", windows.day, "%Y-%m-%d"),
        ("week", windows.week, "%G-W%V"),
        ("month", windows.month, "%Y-%m"),
        ("year", windows.year, "%Y"),
    ]
    .into_iter()
    .filter(|(_, window, _)| elapsed <= *window)
    .map(|(name, _, pattern)| (name, middle.format(pattern).to_string()))
    .collect()
}

fn escape_to(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use proptest::prelude::*;
    use statkeep_core::MetricsKeeper;

    use super::*;

    // 2021-05-17 20:20:20 UTC, Monday.
    fn now() -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(1_621_282_820)
    }

    fn labels(elapsed: Duration) -> Vec<(&'static str, String)> {
        period_labels(now(), now() - elapsed, &PeriodWindows::default())
    }

    #[test]
    fn periods() {
        let hourly = labels(Duration::from_secs(3600));
        assert_eq!(
            hourly,
            [
                ("hour", "2021-05-17 19".to_string()),
                ("day", "2021-05-17".into()),
                ("week", "2021-W20".into()),
                ("month", "2021-05".into()),
                ("year", "2021".into()),
            ]
        );

        let daily = labels(Duration::from_secs(24 * 3600));
        assert_eq!(daily[0], ("day", "2021-05-17".to_string()));
        assert_eq!(daily.len(), 4);

        let yearly = labels(Duration::from_secs(300 * 24 * 3600));
        assert_eq!(yearly, [("year", "2020".to_string())]);

        assert!(labels(Duration::from_secs(500 * 24 * 3600)).is_empty());
    }

    #[test]
    fn escaping() {
        let mut out = String::new();
        escape_to(&mut out, r#"a<b & "c">'d'"#);
        assert_eq!(out, "a&lt;b &amp; &quot;c&quot;&gt;&apos;d&apos;");
    }

    proptest! {
        #[test]
        fn escaped_values_are_inert(value in "\\PC*") {
            let mut out = String::new();
            escape_to(&mut out, &value);

            prop_assert!(!out.contains(['<', '>', '"', '\'']));

            let restored = out
                .replace("&lt;", "<")
                .replace("&gt;", ">")
                .replace("&quot;", "\"")
                .replace("&apos;", "'")
                .replace("&amp;", "&");
            prop_assert_eq!(restored, value);
        }
    }

    #[test]
    fn compact_document() {
        let config = XmlConfig {
            indent: 0,
            ..XmlConfig::default()
        };
        let process = ProcessInfo {
            version: Some("1.0".into()),
            host: Some("node-1".into()),
            ..ProcessInfo::default()
        };
        let mut sink = XmlSink::new(config, process);
        let mut keeper = MetricsKeeper::durations("a<b");
        keeper.add_value(10);

        let mut root = sink.start(now(), now() - Duration::from_secs(7200), None).unwrap();
        let mut group = sink.open_group(&mut root, None, "pipeline").unwrap();
        sink.handle_scalar(&mut group, "count", Scalar::Integer(5))
            .unwrap();
        sink.handle_keeper(&mut group, &keeper).unwrap();
        sink.close_group(group).unwrap();
        sink.end(root).unwrap();

        let document = sink.take_document().unwrap();
        assert!(document.starts_with(
            "<statisticsCollection version=\"1.0\" heapSize=\"-\" totalMemory=\"-\" \
             timestamp=\"2021-05-17 20:20:20.000\" intervalStart=\"2021-05-17 18:20:20.000\" \
             host=\"node-1\" instance=\"-\" day=\"2021-05-17\""
        ));
        assert!(document.contains(
            "<group type=\"pipeline\"><item name=\"count\" value=\"5\"/>\
             <stat name=\"a&lt;b\"><cumulative><item name=\"count\" value=\"1\"/>\
             <item name=\"min\" value=\"10.0\"/>"
        ));
        assert!(document.contains(
            "<interval><item name=\"count\" value=\"1\"/><item name=\"min\" value=\"10.0\"/>"
        ));
        assert!(document.ends_with("</interval></stat></group></statisticsCollection>"));
        assert_eq!(sink.take_document(), None);
    }

    #[test]
    fn unbalanced() {
        let mut sink = XmlSink::new(XmlConfig::default(), ProcessInfo::default());

        let mut root = sink.start(now(), now(), None).unwrap();
        let _group = sink.open_group(&mut root, Some("a"), "adapter").unwrap();
        assert!(matches!(sink.end(root), Err(ExportError::Unbalanced(_))));
        assert_eq!(sink.take_document(), None);

        // The sink is usable again.
        let root = sink.start(now(), now(), None).unwrap();
        assert!(matches!(
            sink.close_group(root),
            Err(ExportError::Unbalanced(_))
        ));
        sink.end(root).unwrap();
        assert!(sink.take_document().unwrap().ends_with("/>\n"));
    }

    #[test]
    fn abandoned_pass() {
        let mut sink = XmlSink::new(XmlConfig::default(), ProcessInfo::default());

        let mut root = sink.start(now(), now(), None).unwrap();
        let _group = sink.open_group(&mut root, Some("stale"), "adapter").unwrap();

        // The next pass starts from scratch.
        let mut root = sink.start(now(), now(), None).unwrap();
        let group = sink.open_group(&mut root, Some("fresh"), "adapter").unwrap();
        sink.close_group(group).unwrap();
        sink.end(root).unwrap();

        let document = sink.take_document().unwrap();
        assert!(document.contains("<group name=\"fresh\" type=\"adapter\"/>"));
        assert!(!document.contains("stale"));
    }
}
