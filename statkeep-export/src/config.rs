use std::time::Duration;

use serde::Deserialize;

/// Settings of [`XmlSink`](crate::XmlSink).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct XmlConfig {
    /// The number of spaces per nesting level, `0` disables pretty printing.
    #[serde(default = "default_indent")]
    pub indent: usize,
    /// Maximum lengths of intervals labelled by calendar periods.
    #[serde(default)]
    pub periods: PeriodWindows,
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            indent: default_indent(),
            periods: PeriodWindows::default(),
        }
    }
}

/// Maximum lengths of intervals that are still labelled by a calendar period.
///
/// An interval is labelled, for instance, by the hour it covers if it's not
/// longer than `hour`. Defaults give 10% of slack to the period lengths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PeriodWindows {
    /// The window of hourly labels.
    #[serde(with = "humantime_serde", default = "default_hour")]
    pub hour: Duration,
    /// The window of daily labels.
    #[serde(with = "humantime_serde", default = "default_day")]
    pub day: Duration,
    /// The window of weekly labels.
    #[serde(with = "humantime_serde", default = "default_week")]
    pub week: Duration,
    /// The window of monthly labels.
    #[serde(with = "humantime_serde", default = "default_month")]
    pub month: Duration,
    /// The window of yearly labels.
    #[serde(with = "humantime_serde", default = "default_year")]
    pub year: Duration,
}

impl Default for PeriodWindows {
    fn default() -> Self {
        Self {
            hour: default_hour(),
            day: default_day(),
            week: default_week(),
            month: default_month(),
            year: default_year(),
        }
    }
}

const DAY: u64 = 24 * 3600;

fn with_slack(secs: u64) -> Duration {
    Duration::from_secs(secs + secs / 10)
}

fn default_indent() -> usize {
    2
}

fn default_hour() -> Duration {
    with_slack(3600)
}

fn default_day() -> Duration {
    with_slack(DAY)
}

fn default_week() -> Duration {
    with_slack(7 * DAY)
}

fn default_month() -> Duration {
    with_slack(31 * DAY)
}

fn default_year() -> Duration {
    with_slack(366 * DAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config: XmlConfig = toml::from_str("").unwrap();
        assert_eq!(config, XmlConfig::default());
        assert_eq!(config.indent, 2);
        assert_eq!(config.periods.hour, Duration::from_secs(66 * 60));
        assert_eq!(config.periods.day, Duration::from_secs(26 * 3600 + 24 * 60));
    }

    #[test]
    fn humantime() {
        let config: XmlConfig = toml::from_str(
            r#"
            indent = 0
            [periods]
            hour = "1h 30m"
            year = "400days"
            "#,
        )
        .unwrap();

        assert_eq!(config.indent, 0);
        assert_eq!(config.periods.hour, Duration::from_secs(90 * 60));
        assert_eq!(config.periods.year, Duration::from_secs(400 * DAY));
        assert_eq!(config.periods.week, default_week());
    }
}
