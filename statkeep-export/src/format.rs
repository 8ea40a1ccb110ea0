use std::time::SystemTime;

use chrono::{DateTime, Utc};

use statkeep_core::{Scalar, NO_DATA};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

pub(crate) fn timestamp(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format(TIMESTAMP_FORMAT)
        .to_string()
}

pub(crate) fn scalar(value: Scalar) -> String {
    match value {
        Scalar::Integer(value) => value.to_string(),
        Scalar::Timestamp(Some(time)) => timestamp(time),
        Scalar::Timestamp(None) => NO_DATA.into(),
    }
}

/// A dotted path of a group, anonymous groups are named by their kind.
pub(crate) fn child_path(parent: &str, name: Option<&str>, kind: &str) -> String {
    let name = name.unwrap_or(kind);

    if parent.is_empty() {
        name.into()
    } else {
        format!("{parent}.{name}")
    }
}
