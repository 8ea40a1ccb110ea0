//! The item-list model: ordered, named and typed values exposed for export.

use std::{borrow::Cow, fmt};

use crate::errors::StatsError;

/// How an item value should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    /// A plain decimal number.
    Integer,
    /// A duration (or a size) with one decimal.
    Time,
    /// A percentage with one decimal and the `%` suffix.
    Fraction,
}

/// A raw item value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ItemValue {
    /// An exact integer.
    Integer(i64),
    /// A derived or rescaled value.
    Float(f64),
}

impl ItemValue {
    /// Converts the value to `f64`.
    #[inline]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Integer(value) => value as f64,
            Self::Float(value) => value,
        }
    }
}

impl From<i64> for ItemValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<u64> for ItemValue {
    fn from(value: u64) -> Self {
        Self::Integer(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ItemValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// The formatted representation of an absent value.
pub const NO_DATA: &str = "-";

impl ItemType {
    /// Formats a value according to the type.
    pub fn format(self, value: Option<ItemValue>) -> String {
        let mut out = String::new();
        self.format_to(&mut out, value);
        out
    }

    /// Appends a formatted value to `out`.
    pub fn format_to(self, out: &mut String, value: Option<ItemValue>) {
        use fmt::Write;

        let value = match value {
            Some(value) if !value.as_f64().is_nan() => value,
            _ => return out.push_str(NO_DATA),
        };

        let _ = match (self, value) {
            (Self::Integer, ItemValue::Integer(value)) => write!(out, "{value}"),
            (Self::Integer, ItemValue::Float(value)) => write!(out, "{}", value.round() as i64),
            (Self::Time, value) => write!(out, "{:.1}", value.as_f64()),
            (Self::Fraction, value) => write!(out, "{:.1}%", value.as_f64() * 100.),
        };
    }
}

/// A single `(name, type, value)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Item<'a> {
    /// The name, unique inside the list.
    pub name: Cow<'a, str>,
    /// How to present the value.
    pub kind: ItemType,
    /// The value, `None` means "no data".
    pub value: Option<ItemValue>,
}

impl<'a> Item<'a> {
    pub(crate) fn new(
        name: impl Into<Cow<'a, str>>,
        kind: ItemType,
        value: Option<ItemValue>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            value,
        }
    }

    /// Returns the formatted value, `"-"` if there is no data.
    pub fn formatted(&self) -> String {
        self.kind.format(self.value)
    }
}

/// An ordered sequence of items.
///
/// The order and names are fixed for the lifetime of the list, only values
/// change. Indices must be derived from [`ItemList::item_count()`].
pub trait ItemList {
    /// Returns the number of items.
    fn item_count(&self) -> usize;

    /// Returns the item at the provided position.
    fn item(&self, index: usize) -> Result<Item<'_>, StatsError>;

    /// Returns the name of the item at the provided position.
    fn item_name(&self, index: usize) -> Result<Cow<'_, str>, StatsError> {
        self.item(index).map(|item| item.name)
    }

    /// Returns the position of the first item with the provided name.
    fn index_of(&self, name: &str) -> Option<usize> {
        (0..self.item_count()).find(|&index| {
            self.item_name(index)
                .map_or(false, |item_name| item_name == name)
        })
    }

    /// Collects all items in order.
    fn to_items(&self) -> Vec<Item<'_>> {
        (0..self.item_count())
            .filter_map(|index| self.item(index).ok())
            .collect()
    }
}

#[inline]
pub(crate) fn out_of_range(index: usize, count: usize) -> StatsError {
    StatsError::IndexOutOfRange { index, count }
}
