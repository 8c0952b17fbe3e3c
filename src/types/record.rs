//! Raw export rows and their synthesized timestamp

use super::column::Column;
use chrono::{NaiveDate, NaiveDateTime};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

/// Date-time formats accepted for `"{Date} {Time}"`, tried in order.
///
/// Carelink writes `2024/01/31` in most locales; US exports use `1/31/24`.
/// Two-digit years must be tried before `%Y`, which would read `24` as AD 24.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M",
];

// ============================================================================
// Timestamp
// ============================================================================

/// Local wall-clock time of a record, or the invalid date.
///
/// The invalid date orders before every valid one, so a descending sort
/// places malformed rows at the end deterministically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct Timestamp(Option<NaiveDateTime>);

impl Timestamp {
    pub const INVALID: Self = Self(None);

    pub const fn new(value: NaiveDateTime) -> Self {
        Self(Some(value))
    }

    /// Parse the `Date` and `Time` column values joined by a space.
    ///
    /// A missing half or an unrecognised format yields [`Timestamp::INVALID`].
    pub fn from_date_time(date: Option<&str>, time: Option<&str>) -> Self {
        let (Some(date), Some(time)) = (date, time) else {
            return Self::INVALID;
        };
        let combined = format!("{} {}", date.trim(), time.trim());

        DATE_TIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(&combined, fmt).ok())
            .map_or(Self::INVALID, Self::new)
    }

    pub const fn get(self) -> Option<NaiveDateTime> {
        self.0
    }

    pub const fn is_valid(self) -> bool {
        self.0.is_some()
    }

    /// Calendar date of the reading, if the timestamp is valid.
    pub fn date(self) -> Option<NaiveDate> {
        self.0.map(|dt| dt.date())
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self::new(value)
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            None => f.write_str("Invalid Date"),
        }
    }
}

// ============================================================================
// Raw Record
// ============================================================================

/// One parsed data row: present column values plus the derived timestamp.
///
/// Empty cells are never stored; `get` returns `None` for them. Records are
/// immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    values: BTreeMap<Column, String>,
    timestamp: Timestamp,
}

impl RawRecord {
    /// Build a record from positional tokens (index 0 is the row index).
    ///
    /// Tokens past the last known column are ignored; missing trailing
    /// tokens are treated as empty.
    pub fn from_fields<S: AsRef<str>>(fields: &[S]) -> Self {
        Self::from_columns(Column::ALL.iter().filter_map(|&column| {
            fields
                .get(column.index())
                .map(|value| (column, value.as_ref()))
        }))
    }

    /// Build a record from explicit `(column, value)` pairs.
    pub fn from_columns<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Column, &'a str)>,
    {
        let values: BTreeMap<Column, String> = pairs
            .into_iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(column, value)| (column, value.to_string()))
            .collect();

        let timestamp = Timestamp::from_date_time(
            values.get(&Column::Date).map(String::as_str),
            values.get(&Column::Time).map(String::as_str),
        );

        Self { values, timestamp }
    }

    pub fn get(&self, column: Column) -> Option<&str> {
        self.values.get(&column).map(String::as_str)
    }

    pub fn has(&self, column: Column) -> bool {
        self.values.contains_key(&column)
    }

    pub const fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Number of present (non-empty) columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Present columns in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (Column, &str)> {
        self.values.iter().map(|(column, value)| (*column, value.as_str()))
    }

    /// Present columns for the raw-data view, which shows Date/Time as a heading.
    pub fn detail_fields(&self) -> impl Iterator<Item = (Column, &str)> {
        self.iter()
            .filter(|(column, _)| !matches!(column, Column::Date | Column::Time))
    }
}

impl Serialize for RawRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len() + 1))?;
        for (column, value) in &self.values {
            map.serialize_entry(column.header(), value)?;
        }
        map.serialize_entry("_timestamp", &self.timestamp)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = Timestamp::new(dt("2024-01-31 08:15:00"));
        assert_eq!(Timestamp::from_date_time(Some("2024/01/31"), Some("08:15:00")), expected);
        assert_eq!(Timestamp::from_date_time(Some("2024-01-31"), Some("08:15:00")), expected);
        assert_eq!(Timestamp::from_date_time(Some("1/31/24"), Some("08:15:00")), expected);
        assert_eq!(Timestamp::from_date_time(Some("01/31/2024"), Some("08:15")), expected);
    }

    #[test]
    fn test_invalid_timestamp_sorts_first() {
        let invalid = Timestamp::from_date_time(Some("yesterday"), Some("noon"));
        assert!(!invalid.is_valid());
        assert_eq!(Timestamp::from_date_time(None, Some("08:00:00")), Timestamp::INVALID);
        assert!(invalid < Timestamp::new(dt("1970-01-01 00:00:00")));
        assert_eq!(invalid.to_string(), "Invalid Date");
    }

    #[test]
    fn test_empty_values_are_absent() {
        let record = RawRecord::from_fields(&["1.0", "2024-01-01", "08:00:00", "", "GLUCOSE"]);
        assert_eq!(record.get(Column::Date), Some("2024-01-01"));
        assert_eq!(record.get(Column::NewDeviceTime), None);
        assert!(!record.has(Column::NewDeviceTime));
        assert_eq!(record.get(Column::BgSource), Some("GLUCOSE"));
        assert_eq!(record.len(), 3);
        assert_eq!(record.timestamp(), Timestamp::new(dt("2024-01-01 08:00:00")));
    }

    #[test]
    fn test_detail_fields_skip_date_and_time() {
        let record = RawRecord::from_columns([
            (Column::Date, "2024-01-01"),
            (Column::Time, "08:00:00"),
            (Column::SensorGlucose, "120"),
            (Column::BgSource, "SENSOR"),
        ]);
        let details: Vec<_> = record.detail_fields().collect();
        assert_eq!(
            details,
            vec![(Column::BgSource, "SENSOR"), (Column::SensorGlucose, "120")]
        );
    }

    #[test]
    fn test_serialize_uses_headers() {
        let record = RawRecord::from_columns([
            (Column::Date, "2024-01-01"),
            (Column::Time, "08:00:00"),
            (Column::SensorGlucose, "120"),
        ]);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["Sensor Glucose (mg/dL)"], "120");
        assert_eq!(json["_timestamp"], "2024-01-01T08:00:00");
    }
}
