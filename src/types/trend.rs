//! Moving-average output types

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;

/// One sample of the smoothed sensor-glucose trend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovingAveragePoint {
    /// Grid slot time (local wall clock)
    pub timestamp: NaiveDateTime,
    /// Mean glucose over the window ending at `timestamp` (mg/dL)
    pub value: f64,
}

/// Moving-average series keyed by calendar date, each in ascending time order.
pub type DailyAverages = BTreeMap<NaiveDate, Vec<MovingAveragePoint>>;
