//! Moving-Average Engine
//!
//! Smooths sensor glucose into one series per calendar date, sampled on a
//! fixed grid (every 15 minutes by default, 96 slots per day).
//!
//! ## Algorithm
//!
//! ```text
//! readings  = sensor-bg entries, ascending by time
//! grid      = every slot of every date that has a reading, ascending
//! for slot in grid:
//!     admit readings with time <= slot          (push back)
//!     evict readings with time <  slot - window (pop front)
//!     if window non-empty: emit mean at slot
//! ```
//!
//! Both cursors only move forward, so one sweep costs
//! O(grid slots + readings). The window keeps a compensated running sum, so a
//! large value leaving the window does not leave rounding error behind; the
//! mean is only recomputed from scratch while a non-finite value sits inside
//! the window.

use crate::types::{DailyAverages, LogEntry, MovingAveragePoint};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;

/// Default trailing window (hours).
pub const DEFAULT_WINDOW_HOURS: f64 = 24.0;

/// Default grid spacing (minutes).
pub const DEFAULT_SLOT_MINUTES: u32 = 15;

const MINUTES_PER_DAY: u32 = 24 * 60;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrendError {
    #[error("Window must be a positive, finite number of hours (got {0})")]
    InvalidWindow(f64),

    #[error("Slot spacing must divide a day evenly (got {0} minutes)")]
    InvalidSlot(u32),
}

/// Compute per-date moving averages with the default 15-minute grid.
pub fn compute_averages(entries: &[LogEntry], window_hours: f64) -> Result<DailyAverages, TrendError> {
    Ok(MovingAverageEngine::new(window_hours, DEFAULT_SLOT_MINUTES)?.compute(entries))
}

/// Validated window and grid settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovingAverageEngine {
    window: TimeDelta,
    slot_minutes: u32,
}

impl Default for MovingAverageEngine {
    fn default() -> Self {
        Self {
            window: TimeDelta::hours(24),
            slot_minutes: DEFAULT_SLOT_MINUTES,
        }
    }
}

impl MovingAverageEngine {
    pub fn new(window_hours: f64, slot_minutes: u32) -> Result<Self, TrendError> {
        if !window_hours.is_finite() || window_hours <= 0.0 {
            return Err(TrendError::InvalidWindow(window_hours));
        }
        if slot_minutes == 0 || MINUTES_PER_DAY % slot_minutes != 0 {
            return Err(TrendError::InvalidSlot(slot_minutes));
        }

        #[allow(clippy::cast_possible_truncation)]
        let millis = (window_hours * 3_600_000.0).round() as i64;
        let window = TimeDelta::try_milliseconds(millis)
            .filter(|w| *w > TimeDelta::zero())
            .ok_or(TrendError::InvalidWindow(window_hours))?;

        Ok(Self { window, slot_minutes })
    }

    pub const fn window(&self) -> TimeDelta {
        self.window
    }

    pub const fn slots_per_day(&self) -> u32 {
        MINUTES_PER_DAY / self.slot_minutes
    }

    /// Sweep all sensor readings once and return the per-date series.
    ///
    /// Readings with an invalid timestamp cannot be placed on a date and are
    /// ignored. An input without sensor readings yields an empty map.
    pub fn compute(&self, entries: &[LogEntry]) -> DailyAverages {
        let mut readings: Vec<(NaiveDateTime, f64)> = entries
            .iter()
            .filter_map(|entry| match entry {
                LogEntry::SensorBg { timestamp, bg_value } => timestamp.get().map(|t| (t, *bg_value)),
                LogEntry::Bolus { .. } | LogEntry::MeasuredBg { .. } => None,
            })
            .collect();

        let mut averages = DailyAverages::new();
        if readings.is_empty() {
            return averages;
        }
        readings.sort_by_key(|(time, _)| *time);

        let dates: BTreeSet<NaiveDate> = readings.iter().map(|(time, _)| time.date()).collect();

        // Dates ascend and slots ascend within a date, so the grid is
        // already in global time order.
        let grid = dates
            .iter()
            .flat_map(|&date| self.slots(date).map(move |slot| (date, slot)));

        let mut window = SlidingWindow::default();
        let mut next = 0;
        let mut points = 0usize;

        for (date, slot) in grid {
            while let Some(&(time, value)) = readings.get(next) {
                if time > slot {
                    break;
                }
                window.push(time, value);
                next += 1;
            }

            if let Some(start) = slot.checked_sub_signed(self.window) {
                window.evict_before(start);
            }

            if let Some(value) = window.mean() {
                averages
                    .entry(date)
                    .or_default()
                    .push(MovingAveragePoint { timestamp: slot, value });
                points += 1;
            }
        }

        tracing::debug!(
            readings = readings.len(),
            dates = dates.len(),
            points,
            window_minutes = self.window.num_minutes(),
            "Moving averages computed"
        );

        averages
    }

    fn slots(&self, date: NaiveDate) -> impl Iterator<Item = NaiveDateTime> {
        let midnight = date.and_time(NaiveTime::MIN);
        let step = self.slot_minutes;
        (0..self.slots_per_day()).filter_map(move |i| {
            midnight.checked_add_signed(TimeDelta::minutes(i64::from(i * step)))
        })
    }
}

/// FIFO window of `(time, value)` readings with a running sum.
#[derive(Debug, Default)]
struct SlidingWindow {
    readings: VecDeque<(NaiveDateTime, f64)>,
    /// Sum of finite values currently in the window
    sum: CompensatedSum,
    /// Count of NaN/infinite values currently in the window
    non_finite: usize,
}

impl SlidingWindow {
    fn push(&mut self, time: NaiveDateTime, value: f64) {
        if value.is_finite() {
            self.sum.add(value);
        } else {
            self.non_finite += 1;
        }
        self.readings.push_back((time, value));
    }

    fn evict_before(&mut self, start: NaiveDateTime) {
        while let Some(&(time, value)) = self.readings.front() {
            if time >= start {
                break;
            }
            self.readings.pop_front();
            if value.is_finite() {
                self.sum.add(-value);
            } else {
                self.non_finite -= 1;
            }
        }
        if self.readings.is_empty() {
            // drop accumulated rounding error
            self.sum = CompensatedSum::default();
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn mean(&self) -> Option<f64> {
        if self.readings.is_empty() {
            return None;
        }
        let len = self.readings.len() as f64;
        if self.non_finite > 0 {
            let total: f64 = self.readings.iter().map(|(_, value)| value).sum();
            return Some(total / len);
        }
        Some(self.sum.value() / len)
    }
}

/// Neumaier summation. The low-order bits lost when a small value is added
/// to a large one are kept in `compensation`, so they come back once the
/// large value is subtracted again.
#[derive(Debug, Default, Clone, Copy)]
struct CompensatedSum {
    sum: f64,
    compensation: f64,
}

impl CompensatedSum {
    fn add(&mut self, value: f64) {
        let total = self.sum + value;
        if self.sum.abs() >= value.abs() {
            self.compensation += (self.sum - total) + value;
        } else {
            self.compensation += (value - total) + self.sum;
        }
        self.sum = total;
    }

    fn value(self) -> f64 {
        self.sum + self.compensation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sensor(s: &str, bg_value: f64) -> LogEntry {
        LogEntry::SensorBg { timestamp: Timestamp::new(at(s)), bg_value }
    }

    fn value_at(averages: &DailyAverages, s: &str) -> Option<f64> {
        let t = at(s);
        averages
            .get(&t.date())?
            .iter()
            .find(|p| p.timestamp == t)
            .map(|p| p.value)
    }

    #[test]
    fn test_no_sensor_readings() {
        let entries = vec![LogEntry::MeasuredBg {
            timestamp: Timestamp::new(at("2024-01-01 08:00")),
            bg_value: 110.0,
        }];
        assert!(compute_averages(&entries, 24.0).unwrap().is_empty());
        assert!(compute_averages(&[], 24.0).unwrap().is_empty());
    }

    #[test]
    fn test_mean_of_both_readings_in_window() {
        let entries = vec![sensor("2024-01-01 20:00", 200.0), sensor("2024-01-01 08:00", 100.0)];
        let averages = compute_averages(&entries, 24.0).unwrap();
        assert_eq!(value_at(&averages, "2024-01-01 20:00"), Some(150.0));
        assert_eq!(value_at(&averages, "2024-01-01 19:45"), Some(100.0));
    }

    #[test]
    fn test_single_reading_fills_following_slots() {
        let averages = compute_averages(&[sensor("2024-01-01 08:00", 120.0)], 24.0).unwrap();
        let series = &averages[&date("2024-01-01")];
        assert_eq!(series.len(), 64);
        assert_eq!(series[0].timestamp, at("2024-01-01 08:00"));
        assert!(series.iter().all(|p| p.value == 120.0));
        assert_eq!(value_at(&averages, "2024-01-01 07:45"), None);
    }

    #[test]
    fn test_window_lower_bound_is_inclusive() {
        let entries = vec![sensor("2024-01-01 07:00", 100.0), sensor("2024-01-01 08:00", 200.0)];
        let averages = compute_averages(&entries, 1.0).unwrap();
        assert_eq!(value_at(&averages, "2024-01-01 08:00"), Some(150.0));
        assert_eq!(value_at(&averages, "2024-01-01 08:15"), Some(200.0));
    }

    #[test]
    fn test_empty_window_emits_nothing() {
        let averages = compute_averages(&[sensor("2024-01-01 08:00", 120.0)], 1.0).unwrap();
        let series = &averages[&date("2024-01-01")];
        let times: Vec<_> = series.iter().map(|p| p.timestamp.format("%H:%M").to_string()).collect();
        assert_eq!(times, vec!["08:00", "08:15", "08:30", "08:45", "09:00"]);
    }

    #[test]
    fn test_window_spans_midnight() {
        let entries = vec![sensor("2024-01-01 23:00", 100.0), sensor("2024-01-02 01:00", 200.0)];
        let averages = compute_averages(&entries, 24.0).unwrap();

        assert_eq!(averages.len(), 2);
        assert_eq!(averages[&date("2024-01-01")].len(), 4);
        assert_eq!(averages[&date("2024-01-02")].len(), 96);
        assert_eq!(value_at(&averages, "2024-01-02 00:00"), Some(100.0));
        assert_eq!(value_at(&averages, "2024-01-02 01:00"), Some(150.0));
    }

    #[test]
    fn test_dates_without_readings_have_no_series() {
        let entries = vec![sensor("2024-01-01 12:00", 100.0), sensor("2024-01-03 12:00", 200.0)];
        let averages = compute_averages(&entries, 72.0).unwrap();
        assert!(!averages.contains_key(&date("2024-01-02")));
        assert_eq!(value_at(&averages, "2024-01-03 12:00"), Some(150.0));
    }

    #[test]
    fn test_nan_only_affects_windows_containing_it() {
        let entries = vec![
            sensor("2024-01-01 08:00", 100.0),
            sensor("2024-01-01 09:00", f64::NAN),
            sensor("2024-01-01 10:00", 120.0),
        ];
        let averages = compute_averages(&entries, 1.0).unwrap();
        assert_eq!(value_at(&averages, "2024-01-01 08:45"), Some(100.0));
        assert!(value_at(&averages, "2024-01-01 10:00").unwrap().is_nan());
        assert_eq!(value_at(&averages, "2024-01-01 10:15"), Some(120.0));
    }

    #[test]
    fn test_invalid_timestamps_and_other_entries_ignored() {
        let entries = vec![
            LogEntry::SensorBg { timestamp: Timestamp::INVALID, bg_value: 300.0 },
            LogEntry::Bolus {
                timestamp: Timestamp::new(at("2024-01-01 07:00")),
                amount_unit: 2.0,
                carb_grams: None,
            },
            sensor("2024-01-01 08:00", 100.0),
        ];
        let averages = compute_averages(&entries, 24.0).unwrap();
        assert_eq!(averages.len(), 1);
        assert!(averages[&date("2024-01-01")].iter().all(|p| p.value == 100.0));
    }

    #[test]
    fn test_matches_direct_computation() {
        // three days of 5-minute readings with a sine-ish pattern
        let start = at("2024-03-01 00:02");
        let entries: Vec<LogEntry> = (0..3 * 288)
            .map(|i| {
                let t = start + TimeDelta::minutes(5 * i);
                let value = 120.0 + 40.0 * ((i as f64) / 20.0).sin();
                LogEntry::SensorBg { timestamp: Timestamp::new(t), bg_value: value }
            })
            .collect();

        let window = TimeDelta::hours(6);
        let averages = compute_averages(&entries, 6.0).unwrap();

        for series in averages.values() {
            for point in series {
                let lo = point.timestamp - window;
                let values: Vec<f64> = entries
                    .iter()
                    .filter_map(|e| {
                        let t = e.timestamp().get()?;
                        (t >= lo && t <= point.timestamp).then(|| e.glucose()).flatten()
                    })
                    .collect();
                let expected = values.iter().sum::<f64>() / values.len() as f64;
                assert!(
                    (point.value - expected).abs() < 1e-9,
                    "at {}: {} vs {}",
                    point.timestamp,
                    point.value,
                    expected
                );
            }
        }
    }

    #[test]
    fn test_outlier_leaving_window_does_not_skew_mean() {
        let entries = vec![
            sensor("2024-01-01 00:00", 1e17),
            sensor("2024-01-01 01:00", 101.0),
            sensor("2024-01-01 01:05", 103.0),
        ];
        let averages = compute_averages(&entries, 1.0).unwrap();
        let series = &averages[&date("2024-01-01")];

        for slot in ["01:15", "01:30", "01:45", "02:00"] {
            let time = at(&format!("2024-01-01 {slot}"));
            let point = series.iter().find(|p| p.timestamp == time).unwrap();
            assert!((point.value - 102.0).abs() < 1e-9, "at {slot}: {}", point.value);
        }
        let last = series.iter().find(|p| p.timestamp == at("2024-01-01 02:15")).unwrap();
        assert!((last.value - 103.0).abs() < 1e-9);
    }

    #[test]
    fn test_compensated_sum_recovers_small_terms() {
        let mut sum = CompensatedSum::default();
        for value in [1e17, 101.0, 103.0, -1e17] {
            sum.add(value);
        }
        assert_eq!(sum.value(), 204.0);
    }

    #[test]
    fn test_custom_slot_spacing() {
        let engine = MovingAverageEngine::new(24.0, 60).unwrap();
        assert_eq!(engine.slots_per_day(), 24);
        let averages = engine.compute(&[sensor("2024-01-01 00:00", 90.0)]);
        assert_eq!(averages[&date("2024-01-01")].len(), 24);
    }

    #[test]
    fn test_invalid_settings() {
        assert_eq!(
            MovingAverageEngine::new(0.0, 15),
            Err(TrendError::InvalidWindow(0.0))
        );
        assert!(MovingAverageEngine::new(f64::NAN, 15).is_err());
        assert_eq!(MovingAverageEngine::new(24.0, 7), Err(TrendError::InvalidSlot(7)));
        assert_eq!(MovingAverageEngine::new(24.0, 0), Err(TrendError::InvalidSlot(0)));
        assert_eq!(MovingAverageEngine::default().window(), TimeDelta::hours(24));
    }
}
