//! Event Classifier
//!
//! Maps sorted raw records onto typed [`LogEntry`] values. Rules are checked in
//! priority order and the first match wins:
//!
//! 1. `Sensor Glucose (mg/dL)` present → [`LogEntry::SensorBg`]
//! 2. `Bolus Volume Selected (U)` present without `Bolus Volume Delivered (U)`
//!    → [`LogEntry::Bolus`], taking `BWZ Carb Input (grams)` from the record
//!    immediately after it in the (descending) sequence, if that one has it
//! 3. `BG Source` is a remote or manual entry → [`LogEntry::MeasuredBg`]
//! 4. anything else produces no entry
//!
//! The carb lookahead mirrors how the pump logs the wizard estimate on the
//! neighbouring row. It peeks at exactly one record and never searches; a
//! device that interleaves rows differently will get carbs misattributed.

use crate::types::{Column, LogEntry, RawRecord};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `BG Source` value for a meter reading accepted on the pump.
pub const REMOTE_BG_SOURCE: &str = "USER_ACCEPTED_REMOTE_BG";

/// `BG Source` value for a reading typed in by the user.
pub const MANUAL_BG_SOURCE: &str = "ENTERED_IN_BG_ENTRY";

/// How non-numeric cells in numeric columns are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericPolicy {
    /// Store `NaN` and keep going; the `NaN` propagates to consumers
    #[default]
    Permissive,
    /// Reject the whole ingestion on the first non-finite value
    Strict,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("Record {index}: column '{column}' is not a number ({value:?})")]
    NonNumeric {
        index: usize,
        column: Column,
        value: Option<String>,
    },
}

/// Classify every record, preserving input order.
pub fn classify(records: &[RawRecord], policy: NumericPolicy) -> Result<Vec<LogEntry>, ClassifyError> {
    (0..records.len())
        .filter_map(|index| classify_at(index, records, policy).transpose())
        .collect()
}

/// Classify the record at `index`, peeking at `index + 1` for bolus carbs.
pub fn classify_at(
    index: usize,
    records: &[RawRecord],
    policy: NumericPolicy,
) -> Result<Option<LogEntry>, ClassifyError> {
    let Some(record) = records.get(index) else {
        return Ok(None);
    };
    let timestamp = record.timestamp();

    if record.has(Column::SensorGlucose) {
        return Ok(Some(LogEntry::SensorBg {
            timestamp,
            bg_value: read_number(record, Column::SensorGlucose, index, policy)?,
        }));
    }

    if record.has(Column::BolusVolumeSelected) && !record.has(Column::BolusVolumeDelivered) {
        let carb_grams = records
            .get(index + 1)
            .filter(|next| next.has(Column::BwzCarbInput))
            .map(|next| read_number(next, Column::BwzCarbInput, index + 1, policy))
            .transpose()?;

        return Ok(Some(LogEntry::Bolus {
            timestamp,
            amount_unit: read_number(record, Column::BolusVolumeSelected, index, policy)?,
            carb_grams,
        }));
    }

    match record.get(Column::BgSource) {
        Some(REMOTE_BG_SOURCE | MANUAL_BG_SOURCE) => Ok(Some(LogEntry::MeasuredBg {
            timestamp,
            bg_value: read_number(record, Column::BgReading, index, policy)?,
        })),
        _ => Ok(None),
    }
}

/// Parse a cell as `f64`; absent or malformed cells become `NaN`.
///
/// Of the textual forms only `Infinity` (optionally signed) is a number;
/// `inf`, `infinity` and friends are malformed like any other word.
pub fn parse_number(value: Option<&str>) -> f64 {
    let Some(text) = value.map(str::trim) else {
        return f64::NAN;
    };
    let unsigned = text.strip_prefix(['+', '-']).unwrap_or(text);
    if unsigned.starts_with(|c: char| c.is_ascii_alphabetic()) && unsigned != "Infinity" {
        return f64::NAN;
    }
    text.parse::<f64>().unwrap_or(f64::NAN)
}

fn read_number(
    record: &RawRecord,
    column: Column,
    index: usize,
    policy: NumericPolicy,
) -> Result<f64, ClassifyError> {
    let raw = record.get(column);
    let value = parse_number(raw);

    if policy == NumericPolicy::Strict && !value.is_finite() {
        return Err(ClassifyError::NonNumeric {
            index,
            column,
            value: raw.map(str::to_string),
        });
    }
    Ok(value)
}
