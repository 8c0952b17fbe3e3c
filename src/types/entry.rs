//! Classified clinical events

use super::record::Timestamp;
use serde::Serialize;

/// One clinical event derived from a raw record.
///
/// Numeric payloads may be `NaN` when the source cell was absent or not a
/// number (see [`crate::classifier::NumericPolicy`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum LogEntry {
    /// Continuous sensor glucose reading (mg/dL)
    SensorBg { timestamp: Timestamp, bg_value: f64 },

    /// Insulin bolus, optionally annotated with the wizard's carb input
    Bolus {
        timestamp: Timestamp,
        amount_unit: f64,
        #[serde(skip_serializing_if = "Option::is_none")]
        carb_grams: Option<f64>,
    },

    /// Fingerstick or manually entered glucose value (mg/dL)
    MeasuredBg { timestamp: Timestamp, bg_value: f64 },
}

/// Discriminant of a [`LogEntry`], for counting and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    SensorBg,
    Bolus,
    MeasuredBg,
}

impl EntryKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SensorBg => "sensor-bg",
            Self::Bolus => "bolus",
            Self::MeasuredBg => "measured-bg",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl LogEntry {
    pub const fn timestamp(&self) -> Timestamp {
        match self {
            Self::SensorBg { timestamp, .. }
            | Self::Bolus { timestamp, .. }
            | Self::MeasuredBg { timestamp, .. } => *timestamp,
        }
    }

    pub const fn kind(&self) -> EntryKind {
        match self {
            Self::SensorBg { .. } => EntryKind::SensorBg,
            Self::Bolus { .. } => EntryKind::Bolus,
            Self::MeasuredBg { .. } => EntryKind::MeasuredBg,
        }
    }

    /// Glucose value for sensor and measured readings.
    pub fn glucose(&self) -> Option<f64> {
        match self {
            Self::SensorBg { bg_value, .. } | Self::MeasuredBg { bg_value, .. } => Some(*bg_value),
            Self::Bolus { .. } => None,
        }
    }
}
