//! Carelink export column schema
//!
//! The pump/CGM export has a fixed positional layout. Column 0 is the device
//! row index (e.g. `1234.0`), which is only used to recognise data rows and is
//! not part of the schema below.

use serde::{Serialize, Serializer};

/// Number of named columns following the row index.
pub const COLUMN_COUNT: usize = 52;

macro_rules! columns {
    ($($variant:ident = $index:literal => $header:literal,)+) => {
        /// One named column of the export, in file order.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum Column {
            $($variant,)+
        }

        impl Column {
            /// Every column in positional order.
            pub const ALL: [Self; COLUMN_COUNT] = [$(Self::$variant,)+];

            /// Positional index in a tokenized line (the row index sits at 0).
            pub const fn index(self) -> usize {
                match self {
                    $(Self::$variant => $index,)+
                }
            }

            /// Header text exactly as the device writes it.
            pub const fn header(self) -> &'static str {
                match self {
                    $(Self::$variant => $header,)+
                }
            }

            /// Look a column up by its header text.
            pub fn from_header(header: &str) -> Option<Self> {
                match header {
                    $($header => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

columns! {
    Date = 1 => "Date",
    Time = 2 => "Time",
    NewDeviceTime = 3 => "New Device Time",
    BgSource = 4 => "BG Source",
    BgReading = 5 => "BG Reading (mg/dL)",
    LinkedBgMeterId = 6 => "Linked BG Meter ID",
    BasalRate = 7 => "Basal Rate (U/h)",
    TempBasalAmount = 8 => "Temp Basal Amount",
    TempBasalType = 9 => "Temp Basal Type",
    TempBasalDuration = 10 => "Temp Basal Duration (h:mm:ss)",
    BolusType = 11 => "Bolus Type",
    BolusVolumeSelected = 12 => "Bolus Volume Selected (U)",
    BolusVolumeDelivered = 13 => "Bolus Volume Delivered (U)",
    BolusDuration = 14 => "Bolus Duration (h:mm:ss)",
    PrimeType = 15 => "Prime Type",
    PrimeVolumeDelivered = 16 => "Prime Volume Delivered (U)",
    EstimatedReservoirVolume = 17 => "Estimated Reservoir Volume after Fill (U)",
    Alert = 18 => "Alert",
    UserClearedAlerts = 19 => "User Cleared Alerts",
    Suspend = 20 => "Suspend",
    Rewind = 21 => "Rewind",
    BwzEstimate = 22 => "BWZ Estimate (U)",
    BwzTargetHighBg = 23 => "BWZ Target High BG (mg/dL)",
    BwzTargetLowBg = 24 => "BWZ Target Low BG (mg/dL)",
    BwzCarbRatio = 25 => "BWZ Carb Ratio (g/U)",
    BwzInsulinSensitivity = 26 => "BWZ Insulin Sensitivity (mg/dL/U)",
    BwzCarbInput = 27 => "BWZ Carb Input (grams)",
    BwzBgInput = 28 => "BWZ BG Input (mg/dL)",
    BwzCorrectionEstimate = 29 => "BWZ Correction Estimate (U)",
    BwzFoodEstimate = 30 => "BWZ Food Estimate (U)",
    BwzActiveInsulin = 31 => "BWZ Active Insulin (U)",
    BwzStatus = 32 => "BWZ Status",
    SensorCalibrationBg = 33 => "Sensor Calibration BG (mg/dL)",
    SensorGlucose = 34 => "Sensor Glucose (mg/dL)",
    IsigValue = 35 => "ISIG Value",
    EventMarker = 36 => "Event Marker",
    BolusNumber = 37 => "Bolus Number",
    BolusCancellationReason = 38 => "Bolus Cancellation Reason",
    BwzUnabsorbedInsulinTotal = 39 => "BWZ Unabsorbed Insulin Total (U)",
    FinalBolusEstimate = 40 => "Final Bolus Estimate",
    ScrollStepSize = 41 => "Scroll Step Size",
    InsulinActionCurveTime = 42 => "Insulin Action Curve Time",
    SensorCalibrationRejectedReason = 43 => "Sensor Calibration Rejected Reason",
    PresetBolus = 44 => "Preset Bolus",
    BolusSource = 45 => "Bolus Source",
    BleNetworkDevice = 46 => "BLE Network Device",
    DeviceUpdateEvent = 47 => "Device Update Event",
    NetworkDeviceAssociatedReason = 48 => "Network Device Associated Reason",
    NetworkDeviceDisassociatedReason = 49 => "Network Device Disassociated Reason",
    NetworkDeviceDisconnectedReason = 50 => "Network Device Disconnected Reason",
    SensorException = 51 => "Sensor Exception",
    PresetTempBasalName = 52 => "Preset Temp Basal Name",
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.header())
    }
}

impl Serialize for Column {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.header())
    }
}
