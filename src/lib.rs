//! carelink-trend: Carelink CGM export ingestion
//!
//! Reads the CSV export of a Medtronic Carelink pump/CGM and turns it into
//! typed clinical events plus a smoothed glucose trend.
//!
//! ## Architecture
//!
//! - **Line Reader**: chunked async reading that reassembles split lines
//! - **Record Parser**: quote-aware tokenizer onto the 52-column schema
//! - **Event Classifier**: sensor, bolus and measured-BG entries
//! - **Moving-Average Engine**: per-day trend on a fixed time grid
//! - **Pipeline**: the single `ingest` entry point tying the above together

pub mod acquisition;
pub mod classifier;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod trend;
pub mod types;

// Re-export configuration
pub use config::AppConfig;

// Re-export commonly used types
pub use types::{
    Column, DailyAverages, EntryKind, LogEntry, MovingAveragePoint, RawRecord, Timestamp,
};

pub use classifier::NumericPolicy;
pub use error::IngestError;
pub use pipeline::{ingest, ingest_file, IngestStats, Ingested};
pub use trend::{compute_averages, MovingAverageEngine};
