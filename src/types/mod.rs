//! Shared data structures for the Carelink ingestion pipeline
//!
//! This module defines the core types that flow through ingestion:
//! - Stage 1-2: Column schema, Timestamp and RawRecord (parsed export rows)
//! - Stage 3: LogEntry (classified clinical events)
//! - Stage 4: MovingAveragePoint (smoothed sensor trend)

mod column;
mod record;
mod entry;
mod trend;

pub use column::*;
pub use record::*;
pub use entry::*;
pub use trend::*;
