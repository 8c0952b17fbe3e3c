//! Export data acquisition module
//!
//! Turns a raw byte source into lines, and lines into raw records.

pub mod line_reader;
pub mod record_parser;

pub use line_reader::{LineReader, DEFAULT_CHUNK_SIZE};
pub use record_parser::{is_record_line, parse_line, tokenize, ParseError};
